use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{info, warn};
use pinwatch_core::{WatchConfig, epoch_secs};

use crate::display;

/// Granularity at which the idle wait checks for Ctrl+C.
const POLL_STEP: Duration = Duration::from_millis(200);

pub fn run(config: &WatchConfig, cycles: Option<u64>, json: bool) {
    let mut monitor = super::make_monitor(config);
    let rt = super::make_runtime();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    if !json {
        println!(
            "Watching {} node(s) every {}s. Press Ctrl+C to stop.",
            monitor.registry().len(),
            config.refresh_interval.as_secs_f64()
        );
        println!();
    }

    while running.load(Ordering::SeqCst) {
        if let Some(max) = cycles
            && monitor.session().cycles() >= max
        {
            break;
        }

        if let Some(report) = rt.block_on(monitor.refresh_if_due(Instant::now())) {
            let streak = monitor.session().consecutive_failures();
            if let Some(note) = display::failure_streak_note(streak) {
                warn!("{note}");
            }
            if json {
                match serde_json::to_string(&report) {
                    Ok(s) => println!("{s}"),
                    Err(e) => eprintln!("Error serializing snapshot: {e}"),
                }
            } else {
                print!(
                    "{}",
                    display::render_report(monitor.registry(), &report, epoch_secs())
                );
                println!();
            }
            continue;
        }

        let wait = monitor
            .session()
            .until_next_refresh(Instant::now())
            .min(POLL_STEP);
        std::thread::sleep(wait);
    }

    let summary = monitor.finish();
    info!("session {} finished after {} cycle(s)", summary.id, summary.cycles);
    if !json {
        println!(
            "Session {} ended: {} cycle(s) in {}",
            summary.id,
            summary.cycles,
            display::format_duration(summary.duration_ms / 1000)
        );
    }
}
