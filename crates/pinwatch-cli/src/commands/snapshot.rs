use pinwatch_core::{WatchConfig, epoch_secs};

use crate::display;

pub fn run(config: &WatchConfig, json: bool) {
    let mut monitor = super::make_monitor(config);
    let rt = super::make_runtime();
    let report = rt.block_on(monitor.refresh());

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing snapshot: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!(
            "{}",
            display::render_report(monitor.registry(), &report, epoch_secs())
        );
    }
}
