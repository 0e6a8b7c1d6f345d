pub mod nodes;
pub mod snapshot;
pub mod watch;

use pinwatch_core::{Monitor, WatchConfig};

/// Defaults, then `PINWATCH_CONFIG`, then `PINWATCH_*` overrides. Exits on error.
pub fn load_config() -> WatchConfig {
    match WatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn make_monitor(config: &WatchConfig) -> Monitor {
    match Monitor::new(config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn make_runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    }
}
