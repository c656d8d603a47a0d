//! Live dice arena service.
//!
//! Hosts one [`ChatArena`](dicearena_execution::ChatArena) per chat behind an
//! [`ArenaRegistry`], drives their timers with tokio, draws dice from the OS
//! and exposes everything over a JSON WebSocket gateway.

pub mod config;
pub mod dice;
pub mod gateway;
pub mod protocol;
pub mod registry;
pub mod scheduler;

use std::time::{SystemTime, UNIX_EPOCH};

pub use config::{Config, ConfigError, ValidatedConfig};
pub use registry::ArenaRegistry;
pub use scheduler::{dispatch_timers, TokioScheduler};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
