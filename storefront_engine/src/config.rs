//! Engine tuning knobs, read from the environment with logged defaults.

use std::env;

use chrono::Duration;
use log::*;

const DEFAULT_RESERVATION_TTL_SECS: i64 = 900;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// How long an unfulfilled reservation holds stock before the sweeper releases it.
/// `STOREFRONT_RESERVATION_TTL_SECS`, default 15 minutes.
pub fn reservation_ttl() -> Duration {
    let secs = env_i64("STOREFRONT_RESERVATION_TTL_SECS", DEFAULT_RESERVATION_TTL_SECS);
    Duration::seconds(secs)
}

/// How often the expiry sweeper wakes. `STOREFRONT_SWEEP_INTERVAL_SECS`, default 60 seconds.
pub fn sweep_interval() -> std::time::Duration {
    let secs = env_i64("STOREFRONT_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS as i64);
    std::time::Duration::from_secs(secs.max(1) as u64)
}

fn env_i64(var: &str, default: i64) -> i64 {
    match env::var(var) {
        Ok(s) => s.parse::<i64>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}
