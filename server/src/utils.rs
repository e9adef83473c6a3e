use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Current wall-clock time in whole seconds since the unix epoch
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}
