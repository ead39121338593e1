use chrono::{DateTime, Utc};

/// Public spectator page of a room.
pub fn spectator_url(room_code: &str) -> String {
    format!("https://gartic.io/{}/viewer", room_code)
}

/// File name for a screenshot taken at `at`, unique down to the nanosecond.
pub fn screenshot_file_name(at: DateTime<Utc>) -> String {
    format!(
        "screenshot_{}_{:09}.png",
        at.timestamp(),
        at.timestamp_subsec_nanos()
    )
}
