use chrono::NaiveTime;

/// Minimum valid stay duration for a day's schedule.
pub const MIN_STAY_DURATION_MINUTES: u32 = 30;
/// Maximum valid stay duration for a day's schedule.
pub const MAX_STAY_DURATION_MINUTES: u32 = 720;

pub fn default_daily_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).expect("valid static default daily start")
}

pub fn default_daily_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).expect("valid static default daily end")
}
