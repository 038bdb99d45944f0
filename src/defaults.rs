use chrono::NaiveTime;

pub const DEFAULT_CLEANING_MINUTES: u32 = 30;

pub fn default_day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).expect("valid static default day start")
}

pub fn default_day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).expect("valid static default day end")
}
