use chrono::{Datelike, Local, NaiveDate};

/// Calendar context for the current week, threaded into discovery queries
/// and ranking prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekContext {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub week_number: u32,
    pub date: String,
}

impl WeekContext {
    #[must_use]
    pub fn now() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            month_name: date.format("%B").to_string(),
            week_number: date.iso_week().week(),
            date: date.format("%Y-%m-%d").to_string(),
        }
    }
}
