use chrono::{DateTime, Datelike, FixedOffset, LocalResult, NaiveTime, TimeZone, Utc, Weekday};

/// Weekly schedule anchored to one weekday and time in a fixed offset.
#[derive(Debug, Clone)]
pub(crate) struct WeeklyCadence {
    tz: FixedOffset,
    weekday: Weekday,
    target: NaiveTime,
}

impl WeeklyCadence {
    pub(crate) fn new(tz: FixedOffset, weekday: Weekday, hour: u32, minute: u32) -> Self {
        let target = NaiveTime::from_hms_opt(hour, minute, 0)
            .unwrap_or_else(|| panic!("invalid time: {hour:02}:{minute:02}"));
        Self {
            tz,
            weekday,
            target,
        }
    }

    pub(crate) fn next_run_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let localized_now = now.with_timezone(&self.tz);
        let today = localized_now.date_naive();

        let mut days_ahead = u64::from(
            (self.weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7,
        );
        if days_ahead == 0 && localized_now.time() > self.target {
            days_ahead = 7;
        }

        let date = today
            .checked_add_days(chrono::Days::new(days_ahead))
            .expect("date should remain representable when advancing");
        let local_target = date.and_time(self.target);

        match self.tz.from_local_datetime(&local_target) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
            LocalResult::None => unreachable!("fixed offset should not produce nonexistent times"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WeeklyCadence;
    use chrono::{DateTime, FixedOffset, Utc, Weekday};

    fn parse_utc(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 1800).expect("ist offset")
    }

    #[test]
    fn next_run_later_this_week() {
        let cadence = WeeklyCadence::new(ist(), Weekday::Sun, 8, 0);
        let now = parse_utc("2026-08-26T12:00:00Z"); // Wednesday
        let expected = parse_utc("2026-08-30T02:30:00Z"); // Sunday 08:00 IST

        assert_eq!(cadence.next_run_from(now), expected);
    }

    #[test]
    fn next_run_same_day_when_before_trigger() {
        let cadence = WeeklyCadence::new(ist(), Weekday::Sun, 8, 0);
        let now = parse_utc("2026-08-30T01:00:00Z"); // Sunday 06:30 IST
        let expected = parse_utc("2026-08-30T02:30:00Z");

        assert_eq!(cadence.next_run_from(now), expected);
    }

    #[test]
    fn next_run_skips_a_week_when_past_trigger() {
        let cadence = WeeklyCadence::new(ist(), Weekday::Sun, 8, 0);
        let now = parse_utc("2026-08-30T10:00:00Z"); // Sunday 15:30 IST
        let expected = parse_utc("2026-09-06T02:30:00Z"); // Next Sunday

        assert_eq!(cadence.next_run_from(now), expected);
    }

    #[test]
    fn next_run_immediate_when_exact_trigger() {
        let cadence = WeeklyCadence::new(ist(), Weekday::Sun, 8, 0);
        let now = parse_utc("2026-08-30T02:30:00Z"); // exactly Sunday 08:00 IST

        assert_eq!(cadence.next_run_from(now), now);
    }
}
