use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{AbsenceInterval, DailyDelta};
use crate::schedule::BreakCalendar;

/// Clock minutes per instructional period.
pub const PERIOD_MINUTES: f64 = 50.0;

/// Factor converting clock hours into 50-minute periods (`60 / 50`).
pub const HOURS_TO_PERIODS: f64 = 60.0 / PERIOD_MINUTES;

/// Unit a duration is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationUnit {
    /// 50-minute instructional periods, breaks deducted.
    #[default]
    SchoolPeriods,
    /// Plain clock hours, no break deduction.
    ClockHours,
}

/// Converts single-day absence intervals into missed time.
///
/// Pure: the result depends only on the interval, the break calendar and
/// the requested unit.
#[derive(Debug, Clone, Default)]
pub struct DurationCalculator {
    breaks: BreakCalendar,
}

impl DurationCalculator {
    pub fn new(breaks: BreakCalendar) -> Self {
        Self { breaks }
    }

    /// Missed time between `start` and `end`, dated on `start`'s date.
    ///
    /// With [`DurationUnit::SchoolPeriods`], every break whose start lies
    /// strictly after `start`'s time and at or before `end`'s time is
    /// deducted, then hours are scaled by `6/5`.
    pub fn missed_time(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        unit: DurationUnit,
    ) -> (NaiveDate, f64) {
        let mut diff = end - start;

        if unit == DurationUnit::SchoolPeriods {
            diff -= self.breaks.deduction_within(start.time(), end.time());
        }

        let hours = diff.num_seconds() as f64 / 3600.0;
        let value = match unit {
            DurationUnit::SchoolPeriods => hours * HOURS_TO_PERIODS,
            DurationUnit::ClockHours => hours,
        };

        (start.date(), value)
    }

    /// [`missed_time`](Self::missed_time) for any absence, as a [`DailyDelta`].
    pub fn delta<A: AbsenceInterval>(&self, absence: &A, unit: DurationUnit) -> DailyDelta {
        let (date, missed) = self.missed_time(absence.start(), absence.end(), unit);
        DailyDelta { date, missed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BreakInterval;

    const EPS: f64 = 1e-9;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn calculator() -> DurationCalculator {
        DurationCalculator::new(BreakCalendar::new(vec![
            BreakInterval::hm(9, 40, 9, 55, 15),
            BreakInterval::hm(11, 35, 11, 40, 5),
            BreakInterval::hm(15, 0, 15, 15, 15),
        ]))
    }

    #[test]
    fn test_single_break_scenario() {
        let calc = DurationCalculator::new(BreakCalendar::new(vec![BreakInterval::hm(
            9, 40, 9, 55, 15,
        )]));
        let (date, periods) = calc.missed_time(
            dt("2024-09-02 08:30"),
            dt("2024-09-02 12:00"),
            DurationUnit::SchoolPeriods,
        );
        assert_eq!(date, dt("2024-09-02 00:00").date());
        // 3.5h - 0.25h = 3.25h → 3.9 periods
        assert!((periods - 3.9).abs() < EPS);
    }

    #[test]
    fn test_all_breaks_deducted_over_morning() {
        let (_, periods) = calculator().missed_time(
            dt("2024-09-02 08:00"),
            dt("2024-09-02 13:20"),
            DurationUnit::SchoolPeriods,
        );
        // 320 min - 20 min = 300 min = 6 periods
        assert!((periods - 6.0).abs() < EPS);
    }

    #[test]
    fn test_clock_hours_skip_break_deduction() {
        let (_, hours) = calculator().missed_time(
            dt("2024-09-02 08:30"),
            dt("2024-09-02 12:00"),
            DurationUnit::ClockHours,
        );
        assert!((hours - 3.5).abs() < EPS);
    }

    #[test]
    fn test_single_period_is_one_unit() {
        let (_, periods) = calculator().missed_time(
            dt("2024-09-02 08:00"),
            dt("2024-09-02 08:50"),
            DurationUnit::SchoolPeriods,
        );
        assert!((periods - 1.0).abs() < EPS);
    }

    #[test]
    fn test_absence_starting_at_break_is_not_deducted() {
        let (_, periods) = calculator().missed_time(
            dt("2024-09-02 09:40"),
            dt("2024-09-02 10:40"),
            DurationUnit::SchoolPeriods,
        );
        assert!((periods - 1.2).abs() < EPS);
    }

    #[test]
    fn test_zero_length_is_zero() {
        let (_, periods) = calculator().missed_time(
            dt("2024-09-02 09:00"),
            dt("2024-09-02 09:00"),
            DurationUnit::SchoolPeriods,
        );
        assert_eq!(periods, 0.0);
    }

    #[test]
    fn test_delta_from_record() {
        use crate::models::{AbsenceRecord, AbsenceStatus};
        let rec = AbsenceRecord {
            full_name: "Muster".to_string(),
            first_name: "Max".to_string(),
            class: "5AHEL".to_string(),
            start: dt("2024-09-02 08:00"),
            end: dt("2024-09-02 08:50"),
            status: AbsenceStatus::Excused,
            reason: String::new(),
            note: String::new(),
        };
        let delta = calculator().delta(&rec, DurationUnit::SchoolPeriods);
        assert_eq!(delta.date, rec.start.date());
        assert!((delta.missed - 1.0).abs() < EPS);
    }
}
