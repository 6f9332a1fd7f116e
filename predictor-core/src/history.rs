//! Per-token histories: eligibility windows and gap-filling against the global day set.
//!
//! A day that appears anywhere in the batch is assumed observable for every token, so a
//! token missing on that day had a true zero, not missing data.

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

/// Recency window for a token, in periods of [`Period::days`].
const ABANDONED_AFTER_PERIODS: i64 = 30;
/// Trailing window kept for forecasting, in periods.
const WINDOW_PERIODS: i64 = 60;

/// Scheduling granularity used to size the eligibility windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "yearly")]
    Yearly,
    #[serde(rename = "days")]
    Days(u32),
}

impl Period {
    pub fn days(&self) -> i64 {
        match self {
            Period::Daily => 1,
            Period::Weekly => 7,
            Period::Monthly => 30,
            Period::Yearly => 365,
            Period::Days(n) => i64::from(*n),
        }
    }

    pub fn from_days(days: u32) -> Self {
        match days {
            1 => Period::Daily,
            7 => Period::Weekly,
            30 => Period::Monthly,
            365 => Period::Yearly,
            n => Period::Days(n),
        }
    }
}

/// One quantity observed on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub quantity: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, quantity: f64) -> Self {
        Self { date, quantity }
    }

    fn zero(date: NaiveDate) -> Self {
        Self { date, quantity: 0.0 }
    }
}

/// Observations of one token, ascending by date.
pub type History = Vec<Observation>;

/// Apply the eligibility rules to a history sorted ascending by date.
///
/// Returns the trailing window of the history, or `None` when the token is not
/// forecastable:
/// - a lone observation that is not on `last_day`
/// - a last observation older than 30 periods before `last_day`
/// - nothing left inside the 60-period window
pub fn limit_history(history: &[Observation], last_day: NaiveDate, period: Period) -> Option<History> {
    let (first, last) = (history.first()?, history.last()?);
    if history.len() == 1 && first.date != last_day {
        return None;
    }

    if (last_day - last.date).num_days() > ABANDONED_AFTER_PERIODS.saturating_mul(period.days()) {
        return None;
    }

    // A window reaching past the calendar's start keeps everything.
    let not_older_than = TimeDelta::try_days(WINDOW_PERIODS.saturating_mul(period.days()))
        .and_then(|window| last_day.checked_sub_signed(window));
    let window: History = history
        .iter()
        .filter(|o| not_older_than.is_none_or(|cutoff| o.date >= cutoff))
        .copied()
        .collect();

    match window.as_slice() {
        [] => None,
        [only] if only.date != last_day => None,
        _ => Some(window),
    }
}

/// A gap-filled series ready for forecasting. Always holds at least two points.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledSeries {
    points: Vec<Observation>,
}

impl FilledSeries {
    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a series built by [`fill_gaps`].
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Observation {
        self.points[self.points.len() - 1]
    }

    pub fn second_last(&self) -> Observation {
        self.points[self.points.len() - 2]
    }

    pub fn into_points(self) -> Vec<Observation> {
        self.points
    }
}

/// Align an eligible history to the global day set.
///
/// A single observation becomes a flat two-point line (the copy is dated to the
/// second-most-recent global day) so a trend forecaster sees "no change".
/// Otherwise every global day between the first observation and the end of
/// `days` that the history lacks is filled with a zero quantity.
///
/// Returns `None` only for an empty history.
pub fn fill_gaps(history: &[Observation], days: &[NaiveDate]) -> Option<FilledSeries> {
    let first = *history.first()?;

    if history.len() == 1 {
        let prev_day = match days {
            [.., prev, last] if *last == first.date => *prev,
            _ => days
                .iter()
                .rev()
                .find(|d| **d < first.date)
                .copied()
                .or_else(|| first.date.pred_opt())
                .unwrap_or(first.date),
        };
        return Some(FilledSeries {
            points: vec![Observation::new(prev_day, first.quantity), first],
        });
    }

    let mut points = Vec::with_capacity(days.len().max(history.len()));
    points.push(first);
    let mut prev_day = first.date;

    for obs in &history[1..] {
        points.extend(
            days.iter()
                .filter(|d| **d > prev_day && **d < obs.date)
                .map(|d| Observation::zero(*d)),
        );
        points.push(*obs);
        prev_day = obs.date;
    }

    points.extend(
        days.iter()
            .filter(|d| **d > prev_day)
            .map(|d| Observation::zero(*d)),
    );

    Some(FilledSeries { points })
}

/// Eligibility check followed by gap-filling.
pub fn normalize(history: &[Observation], days: &[NaiveDate], period: Period) -> Option<FilledSeries> {
    let last_day = *days.last()?;
    let limited = limit_history(history, last_day, period)?;
    fill_gaps(&limited, days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn obs(day: u32, q: f64) -> Observation {
        Observation::new(d(day), q)
    }

    #[test]
    fn test_single_point_must_be_on_last_day() {
        assert!(limit_history(&[obs(3, 1.0)], d(5), Period::Weekly).is_none());
        assert_eq!(
            limit_history(&[obs(5, 1.0)], d(5), Period::Weekly),
            Some(vec![obs(5, 1.0)])
        );
    }

    #[test]
    fn test_abandoned_token_is_dropped() {
        let last = d(1) + TimeDelta::days(33);
        let history = [obs(1, 1.0), obs(2, 1.0)];
        assert!(limit_history(&history, last, Period::Daily).is_none());
        assert!(limit_history(&history, last, Period::Weekly).is_some());
    }

    #[test]
    fn test_window_truncates_old_points() {
        let last = d(1) + TimeDelta::days(70);
        let history = [
            obs(1, 1.0),
            Observation::new(d(1) + TimeDelta::days(40), 2.0),
            Observation::new(last, 3.0),
        ];
        let limited = limit_history(&history, last, Period::Daily).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].quantity, 2.0);
    }

    #[test]
    fn test_truncation_to_single_stale_point_is_dropped() {
        let last = d(1) + TimeDelta::days(25);
        // Old point falls out of the 60-day window, the remaining one is not current.
        let history = [
            Observation::new(d(1) - TimeDelta::days(60), 1.0),
            Observation::new(last - TimeDelta::days(2), 2.0),
        ];
        assert!(limit_history(&history, last, Period::Daily).is_none());
    }

    #[test]
    fn test_huge_period_keeps_whole_history() {
        let last = d(20);
        let history = [obs(1, 1.0), obs(20, 2.0)];
        let limited = limit_history(&history, last, Period::Days(5_000_000)).unwrap();
        assert_eq!(limited, history.to_vec());
        let limited = limit_history(&history, last, Period::Days(u32::MAX)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_fill_gaps_single_point_flat_line() {
        let days = [d(1), d(2), d(3), d(4), d(5)];
        let filled = fill_gaps(&[obs(5, 3.0)], &days).unwrap();
        assert_eq!(filled.points(), &[obs(4, 3.0), obs(5, 3.0)]);
    }

    #[test]
    fn test_fill_gaps_single_point_single_day_batch() {
        let filled = fill_gaps(&[obs(5, 3.0)], &[d(5)]).unwrap();
        assert_eq!(filled.points(), &[obs(4, 3.0), obs(5, 3.0)]);
    }

    #[test]
    fn test_fill_gaps_inserts_zeros_between_and_after() {
        let days = [d(1), d(2), d(4), d(6), d(8), d(9)];
        let filled = fill_gaps(&[obs(2, 1.0), obs(6, 2.0)], &days).unwrap();
        assert_eq!(
            filled.points(),
            &[obs(2, 1.0), obs(4, 0.0), obs(6, 2.0), obs(8, 0.0), obs(9, 0.0)]
        );
    }

    #[test]
    fn test_fill_gaps_covers_every_day_once() {
        let days: Vec<_> = (1..=10).map(d).collect();
        let history = [obs(3, 1.0), obs(4, 2.0), obs(7, 1.0), obs(10, 4.0)];
        let filled = fill_gaps(&history, &days).unwrap();
        assert_eq!(filled.len(), 8); // days 3..=10
        let dates: Vec<_> = filled.points().iter().map(|o| o.date).collect();
        assert_eq!(dates, (3..=10).map(d).collect::<Vec<_>>());
    }

    #[test]
    fn test_normalize_drops_stale_single_point() {
        let days = [d(1), d(2), d(3)];
        assert!(normalize(&[obs(1, 2.0)], &days, Period::Weekly).is_none());
        assert!(normalize(&[obs(3, 2.0)], &days, Period::Weekly).is_some());
        assert!(normalize(&[obs(3, 2.0)], &[], Period::Weekly).is_none());
    }

    #[test]
    fn test_period_days() {
        assert_eq!(Period::Weekly.days(), 7);
        assert_eq!(Period::Monthly.days(), 30);
        assert_eq!(Period::from_days(14), Period::Days(14));
        assert_eq!(Period::from_days(7), Period::Weekly);
    }
}
