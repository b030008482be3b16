//! Heart-rate partitioning
//!
//! Splits the day's heart-rate samples into at-rest and active subsets using
//! the resolved sleep window, and reconciles a single resting value from up
//! to three candidate sources. All resolved values are integers, rounded to
//! nearest (half away from zero) after averaging.

use crate::types::Sample;
use crate::window::is_within;

/// A sleep window in minutes-of-day, possibly crossing midnight
pub type SleepWindow = (u32, u32);

/// Resolve a single resting heart rate for the day.
///
/// Priority order, first success wins:
/// 1. a directly reported daily resting-HR aggregate,
/// 2. the mean of samples inside the sleep window,
/// 3. the minimum observed sample.
pub fn resolve_resting_hr(
    direct: Option<f64>,
    samples: &[Sample],
    sleep_window: Option<SleepWindow>,
) -> Option<i64> {
    if let Some(v) = direct {
        return Some(v.round() as i64);
    }
    if let Some(window) = sleep_window {
        if let Some(mean) = mean(partition(samples, window, true)) {
            return Some(mean.round() as i64);
        }
    }
    min_hr(samples)
}

/// Mean heart rate outside the sleep window.
///
/// Without a sleep window every sample counts as active. Returns None when
/// no active samples exist.
pub fn active_hr(samples: &[Sample], sleep_window: Option<SleepWindow>) -> Option<i64> {
    let mean = match sleep_window {
        Some(window) => mean(partition(samples, window, false)),
        None => mean(samples.iter().map(|s| s.value)),
    };
    mean.map(|v| v.round() as i64)
}

/// Mean of all samples, rounded
pub fn avg_hr(samples: &[Sample]) -> Option<i64> {
    mean(samples.iter().map(|s| s.value)).map(|v| v.round() as i64)
}

/// Minimum observed sample, rounded
pub fn min_hr(samples: &[Sample]) -> Option<i64> {
    samples
        .iter()
        .map(|s| s.value)
        .fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        })
        .map(|v| v.round() as i64)
}

/// Maximum observed sample, rounded
pub fn max_hr(samples: &[Sample]) -> Option<i64> {
    samples
        .iter()
        .map(|s| s.value)
        .fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        })
        .map(|v| v.round() as i64)
}

/// Values of the samples inside (or outside) the window.
///
/// Samples with unparseable time labels are treated as outside any window,
/// so they still count toward the active partition.
fn partition(
    samples: &[Sample],
    window: SleepWindow,
    inside: bool,
) -> impl Iterator<Item = f64> + '_ {
    samples.iter().filter_map(move |s| {
        let in_window = crate::window::minutes_of_day(&s.time)
            .map(|t| is_within(t, window.0, window.1))
            .unwrap_or(false);
        (in_window == inside).then_some(s.value)
    })
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new("23:30", 52.0),
            Sample::new("02:00", 48.0),
            Sample::new("06:30", 55.0),
            Sample::new("10:00", 95.0),
            Sample::new("14:00", 110.0),
            Sample::new("18:30", 88.0),
        ]
    }

    const NIGHT: SleepWindow = (1380, 420); // 23:00-07:00, crosses midnight

    #[test]
    fn test_direct_aggregate_wins() {
        let rhr = resolve_resting_hr(Some(51.6), &samples(), Some(NIGHT));
        assert_eq!(rhr, Some(52));
    }

    #[test]
    fn test_sleep_window_mean_is_second_choice() {
        // (52 + 48 + 55) / 3 = 51.666 -> rounds to 52
        let rhr = resolve_resting_hr(None, &samples(), Some(NIGHT));
        assert_eq!(rhr, Some(52));
    }

    #[test]
    fn test_day_minimum_is_last_resort() {
        // No sleep window at all: fall through to the observed minimum
        let rhr = resolve_resting_hr(None, &samples(), None);
        assert_eq!(rhr, Some(48));

        // Sleep window that no sample falls into: also the minimum
        let rhr = resolve_resting_hr(None, &samples(), Some((720, 721)));
        assert_eq!(rhr, Some(48));
    }

    #[test]
    fn test_no_samples_no_resting_hr() {
        assert_eq!(resolve_resting_hr(None, &[], Some(NIGHT)), None);
        assert_eq!(resolve_resting_hr(None, &[], None), None);
    }

    #[test]
    fn test_active_hr_excludes_sleep_window() {
        // (95 + 110 + 88) / 3 = 97.666 -> 98
        assert_eq!(active_hr(&samples(), Some(NIGHT)), Some(98));
    }

    #[test]
    fn test_active_hr_without_window_uses_all_samples() {
        // (52 + 48 + 55 + 95 + 110 + 88) / 6 = 74.666 -> 75
        assert_eq!(active_hr(&samples(), None), Some(75));
    }

    #[test]
    fn test_active_hr_none_when_all_samples_sleep() {
        let night_only = vec![Sample::new("01:00", 50.0), Sample::new("04:00", 47.0)];
        assert_eq!(active_hr(&night_only, Some(NIGHT)), None);
    }

    #[test]
    fn test_rounding_is_nearest_after_averaging() {
        // Mean 74.5 rounds half away from zero to 75
        let s = vec![Sample::new("12:00", 74.0), Sample::new("12:05", 75.0)];
        assert_eq!(avg_hr(&s), Some(75)); // 74.5 -> 75
        let s = vec![Sample::new("12:00", 74.0), Sample::new("12:05", 74.8)];
        assert_eq!(avg_hr(&s), Some(74)); // 74.4 -> 74
    }

    #[test]
    fn test_min_max_helpers() {
        assert_eq!(min_hr(&samples()), Some(48));
        assert_eq!(max_hr(&samples()), Some(110));
        assert_eq!(min_hr(&[]), None);
        assert_eq!(max_hr(&[]), None);
    }
}
