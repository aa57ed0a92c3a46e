//! Selection of the cheapest contiguous block of hours.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::price::{average_price, slot_start, PricePoint, PriceSeries};
use crate::EspotError;

/// A contiguous run of hourly prices considered as one appliance run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub start_date: NaiveDate,
    pub start_hour: u8,
    /// Date of the last hour inside the window
    pub end_date: NaiveDate,
    /// Last hour inside the window (the run finishes one hour later)
    pub end_hour: u8,
    pub hours: usize,
    pub average_price: f64,
}

impl Window {
    fn from_points(points: &[PricePoint], average_price: f64) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;
        Some(Self {
            start_date: first.date,
            start_hour: first.hour,
            end_date: last.date,
            end_hour: last.hour,
            hours: points.len(),
            average_price,
        })
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        slot_start(self.start_date, self.start_hour)
    }

    /// Moment the run is finished, i.e. the end of its last hour.
    pub fn ends_at(&self) -> NaiveDateTime {
        slot_start(self.end_date, self.end_hour) + chrono::Duration::hours(1)
    }

    /// Whether the given point lies inside this window.
    pub fn contains(&self, point: &PricePoint) -> bool {
        point.slot() >= (self.start_date, self.start_hour)
            && point.slot() <= (self.end_date, self.end_hour)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSelection {
    pub best: Window,
    /// Mean price over every point at or before the cutoff
    pub overall_average: f64,
}

impl WindowSelection {
    /// How much cheaper the best window is than the overall average, as a
    /// fraction of that average. `None` when the average is zero.
    pub fn better_than_average(&self) -> Option<f64> {
        if self.overall_average == 0.0 {
            return None;
        }
        Some((self.overall_average - self.best.average_price) / self.overall_average)
    }
}

/// Finds the `window_length`-hour window with the lowest average price whose
/// last hour lies at or before (`cutoff_date`, `cutoff_hour`).
///
/// When several windows share the minimal average, the earliest one wins.
/// The series itself is left untouched.
pub fn select_best_window(
    series: &PriceSeries,
    window_length: usize,
    cutoff_date: NaiveDate,
    cutoff_hour: u8,
) -> Result<WindowSelection, EspotError> {
    if window_length == 0 {
        return Err(EspotError::InvalidArgument(
            "window length must be at least one hour".to_owned(),
        ));
    }

    let eligible = series.until(cutoff_date, cutoff_hour);
    let available = eligible.len();
    let insufficient = || EspotError::InsufficientData {
        needed: window_length,
        available,
    };
    if window_length > available {
        return Err(insufficient());
    }

    let mut best: Option<(&[PricePoint], f64)> = None;
    for candidate in eligible.windows(window_length) {
        let sum: f64 = candidate.iter().map(|p| p.price_sek).sum();
        // strict comparison keeps the earliest of equally cheap windows
        if best.map_or(true, |(_, best_sum)| sum < best_sum) {
            best = Some((candidate, sum));
        }
    }

    let (points, sum) = best.ok_or_else(insufficient)?;
    let best =
        Window::from_points(points, sum / window_length as f64).ok_or_else(insufficient)?;
    let overall_average = average_price(eligible).unwrap_or(best.average_price);

    Ok(WindowSelection {
        best,
        overall_average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn series_of(date: NaiveDate, prices: &[f64]) -> PriceSeries {
        let points = prices
            .iter()
            .enumerate()
            .map(|(h, &p)| PricePoint::new(date, h as u8, p))
            .collect();
        PriceSeries::new(points).unwrap()
    }

    #[test]
    fn test_select_cheapest_pair() {
        let series = series_of(day(10), &[10.0, 1.0, 1.0, 10.0]);

        let selection = select_best_window(&series, 2, day(10), 3).unwrap();

        assert_eq!(selection.best.start_hour, 1);
        assert_eq!(selection.best.end_hour, 2);
        assert_relative_eq!(selection.best.average_price, 1.0);
        assert_relative_eq!(selection.overall_average, 5.5);
        assert_relative_eq!(
            selection.better_than_average().unwrap(),
            0.818,
            epsilon = 0.001
        );
    }

    #[test]
    fn test_selection_is_minimal() {
        let prices = [
            0.42, 0.39, 0.37, 0.35, 0.36, 0.41, 0.55, 0.71, 0.83, 0.77, 0.62, 0.51, 0.48, 0.44,
            0.46, 0.52, 0.66, 0.92, 1.05, 0.97, 0.81, 0.64, 0.52, 0.47,
        ];
        let series = series_of(day(10), &prices);

        for length in 1..=prices.len() {
            let selection = select_best_window(&series, length, day(10), 23).unwrap();
            for candidate in prices.windows(length) {
                let average = candidate.iter().sum::<f64>() / length as f64;
                assert!(selection.best.average_price <= average + 1e-12);
            }
        }
    }

    #[test]
    fn test_ties_pick_earliest_start() {
        let series = series_of(day(10), &[3.0, 1.0, 2.0, 5.0, 1.0, 2.0, 3.0]);

        let first = select_best_window(&series, 2, day(10), 23).unwrap();
        let second = select_best_window(&series, 2, day(10), 23).unwrap();

        assert_eq!(first.best.start_hour, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_window_may_span_midnight() {
        let points = vec![
            PricePoint::new(day(10), 22, 5.0),
            PricePoint::new(day(10), 23, 1.0),
            PricePoint::new(day(11), 0, 1.0),
            PricePoint::new(day(11), 1, 5.0),
        ];
        let series = PriceSeries::new(points).unwrap();

        let selection = select_best_window(&series, 2, day(11), 24).unwrap();

        assert_eq!(selection.best.starts_at(), day(10).and_hms_opt(23, 0, 0).unwrap());
        assert_eq!(selection.best.ends_at(), day(11).and_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_excludes_later_windows() {
        let series = series_of(day(10), &[4.0, 3.0, 2.0, 1.0, 0.5]);

        let selection = select_best_window(&series, 2, day(10), 2).unwrap();

        assert_eq!(selection.best.start_hour, 1);
        assert_eq!(selection.best.end_hour, 2);
        assert_relative_eq!(selection.overall_average, 3.0);
    }

    #[test]
    fn test_window_covering_whole_series() {
        let series = series_of(day(10), &[2.0, 4.0, 6.0]);

        let selection = select_best_window(&series, 3, day(10), 23).unwrap();

        assert_eq!(selection.best.start_hour, 0);
        assert_eq!(selection.best.hours, 3);
        assert_relative_eq!(selection.best.average_price, 4.0);
        assert_eq!(selection.better_than_average(), Some(0.0));
    }

    #[test]
    fn test_window_longer_than_series() {
        let series = series_of(day(10), &[2.0, 4.0, 6.0]);

        let err = select_best_window(&series, 4, day(10), 23).unwrap_err();

        assert!(matches!(
            err,
            EspotError::InsufficientData {
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_empty_series() {
        let err = select_best_window(&PriceSeries::default(), 1, day(10), 23).unwrap_err();

        assert!(matches!(
            err,
            EspotError::InsufficientData {
                needed: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn test_zero_length_window() {
        let series = series_of(day(10), &[2.0]);

        assert!(matches!(
            select_best_window(&series, 0, day(10), 23),
            Err(EspotError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_average_has_no_percentage() {
        let series = series_of(day(10), &[-1.0, 1.0]);

        let selection = select_best_window(&series, 1, day(10), 23).unwrap();

        assert_eq!(selection.best.start_hour, 0);
        assert_eq!(selection.better_than_average(), None);
    }

    #[test]
    fn test_contains() {
        let series = series_of(day(10), &[5.0, 1.0, 1.0, 5.0]);
        let selection = select_best_window(&series, 2, day(10), 23).unwrap();

        let inside: Vec<u8> = series
            .iter()
            .filter(|p| selection.best.contains(p))
            .map(|p| p.hour)
            .collect();
        assert_eq!(inside, vec![1, 2]);
    }
}
