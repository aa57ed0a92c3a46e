use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::EspotError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    /// Delivery date of this price
    pub date: NaiveDate,
    /// Delivery hour, 0-23
    pub hour: u8,
    /// Spot price in SEK as published by the feed
    pub price_sek: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, hour: u8, price_sek: f64) -> Self {
        Self {
            date,
            hour,
            price_sek,
        }
    }

    /// The (date, hour) pair this price is ordered by.
    pub fn slot(&self) -> (NaiveDate, u8) {
        (self.date, self.hour)
    }

    /// Start of the delivery hour as a local timestamp.
    pub fn starts_at(&self) -> NaiveDateTime {
        slot_start(self.date, self.hour)
    }
}

pub(crate) fn slot_start(date: NaiveDate, hour: u8) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + chrono::Duration::hours(i64::from(hour))
}

/// Hourly prices sorted ascending by (date, hour) without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, rejecting points that are out of order, duplicated or
    /// carry an hour outside 0-23.
    ///
    /// Points are keyed by local (date, hour), so a day that repeats an hour
    /// (the night daylight saving time ends) is rejected as a whole.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, EspotError> {
        if let Some(point) = points.iter().find(|p| p.hour > 23) {
            return Err(EspotError::MalformedResponse(format!(
                "hour {} on {} is out of range",
                point.hour, point.date
            )));
        }

        if let Some(pair) = points.windows(2).find(|pair| pair[0].slot() >= pair[1].slot()) {
            return Err(EspotError::MalformedResponse(format!(
                "prices are not strictly ordered: {} {:02}:00 followed by {} {:02}:00",
                pair[0].date, pair[0].hour, pair[1].date, pair[1].hour
            )));
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    /// Drops every point at or before the given (date, hour), keeping only
    /// prices for hours that have not started yet.
    pub fn upcoming(mut self, date: NaiveDate, hour: u8) -> Self {
        self.points.retain(|p| p.slot() > (date, hour));
        self
    }

    /// The prefix of points whose (date, hour) is at or before the cutoff.
    pub fn until(&self, cutoff_date: NaiveDate, cutoff_hour: u8) -> &[PricePoint] {
        let end = self
            .points
            .partition_point(|p| p.slot() <= (cutoff_date, cutoff_hour));
        &self.points[..end]
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Mean price of the given points, `None` when there are none.
pub fn average_price(points: &[PricePoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let sum: f64 = points.iter().map(|p| p.price_sek).sum();
    Some(sum / points.len() as f64)
}
