use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::price::{PricePoint, PriceSeries};
use crate::EspotError;

/// Default endpoint of the public spot price feed.
pub const DEFAULT_API_ENDPOINT: &str = "https://mgrey.se/espot";

/// Price zone for Swedish spot prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    Se1,
    Se2,
    #[default]
    Se3,
    Se4,
}

impl Zone {
    /// Returns the key the feed uses for this zone.
    pub const fn code(&self) -> &'static str {
        match self {
            Zone::Se1 => "SE1",
            Zone::Se2 => "SE2",
            Zone::Se3 => "SE3",
            Zone::Se4 => "SE4",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Zone {
    type Err = EspotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SE1" => Ok(Zone::Se1),
            "SE2" => Ok(Zone::Se2),
            "SE3" => Ok(Zone::Se3),
            "SE4" => Ok(Zone::Se4),
            other => Err(EspotError::InvalidArgument(format!(
                "unknown price zone {other}"
            ))),
        }
    }
}

#[derive(Deserialize)]
struct EspotDataItem {
    hour: u8,
    price_sek: f64,
}

impl EspotDataItem {
    fn into_price_point(self, date: NaiveDate) -> Result<PricePoint, EspotError> {
        if self.hour > 23 {
            return Err(EspotError::MalformedResponse(format!(
                "hour {} on {date} is out of range",
                self.hour
            )));
        }
        Ok(PricePoint::new(date, self.hour, self.price_sek))
    }
}

/// Parses one day of feed output for `zone`.
///
/// The feed answers with an object keyed by zone code; other keys are ignored.
pub fn parse_day(body: &str, zone: Zone, date: NaiveDate) -> Result<Vec<PricePoint>, EspotError> {
    let mut document: Map<String, Value> = serde_json::from_str(body)
        .map_err(|e| EspotError::MalformedResponse(format!("invalid json for {date}: {e}")))?;

    let entries = document.remove(zone.code()).ok_or_else(|| {
        EspotError::MalformedResponse(format!("zone {zone} missing in response for {date}"))
    })?;

    let items: Vec<EspotDataItem> = serde_json::from_value(entries).map_err(|e| {
        EspotError::MalformedResponse(format!("unexpected price entries for {date}: {e}"))
    })?;

    items
        .into_iter()
        .map(|item| item.into_price_point(date))
        .collect()
}

/// Configuration for the price feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub endpoint: String,
    pub zone: Zone,
    /// Every request is abandoned after this long
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_owned(),
            zone: Zone::default(),
            timeout: Duration::from_secs(10),
            user_agent: format!("espot-planner/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client for the day-ahead price feed.
#[derive(Debug, Clone)]
pub struct PriceFeed {
    client: Client,
    config: FeedConfig,
}

impl PriceFeed {
    pub fn new(config: FeedConfig) -> Result<Self, EspotError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn zone(&self) -> Zone {
        self.config.zone
    }

    /// Fetches the hourly prices of a single delivery day.
    ///
    /// Anything but `200 OK` is a failure, so is a body without the
    /// configured zone. Timeouts surface as [`EspotError::Fetch`].
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<PricePoint>, EspotError> {
        debug!(%date, zone = %self.config.zone, "fetching spot prices");

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("format", "json".to_owned()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await
            .map_err(|source| EspotError::Fetch { date, source })?;

        if response.status() != StatusCode::OK {
            return Err(EspotError::Status {
                date,
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| EspotError::Fetch { date, source })?;

        let points = parse_day(&body, self.config.zone, date)?;
        debug!(%date, count = points.len(), "received spot prices");
        Ok(points)
    }

    /// Fetches today's and tomorrow's prices, one after the other, and keeps
    /// only the hours after `now`.
    ///
    /// A failure for either day aborts the whole fetch.
    pub async fn fetch_upcoming(&self, now: NaiveDateTime) -> Result<PriceSeries, EspotError> {
        let today = now.date();
        let tomorrow = today.succ_opt().ok_or_else(|| {
            EspotError::InvalidArgument(format!("no calendar day after {today}"))
        })?;

        let mut points = self.fetch_day(today).await?;
        points.extend(self.fetch_day(tomorrow).await?);

        let hour = u8::try_from(now.hour()).map_err(|e| {
            EspotError::InvalidArgument(format!("converting hour failed: {e:?}"))
        })?;
        Ok(PriceSeries::new(points)?.upcoming(today, hour))
    }
}

/// Query one day of prices for `zone` from the public feed with a default client.
pub async fn query_prices(zone: Zone, date: NaiveDate) -> Result<Vec<PricePoint>, EspotError> {
    let feed = PriceFeed::new(FeedConfig {
        zone,
        ..FeedConfig::default()
    })?;
    feed.fetch_day(date).await
}
