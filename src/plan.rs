//! Turns a window selection into the values shown to the user.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::price::PriceSeries;
use crate::window::{select_best_window, Window};
use crate::EspotError;

/// Last day a run may end on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EndDay {
    Today,
    #[default]
    Tomorrow,
}

/// What the user asked for: run length and the latest hour it may end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub hours: u8,
    pub max_end_hour: u8,
    #[serde(default)]
    pub end_day: EndDay,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            hours: 1,
            max_end_hour: 24,
            end_day: EndDay::Tomorrow,
        }
    }
}

impl PlanRequest {
    pub const MAX_HOURS: u8 = 24;

    pub fn validate(&self) -> Result<(), EspotError> {
        if !(1..=Self::MAX_HOURS).contains(&self.hours) {
            return Err(EspotError::InvalidArgument(format!(
                "consecutive hours must be between 1 and {}, got {}",
                Self::MAX_HOURS,
                self.hours
            )));
        }
        if !(1..=24).contains(&self.max_end_hour) {
            return Err(EspotError::InvalidArgument(format!(
                "max end hour must be between 1 and 24, got {}",
                self.max_end_hour
            )));
        }
        Ok(())
    }

    /// The (date, hour) cutoff relative to `today`.
    pub fn cutoff(&self, today: NaiveDate) -> Result<(NaiveDate, u8), EspotError> {
        let date = match self.end_day {
            EndDay::Today => today,
            EndDay::Tomorrow => today.succ_opt().ok_or_else(|| {
                EspotError::InvalidArgument(format!("no calendar day after {today}"))
            })?,
        };
        Ok((date, self.max_end_hour))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub window: Window,
    pub overall_average: f64,
    /// Fraction by which the window undercuts the overall average
    pub better_than_average: Option<f64>,
}

impl Plan {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.window.starts_at()
    }

    /// Start time as shown on the dashboard, e.g. `13:00`.
    pub fn start_label(&self) -> String {
        format!("{:02}:00", self.window.start_hour)
    }

    pub fn average_label(&self) -> String {
        format!("{:.2}", self.window.average_price)
    }

    pub fn better_than_average_label(&self) -> String {
        match self.better_than_average {
            Some(fraction) => format!("{:.1} %", fraction * 100.0),
            None => "n/a".to_owned(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Start at hour {} for optimal prices in the next {} hours",
            self.window.start_hour, self.window.hours
        )
    }
}

/// Selects the cheapest window for `request` among the upcoming prices.
pub fn plan(
    series: &PriceSeries,
    request: &PlanRequest,
    today: NaiveDate,
) -> Result<Plan, EspotError> {
    request.validate()?;
    let (cutoff_date, cutoff_hour) = request.cutoff(today)?;

    let selection = select_best_window(
        series,
        usize::from(request.hours),
        cutoff_date,
        cutoff_hour,
    )?;
    let better_than_average = selection.better_than_average();

    info!(
        start = %selection.best.starts_at(),
        hours = request.hours,
        average = selection.best.average_price,
        "selected cheapest window"
    );

    Ok(Plan {
        window: selection.best,
        overall_average: selection.overall_average,
        better_than_average,
    })
}
