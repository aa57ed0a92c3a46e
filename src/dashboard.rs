use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::chart::render_price_chart;
use crate::client::PriceFeed;
use crate::plan::{plan, EndDay, Plan, PlanRequest};
use crate::price::{PricePoint, PriceSeries};
use crate::EspotError;

const CHART_WIDTH: u32 = 960;
const CHART_HEIGHT: u32 = 280;

/// Source of the local wall-clock time in the configured timezone.
pub type Clock = fn(Tz) -> NaiveDateTime;

fn local_now(timezone: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&timezone).naive_local()
}

#[derive(Debug)]
pub struct AppState {
    feed: PriceFeed,
    timezone: Tz,
    clock: Clock,
}

impl AppState {
    pub fn new(feed: PriceFeed, timezone: Tz) -> Self {
        Self {
            feed,
            timezone,
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)(self.timezone)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/plan", get(plan_handler))
        .route("/health", get(health))
        .with_state(state)
}

/// Query parameters shared by the page and the JSON API.
///
/// Kept as raw strings so that unparsable input is reported like any other
/// invalid argument. Blank fields fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PlanQuery {
    hours: Option<String>,
    max_end_hour: Option<String>,
    end_day: Option<String>,
}

fn non_blank(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_hour_field(name: &str, raw: &Option<String>, default: u8) -> Result<u8, EspotError> {
    match non_blank(raw) {
        Some(value) => value.parse().map_err(|_| {
            EspotError::InvalidArgument(format!(
                "{name} must be a whole number between 1 and 24, got {value:?}"
            ))
        }),
        None => Ok(default),
    }
}

impl PlanQuery {
    fn into_request(self) -> Result<PlanRequest, EspotError> {
        let defaults = PlanRequest::default();

        let end_day = match non_blank(&self.end_day) {
            None => defaults.end_day,
            Some(value) if value.eq_ignore_ascii_case("today") => EndDay::Today,
            Some(value) if value.eq_ignore_ascii_case("tomorrow") => EndDay::Tomorrow,
            Some(value) => {
                return Err(EspotError::InvalidArgument(format!(
                    "end_day must be today or tomorrow, got {value:?}"
                )))
            }
        };

        Ok(PlanRequest {
            hours: parse_hour_field("hours", &self.hours, defaults.hours)?,
            max_end_hour: parse_hour_field(
                "max_end_hour",
                &self.max_end_hour,
                defaults.max_end_hour,
            )?,
            end_day,
        })
    }
}

fn status_for(err: &EspotError) -> StatusCode {
    match err {
        e if e.is_fetch_failure() => StatusCode::BAD_GATEWAY,
        EspotError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EspotError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error body for the JSON API.
#[derive(Debug)]
pub struct ApiError(EspotError);

impl From<EspotError> for ApiError {
    fn from(e: EspotError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.0.to_string() });
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Fetches the upcoming prices and plans the request against them.
async fn evaluate(
    state: &AppState,
    request: &PlanRequest,
) -> Result<(PriceSeries, Result<Plan, EspotError>), EspotError> {
    request.validate()?;
    let now = state.now();
    let series = state.feed.fetch_upcoming(now).await?;
    let outcome = plan(&series, request, now.date());
    Ok((series, outcome))
}

#[derive(Debug, Serialize)]
struct PlanResponse {
    zone: String,
    summary: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
    plan: Plan,
    prices: PriceSeries,
}

async fn plan_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<PlanResponse>, ApiError> {
    let request = query.into_request()?;
    let (series, outcome) = evaluate(&state, &request).await.inspect_err(|e| {
        warn!(error = %e, "price fetch failed");
    })?;
    let plan = outcome?;

    Ok(Json(PlanResponse {
        zone: state.feed.zone().to_string(),
        summary: plan.summary(),
        start: plan.starts_at(),
        end: plan.window.ends_at(),
        plan,
        prices: series,
    }))
}

#[derive(Debug)]
pub struct PriceRow {
    pub time: String,
    pub price: String,
    pub in_window: bool,
}

#[derive(Debug)]
pub struct PlanDisplay {
    pub start: String,
    pub average_price: String,
    pub better_than_average: String,
    pub summary: String,
}

impl From<&Plan> for PlanDisplay {
    fn from(plan: &Plan) -> Self {
        Self {
            start: plan.start_label(),
            average_price: plan.average_label(),
            better_than_average: plan.better_than_average_label(),
            summary: plan.summary(),
        }
    }
}

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub zone: String,
    pub hours: u8,
    pub max_end_hour: u8,
    pub end_today: bool,
    pub plan: Option<PlanDisplay>,
    pub error: Option<String>,
    pub chart_svg: Option<String>,
    pub rows: Vec<PriceRow>,
    pub generated_at: String,
}

fn price_rows(points: &[PricePoint], plan: Option<&Plan>) -> Vec<PriceRow> {
    points
        .iter()
        .map(|p| PriceRow {
            time: p.starts_at().format("%a %H:%M").to_string(),
            price: format!("{:.2}", p.price_sek),
            in_window: plan.is_some_and(|plan| plan.window.contains(p)),
        })
        .collect()
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlanQuery>,
) -> Response {
    let parsed = query.into_request();
    // the form is redrawn with defaults when the input could not be parsed
    let request = parsed.as_ref().copied().unwrap_or_default();

    let evaluated = match parsed {
        Ok(request) => evaluate(&state, &request).await,
        Err(e) => Err(e),
    };
    let (series, outcome) = match evaluated {
        Ok((series, outcome)) => (Some(series), outcome),
        Err(e) => (None, Err(e)),
    };

    let (plan, error, status) = match outcome {
        Ok(plan) => (Some(plan), None, StatusCode::OK),
        Err(e) => {
            warn!(error = %e, "no plan for dashboard");
            let status = status_for(&e);
            (None, Some(e.to_string()), status)
        }
    };

    let chart_svg = series.as_ref().filter(|s| !s.is_empty()).and_then(|s| {
        render_price_chart(
            s.points(),
            plan.as_ref().map(|p| &p.window),
            CHART_WIDTH,
            CHART_HEIGHT,
        )
        .inspect_err(|e| warn!(error = %e, "chart rendering failed"))
        .ok()
    });

    let template = DashboardTemplate {
        zone: state.feed.zone().to_string(),
        hours: request.hours,
        max_end_hour: request.max_end_hour,
        end_today: request.end_day == EndDay::Today,
        rows: series
            .as_ref()
            .map(|s| price_rows(s.points(), plan.as_ref()))
            .unwrap_or_default(),
        plan: plan.as_ref().map(PlanDisplay::from),
        error,
        chart_svg,
        generated_at: state.now().format("%Y-%m-%d %H:%M").to_string(),
    };

    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Template render error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("<h1>Error rendering dashboard: {e}</h1>")),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
