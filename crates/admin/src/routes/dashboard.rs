//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use vehicle_manager_core::{
    ChartKind, ChartPoint, FuelType,
    format::{format_currency_compact, format_number},
};

use super::{ErrorTemplate, LayoutView};
use crate::middleware::RequireSession;
use crate::query::HomeData;
use crate::state::AppState;

/// Number of manufacturers shown in the OEM chart.
const TOP_OEMS: usize = 5;

/// Headline statistic.
#[derive(Debug, Clone)]
pub struct StatView {
    pub label: &'static str,
    pub value: String,
}

/// One bar of a chart.
#[derive(Debug, Clone)]
pub struct BarView {
    pub label: String,
    pub value: String,
    /// Bar length relative to the largest value, 0-100.
    pub percent: u64,
}

/// `value` as a whole percentage of `max`, 0 when `max` is 0.
fn percent_of(value: u64, max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    u64::try_from(u128::from(value) * 100 / u128::from(max)).unwrap_or(100)
}

/// A bar chart card.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub title: &'static str,
    pub bars: Vec<BarView>,
}

impl ChartView {
    fn new(kind: ChartKind, points: &[ChartPoint], label: impl Fn(&str) -> String) -> Self {
        let max = points.iter().map(|p| p.value).max().unwrap_or(0);
        let bars = points
            .iter()
            .map(|point| BarView {
                label: label(&point.key),
                value: format_number(point.value),
                percent: percent_of(point.value, max),
            })
            .collect();

        Self {
            title: kind.title(),
            bars,
        }
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: LayoutView,
    pub stats: Vec<StatView>,
    pub charts: Vec<ChartView>,
}

/// Manufacturers with the most vehicles, largest first.
fn top_oems(points: &[ChartPoint]) -> Vec<ChartPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| b.value.cmp(&a.value));
    sorted.truncate(TOP_OEMS);
    sorted
}

fn fuel_label(key: &str) -> String {
    FuelType::from_chart_key(key).map_or_else(|| key.to_string(), |fuel| fuel.label().to_string())
}

fn build(home: &HomeData) -> (Vec<StatView>, Vec<ChartView>) {
    let stats = vec![
        StatView {
            label: "Vehicles in stock",
            value: format_number(home.summary.count),
        },
        StatView {
            label: "Unique OEMs",
            value: format_number(home.summary.oems),
        },
        StatView {
            label: "Stock value",
            value: format_currency_compact(home.summary.value),
        },
    ];

    let charts = vec![
        ChartView::new(ChartKind::Oem, &top_oems(&home.oems), ToString::to_string),
        ChartView::new(ChartKind::FuelType, &home.fuel_types, fuel_label),
        ChartView::new(
            ChartKind::RegistrationYear,
            &home.registration_years,
            ToString::to_string,
        ),
    ];

    (stats, charts)
}

/// Dashboard page handler.
///
/// GET /
#[instrument(skip(auth, state))]
pub async fn dashboard(auth: RequireSession, State(state): State<AppState>) -> Response {
    let layout = LayoutView::load(&state, &auth, "/").await;
    let api = auth.api(state.api());

    match state.queries().home(&api).await {
        Ok(home) => {
            let (stats, charts) = build(&home);
            DashboardTemplate {
                layout,
                stats,
                charts,
            }
            .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to load dashboard: {e}");
            ErrorTemplate::for_query(layout, &e, "/")
        }
    }
}
