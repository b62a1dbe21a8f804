//! Application router and request handlers.
//!
//! Handlers parse and validate query parameters, run aggregation queries
//! through the shared [SampleStore](crate::store::SampleStore), and shape the
//! results into response bodies. All failures are returned as
//! [AnalyticsError] so every endpoint produces the same error format.

use crate::aggregate::{self, GroupBy};
use crate::app_state::SharedAppState;
use crate::auth;
use crate::error::AnalyticsError;
use crate::filter::{CategoryPredicate, FilterParams, Required, SampleFilter};
use crate::metrics::{self, metrics_handler};
use crate::models::{
    AuthResponse, Credentials, SampleCount, SampleDetail, SamplePointAverages, ShipFilterAverages,
};
use crate::shape;
use crate::validated_json::ValidatedJson;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::collections::BTreeMap;
use tower::ServiceBuilder;
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

/// Sample type for hydraulic control unit samples.
const HCU_SAMPLE_TYPE: &str = "HCU";

/// Sample type for purifier samples.
const PURIFIER_SAMPLE_TYPE: &str = "Purifier";

/// The numbered HCU sample points included in average queries.
fn hcu_sample_points() -> Vec<String> {
    (1..=9).map(|i| format!("HCU#{i}")).collect()
}

/// The samplestat service type.
///
/// Trailing slashes are stripped before routing, so `/api/ships/` and
/// `/api/ships` are the same endpoint.
pub type Service = NormalizePath<Router>;

/// Build the service from shared application state.
pub fn service(state: SharedAppState) -> Service {
    NormalizePath::trim_trailing_slash(router(state))
}

/// Build the application router.
pub fn router(state: SharedAppState) -> Router {
    fn api() -> Router<SharedAppState> {
        Router::new()
            .route("/sample-type-count", get(sample_type_count))
            .route("/ship-hcu-count", get(ship_hcu_count))
            .route("/purifier-count", get(purifier_count))
            .route("/sample-count", get(sample_count))
            .route("/ships", get(ships))
            .route("/ship-hcu-details", get(ship_hcu_details))
            .route("/average-particle-count", get(average_particle_count))
            .route(
                "/filtered-average-particle-count",
                get(filtered_average_particle_count),
            )
    }

    Router::new()
        .route("/", get(root))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .nest("/api", api())
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
}

/// Status banner confirming that the server is running.
async fn root() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Register an account and return it with a session token.
async fn signup(
    State(state): State<SharedAppState>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), AnalyticsError> {
    let response = auth::signup(&state.store, credentials).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Authenticate an account and return it with a session token.
async fn login(
    State(state): State<SharedAppState>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<Json<AuthResponse>, AnalyticsError> {
    let response = auth::login(&state.store, credentials).await?;
    Ok(Json(response))
}

/// Count samples of each type, optionally filtered.
async fn sample_type_count(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<BTreeMap<String, i64>>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::none())?;
    let counts = state
        .store
        .read(move |conn| aggregate::grouped_count(conn, &filter, GroupBy::SampleType))
        .await?;
    Ok(Json(shape::count_map(counts)))
}

/// Count HCU samples per ship, optionally filtered.
async fn ship_hcu_count(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<BTreeMap<String, i64>>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::none())?
        .with_sample_type(CategoryPredicate::Equals(HCU_SAMPLE_TYPE.to_string()));
    let counts = state
        .store
        .read(move |conn| aggregate::grouped_count(conn, &filter, GroupBy::Ship))
        .await?;
    Ok(Json(shape::count_map(counts)))
}

/// Count purifier samples per ship, optionally filtered.
async fn purifier_count(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<BTreeMap<String, i64>>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::none())?
        .with_sample_type(CategoryPredicate::Equals(PURIFIER_SAMPLE_TYPE.to_string()));
    let counts = state
        .store
        .read(move |conn| aggregate::grouped_count(conn, &filter, GroupBy::Ship))
        .await?;
    Ok(Json(shape::count_map(counts)))
}

/// Count all samples matching the filter.
async fn sample_count(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<SampleCount>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::none())?;
    let count = state
        .store
        .read(move |conn| aggregate::total_count(conn, &filter))
        .await?;
    Ok(Json(SampleCount { count }))
}

/// List the distinct ship names.
async fn ships(State(state): State<SharedAppState>) -> Result<Json<Vec<String>>, AnalyticsError> {
    let names = state.store.read(aggregate::distinct_ships).await?;
    Ok(Json(names))
}

/// List HCU sample records for one ship over a year range.
async fn ship_hcu_details(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<SampleDetail>>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::ship_and_year_range())?
        .with_sample_point(CategoryPredicate::Prefix(HCU_SAMPLE_TYPE.to_string()));
    let records = state
        .store
        .read(move |conn| aggregate::detail_rows(conn, &filter))
        .await?;
    if records.is_empty() {
        return Err(AnalyticsError::NoData {
            scope: "ship and year range",
        });
    }
    Ok(Json(shape::sample_details(records)?))
}

/// Average particle counts per HCU sample point over a date range,
/// optionally restricted to one ship.
async fn average_particle_count(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<SamplePointAverages>>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::date_range())?
        .with_sample_point(CategoryPredicate::OneOf(hcu_sample_points()));
    let averages = state
        .store
        .read(move |conn| aggregate::grouped_averages(conn, &filter, GroupBy::SamplePoint))
        .await?;
    if averages.is_empty() {
        return Err(AnalyticsError::NoData {
            scope: "date range",
        });
    }
    Ok(Json(shape::sample_point_averages(averages)))
}

/// Compare per-ship average particle counts before and after the filter.
///
/// Both sides run in a single store read so they see a consistent view of
/// the data. An empty result is a valid comparison, not an error.
async fn filtered_average_particle_count(
    State(state): State<SharedAppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<ShipFilterAverages>>, AnalyticsError> {
    let filter = SampleFilter::build(&params, Required::date_range())?;
    let before_filter = filter
        .clone()
        .with_sample_point(CategoryPredicate::Equals(shape::BEFORE_FILTER.to_string()));
    let after_filter =
        filter.with_sample_point(CategoryPredicate::Equals(shape::AFTER_FILTER.to_string()));
    let (before, after) = state
        .store
        .read(move |conn| {
            let before = aggregate::grouped_averages(conn, &before_filter, GroupBy::Ship)?;
            let after = aggregate::grouped_averages(conn, &after_filter, GroupBy::Ship)?;
            Ok((before, after))
        })
        .await?;
    Ok(Json(shape::ship_filter_averages(before, after)))
}
