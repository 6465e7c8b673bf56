//! HTTP routes and handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crimewatch::config::DetectionConfig;
use crimewatch::models::{
    Coordinate, EncodedPath, NewIncident, ProximityMatch, Severity, UNKNOWN_INTERSECTION,
};
use crimewatch::proximity::{IncidentIndex, NearbySearch};
use crimewatch::route::{nearby_along_samples, sample_route};
use crimewatch::services::{
    fetch_snapshot, AlertDispatcher, ContactBook, DirectionsProvider, DispatchReport, Geocoder,
    RecordStore,
};
use crimewatch::AlertError;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub directions: Option<Arc<dyn DirectionsProvider>>,
    pub geocoder: Arc<dyn Geocoder>,
    pub dispatcher: Arc<dyn AlertDispatcher>,
    pub contacts: ContactBook,
    pub detection: DetectionConfig,
    pub fetch_timeout: Duration,
}

impl AppState {
    /// Resolve a position to an address, degrading to "Unknown" on any failure
    async fn address_of(&self, coord: Coordinate) -> String {
        match self.geocoder.reverse_geocode(coord).await {
            Ok(Some(address)) => address,
            Ok(None) => UNKNOWN_INTERSECTION.to_string(),
            Err(e) => {
                warn!("Reverse geocoding {} failed: {}", coord, e);
                UNKNOWN_INTERSECTION.to_string()
            }
        }
    }
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/check_crime", post(check_crime_handler))
        .route("/check_route", post(check_route_handler))
        .route("/get_directions", post(directions_handler))
        .route("/form", post(report_handler))
        .route("/add_contact", post(add_contact_handler))
        .route("/share_location", post(share_location_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON request body whose rejections are reported as [`ApiError`]
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct Payload<T>(T);

/// Error response wrapper mapping the alert taxonomy onto status codes
enum ApiError {
    Alert(AlertError),
    /// Body missing, not JSON, or not the expected shape
    Payload(JsonRejection),
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        Self::Alert(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Payload(rejection)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Alert(e) if e.is_client_error() => {
                warn!("Rejected request: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Alert(e) => {
                error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Payload(rejection) => {
                warn!("Rejected request body: {}", rejection.body_text());
                (
                    StatusCode::BAD_REQUEST,
                    format!("invalid request body: {}", rejection.body_text()),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    incidents: Option<usize>,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let incidents = fetch_snapshot(state.store.as_ref(), state.fetch_timeout)
        .await
        .map(|records| records.len())
        .ok();

    Json(HealthResponse {
        status: if incidents.is_some() { "ok" } else { "degraded" },
        incidents,
    })
}

#[derive(Deserialize)]
struct PositionRequest {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Serialize)]
struct CheckResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nearby_crimes: Vec<ProximityMatch>,
}

/// Live position check against alert-worthy incidents
async fn check_crime_handler(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<PositionRequest>,
) -> ApiResult<CheckResponse> {
    let position = Coordinate::from_parts(req.latitude, req.longitude)?;
    let records = fetch_snapshot(state.store.as_ref(), state.fetch_timeout).await?;

    let nearby_crimes = records.find_nearby(&position, &state.detection.point_query())?;

    Ok(Json(CheckResponse {
        status: if nearby_crimes.is_empty() {
            "safe"
        } else {
            "danger"
        },
        nearby_crimes,
    }))
}

#[derive(Deserialize)]
struct RouteRequest {
    polyline: Option<String>,
}

#[derive(Serialize)]
struct RouteResponse {
    points: Vec<Coordinate>,
    nearby_crimes: Vec<ProximityMatch>,
}

/// Incidents along an already encoded route
async fn check_route_handler(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<RouteRequest>,
) -> ApiResult<RouteResponse> {
    let path = req
        .polyline
        .map(EncodedPath::from)
        .ok_or_else(|| AlertError::MalformedPath("polyline is missing".to_string()))?;
    let points = sample_route(&path)?;
    let nearby_crimes = route_matches(&state, &points).await?;

    Ok(Json(RouteResponse {
        points,
        nearby_crimes,
    }))
}

#[derive(Deserialize)]
struct DirectionsRequest {
    origin_lat: Option<f64>,
    origin_lng: Option<f64>,
    destination: Option<String>,
}

#[derive(Serialize)]
struct DirectionsResponse {
    overview_polyline: EncodedPath,
    destination_lat: f64,
    destination_lng: f64,
    nearby_crimes: Vec<ProximityMatch>,
}

/// Plan a route to a destination and flag incidents along it
async fn directions_handler(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<DirectionsRequest>,
) -> ApiResult<DirectionsResponse> {
    let origin = Coordinate::from_parts(req.origin_lat, req.origin_lng)?;
    let destination = req
        .destination
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AlertError::InvalidDestination("destination is missing".to_string()))?;

    let provider = state.directions.as_ref().ok_or_else(|| {
        AlertError::DirectionsUnavailable("no directions provider configured".to_string())
    })?;

    let route = provider.compute_route(origin, destination).await?;
    let samples = sample_route(&route.encoded_path)?;
    let nearby_crimes = route_matches(&state, &samples).await?;

    info!(
        "Route from {} to {:?}: {} incidents nearby",
        origin,
        destination,
        nearby_crimes.len()
    );

    Ok(Json(DirectionsResponse {
        overview_polyline: route.encoded_path,
        destination_lat: route.endpoint.latitude,
        destination_lng: route.endpoint.longitude,
        nearby_crimes,
    }))
}

/// Fetch one snapshot, index it, and search around every route sample
async fn route_matches(
    state: &AppState,
    samples: &[Coordinate],
) -> Result<Vec<ProximityMatch>, AlertError> {
    let records = fetch_snapshot(state.store.as_ref(), state.fetch_timeout).await?;
    let index = IncidentIndex::build(records);
    nearby_along_samples(samples, &state.detection.route_query(), &index)
}

#[derive(Deserialize)]
struct ReportRequest {
    latitude: Option<f64>,
    longitude: Option<f64>,
    crime: Option<String>,
}

#[derive(Serialize)]
struct ReportResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "NearestIntersectionLocation")]
    nearest_intersection: String,
}

/// Incident report submitted by a user at their current position
async fn report_handler(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<ReportRequest>,
) -> ApiResult<ReportResponse> {
    let position = Coordinate::from_parts(req.latitude, req.longitude)?;
    let nearest_intersection = state.address_of(position).await;

    let incident = NewIncident {
        position,
        severity: Severity::Low,
        rate: 0.0,
        nearest_intersection: nearest_intersection.clone(),
        description: req
            .crime
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };
    let id = state.store.insert_incident(incident).await?;

    Ok(Json(ReportResponse {
        id,
        nearest_intersection,
    }))
}

#[derive(Deserialize)]
struct ContactRequest {
    phone: Option<String>,
}

#[derive(Serialize)]
struct ContactResponse {
    contacts: usize,
}

async fn add_contact_handler(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<ContactRequest>,
) -> ApiResult<ContactResponse> {
    let contacts = state
        .contacts
        .add(req.phone.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(ContactResponse { contacts }))
}

/// Send the user's position to every emergency contact
async fn share_location_handler(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<PositionRequest>,
) -> ApiResult<DispatchReport> {
    let position = Coordinate::from_parts(req.latitude, req.longitude)?;
    let address = state.address_of(position).await;
    let contacts = state.contacts.all().await;

    let message = format!(
        "Emergency alert: your contact shared their location {} near {}",
        position, address
    );
    let report = state.dispatcher.notify(&contacts, &message).await;

    Ok(Json(report))
}
