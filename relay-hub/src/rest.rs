use crate::errors::Error;
use crate::metrics;
use crate::model::{
    Action, Appliance, Confirmation, HistoryDataPoint, Metrics, NewSchedule, Notification,
    Schedule, Timer, WeeklyDataPoint,
};
use crate::store::{lock, ApplianceStateStore, SharedStore};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Clone)]
struct AppState {
    store: SharedStore,
}

#[derive(Debug, Serialize)]
pub struct ApplianceView {
    #[serde(flatten)]
    pub appliance: Appliance,
    pub relay_level: bool,
    pub daily_cost: f64,
    pub usage_hours: u64,
    pub usage_minutes: u64,
    pub timer_remaining: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub appliances: Vec<ApplianceView>,
    pub metrics: Metrics,
    pub notifications: Vec<Notification>,
    pub history_24h: Vec<HistoryDataPoint>,
    pub history_7d: Vec<WeeklyDataPoint>,
    pub is_loading: bool,
    pub is_online: bool,
    pub device_address: String,
    pub electricity_rate: f64,
}

impl StateResponse {
    fn from_store(store: &ApplianceStateStore) -> Self {
        let now = Utc::now();
        let rate = store.electricity_rate();
        let appliances = store
            .appliances()
            .iter()
            .map(|appliance| {
                let (usage_hours, usage_minutes) = appliance.usage_hours_minutes();
                ApplianceView {
                    relay_level: appliance.relay_level(),
                    daily_cost: appliance.daily_cost(rate),
                    usage_hours,
                    usage_minutes,
                    timer_remaining: appliance.timer.as_ref().map(|t| t.remaining_secs(now)),
                    appliance: appliance.clone(),
                }
            })
            .collect();

        Self {
            appliances,
            metrics: store.metrics().clone(),
            notifications: store.notifications().to_vec(),
            history_24h: store.history_24h().to_vec(),
            history_7d: store.history_7d().to_vec(),
            is_loading: store.is_loading(),
            is_online: store.is_online(),
            device_address: store.device_address().to_string(),
            electricity_rate: rate,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimerRequest {
    pub duration: u32,
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleToggled {
    pub enabled: bool,
}

pub fn create_router(store: SharedStore) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/state", get(get_state))
        .route("/api/v1/appliances/:id/toggle", post(toggle_appliance))
        .route("/api/v1/appliances/:id/schedules", post(add_schedule))
        .route(
            "/api/v1/appliances/:id/schedules/:schedule_id",
            delete(delete_schedule),
        )
        .route(
            "/api/v1/appliances/:id/schedules/:schedule_id/toggle",
            post(toggle_schedule),
        )
        .route(
            "/api/v1/appliances/:id/timer",
            put(set_timer).delete(cancel_timer),
        )
        .route("/api/v1/notifications/:id", delete(dismiss_notification))
        .route("/api/v1/statistics/reset", post(reset_statistics))
        .route("/api/v1/settings/address", put(update_device_address))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse::from_store(&lock(&state.store)))
}

async fn toggle_appliance(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Response, AppError> {
    let confirmation = lock(&state.store)
        .toggle_appliance(id)
        .ok_or_else(|| AppError::not_found(format!("appliance {}", id)))?;

    let status = if confirmation.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(confirmation)).into_response())
}

async fn add_schedule(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(schedule): Json<NewSchedule>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let schedule = lock(&state.store)
        .add_schedule(id, schedule)?
        .ok_or_else(|| AppError::not_found(format!("appliance {}", id)))?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

async fn delete_schedule(
    State(state): State<AppState>,
    Path((id, schedule_id)): Path<(u32, String)>,
) -> Result<StatusCode, AppError> {
    if lock(&state.store).delete_schedule(id, &schedule_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("schedule {}", schedule_id)))
    }
}

async fn toggle_schedule(
    State(state): State<AppState>,
    Path((id, schedule_id)): Path<(u32, String)>,
) -> Result<Json<ScheduleToggled>, AppError> {
    let enabled = lock(&state.store)
        .toggle_schedule(id, &schedule_id)
        .ok_or_else(|| AppError::not_found(format!("schedule {}", schedule_id)))?;
    Ok(Json(ScheduleToggled { enabled }))
}

async fn set_timer(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<TimerRequest>,
) -> Result<Json<Timer>, AppError> {
    let timer = lock(&state.store)
        .set_timer(id, request.duration, request.action)?
        .ok_or_else(|| AppError::not_found(format!("appliance {}", id)))?;
    Ok(Json(timer))
}

async fn cancel_timer(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    if lock(&state.store).cancel_timer(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("timer on appliance {}", id)))
    }
}

async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if lock(&state.store).dismiss_notification(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("notification {}", id)))
    }
}

async fn reset_statistics(State(state): State<AppState>) -> Json<Confirmation> {
    Json(lock(&state.store).reset_statistics())
}

async fn update_device_address(
    State(state): State<AppState>,
    Json(request): Json<AddressRequest>,
) -> Result<Json<Confirmation>, AppError> {
    let confirmation = lock(&state.store).update_device_address(&request.address)?;
    Ok(Json(confirmation))
}

struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn not_found(what: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: anyhow::anyhow!("{} not found", what),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("API error: {}", self.error);
        }
        let body = Confirmation::failure(self.error.to_string());
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::InvalidAddress(_) | Error::InvalidTimer(_) | Error::InvalidSchedule(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Device(_) | Error::DeviceUnavailable(_) => StatusCode::BAD_GATEWAY,
            Error::Json(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            error: err.into(),
        }
    }
}
