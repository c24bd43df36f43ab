//! HTTP boundary in front of the record database.
//!
//! Clients never see the database; this server owns it and exposes the
//! fetch/upsert/schema contract that `HttpRemoteStore` speaks.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::record_db::RecordDb;
use super::types::RemoteRecord;
use crate::error::{DatabaseError, ValidationError};

#[derive(Clone)]
struct ServerState {
    db: Arc<Mutex<RecordDb>>,
}

impl ServerState {
    fn with_db<T>(
        &self,
        f: impl FnOnce(&RecordDb) -> Result<T, DatabaseError>,
    ) -> Result<T, ApiError> {
        let db = self
            .db
            .lock()
            .map_err(|_| ApiError::Database(DatabaseError::Locked))?;
        f(&db).map_err(ApiError::Database)
    }
}

enum ApiError {
    NotFound,
    Invalid(ValidationError),
    Database(DatabaseError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "no record".to_string()),
            ApiError::Invalid(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Database(err) => {
                warn!(error = %err, "record database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Build the router over an already-opened database.
pub fn router(db: RecordDb) -> Router {
    let state = ServerState {
        db: Arc::new(Mutex::new(db)),
    };
    Router::new()
        .route("/v1/schema", post(ensure_schema))
        .route("/v1/days/:user_key/:date", get(get_day).put(put_day))
        .with_state(state)
}

/// Ensure the schema, then serve until the listener fails.
pub async fn serve(listener: TcpListener, db: RecordDb) -> std::io::Result<()> {
    db.ensure_schema()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "record server listening");
    }
    axum::serve(listener, router(db)).await
}

async fn ensure_schema(State(state): State<ServerState>) -> Result<StatusCode, ApiError> {
    state.with_db(|db| db.ensure_schema())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_day(
    State(state): State<ServerState>,
    Path((user_key, date)): Path<(String, NaiveDate)>,
) -> Result<Json<RemoteRecord>, ApiError> {
    match state.with_db(|db| db.fetch(&user_key, date))? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound),
    }
}

async fn put_day(
    State(state): State<ServerState>,
    Path((user_key, date)): Path<(String, NaiveDate)>,
    Json(record): Json<RemoteRecord>,
) -> Result<Json<RemoteRecord>, ApiError> {
    record.validate().map_err(ApiError::Invalid)?;
    let stored = state.with_db(|db| db.upsert(&user_key, date, &record))?;
    debug!(%user_key, %date, count = stored.count, "record upserted");
    Ok(Json(stored))
}
