//! HTTP layer over a shared [`Recommender`].

use crate::error::RecommendError;
use crate::models::Recommendation;
use crate::recommender::Recommender;
use anyhow::{Context, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_MODEL_PATH: &str = "models/car_price_model.json";
pub const DEFAULT_DATASET_PATH: &str = "data/car_prices.csv";

#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// host:port to listen on
    pub bind: String,
    pub model_path: PathBuf,
    pub dataset_path: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(recommender: Recommender) -> Self {
        Self {
            recommender: Arc::new(recommender),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default, alias = "seats", alias = "family_size", alias = "minSeats")]
    pub min_seats: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeBody {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/healthz", get(healthz))
        .route("/recommendations", get(recommendations_handler))
        .with_state(state)
}

/// Bind `config.bind` and serve until the process stops.
pub async fn serve(config: &ServeConfig, recommender: Recommender) -> Result<()> {
    let app = router(AppState::new(recommender));
    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🌐 Carvise API listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn welcome() -> Json<WelcomeBody> {
    Json(WelcomeBody {
        message: "Welcome to Carvise!".to_string(),
    })
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn recommendations_handler(
    State(state): State<AppState>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        error_response(&RecommendError::InvalidRequest(rejection.body_text()))
    })?;
    let budget = query.budget.ok_or_else(|| {
        error_response(&RecommendError::InvalidRequest(
            "missing `budget` query parameter".to_string(),
        ))
    })?;
    let min_seats = query.min_seats.ok_or_else(|| {
        error_response(&RecommendError::InvalidRequest(
            "missing `min_seats` query parameter".to_string(),
        ))
    })?;

    let recommendations = state
        .recommender
        .recommend(budget, min_seats)
        .map_err(|err| error_response(&err))?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

fn status_for(err: &RecommendError) -> StatusCode {
    match err {
        RecommendError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RecommendError::NoMatches { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &RecommendError) -> ApiError {
    let status = status_for(err);
    if status.is_server_error() {
        warn!("Recommendation request failed: {}", err);
    }
    (
        status,
        Json(ErrorBody {
            error: err.reason().to_string(),
            message: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::tests::{trained_model, training_set};
    use axum::http::Uri;
    use pretty_assertions::assert_eq;

    fn state() -> AppState {
        let recommender = Recommender::new(&trained_model(), &training_set(), 2025).unwrap();
        AppState::new(recommender)
    }

    fn query(uri: &str) -> Result<Query<RecommendationQuery>, QueryRejection> {
        Query::try_from_uri(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn seat_aliases_are_accepted() {
        for uri in [
            "/recommendations?budget=20000&min_seats=7",
            "/recommendations?budget=20000&seats=7",
            "/recommendations?budget=20000&family_size=7",
            "/recommendations?budget=20000&minSeats=7",
        ] {
            let Query(q) = query(uri).unwrap();
            assert_eq!(q.budget, Some(20_000.0));
            assert_eq!(q.min_seats, Some(7));
        }
    }

    #[tokio::test]
    async fn welcome_message() {
        let Json(body) = welcome().await;
        assert_eq!(body.message, "Welcome to Carvise!");
        assert_eq!(healthz().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn returns_filtered_recommendations() {
        let Json(body) = recommendations_handler(
            State(state()),
            query("/recommendations?budget=1000000&family_size=7"),
        )
        .await
        .unwrap();
        assert!(!body.recommendations.is_empty());
        assert!(body.recommendations.iter().all(|r| r.seats >= 7));
    }

    #[tokio::test]
    async fn missing_budget_is_bad_request() {
        let (status, Json(body)) =
            recommendations_handler(State(state()), query("/recommendations?seats=5"))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "invalid_request");
    }

    #[tokio::test]
    async fn malformed_budget_is_bad_request() {
        let (status, Json(body)) = recommendations_handler(
            State(state()),
            query("/recommendations?budget=lots&seats=5"),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "invalid_request");
    }

    #[tokio::test]
    async fn no_matches_is_not_found() {
        let (status, Json(body)) = recommendations_handler(
            State(state()),
            query("/recommendations?budget=1&min_seats=5"),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "no_matches");
    }

    #[test]
    fn server_side_failures_map_to_500() {
        let err = RecommendError::SchemaMismatch {
            expected: 3,
            found: 0,
        };
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
        let (_, Json(body)) = error_response(&err);
        assert_eq!(body.error, "schema_mismatch");
    }
}
