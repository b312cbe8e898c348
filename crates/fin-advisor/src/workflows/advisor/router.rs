use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{DecisionId, RecommendationId, SessionId, UserId};
use super::envelope::{DecisionRequest, SuccessEnvelope};
use super::repository::DecisionRepository;
use super::service::{AdvisorError, DecisionService};

/// Header carrying the user id vouched for by the identity provider.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub accepted: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Router builder exposing the decision engine endpoints.
pub fn advisor_router<R>(service: Arc<DecisionService<R>>) -> Router
where
    R: DecisionRepository + 'static,
{
    Router::new()
        .route("/api/v1/decisions", post(decide_handler::<R>))
        .route(
            "/api/v1/decisions/:decision_id",
            get(decision_status_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/messages",
            post(turn_handler::<R>),
        )
        .route(
            "/api/v1/recommendations/:recommendation_id/feedback",
            post(feedback_handler::<R>),
        )
        .route("/api/v1/health-score", get(health_score_handler::<R>))
        .with_state(service)
}

fn authenticated_user(headers: &HeaderMap) -> Result<UserId, AdvisorError> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or(AdvisorError::Unauthenticated)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AdvisorError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AdvisorError::InvalidRequest(rejection.body_text()))
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, AdvisorError>) -> Response {
    match outcome {
        Ok(data) => (status, Json(SuccessEnvelope::new(data))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn decide_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    headers: HeaderMap,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Response
where
    R: DecisionRepository + 'static,
{
    let outcome = authenticated_user(&headers)
        .and_then(|user| Ok((user, body(payload)?)))
        .and_then(|(user, request)| service.decide(&user, request));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn turn_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Response
where
    R: DecisionRepository + 'static,
{
    let session = SessionId(session_id);
    let outcome = authenticated_user(&headers)
        .and_then(|user| Ok((user, body(payload)?)))
        .and_then(|(user, turn)| service.handle_turn(&user, &session, &turn.text));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn decision_status_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    Path(decision_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: DecisionRepository + 'static,
{
    let id = DecisionId(decision_id);
    let outcome =
        authenticated_user(&headers).and_then(|user| service.decision_status(&user, &id));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn feedback_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    Path(recommendation_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Response
where
    R: DecisionRepository + 'static,
{
    let id = RecommendationId(recommendation_id);
    let outcome = authenticated_user(&headers)
        .and_then(|user| Ok((user, body(payload)?)))
        .and_then(|(user, feedback)| {
            service.submit_feedback(&user, &id, feedback.accepted, feedback.comment)
        });
    respond(StatusCode::CREATED, outcome)
}

pub(crate) async fn health_score_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: DecisionRepository + 'static,
{
    let outcome = authenticated_user(&headers).and_then(|user| service.health_snapshot(&user));
    respond(StatusCode::OK, outcome)
}
