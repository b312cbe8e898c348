use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::advisor::dialogue::DialogueState;
use crate::workflows::advisor::domain::{
    Decision, DecisionId, DecisionStatus, FinancialBaseline, Payload, Recommendation,
    RecommendationFeedback, RecommendationId, SessionId, SlotValue, UserId,
};
use crate::workflows::advisor::repository::{DecisionRepository, RepositoryError};
use crate::workflows::advisor::slots::fields;
use crate::workflows::advisor::{
    advisor_router, DecisionService, EvaluationConfig, InMemoryDecisionRepository, USER_HEADER,
};

pub(super) fn owner() -> UserId {
    UserId("owner-1".to_string())
}

pub(super) fn session(name: &str) -> SessionId {
    SessionId(format!("session-{name}"))
}

pub(super) fn hiring_payload(payroll: f64) -> Payload {
    Payload::new()
        .with(fields::MONTHLY_REVENUE, SlotValue::Number(150_000.0))
        .with(fields::MONTHLY_EXPENSES, SlotValue::Number(80_000.0))
        .with(fields::OWNER_WITHDRAWALS, SlotValue::Number(10_000.0))
        .with(fields::STAFF_PAYROLL, SlotValue::Number(payroll))
        .with(fields::CURRENT_SAVINGS, SlotValue::Number(60_000.0))
}

pub(super) fn baseline() -> FinancialBaseline {
    FinancialBaseline {
        monthly_revenue: 40_000.0,
        monthly_expenses: 30_000.0,
        current_savings: 90_000.0,
        total_debt: 0.0,
        updated_at: Utc::now(),
    }
}

pub(super) fn build_service() -> (
    DecisionService<InMemoryDecisionRepository>,
    Arc<InMemoryDecisionRepository>,
) {
    let repository = Arc::new(InMemoryDecisionRepository::default());
    let service = DecisionService::new(repository.clone(), EvaluationConfig::default());
    (service, repository)
}

pub(super) fn build_scripted_service() -> (
    DecisionService<ScriptedRepository>,
    Arc<ScriptedRepository>,
) {
    let repository = Arc::new(ScriptedRepository::default());
    let service = DecisionService::new(repository.clone(), EvaluationConfig::default());
    (service, repository)
}

/// In-memory store with switches for injecting store outages and racing writers.
#[derive(Default)]
pub(super) struct ScriptedRepository {
    pub(super) inner: InMemoryDecisionRepository,
    failing_completions: AtomicU32,
    completion_attempts: AtomicU32,
    failing_status_updates: AtomicU32,
    lose_next_create_ack: AtomicBool,
    race_next_load: AtomicBool,
}

impl ScriptedRepository {
    pub(super) fn fail_completions(&self, times: u32) {
        self.failing_completions.store(times, Ordering::SeqCst);
    }

    pub(super) fn completion_attempts(&self) -> u32 {
        self.completion_attempts.load(Ordering::SeqCst)
    }

    pub(super) fn fail_status_updates(&self, times: u32) {
        self.failing_status_updates.store(times, Ordering::SeqCst);
    }

    /// The next decision insert is stored but reported to the caller as an outage.
    pub(super) fn lose_next_create_ack(&self) {
        self.lose_next_create_ack.store(true, Ordering::SeqCst);
    }

    /// The next dialogue load is followed by a competing write to the same session.
    pub(super) fn race_next_load(&self) {
        self.race_next_load.store(true, Ordering::SeqCst);
    }
}

impl DecisionRepository for ScriptedRepository {
    fn create_decision(&self, decision: Decision) -> Result<Decision, RepositoryError> {
        let created = self.inner.create_decision(decision)?;
        if self.lose_next_create_ack.swap(false, Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(created)
    }

    fn update_decision_status(
        &self,
        id: &DecisionId,
        status: DecisionStatus,
    ) -> Result<(), RepositoryError> {
        if take_failure(&self.failing_status_updates) {
            return Err(offline());
        }
        self.inner.update_decision_status(id, status)
    }

    fn fetch_decision(&self, id: &DecisionId) -> Result<Option<Decision>, RepositoryError> {
        self.inner.fetch_decision(id)
    }

    fn complete_decision(
        &self,
        recommendation: Recommendation,
        inputs: Payload,
    ) -> Result<Recommendation, RepositoryError> {
        self.completion_attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.failing_completions) {
            return Err(offline());
        }
        self.inner.complete_decision(recommendation, inputs)
    }

    fn fetch_recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        self.inner.fetch_recommendation(id)
    }

    fn recommendation_for(
        &self,
        decision_id: &DecisionId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        self.inner.recommendation_for(decision_id)
    }

    fn insert_feedback(&self, feedback: RecommendationFeedback) -> Result<(), RepositoryError> {
        self.inner.insert_feedback(feedback)
    }

    fn load_dialogue(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<DialogueState>, RepositoryError> {
        let loaded = self.inner.load_dialogue(session_id)?;
        if self.race_next_load.swap(false, Ordering::SeqCst) {
            if let Some(state) = loaded.clone() {
                let version = state.version;
                self.inner.save_dialogue(state, version)?;
            }
        }
        Ok(loaded)
    }

    fn save_dialogue(
        &self,
        state: DialogueState,
        expected_version: u64,
    ) -> Result<DialogueState, RepositoryError> {
        self.inner.save_dialogue(state, expected_version)
    }

    fn load_baseline(
        &self,
        user_id: &UserId,
    ) -> Result<Option<FinancialBaseline>, RepositoryError> {
        self.inner.load_baseline(user_id)
    }

    fn save_baseline(
        &self,
        user_id: &UserId,
        baseline: FinancialBaseline,
    ) -> Result<(), RepositoryError> {
        self.inner.save_baseline(user_id, baseline)
    }
}

fn take_failure(remaining: &AtomicU32) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) fn advisor_router_with_service(
    service: DecisionService<InMemoryDecisionRepository>,
) -> axum::Router {
    advisor_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("build request")
}

pub(super) fn get_request(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::empty()).expect("build request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
