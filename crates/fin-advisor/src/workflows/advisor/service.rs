use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::dialogue::{
    plan, DialogueEngine, DialogueState, ResolvedFlow, TurnOutcome, CLARIFICATION_MESSAGE,
};
use super::domain::{
    Decision, DecisionId, DecisionStatus, FinancialBaseline, Payload, Recommendation,
    RecommendationFeedback, RecommendationId, SessionId, UserId,
};
use super::envelope::{
    Cancellation, Clarification, DataNeeded, DecisionRequest, DecisionResult, EngineReply,
};
use super::evaluation::{EvaluationConfig, EvaluationError, RuleEvaluator};
use super::health::{self, Financials, HealthBand};
use super::parser::{self, ParseFailure};
use super::repository::{DecisionRepository, DecisionStatusView, RepositoryError};
use super::slots::{find_slot, slots_for};

const CANCELLED_MESSAGE: &str =
    "Okay, I've cleared that question. Ask me about another decision whenever you're ready.";
const CLARIFICATION_ACTIONS: &[&str] = &[
    "Can I afford to hire someone?",
    "Should I restock inventory?",
    "How is my business doing financially?",
];

/// Orchestrates intent resolution, slot collection, evaluation, and persistence.
pub struct DecisionService<R> {
    repository: Arc<R>,
    engine: DialogueEngine,
    evaluator: RuleEvaluator,
}

static DECISION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RECOMMENDATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_decision_id() -> DecisionId {
    let id = DECISION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DecisionId(format!("dec-{id:06}"))
}

fn next_recommendation_id() -> RecommendationId {
    let id = RECOMMENDATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RecommendationId(format!("rec-{id:06}"))
}

impl<R> DecisionService<R>
where
    R: DecisionRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: EvaluationConfig) -> Self {
        Self::with_engine(repository, DialogueEngine::default(), RuleEvaluator::new(config))
    }

    pub fn with_engine(repository: Arc<R>, engine: DialogueEngine, evaluator: RuleEvaluator) -> Self {
        Self {
            repository,
            engine,
            evaluator,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    /// Single-shot request: the caller resends the accumulated payload every time and no
    /// session state is kept. A decision is recorded only once the payload is complete.
    pub fn decide(
        &self,
        user: &UserId,
        request: DecisionRequest,
    ) -> Result<EngineReply, AdvisorError> {
        let question = request.question.trim().to_string();
        if question.is_empty() && request.intent.is_none() {
            return Err(AdvisorError::InvalidRequest(
                "a question or an intent is required".to_string(),
            ));
        }

        let intent = self
            .engine
            .resolver()
            .resolve_with_hint(request.intent.as_deref(), &question);
        if !intent.is_known() {
            return Ok(clarification(CLARIFICATION_MESSAGE));
        }

        let mut payload = Payload::new();
        let mut rejected: Vec<(&'static str, ParseFailure)> = Vec::new();
        for (field, value) in &request.payload {
            let Some(slot) = find_slot(intent, field) else {
                debug!(field = %field, intent = intent.label(), "ignoring unknown payload field");
                continue;
            };
            if value.is_null() {
                continue;
            }
            match parser::coerce(value, slot) {
                Ok(parsed) => payload.insert(slot.field_name, parsed),
                Err(failure) => rejected.push((slot.field_name, failure)),
            }
        }

        if let Some(baseline) = self.repository.load_baseline(user)? {
            baseline.prefill(slots_for(intent), &mut payload);
        }

        let flow = ResolvedFlow {
            intent,
            question,
            payload,
            decision_id: None,
        };
        match plan(flow) {
            TurnOutcome::Prompt {
                slot,
                intent,
                payload,
                ..
            } => {
                let reason = rejected
                    .iter()
                    .find(|(field, _)| *field == slot.field_name)
                    .map(|(_, failure)| failure.to_string());
                Ok(EngineReply::DataNeeded {
                    data_needed: DataNeeded::new(slot, intent, &payload, reason),
                })
            }
            TurnOutcome::Ready(flow) => {
                let result = self.evaluate_and_persist(user, &flow)?;
                Ok(EngineReply::Decision(result))
            }
            other => Ok(reply_for(other)),
        }
    }

    /// Apply one chat message to the session's dialogue.
    pub fn handle_turn(
        &self,
        user: &UserId,
        session: &SessionId,
        text: &str,
    ) -> Result<EngineReply, AdvisorError> {
        if text.trim().is_empty() {
            return Err(AdvisorError::InvalidRequest(
                "message text must not be empty".to_string(),
            ));
        }
        self.run_turn(user, session, |engine, state, baseline| {
            engine.turn(state, text, baseline)
        })
    }

    /// Drop the session's unfinished question.
    pub fn cancel(&self, user: &UserId, session: &SessionId) -> Result<EngineReply, AdvisorError> {
        self.run_turn(user, session, |engine, state, _| engine.cancel(state))
    }

    /// Re-evaluate the last resolved question without collecting its slots again.
    pub fn retry(&self, user: &UserId, session: &SessionId) -> Result<EngineReply, AdvisorError> {
        self.run_turn(user, session, |engine, state, _| engine.retry(state))
    }

    fn run_turn<F>(
        &self,
        user: &UserId,
        session: &SessionId,
        step: F,
    ) -> Result<EngineReply, AdvisorError>
    where
        F: FnOnce(&DialogueEngine, &mut DialogueState, Option<&FinancialBaseline>) -> TurnOutcome,
    {
        let mut state = match self.repository.load_dialogue(session)? {
            Some(state) if state.user_id != *user => {
                return Err(AdvisorError::NotFound { what: "session" })
            }
            Some(state) => state,
            None => DialogueState::new(session.clone(), user.clone(), Utc::now()),
        };
        let expected = state.version;
        let baseline = self.repository.load_baseline(user)?;

        let outcome = step(&self.engine, &mut state, baseline.as_ref());
        let opened = self.open_decision(user, &mut state);
        let active_decision = state
            .flow
            .as_ref()
            .and_then(|flow| flow.decision_id.clone());
        debug!(
            session_id = %session.0,
            phase = state.phase.label(),
            "dialogue turn applied"
        );

        match outcome {
            TurnOutcome::Ready(mut flow) => {
                flow.decision_id = active_decision;
                // Claim the evaluating state before any side effect so a racing turn fails.
                let mut state = self.save_state(state, expected)?;
                let claimed = state.version;
                let result = self.evaluate_and_persist(user, &flow)?;
                self.engine.complete(&mut state, result.decision_id.clone());
                self.save_state(state, claimed)?;
                Ok(EngineReply::Decision(result))
            }
            TurnOutcome::NothingToRetry => Err(AdvisorError::NothingToRetry),
            other => {
                self.save_state(state, expected)?;
                if let Some(decision) = opened {
                    self.record_opened_decision(decision);
                }
                let mut reply = reply_for(other);
                if let EngineReply::DataNeeded { data_needed } = &mut reply {
                    data_needed.intent_context.decision_id = active_decision;
                }
                Ok(reply)
            }
        }
    }

    /// Assigns a decision id to the active flow once it holds at least one answer. The row
    /// itself is written after the session save succeeds.
    fn open_decision(&self, user: &UserId, state: &mut DialogueState) -> Option<Decision> {
        let flow = state.flow.as_mut()?;
        if flow.decision_id.is_some() || flow.payload.is_empty() {
            return None;
        }
        let id = next_decision_id();
        flow.decision_id = Some(id.clone());
        Some(pending_decision(id, user, flow))
    }

    /// A missing row is recreated when the flow is evaluated, so failures here only log.
    fn record_opened_decision(&self, decision: Decision) {
        let id = decision.id.clone();
        match self.retry_once("create_decision", || {
            self.repository.create_decision(decision.clone())
        }) {
            Ok(_) => debug!(decision_id = %id.0, "pending decision opened"),
            Err(RepositoryError::Conflict) => {}
            Err(error) => {
                warn!(decision_id = %id.0, %error, "failed to open pending decision");
            }
        }
    }

    fn save_state(
        &self,
        state: DialogueState,
        expected_version: u64,
    ) -> Result<DialogueState, AdvisorError> {
        let session_id = state.session_id.clone();
        match self.repository.save_dialogue(state, expected_version) {
            Ok(saved) => Ok(saved),
            Err(RepositoryError::Conflict) => {
                warn!(session_id = %session_id.0, expected_version, "concurrent dialogue turn rejected");
                Err(AdvisorError::ConcurrentTurn)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Evaluate the flow and attach exactly one recommendation to its decision.
    fn evaluate_and_persist(
        &self,
        user: &UserId,
        flow: &ResolvedFlow,
    ) -> Result<DecisionResult, AdvisorError> {
        let decision = self.ensure_decision(user, flow)?;
        if let Some(existing) = self.repository.recommendation_for(&decision.id)? {
            debug!(decision_id = %decision.id.0, "decision already completed");
            return Ok(DecisionResult::from(&existing));
        }

        let evaluation = match self.evaluator.evaluate(flow.intent, &flow.payload) {
            Ok(evaluation) => evaluation,
            Err(error) => {
                self.mark_failed(&decision.id);
                return Err(error.into());
            }
        };
        let health = health::score(&Financials::from_payload(&flow.payload));

        let now = Utc::now();
        let recommendation = Recommendation {
            id: next_recommendation_id(),
            decision_id: decision.id.clone(),
            recommendation: evaluation.verdict,
            reasoning: evaluation.reasoning,
            actionable_steps: evaluation.next_steps,
            financial_health_score: health.score,
            score_interpretation: health.interpretation.to_string(),
            numeric_breakdown: evaluation.numeric_breakdown,
            created_at: now,
        };

        let stored = match self.retry_once("complete_decision", || {
            self.repository
                .complete_decision(recommendation.clone(), flow.payload.clone())
        }) {
            Ok(stored) => stored,
            // The first attempt may have landed before the store reported failure.
            Err(RepositoryError::Conflict) => match self.repository.recommendation_for(&decision.id) {
                Ok(Some(existing)) => existing,
                _ => {
                    self.mark_failed(&decision.id);
                    return Err(RepositoryError::Conflict.into());
                }
            },
            Err(error) => {
                self.mark_failed(&decision.id);
                return Err(error.into());
            }
        };

        if let Some(baseline) = FinancialBaseline::from_payload(&flow.payload, now) {
            if let Err(error) = self.repository.save_baseline(user, baseline) {
                warn!(user_id = %user.0, %error, "failed to refresh financial baseline");
            }
        }

        info!(
            decision_id = %decision.id.0,
            recommendation_id = %stored.id.0,
            intent = flow.intent.label(),
            verdict = stored.recommendation.label(),
            score = stored.financial_health_score,
            "decision processed"
        );

        Ok(DecisionResult::from(&stored))
    }

    /// The flow's decision row, written now if it was never stored.
    fn ensure_decision(&self, user: &UserId, flow: &ResolvedFlow) -> Result<Decision, AdvisorError> {
        let id = flow.decision_id.clone().unwrap_or_else(next_decision_id);
        if let Some(existing) = self.retry_once("fetch_decision", || self.repository.fetch_decision(&id))? {
            return Ok(existing);
        }

        let decision = pending_decision(id.clone(), user, flow);
        match self.retry_once("create_decision", || {
            self.repository.create_decision(decision.clone())
        }) {
            Ok(created) => Ok(created),
            // An earlier attempt stored the row but its acknowledgement was lost.
            Err(RepositoryError::Conflict) => self
                .repository
                .fetch_decision(&id)?
                .ok_or(AdvisorError::Repository(RepositoryError::Conflict)),
            Err(error) => Err(error.into()),
        }
    }

    /// Store calls get one retry on `Unavailable`; anything else is returned as is.
    fn retry_once<T, F>(&self, operation: &'static str, mut call: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Result<T, RepositoryError>,
    {
        match call() {
            Err(RepositoryError::Unavailable(reason)) => {
                warn!(operation, %reason, "store unavailable, retrying once");
                call()
            }
            other => other,
        }
    }

    fn mark_failed(&self, decision_id: &DecisionId) {
        if let Err(error) = self
            .repository
            .update_decision_status(decision_id, DecisionStatus::Error)
        {
            warn!(decision_id = %decision_id.0, %error, "failed to mark decision as errored");
        }
    }

    /// Status of a decision owned by `user`.
    pub fn decision_status(
        &self,
        user: &UserId,
        decision_id: &DecisionId,
    ) -> Result<DecisionStatusView, AdvisorError> {
        let decision = self
            .repository
            .fetch_decision(decision_id)?
            .filter(|decision| decision.user_id == *user)
            .ok_or(AdvisorError::NotFound { what: "decision" })?;
        let recommendation = self.repository.recommendation_for(decision_id)?;
        Ok(DecisionStatusView::new(&decision, recommendation.as_ref()))
    }

    /// Append an accept/reject signal to a recommendation the user received.
    pub fn submit_feedback(
        &self,
        user: &UserId,
        recommendation_id: &RecommendationId,
        accepted: bool,
        comment: Option<String>,
    ) -> Result<RecommendationFeedback, AdvisorError> {
        let recommendation = self
            .repository
            .fetch_recommendation(recommendation_id)?
            .ok_or(AdvisorError::NotFound {
                what: "recommendation",
            })?;
        let owned = self
            .repository
            .fetch_decision(&recommendation.decision_id)?
            .is_some_and(|decision| decision.user_id == *user);
        if !owned {
            return Err(AdvisorError::NotFound {
                what: "recommendation",
            });
        }

        let feedback = RecommendationFeedback {
            recommendation_id: recommendation_id.clone(),
            user_id: user.clone(),
            accepted,
            comment: comment
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            submitted_at: Utc::now(),
        };
        self.repository.insert_feedback(feedback.clone())?;
        info!(
            recommendation_id = %recommendation_id.0,
            accepted,
            "recommendation feedback recorded"
        );
        Ok(feedback)
    }

    /// Health score from the user's stored baseline.
    pub fn health_snapshot(&self, user: &UserId) -> Result<HealthSnapshot, AdvisorError> {
        let baseline = self
            .repository
            .load_baseline(user)?
            .ok_or(AdvisorError::NoFinancialData)?;
        let financials = Financials::from(&baseline);
        let health = health::score(&financials);
        Ok(HealthSnapshot {
            financial_health_score: health.score,
            score_interpretation: health.interpretation,
            band: health.band,
            financials,
            baseline_updated_at: baseline.updated_at,
        })
    }
}

fn pending_decision(id: DecisionId, user: &UserId, flow: &ResolvedFlow) -> Decision {
    let now = Utc::now();
    Decision {
        id,
        user_id: user.clone(),
        question: flow.question.clone(),
        intent: flow.intent,
        inputs: flow.payload.clone(),
        status: DecisionStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

fn reply_for(outcome: TurnOutcome) -> EngineReply {
    match outcome {
        TurnOutcome::Clarify { message } => clarification(&message),
        TurnOutcome::Prompt {
            slot,
            intent,
            payload,
            reason,
        } => EngineReply::DataNeeded {
            data_needed: DataNeeded::new(slot, intent, &payload, reason),
        },
        TurnOutcome::Cancelled => EngineReply::Cancelled {
            cancelled: Cancellation {
                message: CANCELLED_MESSAGE.to_string(),
            },
        },
        // Callers resolve these before asking for a reply.
        TurnOutcome::Ready(_) | TurnOutcome::NothingToRetry => {
            clarification(CLARIFICATION_MESSAGE)
        }
    }
}

fn clarification(message: &str) -> EngineReply {
    EngineReply::Clarification {
        clarification: Clarification {
            message: message.to_string(),
            suggested_actions: CLARIFICATION_ACTIONS
                .iter()
                .map(|action| action.to_string())
                .collect(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub financial_health_score: u8,
    pub score_interpretation: &'static str,
    pub band: HealthBand,
    pub financials: Financials,
    pub baseline_updated_at: DateTime<Utc>,
}

/// Orchestration-level failure. Slot validation never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("no financial baseline on record")]
    NoFinancialData,
    #[error("request is missing an authenticated user")]
    Unauthenticated,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{what} not found")]
    NotFound { what: &'static str },
    #[error("another turn is already being processed for this session")]
    ConcurrentTurn,
    #[error("there is no resolved question to retry")]
    NothingToRetry,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl AdvisorError {
    pub fn code(&self) -> &'static str {
        match self {
            AdvisorError::NoFinancialData => "NO_FINANCIAL_DATA",
            AdvisorError::Unauthenticated => "UNAUTHENTICATED",
            AdvisorError::InvalidRequest(_) => "INVALID_REQUEST",
            AdvisorError::NotFound { .. } | AdvisorError::Repository(RepositoryError::NotFound) => {
                "NOT_FOUND"
            }
            AdvisorError::ConcurrentTurn => "CONCURRENT_TURN",
            AdvisorError::NothingToRetry => "NOTHING_TO_RETRY",
            AdvisorError::Repository(RepositoryError::Unavailable(_)) => "STORE_UNAVAILABLE",
            AdvisorError::Repository(RepositoryError::Conflict) | AdvisorError::Evaluation(_) => {
                "INTERNAL"
            }
        }
    }

    pub fn severity(&self) -> &'static str {
        match self {
            AdvisorError::NothingToRetry => "info",
            AdvisorError::NoFinancialData
            | AdvisorError::InvalidRequest(_)
            | AdvisorError::NotFound { .. }
            | AdvisorError::ConcurrentTurn => "warning",
            AdvisorError::Unauthenticated
            | AdvisorError::Repository(_)
            | AdvisorError::Evaluation(_) => "error",
        }
    }

    /// Short text safe to show the user; store and evaluation details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::NoFinancialData => {
                "We don't have your financial figures yet. Answer a decision question first so we can record your revenue, expenses, and savings.".to_string()
            }
            AdvisorError::Unauthenticated => "Please sign in to continue.".to_string(),
            AdvisorError::InvalidRequest(reason) => format!("The request could not be read: {reason}."),
            AdvisorError::NotFound { what } => format!("That {what} could not be found."),
            AdvisorError::Repository(RepositoryError::NotFound) => {
                "That record could not be found.".to_string()
            }
            AdvisorError::ConcurrentTurn => {
                "Your previous message is still being processed. Wait a moment and send it again.".to_string()
            }
            AdvisorError::NothingToRetry => {
                "There is no earlier question to try again. Ask a new question instead.".to_string()
            }
            AdvisorError::Repository(_) | AdvisorError::Evaluation(_) => {
                "Something went wrong while preparing your recommendation.".to_string()
            }
        }
    }

    pub fn suggested_actions(&self) -> &'static [&'static str] {
        match self {
            AdvisorError::NoFinancialData => &["supply_financial_data", "ask_new_question"],
            AdvisorError::Unauthenticated => &["sign_in"],
            AdvisorError::InvalidRequest(_) => &["supply_new_data", "cancel"],
            AdvisorError::NotFound { .. } | AdvisorError::Repository(RepositoryError::NotFound) => {
                &["ask_new_question"]
            }
            AdvisorError::ConcurrentTurn => &["retry"],
            AdvisorError::NothingToRetry => &["ask_new_question"],
            AdvisorError::Repository(_) | AdvisorError::Evaluation(_) => {
                &["retry", "cancel"]
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            "UNAUTHENTICATED" => StatusCode::UNAUTHORIZED,
            "NO_FINANCIAL_DATA" | "NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_REQUEST" => StatusCode::BAD_REQUEST,
            "CONCURRENT_TURN" | "NOTHING_TO_RETRY" => StatusCode::CONFLICT,
            "STORE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
