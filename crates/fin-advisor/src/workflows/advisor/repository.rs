use serde::Serialize;

use super::dialogue::DialogueState;
use super::domain::{
    Decision, DecisionId, DecisionStatus, FinancialBaseline, Payload, Recommendation,
    RecommendationFeedback, RecommendationId, SessionId, UserId,
};

/// Narrow storage interface for decisions, recommendations, and dialogue state.
pub trait DecisionRepository: Send + Sync {
    fn create_decision(&self, decision: Decision) -> Result<Decision, RepositoryError>;
    fn update_decision_status(
        &self,
        id: &DecisionId,
        status: DecisionStatus,
    ) -> Result<(), RepositoryError>;
    fn fetch_decision(&self, id: &DecisionId) -> Result<Option<Decision>, RepositoryError>;

    /// Attaches the recommendation, records the final inputs, and marks the decision
    /// `processed` as one write. A decision that already has a recommendation is rejected
    /// with `Conflict` and left untouched.
    fn complete_decision(
        &self,
        recommendation: Recommendation,
        inputs: Payload,
    ) -> Result<Recommendation, RepositoryError>;
    fn fetch_recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError>;
    fn recommendation_for(
        &self,
        decision_id: &DecisionId,
    ) -> Result<Option<Recommendation>, RepositoryError>;
    fn insert_feedback(&self, feedback: RecommendationFeedback) -> Result<(), RepositoryError>;

    fn load_dialogue(&self, session_id: &SessionId)
        -> Result<Option<DialogueState>, RepositoryError>;
    /// Compare-and-swap write. `expected_version` is the version the caller loaded (0 for a
    /// new session); the stored copy comes back with its version bumped.
    fn save_dialogue(
        &self,
        state: DialogueState,
        expected_version: u64,
    ) -> Result<DialogueState, RepositoryError>;

    fn load_baseline(&self, user_id: &UserId)
        -> Result<Option<FinancialBaseline>, RepositoryError>;
    fn save_baseline(
        &self,
        user_id: &UserId,
        baseline: FinancialBaseline,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized view of a decision and its recommendation, if any.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionStatusView {
    pub decision_id: DecisionId,
    pub intent: &'static str,
    pub question: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation_id: Option<RecommendationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_health_score: Option<u8>,
}

impl DecisionStatusView {
    pub fn new(decision: &Decision, recommendation: Option<&Recommendation>) -> Self {
        Self {
            decision_id: decision.id.clone(),
            intent: decision.intent.label(),
            question: decision.question.clone(),
            status: decision.status.label(),
            recommendation_id: recommendation.map(|rec| rec.id.clone()),
            recommendation: recommendation.map(|rec| rec.recommendation.label()),
            financial_health_score: recommendation.map(|rec| rec.financial_health_score),
        }
    }
}
