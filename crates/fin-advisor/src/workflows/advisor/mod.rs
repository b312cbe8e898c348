//! Conversational decision engine for small-business financial questions.
//!
//! A question is resolved to an [`Intent`], the dialogue collects the slots that intent
//! requires, and the rule evaluator turns the completed payload into a [`Recommendation`]
//! alongside a financial health score. [`DecisionService`] owns the turn loop and the
//! persistence calls; everything below it is pure.

pub mod dialogue;
pub mod domain;
pub mod envelope;
pub(crate) mod evaluation;
pub mod health;
pub mod intent;
pub mod memory;
pub mod parser;
pub mod repository;
pub mod router;
pub mod service;
pub mod slots;

#[cfg(test)]
mod tests;

pub use dialogue::{DialogueEngine, DialoguePhase, DialogueState, ResolvedFlow, TurnOutcome};
pub use domain::{
    Decision, DecisionId, DecisionStatus, FinancialBaseline, Intent, Payload, Recommendation,
    RecommendationFeedback, RecommendationId, SessionId, SlotValue, UserId, Verdict,
};
pub use envelope::{
    Cancellation, Clarification, DataNeeded, DecisionRequest, DecisionResult, EngineReply,
    ErrorBody, ErrorEnvelope, IntentContext, SuccessEnvelope,
};
pub use evaluation::{Evaluation, EvaluationConfig, EvaluationError, RuleEvaluator};
pub use health::{Financials, HealthBand, HealthScore};
pub use intent::IntentResolver;
pub use memory::InMemoryDecisionRepository;
pub use parser::ParseFailure;
pub use repository::{DecisionRepository, DecisionStatusView, RepositoryError};
pub use router::{advisor_router, FeedbackRequest, TurnRequest, USER_HEADER};
pub use service::{AdvisorError, DecisionService, HealthSnapshot};
pub use slots::{SlotDefinition, SlotKind};
