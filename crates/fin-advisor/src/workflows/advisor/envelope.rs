//! JSON shapes exchanged with the presentation layer.

use std::collections::BTreeMap;

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::domain::{DecisionId, Intent, Payload, Recommendation, RecommendationId};
use super::service::AdvisorError;
use super::slots::SlotDefinition;

/// Stateless request: everything the caller already knows about the decision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub payload: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentContext {
    pub intent: String,
    pub decision_type: String,
    pub current_payload: Payload,
    /// Pending decision opened for a chat flow; absent for stateless requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<DecisionId>,
}

/// Prompt for the next missing slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataNeeded {
    pub field: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(rename = "canBeZeroOrNone")]
    pub can_be_zero_or_none: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    pub intent_context: IntentContext,
}

impl DataNeeded {
    pub fn new(
        slot: &SlotDefinition,
        intent: Intent,
        payload: &Payload,
        validation_error: Option<String>,
    ) -> Self {
        let options = if slot.options.is_empty() {
            None
        } else {
            Some(slot.options.iter().map(|option| option.to_string()).collect())
        };

        Self {
            field: slot.field_name.to_string(),
            prompt: slot.prompt.to_string(),
            kind: slot.kind.wire_label().to_string(),
            options,
            can_be_zero_or_none: slot.zero_allowed,
            validation_error,
            intent_context: IntentContext {
                intent: intent.label().to_string(),
                decision_type: intent.decision_type().to_string(),
                current_payload: payload.clone(),
                decision_id: None,
            },
        }
    }
}

/// Completed decision card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    pub decision_result: String,
    pub decision_status: String,
    pub explanation: String,
    pub next_steps: Vec<String>,
    pub financial_health_score: u8,
    pub score_interpretation: String,
    pub numeric_breakdown: BTreeMap<String, f64>,
    pub decision_id: DecisionId,
    pub recommendation_id: RecommendationId,
}

impl From<&Recommendation> for DecisionResult {
    fn from(recommendation: &Recommendation) -> Self {
        Self {
            decision_result: recommendation.recommendation.label().to_string(),
            decision_status: recommendation.recommendation.decision_status().to_string(),
            explanation: recommendation.reasoning.clone(),
            next_steps: recommendation.actionable_steps.clone(),
            financial_health_score: recommendation.financial_health_score,
            score_interpretation: recommendation.score_interpretation.clone(),
            numeric_breakdown: recommendation.numeric_breakdown.clone(),
            decision_id: recommendation.decision_id.clone(),
            recommendation_id: recommendation.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clarification {
    pub message: String,
    pub suggested_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    pub message: String,
}

/// Successful engine output; serialized as the `data` member of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngineReply {
    DataNeeded { data_needed: DataNeeded },
    Decision(DecisionResult),
    Clarification { clarification: Clarification },
    Cancelled { cancelled: Cancellation },
}

impl EngineReply {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineReply::DataNeeded { .. } => "data_needed",
            EngineReply::Decision(_) => "decision",
            EngineReply::Clarification { .. } => "clarification",
            EngineReply::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub severity: &'static str,
    pub details: String,
    pub suggested_actions: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl From<&AdvisorError> for ErrorEnvelope {
    fn from(error: &AdvisorError) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: error.code(),
                severity: error.severity(),
                details: error.user_message(),
                suggested_actions: error.suggested_actions().to_vec(),
            },
        }
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope::from(&self);
        (self.status_code(), axum::Json(envelope)).into_response()
    }
}
