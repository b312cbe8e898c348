//! Turn-by-turn slot collection.
//!
//! `AwaitingQuestion -> CollectingSlot(field)* -> Evaluating -> Completed`, with `Cancelled`
//! reachable from any phase. The engine only mutates the [`DialogueState`] it is handed;
//! persistence and evaluation belong to the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DecisionId, FinancialBaseline, Intent, Payload, SessionId, UserId};
use super::intent::IntentResolver;
use super::parser;
use super::slots::{find_slot, missing_required, slots_for, SlotDefinition};

pub const CLARIFICATION_MESSAGE: &str = "I couldn't tell which decision you're weighing. Try rephrasing, for example \"Can I afford to hire someone?\" or \"Should I restock inventory?\"";

const CANCEL_WORDS: &[&str] = &["cancel", "stop", "start over", "reset", "never mind"];
const RETRY_WORDS: &[&str] = &["try again", "retry"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DialoguePhase {
    AwaitingQuestion,
    CollectingSlot { field: String },
    Evaluating,
    Completed { decision_id: DecisionId },
    Cancelled,
}

impl DialoguePhase {
    pub fn label(&self) -> &'static str {
        match self {
            DialoguePhase::AwaitingQuestion => "awaiting_question",
            DialoguePhase::CollectingSlot { .. } => "collecting_slot",
            DialoguePhase::Evaluating => "evaluating",
            DialoguePhase::Completed { .. } => "completed",
            DialoguePhase::Cancelled => "cancelled",
        }
    }
}

/// Intent, question, and payload of one flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFlow {
    pub intent: Intent,
    pub question: String,
    pub payload: Payload,
    /// Decision row opened for this flow once its first slot was filled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<DecisionId>,
}

/// Versioned conversation state; `version` backs the optimistic write check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueState {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub version: u64,
    pub phase: DialoguePhase,
    pub flow: Option<ResolvedFlow>,
    /// Last flow that reached evaluation, kept so "try again" skips slot collection.
    pub last_resolved: Option<ResolvedFlow>,
    pub updated_at: DateTime<Utc>,
}

impl DialogueState {
    pub fn new(session_id: SessionId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            user_id,
            version: 0,
            phase: DialoguePhase::AwaitingQuestion,
            flow: None,
            last_resolved: None,
            updated_at: now,
        }
    }

    pub fn pending_field(&self) -> Option<&'static SlotDefinition> {
        match (&self.phase, &self.flow) {
            (DialoguePhase::CollectingSlot { field }, Some(flow)) => find_slot(flow.intent, field),
            _ => None,
        }
    }
}

/// Control words recognised before the text is treated as a question or an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueCommand<'a> {
    Cancel,
    Retry,
    Input(&'a str),
}

impl<'a> DialogueCommand<'a> {
    pub fn classify(text: &'a str) -> Self {
        let normalized = text
            .trim()
            .trim_end_matches(|ch: char| ch.is_ascii_punctuation())
            .to_lowercase();
        if CANCEL_WORDS.contains(&normalized.as_str()) {
            DialogueCommand::Cancel
        } else if RETRY_WORDS.contains(&normalized.as_str()) {
            DialogueCommand::Retry
        } else {
            DialogueCommand::Input(text.trim())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Intent could not be resolved; ask the user to rephrase.
    Clarify { message: String },
    /// Another slot is needed. `reason` is set when the previous answer was rejected.
    Prompt {
        slot: &'static SlotDefinition,
        intent: Intent,
        payload: Payload,
        reason: Option<String>,
    },
    /// Payload complete; the caller evaluates it.
    Ready(ResolvedFlow),
    Cancelled,
    NothingToRetry,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DialogueEngine {
    resolver: IntentResolver,
}

impl DialogueEngine {
    pub fn new(resolver: IntentResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.resolver
    }

    /// Apply one user message to `state`.
    pub fn turn(
        &self,
        state: &mut DialogueState,
        text: &str,
        baseline: Option<&FinancialBaseline>,
    ) -> TurnOutcome {
        match DialogueCommand::classify(text) {
            DialogueCommand::Cancel => self.cancel(state),
            DialogueCommand::Retry => self.retry(state),
            DialogueCommand::Input(input) => match state.phase {
                DialoguePhase::CollectingSlot { .. } => self.answer(state, input, baseline),
                _ => self.begin(state, input, None, Payload::new(), baseline),
            },
        }
    }

    /// Start a new flow from a question, discarding any unfinished one.
    pub fn begin(
        &self,
        state: &mut DialogueState,
        question: &str,
        hint: Option<&str>,
        mut payload: Payload,
        baseline: Option<&FinancialBaseline>,
    ) -> TurnOutcome {
        let intent = self.resolver.resolve_with_hint(hint, question);
        if !intent.is_known() {
            state.flow = None;
            state.phase = DialoguePhase::AwaitingQuestion;
            return TurnOutcome::Clarify {
                message: CLARIFICATION_MESSAGE.to_string(),
            };
        }

        if let Some(baseline) = baseline {
            baseline.prefill(slots_for(intent), &mut payload);
        }

        state.flow = Some(ResolvedFlow {
            intent,
            question: question.trim().to_string(),
            payload,
            decision_id: None,
        });
        self.advance(state)
    }

    fn answer(
        &self,
        state: &mut DialogueState,
        raw: &str,
        baseline: Option<&FinancialBaseline>,
    ) -> TurnOutcome {
        let Some(slot) = state.pending_field() else {
            // Pending field no longer matches the schema; treat the text as a new question.
            return self.begin(state, raw, None, Payload::new(), baseline);
        };
        let Some(flow) = state.flow.as_mut() else {
            return self.begin(state, raw, None, Payload::new(), baseline);
        };

        match parser::parse(raw, slot) {
            Ok(value) => {
                flow.payload.insert(slot.field_name, value);
                self.advance(state)
            }
            Err(failure) => TurnOutcome::Prompt {
                slot,
                intent: flow.intent,
                payload: flow.payload.clone(),
                reason: Some(failure.to_string()),
            },
        }
    }

    fn advance(&self, state: &mut DialogueState) -> TurnOutcome {
        let Some(flow) = state.flow.as_ref() else {
            state.phase = DialoguePhase::AwaitingQuestion;
            return TurnOutcome::Clarify {
                message: CLARIFICATION_MESSAGE.to_string(),
            };
        };

        let outcome = plan(flow.clone());
        state.phase = match &outcome {
            TurnOutcome::Prompt { slot, .. } => DialoguePhase::CollectingSlot {
                field: slot.field_name.to_string(),
            },
            _ => DialoguePhase::Evaluating,
        };
        outcome
    }

    /// Drop the active flow; the next message is treated as a new question.
    pub fn cancel(&self, state: &mut DialogueState) -> TurnOutcome {
        state.flow = None;
        state.phase = DialoguePhase::Cancelled;
        TurnOutcome::Cancelled
    }

    /// Re-enter evaluation with an interrupted flow or the last resolved one. A flow that is
    /// still collecting slots keeps its place and the pending prompt is repeated.
    pub fn retry(&self, state: &mut DialogueState) -> TurnOutcome {
        if let (Some(slot), Some(flow)) = (state.pending_field(), state.flow.as_ref()) {
            return TurnOutcome::Prompt {
                slot,
                intent: flow.intent,
                payload: flow.payload.clone(),
                reason: None,
            };
        }

        if state.phase == DialoguePhase::Evaluating {
            if let Some(flow) = state.flow.clone() {
                return TurnOutcome::Ready(flow);
            }
        }

        match state.last_resolved.clone() {
            Some(mut flow) => {
                // A completed decision already has its recommendation; re-running opens a new one.
                flow.decision_id = None;
                state.flow = Some(flow.clone());
                state.phase = DialoguePhase::Evaluating;
                TurnOutcome::Ready(flow)
            }
            None => TurnOutcome::NothingToRetry,
        }
    }

    /// Record a successful evaluation and keep the flow for later retries.
    pub fn complete(&self, state: &mut DialogueState, decision_id: DecisionId) {
        if let Some(flow) = state.flow.take() {
            state.last_resolved = Some(flow);
        }
        state.phase = DialoguePhase::Completed { decision_id };
    }
}

/// Next step for a flow without touching any session state: the first missing required
/// slot in registry order, or `Ready` when none remain.
pub fn plan(flow: ResolvedFlow) -> TurnOutcome {
    let next = missing_required(flow.intent, &flow.payload).first().copied();
    match next {
        Some(slot) => TurnOutcome::Prompt {
            slot,
            intent: flow.intent,
            payload: flow.payload,
            reason: None,
        },
        None => TurnOutcome::Ready(flow),
    }
}
