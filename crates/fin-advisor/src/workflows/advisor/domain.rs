use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slots::{fields, SlotDefinition};

/// Authenticated user identifier supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Conversation identifier; one active dialogue per session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

/// Category of financial decision a question concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Hiring,
    Inventory,
    Marketing,
    Savings,
    Equipment,
    LoanManagement,
    BusinessExpansion,
    GeneralAdvice,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 9] = [
        Intent::Hiring,
        Intent::Inventory,
        Intent::Marketing,
        Intent::Savings,
        Intent::Equipment,
        Intent::LoanManagement,
        Intent::BusinessExpansion,
        Intent::GeneralAdvice,
        Intent::Unknown,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Intent::Hiring => "hiring",
            Intent::Inventory => "inventory",
            Intent::Marketing => "marketing",
            Intent::Savings => "savings",
            Intent::Equipment => "equipment",
            Intent::LoanManagement => "loan_management",
            Intent::BusinessExpansion => "business_expansion",
            Intent::GeneralAdvice => "general_advice",
            Intent::Unknown => "unknown",
        }
    }

    /// Human-facing name of the decision being made, echoed in `intent_context`.
    pub const fn decision_type(self) -> &'static str {
        match self {
            Intent::Hiring => "Hiring Decision",
            Intent::Inventory => "Inventory Purchase",
            Intent::Marketing => "Marketing Spend",
            Intent::Savings => "Savings Plan",
            Intent::Equipment => "Equipment Purchase",
            Intent::LoanManagement => "Loan Management",
            Intent::BusinessExpansion => "Business Expansion",
            Intent::GeneralAdvice => "General Financial Advice",
            Intent::Unknown => "Unknown",
        }
    }

    /// Parses a caller-supplied intent name. Unrecognised names yield `None` so the
    /// caller falls back to resolving the question text.
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let intent = match normalized.as_str() {
            "hiring" | "hire" => Intent::Hiring,
            "inventory" | "stock" => Intent::Inventory,
            "marketing" => Intent::Marketing,
            "savings" | "saving" => Intent::Savings,
            "equipment" => Intent::Equipment,
            "loan_management" | "loan" | "loans" | "debt" => Intent::LoanManagement,
            "business_expansion" | "expansion" => Intent::BusinessExpansion,
            "general_advice" | "general" => Intent::GeneralAdvice,
            "unknown" => Intent::Unknown,
            _ => return None,
        };
        Some(intent)
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Intent::Unknown)
    }
}

/// Typed value captured for a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Boolean(bool),
    Number(f64),
    Choice(String),
}

impl SlotValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SlotValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SlotValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            SlotValue::Choice(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Accumulated slot values for one dialogue. Keys only grow until the flow is cancelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, SlotValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: SlotValue) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: SlotValue) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&SlotValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(SlotValue::as_number)
    }

    /// Optional numeric slots count as zero when absent.
    pub fn number_or_zero(&self, field: &str) -> f64 {
        self.number(field).unwrap_or(0.0)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(SlotValue::as_bool)
    }

    pub fn choice(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(SlotValue::as_choice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SlotValue)> {
        self.0.iter()
    }
}

/// Lifecycle of a persisted decision row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Pending,
    Processed,
    Error,
}

impl DecisionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionStatus::Pending => "pending",
            DecisionStatus::Processed => "processed",
            DecisionStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub user_id: UserId,
    pub question: String,
    pub intent: Intent,
    pub inputs: Payload,
    pub status: DecisionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Verdict attached to a completed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approve,
    Wait,
    Reject,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Approve => "APPROVE",
            Verdict::Wait => "WAIT",
            Verdict::Reject => "REJECT",
        }
    }

    /// Presentation hint for the result card.
    pub const fn decision_status(self) -> &'static str {
        match self {
            Verdict::Approve => "success",
            Verdict::Wait => "warning",
            Verdict::Reject => "danger",
        }
    }
}

/// Immutable engine output for one processed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub decision_id: DecisionId,
    pub recommendation: Verdict,
    pub reasoning: String,
    pub actionable_steps: Vec<String>,
    pub financial_health_score: u8,
    pub score_interpretation: String,
    pub numeric_breakdown: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

/// Append-only accept/reject signal on a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFeedback {
    pub recommendation_id: RecommendationId,
    pub user_id: UserId,
    pub accepted: bool,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Most recent core financials a user supplied, reused to pre-fill new dialogues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialBaseline {
    pub monthly_revenue: f64,
    pub monthly_expenses: f64,
    pub current_savings: f64,
    pub total_debt: f64,
    pub updated_at: DateTime<Utc>,
}

impl FinancialBaseline {
    /// Builds a baseline when the payload carries revenue, expenses, and savings.
    pub fn from_payload(payload: &Payload, updated_at: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            monthly_revenue: payload.number(fields::MONTHLY_REVENUE)?,
            monthly_expenses: payload.number(fields::MONTHLY_EXPENSES)?,
            current_savings: payload.number(fields::CURRENT_SAVINGS)?,
            total_debt: payload.number_or_zero(fields::TOTAL_DEBT),
            updated_at,
        })
    }

    /// Seeds the baseline figures for the slots an intent uses without overriding
    /// anything the caller already supplied.
    pub fn prefill(&self, slots: &[SlotDefinition], payload: &mut Payload) {
        let known = [
            (fields::MONTHLY_REVENUE, self.monthly_revenue),
            (fields::MONTHLY_EXPENSES, self.monthly_expenses),
            (fields::CURRENT_SAVINGS, self.current_savings),
            (fields::TOTAL_DEBT, self.total_debt),
        ];

        for (field, value) in known {
            let Some(slot) = slots.iter().find(|slot| slot.field_name == field) else {
                continue;
            };
            if payload.contains(field) || (value == 0.0 && !slot.zero_allowed) {
                continue;
            }
            payload.insert(field, SlotValue::Number(value));
        }
    }
}
