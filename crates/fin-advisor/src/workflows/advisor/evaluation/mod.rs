mod config;
mod policy;
mod rules;

pub use config::EvaluationConfig;

use std::collections::BTreeMap;

use super::domain::{Intent, Payload, Verdict};
use super::health::Financials;
use super::slots::missing_required;
use policy::{compose_reasoning, next_steps};

/// Rule output for a complete payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub intent: Intent,
    pub verdict: Verdict,
    pub reasoning: String,
    pub next_steps: Vec<String>,
    pub numeric_breakdown: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("no decision rules exist for intent {}", .0.label())]
    UnsupportedIntent(Intent),
    #[error("required field {0} is missing or has the wrong type")]
    MissingField(&'static str),
}

/// Stateless evaluator applying [`EvaluationConfig`] thresholds per intent.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    config: EvaluationConfig,
}

impl RuleEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn evaluate(&self, intent: Intent, payload: &Payload) -> Result<Evaluation, EvaluationError> {
        if !intent.is_known() {
            return Err(EvaluationError::UnsupportedIntent(intent));
        }
        if let Some(slot) = missing_required(intent, payload).first() {
            return Err(EvaluationError::MissingField(slot.field_name));
        }

        let financials = Financials::from_payload(payload);
        let outcome = rules::apply(intent, payload, &financials, &self.config)?;

        let mut numeric_breakdown = base_breakdown(&financials);
        for (key, value) in outcome.extras {
            numeric_breakdown.insert(key.to_string(), round2(value));
        }

        Ok(Evaluation {
            intent,
            verdict: outcome.verdict,
            reasoning: compose_reasoning(intent, outcome.verdict, &outcome.checks),
            next_steps: next_steps(intent, outcome.verdict, &outcome.checks),
            numeric_breakdown,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Snapshot every result carries so callers never recompute it.
fn base_breakdown(financials: &Financials) -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("monthly_revenue".to_string(), financials.monthly_revenue),
        ("monthly_expenses".to_string(), financials.monthly_expenses),
        ("current_savings".to_string(), financials.current_savings),
        ("owner_withdrawals".to_string(), financials.owner_withdrawals),
        ("total_debt".to_string(), financials.total_debt),
        ("net_income".to_string(), financials.net_income()),
        (
            "profit_margin".to_string(),
            round2(financials.profit_margin() * 100.0),
        ),
    ])
}
