//! Financial health score shared by the decision flow and baseline snapshots.
//!
//! Pure arithmetic only; identical inputs always produce the identical score.

use serde::Serialize;

use super::domain::{FinancialBaseline, Payload};
use super::slots::fields;

const PROFITABILITY_WEIGHT: f64 = 40.0;
const RUNWAY_WEIGHT: f64 = 35.0;
const DEBT_WEIGHT: f64 = 25.0;
const HEALTHY_MARGIN: f64 = 0.20;
const HEALTHY_RUNWAY_MONTHS: f64 = 6.0;

const STABLE_INTERPRETATION: &str =
    "Stable: the business is profitable with healthy reserves and manageable debt.";
const CAUTION_INTERPRETATION: &str =
    "Caution: the fundamentals work, but thin margins, reserves, or debt leave little room for error.";
const RISKY_INTERPRETATION: &str =
    "Risky: cash flow, reserves, or debt exposure need attention before taking on new commitments.";

/// Divide, returning 0.0 for a zero or non-finite result instead of NaN or infinity.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Core figures the score is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Financials {
    pub monthly_revenue: f64,
    pub monthly_expenses: f64,
    pub current_savings: f64,
    pub total_debt: f64,
    pub owner_withdrawals: f64,
}

impl Financials {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            monthly_revenue: payload.number_or_zero(fields::MONTHLY_REVENUE),
            monthly_expenses: payload.number_or_zero(fields::MONTHLY_EXPENSES),
            current_savings: payload.number_or_zero(fields::CURRENT_SAVINGS),
            total_debt: payload.number_or_zero(fields::TOTAL_DEBT),
            owner_withdrawals: payload.number_or_zero(fields::OWNER_WITHDRAWALS),
        }
    }

    pub fn net_income(&self) -> f64 {
        self.monthly_revenue - self.monthly_expenses - self.owner_withdrawals
    }

    /// Net income as a fraction of revenue; 0.0 when there is no revenue.
    pub fn profit_margin(&self) -> f64 {
        safe_ratio(self.net_income(), self.monthly_revenue)
    }

    pub fn runway_months(&self) -> f64 {
        safe_ratio(self.current_savings, self.monthly_expenses)
    }

    /// Debt relative to a year of revenue, clamped to 0..=1. Any debt with no revenue is
    /// full exposure.
    pub fn debt_exposure(&self) -> f64 {
        if self.total_debt <= 0.0 {
            0.0
        } else if self.monthly_revenue <= 0.0 {
            1.0
        } else {
            safe_ratio(self.total_debt, self.monthly_revenue * 12.0).clamp(0.0, 1.0)
        }
    }
}

impl From<&FinancialBaseline> for Financials {
    fn from(baseline: &FinancialBaseline) -> Self {
        Self {
            monthly_revenue: baseline.monthly_revenue,
            monthly_expenses: baseline.monthly_expenses,
            current_savings: baseline.current_savings,
            total_debt: baseline.total_debt,
            owner_withdrawals: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Stable,
    Caution,
    Risky,
}

impl HealthBand {
    pub const fn for_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => HealthBand::Stable,
            40..=79 => HealthBand::Caution,
            _ => HealthBand::Risky,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            HealthBand::Stable => "stable",
            HealthBand::Caution => "caution",
            HealthBand::Risky => "risky",
        }
    }

    pub const fn interpretation(self) -> &'static str {
        match self {
            HealthBand::Stable => STABLE_INTERPRETATION,
            HealthBand::Caution => CAUTION_INTERPRETATION,
            HealthBand::Risky => RISKY_INTERPRETATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthScore {
    pub score: u8,
    pub band: HealthBand,
    pub interpretation: &'static str,
}

/// Weighted 0..=100 score over profitability, savings runway, and debt exposure.
pub fn score(financials: &Financials) -> HealthScore {
    let profitability = (financials.profit_margin() / HEALTHY_MARGIN).clamp(0.0, 1.0);
    let runway = (financials.runway_months() / HEALTHY_RUNWAY_MONTHS).clamp(0.0, 1.0);
    let debt = 1.0 - financials.debt_exposure();

    let total =
        profitability * PROFITABILITY_WEIGHT + runway * RUNWAY_WEIGHT + debt * DEBT_WEIGHT;
    let score = total.round().clamp(0.0, 100.0) as u8;
    let band = HealthBand::for_score(score);

    HealthScore {
        score,
        band,
        interpretation: band.interpretation(),
    }
}
