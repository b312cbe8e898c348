use serde::{Deserialize, Serialize};

/// Thresholds applied by the per-intent rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub hiring_net_income_multiple: f64,
    pub inventory_reserve_months: f64,
    pub marketing_max_revenue_share: f64,
    pub equipment_reserve_months: f64,
    pub equipment_loan_term_months: f64,
    pub equipment_lease_term_months: f64,
    pub equipment_payment_coverage: f64,
    pub loan_comfortable_coverage: f64,
    pub loan_minimum_coverage: f64,
    pub expansion_max_payback_months: f64,
    pub expansion_min_savings_share: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            hiring_net_income_multiple: 3.0,
            inventory_reserve_months: 1.0,
            marketing_max_revenue_share: 0.10,
            equipment_reserve_months: 3.0,
            equipment_loan_term_months: 24.0,
            equipment_lease_term_months: 36.0,
            equipment_payment_coverage: 2.0,
            loan_comfortable_coverage: 1.5,
            loan_minimum_coverage: 1.0,
            expansion_max_payback_months: 24.0,
            expansion_min_savings_share: 0.5,
        }
    }
}
