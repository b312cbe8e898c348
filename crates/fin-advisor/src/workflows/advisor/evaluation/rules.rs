use super::super::domain::{Intent, Payload, Verdict};
use super::super::health::{self, safe_ratio, Financials, HealthBand};
use super::super::slots::fields;
use super::config::EvaluationConfig;
use super::EvaluationError;

/// One threshold comparison, reported back in the reasoning whether it passed or not.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ThresholdCheck {
    pub passed: bool,
    pub description: String,
    pub remedy: Option<String>,
}

fn check(passed: bool, description: String, remedy: &str) -> ThresholdCheck {
    ThresholdCheck {
        passed,
        description,
        remedy: Some(remedy.to_string()),
    }
}

pub(crate) struct RuleOutcome {
    pub verdict: Verdict,
    pub checks: Vec<ThresholdCheck>,
    pub extras: Vec<(&'static str, f64)>,
}

fn amount(value: f64) -> String {
    format!("{value:.0}")
}

fn required_number(payload: &Payload, field: &'static str) -> Result<f64, EvaluationError> {
    payload
        .number(field)
        .ok_or(EvaluationError::MissingField(field))
}

fn required_flag(payload: &Payload, field: &'static str) -> Result<bool, EvaluationError> {
    payload
        .flag(field)
        .ok_or(EvaluationError::MissingField(field))
}

fn required_choice<'a>(
    payload: &'a Payload,
    field: &'static str,
) -> Result<&'a str, EvaluationError> {
    payload
        .choice(field)
        .ok_or(EvaluationError::MissingField(field))
}

/// Loss-making businesses are rejected; otherwise every check must pass to approve.
fn graded(net_income: f64, checks: &[ThresholdCheck]) -> Verdict {
    if net_income <= 0.0 {
        Verdict::Reject
    } else if checks.iter().all(|check| check.passed) {
        Verdict::Approve
    } else {
        Verdict::Wait
    }
}

pub(crate) fn apply(
    intent: Intent,
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    match intent {
        Intent::Hiring => hiring(payload, financials, config),
        Intent::Inventory => inventory(payload, financials, config),
        Intent::Marketing => marketing(payload, financials, config),
        Intent::Savings => savings(payload, financials),
        Intent::Equipment => equipment(payload, financials, config),
        Intent::LoanManagement => loan_management(payload, financials, config),
        Intent::BusinessExpansion => business_expansion(payload, financials, config),
        Intent::GeneralAdvice => Ok(general_advice(financials)),
        Intent::Unknown => Err(EvaluationError::UnsupportedIntent(intent)),
    }
}

fn hiring(
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    let payroll = required_number(payload, fields::STAFF_PAYROLL)?;
    let net_income = financials.net_income();
    let savings = financials.current_savings;
    let required_net = config.hiring_net_income_multiple * payroll;

    let checks = vec![
        check(
            net_income >= required_net,
            format!(
                "net income ({}) is at least {:.1}x the proposed payroll ({} needed)",
                amount(net_income),
                config.hiring_net_income_multiple,
                amount(required_net)
            ),
            "Grow monthly net income or start with a part-time or lower-cost hire.",
        ),
        check(
            savings >= payroll,
            format!(
                "savings ({}) cover one month of the proposed payroll ({})",
                amount(savings),
                amount(payroll)
            ),
            "Build savings to cover at least one month of the new payroll before hiring.",
        ),
    ];

    Ok(RuleOutcome {
        verdict: graded(net_income, &checks),
        checks,
        extras: vec![
            ("proposed_payroll", payroll),
            ("required_net_income", required_net),
            ("payroll_coverage", safe_ratio(net_income, payroll)),
        ],
    })
}

fn inventory(
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    let cost = required_number(payload, fields::INVENTORY_COST)?;
    let stock_type = required_choice(payload, fields::STOCK_TYPE)?;
    let net_income = financials.net_income();
    let savings = financials.current_savings;
    let savings_after = savings - cost;
    let reserve_needed = financials.monthly_expenses * config.inventory_reserve_months;

    let mut checks = vec![
        check(
            net_income > 0.0,
            format!(
                "the business is cash-flow positive (net income {})",
                amount(net_income)
            ),
            "Cut costs or raise prices until monthly net income is positive.",
        ),
        check(
            savings_after >= reserve_needed,
            format!(
                "savings after the purchase ({}) still cover {:.0} month(s) of expenses ({})",
                amount(savings_after),
                config.inventory_reserve_months,
                amount(reserve_needed)
            ),
            "Buy a smaller initial quantity so reserves stay above your monthly expenses.",
        ),
    ];
    if stock_type.eq_ignore_ascii_case("perishable") {
        checks.push(check(
            net_income >= cost,
            format!(
                "monthly net income ({}) covers the perishable stock ({})",
                amount(net_income),
                amount(cost)
            ),
            "Order perishable stock in smaller, more frequent batches.",
        ));
    }

    let verdict = if checks.iter().all(|check| check.passed) {
        Verdict::Approve
    } else if net_income > 0.0 || savings >= cost {
        Verdict::Wait
    } else {
        Verdict::Reject
    };

    Ok(RuleOutcome {
        verdict,
        checks,
        extras: vec![
            ("inventory_cost", cost),
            ("savings_after_purchase", savings_after),
        ],
    })
}

fn marketing(
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    let budget = required_number(payload, fields::MARKETING_BUDGET)?;
    let tracked = required_flag(payload, fields::TRACKS_CAMPAIGN_RESULTS)?;
    let net_income = financials.net_income();
    let share = safe_ratio(budget, financials.monthly_revenue);

    let checks = vec![
        check(
            net_income > budget,
            format!(
                "net income ({}) exceeds the marketing budget ({})",
                amount(net_income),
                amount(budget)
            ),
            "Start with a smaller test budget that net income can absorb.",
        ),
        check(
            share <= config.marketing_max_revenue_share,
            format!(
                "the budget is {:.1}% of revenue (limit {:.0}%)",
                share * 100.0,
                config.marketing_max_revenue_share * 100.0
            ),
            "Keep marketing spend within the share of monthly revenue you can sustain.",
        ),
        check(
            tracked,
            "campaign results are tracked".to_string(),
            "Set up result tracking (promo codes, tagged links) before increasing spend.",
        ),
    ];

    Ok(RuleOutcome {
        verdict: graded(net_income, &checks),
        checks,
        extras: vec![
            ("marketing_budget", budget),
            ("budget_share_of_revenue", share * 100.0),
        ],
    })
}

fn savings(payload: &Payload, financials: &Financials) -> Result<RuleOutcome, EvaluationError> {
    let goal = required_number(payload, fields::SAVINGS_GOAL)?;
    let months = required_number(payload, fields::MONTHS_TO_GOAL)?;
    let net_income = financials.net_income();
    let savings = financials.current_savings;
    let gap = (goal - savings).max(0.0);
    let monthly_needed = safe_ratio(gap, months);

    let goal_met = savings >= goal;
    let contribution_covered = net_income > 0.0 && net_income >= monthly_needed;
    let checks = vec![
        ThresholdCheck {
            passed: goal_met,
            description: format!(
                "current savings ({}) already meet the goal ({})",
                amount(savings),
                amount(goal)
            ),
            remedy: None,
        },
        check(
            contribution_covered,
            format!(
                "net income ({}) covers the monthly contribution needed ({})",
                amount(net_income),
                amount(monthly_needed)
            ),
            "Extend the timeline or trim expenses to free up the monthly contribution.",
        ),
    ];

    let verdict = if goal_met || contribution_covered {
        Verdict::Approve
    } else if net_income > 0.0 {
        Verdict::Wait
    } else {
        Verdict::Reject
    };

    Ok(RuleOutcome {
        verdict,
        checks,
        extras: vec![
            ("savings_goal", goal),
            ("savings_gap", gap),
            ("monthly_contribution_needed", monthly_needed),
        ],
    })
}

fn equipment(
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    let cost = required_number(payload, fields::EQUIPMENT_COST)?;
    let method = required_choice(payload, fields::PAYMENT_METHOD)?.to_ascii_lowercase();
    let net_income = financials.net_income();

    let mut extras = vec![("equipment_cost", cost)];
    let checks = if method == "cash" {
        let savings_after = financials.current_savings - cost;
        let reserve_needed = financials.monthly_expenses * config.equipment_reserve_months;
        extras.push(("savings_after_purchase", savings_after));
        vec![check(
            savings_after >= reserve_needed,
            format!(
                "savings after paying cash ({}) keep {:.0} months of expenses ({}) in reserve",
                amount(savings_after),
                config.equipment_reserve_months,
                amount(reserve_needed)
            ),
            "Consider financing or leasing so cash reserves stay intact.",
        )]
    } else {
        let term = if method == "lease" {
            config.equipment_lease_term_months
        } else {
            config.equipment_loan_term_months
        };
        let payment = safe_ratio(cost, term);
        extras.push(("estimated_monthly_payment", payment));
        vec![check(
            net_income >= config.equipment_payment_coverage * payment,
            format!(
                "net income ({}) is at least {:.1}x the estimated {} payment ({} per month over {:.0} months)",
                amount(net_income),
                config.equipment_payment_coverage,
                method,
                amount(payment),
                term
            ),
            "Look for a longer term or a cheaper model to lower the monthly payment.",
        )]
    };

    Ok(RuleOutcome {
        verdict: graded(net_income, &checks),
        checks,
        extras,
    })
}

fn loan_management(
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    let payment = required_number(payload, fields::MONTHLY_LOAN_PAYMENT)?;
    let debt = required_number(payload, fields::TOTAL_DEBT)?;
    let net_income = financials.net_income();
    let coverage = safe_ratio(net_income, payment);

    let checks = vec![
        check(
            coverage >= config.loan_minimum_coverage,
            format!(
                "net income covers the monthly repayment ({:.2}x, minimum {:.1}x)",
                coverage, config.loan_minimum_coverage
            ),
            "Contact your lender about restructuring before repayments fall behind.",
        ),
        check(
            coverage >= config.loan_comfortable_coverage,
            format!(
                "debt service coverage ({:.2}x) is at least {:.1}x",
                coverage, config.loan_comfortable_coverage
            ),
            "Reduce other expenses or refinance to lower the monthly repayment.",
        ),
    ];

    let verdict = if coverage >= config.loan_comfortable_coverage {
        Verdict::Approve
    } else if coverage >= config.loan_minimum_coverage {
        Verdict::Wait
    } else {
        Verdict::Reject
    };

    let mut extras = vec![
        ("monthly_loan_payment", payment),
        ("debt_service_coverage", coverage),
        ("months_to_repay", safe_ratio(debt, payment)),
    ];
    if let Some(rate) = payload.number(fields::INTEREST_RATE) {
        extras.push(("interest_rate", rate));
    }

    Ok(RuleOutcome {
        verdict,
        checks,
        extras,
    })
}

fn business_expansion(
    payload: &Payload,
    financials: &Financials,
    config: &EvaluationConfig,
) -> Result<RuleOutcome, EvaluationError> {
    let cost = required_number(payload, fields::EXPANSION_COST)?;
    let increase = required_number(payload, fields::EXPECTED_REVENUE_INCREASE)?;
    let net_income = financials.net_income();
    let savings = financials.current_savings;
    let payback_months = safe_ratio(cost, increase);
    let savings_needed = cost * config.expansion_min_savings_share;

    let checks = vec![
        check(
            savings >= savings_needed,
            format!(
                "savings ({}) cover {:.0}% of the expansion cost ({})",
                amount(savings),
                config.expansion_min_savings_share * 100.0,
                amount(savings_needed)
            ),
            "Save toward the expansion or phase it to reduce the up-front cost.",
        ),
        check(
            increase > 0.0 && payback_months <= config.expansion_max_payback_months,
            format!(
                "the payback period ({:.1} months) is within {:.0} months",
                payback_months, config.expansion_max_payback_months
            ),
            "Validate the revenue projection or lower the cost to shorten the payback period.",
        ),
    ];

    Ok(RuleOutcome {
        verdict: graded(net_income, &checks),
        checks,
        extras: vec![
            ("expansion_cost", cost),
            ("expected_revenue_increase", increase),
            ("payback_months", payback_months),
        ],
    })
}

fn general_advice(financials: &Financials) -> RuleOutcome {
    let health = health::score(financials);
    let net_income = financials.net_income();
    let runway = financials.runway_months();
    let exposure = financials.debt_exposure();

    let checks = vec![
        check(
            net_income > 0.0,
            format!("monthly net income is positive ({})", amount(net_income)),
            "Review pricing and the largest expense lines to restore profitability.",
        ),
        check(
            runway >= 3.0,
            format!("savings cover {runway:.1} months of expenses (target 3)"),
            "Build an emergency reserve of at least three months of expenses.",
        ),
        check(
            exposure <= 0.5,
            format!(
                "debt is {:.0}% of annual revenue (target at most 50%)",
                exposure * 100.0
            ),
            "Prioritise paying down the highest-interest debt.",
        ),
    ];

    let verdict = match health.band {
        HealthBand::Stable => Verdict::Approve,
        HealthBand::Caution => Verdict::Wait,
        HealthBand::Risky => Verdict::Reject,
    };

    RuleOutcome {
        verdict,
        checks,
        extras: vec![("runway_months", runway)],
    }
}
