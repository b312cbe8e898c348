use super::super::domain::{Intent, Verdict};
use super::rules::ThresholdCheck;

fn subject(intent: Intent) -> &'static str {
    match intent {
        Intent::Hiring => "new hire",
        Intent::Inventory => "inventory purchase",
        Intent::Marketing => "marketing spend",
        Intent::Savings => "savings plan",
        Intent::Equipment => "equipment purchase",
        Intent::LoanManagement => "current loan repayments",
        Intent::BusinessExpansion => "expansion",
        Intent::GeneralAdvice | Intent::Unknown => "overall financial position",
    }
}

fn headline(intent: Intent, verdict: Verdict) -> String {
    let subject = subject(intent);
    match verdict {
        Verdict::Approve => format!("Your finances support the {subject}."),
        Verdict::Wait => {
            format!("Hold off on the {subject} for now; some thresholds are not met yet.")
        }
        Verdict::Reject => format!("Your finances do not support the {subject} right now."),
    }
}

/// Headline followed by the thresholds that were met and missed.
pub(crate) fn compose_reasoning(
    intent: Intent,
    verdict: Verdict,
    checks: &[ThresholdCheck],
) -> String {
    let (met, unmet): (Vec<&ThresholdCheck>, Vec<&ThresholdCheck>) =
        checks.iter().partition(|check| check.passed);

    let mut reasoning = headline(intent, verdict);
    if !met.is_empty() {
        let listed: Vec<&str> = met.iter().map(|check| check.description.as_str()).collect();
        reasoning.push_str(&format!(" Met: {}.", listed.join("; ")));
    }
    if !unmet.is_empty() {
        let listed: Vec<&str> = unmet
            .iter()
            .map(|check| check.description.as_str())
            .collect();
        reasoning.push_str(&format!(" Not met: {}.", listed.join("; ")));
    }
    reasoning
}

fn approval_steps(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Hiring => &[
            "Write the role description and pick a target start date.",
            "Set aside one month of the new payroll in a separate account before the start date.",
        ],
        Intent::Inventory => &[
            "Place the order and track sell-through weekly for the first month.",
        ],
        Intent::Marketing => &[
            "Launch with a fixed monthly cap and compare results against the budget after 30 days.",
        ],
        Intent::Savings => &[
            "Schedule an automatic monthly transfer into a dedicated savings account.",
        ],
        Intent::Equipment => &[
            "Collect at least two quotes and confirm warranty terms before buying.",
        ],
        Intent::LoanManagement => &[
            "Keep repayments current and consider extra payments on the highest-interest balance.",
        ],
        Intent::BusinessExpansion => &[
            "Draft a phased rollout plan with monthly revenue milestones.",
        ],
        Intent::GeneralAdvice | Intent::Unknown => &[
            "Keep reviewing revenue, expenses, and reserves every month.",
        ],
    }
}

/// Ordered actions: remedies for missed thresholds first, then follow-ups for the verdict.
/// Never empty.
pub(crate) fn next_steps(intent: Intent, verdict: Verdict, checks: &[ThresholdCheck]) -> Vec<String> {
    let mut steps: Vec<String> = checks
        .iter()
        .filter(|check| !check.passed)
        .filter_map(|check| check.remedy.clone())
        .collect();

    match verdict {
        Verdict::Approve => {
            steps.extend(approval_steps(intent).iter().map(|step| step.to_string()));
        }
        Verdict::Wait => {
            steps.push("Re-run this check after next month's figures are in.".to_string());
        }
        Verdict::Reject => {
            steps.push("Focus on stabilising monthly cash flow before new commitments.".to_string());
            steps.push("Re-run this check once net income is consistently positive.".to_string());
        }
    }

    steps
}
