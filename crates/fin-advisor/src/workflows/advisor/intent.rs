use super::domain::Intent;

/// Keyword rule; a question matches when it contains any keyword.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
}

// Priority order: the first matching rule wins.
const STANDARD_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::Hiring,
        keywords: &["hire", "hiring", "staff", "employee", "recruit", "payroll"],
    },
    IntentRule {
        intent: Intent::LoanManagement,
        keywords: &["loan", "borrow", "debt", "credit line", "repay"],
    },
    IntentRule {
        intent: Intent::Inventory,
        keywords: &["inventory", "stock", "restock", "supplies"],
    },
    IntentRule {
        intent: Intent::Marketing,
        keywords: &["marketing", "advertis", "promot", "campaign"],
    },
    IntentRule {
        intent: Intent::Equipment,
        keywords: &["equipment", "machine", "vehicle", "laptop", "tools"],
    },
    IntentRule {
        intent: Intent::BusinessExpansion,
        keywords: &["expand", "expansion", "new location", "open a branch", "grow"],
    },
    IntentRule {
        intent: Intent::Savings,
        keywords: &["save", "saving", "emergency fund", "reserve"],
    },
    IntentRule {
        intent: Intent::GeneralAdvice,
        keywords: &[
            "should i",
            "advice",
            "finances",
            "financial health",
            "how is my business",
        ],
    },
];

/// Deterministic keyword matcher mapping question text to an [`Intent`].
#[derive(Debug, Clone, Copy)]
pub struct IntentResolver {
    rules: &'static [IntentRule],
}

impl Default for IntentResolver {
    fn default() -> Self {
        Self::standard()
    }
}

impl IntentResolver {
    pub fn standard() -> Self {
        Self::with_rules(STANDARD_RULES)
    }

    pub fn with_rules(rules: &'static [IntentRule]) -> Self {
        Self { rules }
    }

    pub fn resolve(&self, question: &str) -> Intent {
        let question = question.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|keyword| question.contains(keyword)))
            .map(|rule| rule.intent)
            .unwrap_or(Intent::Unknown)
    }

    /// Honour an explicit, recognised intent from the caller; otherwise resolve the text.
    pub fn resolve_with_hint(&self, hint: Option<&str>, question: &str) -> Intent {
        match hint.and_then(Intent::from_label) {
            Some(intent) if intent.is_known() => intent,
            _ => self.resolve(question),
        }
    }
}
