//! Static slot schema per intent.
//!
//! Order matters: the dialogue asks for missing required fields in exactly the order they
//! appear here, so repeated conversations about the same intent are reproducible.

use serde::Serialize;

use super::domain::{Intent, Payload};

/// Payload keys shared between the registry and the rule evaluator.
pub mod fields {
    pub const MONTHLY_REVENUE: &str = "monthlyRevenue";
    pub const MONTHLY_EXPENSES: &str = "monthlyExpenses";
    pub const CURRENT_SAVINGS: &str = "currentSavings";
    pub const TOTAL_DEBT: &str = "totalDebt";
    pub const OWNER_WITHDRAWALS: &str = "ownerWithdrawals";
    pub const STAFF_PAYROLL: &str = "staffPayroll";
    pub const INVENTORY_COST: &str = "inventoryCost";
    pub const STOCK_TYPE: &str = "stockType";
    pub const MARKETING_BUDGET: &str = "marketingBudget";
    pub const TRACKS_CAMPAIGN_RESULTS: &str = "tracksCampaignResults";
    pub const SAVINGS_GOAL: &str = "savingsGoal";
    pub const MONTHS_TO_GOAL: &str = "monthsToGoal";
    pub const EQUIPMENT_COST: &str = "equipmentCost";
    pub const PAYMENT_METHOD: &str = "paymentMethod";
    pub const MONTHLY_LOAN_PAYMENT: &str = "monthlyLoanPayment";
    pub const INTEREST_RATE: &str = "interestRate";
    pub const EXPANSION_COST: &str = "expansionCost";
    pub const EXPECTED_REVENUE_INCREASE: &str = "expectedRevenueIncrease";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Number,
    Boolean,
    Enum,
}

impl SlotKind {
    /// Value of the `type` field in a `data_needed` response.
    pub const fn wire_label(self) -> &'static str {
        match self {
            SlotKind::Number => "number",
            SlotKind::Boolean => "boolean",
            SlotKind::Enum => "text_enum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotDefinition {
    pub field_name: &'static str,
    pub kind: SlotKind,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
    pub required: bool,
    pub zero_allowed: bool,
}

impl SlotDefinition {
    const fn number(field_name: &'static str, prompt: &'static str) -> Self {
        Self {
            field_name,
            kind: SlotKind::Number,
            prompt,
            options: &[],
            required: true,
            zero_allowed: false,
        }
    }

    const fn boolean(field_name: &'static str, prompt: &'static str) -> Self {
        Self {
            kind: SlotKind::Boolean,
            ..Self::number(field_name, prompt)
        }
    }

    const fn choice(
        field_name: &'static str,
        prompt: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            kind: SlotKind::Enum,
            options,
            ..Self::number(field_name, prompt)
        }
    }

    const fn allow_zero(self) -> Self {
        Self {
            zero_allowed: true,
            ..self
        }
    }

    const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }
}

const MONTHLY_REVENUE: SlotDefinition = SlotDefinition::number(
    fields::MONTHLY_REVENUE,
    "What is your average monthly revenue?",
)
.allow_zero();
const MONTHLY_EXPENSES: SlotDefinition = SlotDefinition::number(
    fields::MONTHLY_EXPENSES,
    "What are your average monthly operating expenses?",
);
const CURRENT_SAVINGS: SlotDefinition = SlotDefinition::number(
    fields::CURRENT_SAVINGS,
    "How much does the business currently hold in savings or cash reserves?",
)
.allow_zero();
const TOTAL_DEBT: SlotDefinition = SlotDefinition::number(
    fields::TOTAL_DEBT,
    "How much outstanding debt does the business carry?",
)
.allow_zero()
.optional();

const HIRING: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    SlotDefinition::number(
        fields::OWNER_WITHDRAWALS,
        "How much do you withdraw from the business for yourself each month?",
    )
    .allow_zero(),
    SlotDefinition::number(
        fields::STAFF_PAYROLL,
        "What monthly payroll cost do you expect for the new hire?",
    ),
    CURRENT_SAVINGS,
    TOTAL_DEBT,
];

const INVENTORY: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    CURRENT_SAVINGS,
    SlotDefinition::number(
        fields::INVENTORY_COST,
        "How much will the inventory purchase cost?",
    ),
    SlotDefinition::choice(
        fields::STOCK_TYPE,
        "What kind of stock is it?",
        &["perishable", "durable", "seasonal"],
    ),
    TOTAL_DEBT,
];

const MARKETING: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    CURRENT_SAVINGS,
    SlotDefinition::number(
        fields::MARKETING_BUDGET,
        "What monthly marketing budget are you considering?",
    ),
    SlotDefinition::boolean(
        fields::TRACKS_CAMPAIGN_RESULTS,
        "Do you track the results of your campaigns (yes or no)?",
    ),
    TOTAL_DEBT,
];

const SAVINGS: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    CURRENT_SAVINGS,
    SlotDefinition::number(fields::SAVINGS_GOAL, "What savings target are you aiming for?"),
    SlotDefinition::number(
        fields::MONTHS_TO_GOAL,
        "In how many months do you want to reach that target?",
    ),
    TOTAL_DEBT,
];

const EQUIPMENT: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    CURRENT_SAVINGS,
    SlotDefinition::number(fields::EQUIPMENT_COST, "How much does the equipment cost?"),
    SlotDefinition::choice(
        fields::PAYMENT_METHOD,
        "How do you plan to pay for it?",
        &["cash", "loan", "lease"],
    ),
    TOTAL_DEBT,
];

const LOAN_MANAGEMENT: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    CURRENT_SAVINGS,
    SlotDefinition::number(
        fields::TOTAL_DEBT,
        "How much do you owe in total across your loans?",
    ),
    SlotDefinition::number(
        fields::MONTHLY_LOAN_PAYMENT,
        "What is your total monthly loan repayment?",
    ),
    SlotDefinition::number(
        fields::INTEREST_RATE,
        "What annual interest rate are you paying (in percent)?",
    )
    .allow_zero()
    .optional(),
];

const BUSINESS_EXPANSION: &[SlotDefinition] = &[
    MONTHLY_REVENUE,
    MONTHLY_EXPENSES,
    CURRENT_SAVINGS,
    SlotDefinition::number(
        fields::EXPANSION_COST,
        "What is the total up-front cost of the expansion?",
    ),
    SlotDefinition::number(
        fields::EXPECTED_REVENUE_INCREASE,
        "How much additional monthly revenue do you expect from it?",
    ),
    TOTAL_DEBT,
];

const GENERAL_ADVICE: &[SlotDefinition] =
    &[MONTHLY_REVENUE, MONTHLY_EXPENSES, CURRENT_SAVINGS, TOTAL_DEBT];

/// Ordered slot list for an intent. `Unknown` has no slots and cannot proceed.
pub fn slots_for(intent: Intent) -> &'static [SlotDefinition] {
    match intent {
        Intent::Hiring => HIRING,
        Intent::Inventory => INVENTORY,
        Intent::Marketing => MARKETING,
        Intent::Savings => SAVINGS,
        Intent::Equipment => EQUIPMENT,
        Intent::LoanManagement => LOAN_MANAGEMENT,
        Intent::BusinessExpansion => BUSINESS_EXPANSION,
        Intent::GeneralAdvice => GENERAL_ADVICE,
        Intent::Unknown => &[],
    }
}

pub fn find_slot(intent: Intent, field: &str) -> Option<&'static SlotDefinition> {
    slots_for(intent)
        .iter()
        .find(|slot| slot.field_name == field)
}

/// Required slots absent from `payload`, in registry order.
pub fn missing_required(intent: Intent, payload: &Payload) -> Vec<&'static SlotDefinition> {
    slots_for(intent)
        .iter()
        .filter(|slot| slot.required && !payload.contains(slot.field_name))
        .collect()
}
