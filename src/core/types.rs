use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInputs {
    pub salary: f64,
    pub bonus: f64,
    pub deferred: f64,
    pub income_growth: f64,
    pub tax_rate: f64,
    pub annual_spend: f64,
    pub savings: f64,
    pub years: u32,
    pub equity_mix: f64,
    pub portfolio_return: f64,
    pub equity_shock: f64,
    // 1-indexed year the shock lands in; 0 never matches.
    pub shock_year: u32,
    pub mortgage_rate: f64,
    pub mortgage_term: u32,
    pub dti_cap: f64,
    pub down_payment_pct: f64,
    pub pti_pct: f64,
    pub candidate_mortgage: f64,
}

impl ProjectionInputs {
    pub fn base_compensation(&self) -> f64 {
        self.salary + self.bonus + self.deferred
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensationScheduleEntry {
    pub salary: f64,
    pub bonus: f64,
    pub deferred: f64,
}

impl CompensationScheduleEntry {
    pub fn total(self) -> f64 {
        self.salary + self.bonus + self.deferred
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixScheduleEntry {
    pub asset: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub gross: f64,
    pub after_tax: f64,
    pub spend: f64,
    pub investment_return: f64,
    pub ending_net_worth: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilitySummary {
    pub first_year_gross_monthly: f64,
    pub dti_payment_cap: f64,
    pub max_affordable_mortgage: f64,
    pub affordable_home_price: f64,
    pub projected_down_payment_capital: f64,
    pub candidate_monthly_payment: f64,
    pub candidate_housing_cost: f64,
    // `None` when first-year gross income is zero.
    pub candidate_dti: Option<f64>,
    pub final_net_worth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub years: Vec<YearRecord>,
    pub summary: AffordabilitySummary,
}
