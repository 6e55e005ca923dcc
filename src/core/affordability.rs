use super::types::{AffordabilitySummary, ProjectionInputs, YearRecord};

pub fn monthly_payment(principal: f64, annual_rate_pct: f64, term_years: u32) -> f64 {
    let n = payment_count(term_years);
    if n == 0.0 {
        return principal;
    }
    let r = monthly_rate(annual_rate_pct);
    if r == 0.0 {
        return principal / n;
    }
    let compounded = (1.0 + r).powf(n);
    principal * (r * compounded) / (compounded - 1.0)
}

pub fn max_principal_for_payment(payment: f64, annual_rate_pct: f64, term_years: u32) -> f64 {
    let n = payment_count(term_years);
    if n == 0.0 {
        return 0.0;
    }
    let r = monthly_rate(annual_rate_pct);
    if r == 0.0 {
        return payment * n;
    }
    let compounded = (1.0 + r).powf(n);
    payment * ((compounded - 1.0) / (r * compounded))
}

pub fn affordability(records: &[YearRecord], inputs: &ProjectionInputs) -> AffordabilitySummary {
    let first_year_gross_monthly = records.first().map_or(0.0, |year| year.gross / 12.0);
    let dti_payment_cap = first_year_gross_monthly * (inputs.dti_cap / 100.0);
    let max_affordable_mortgage =
        max_principal_for_payment(dti_payment_cap, inputs.mortgage_rate, inputs.mortgage_term)
            .max(0.0);

    let final_net_worth = records.last().map_or(0.0, |year| year.ending_net_worth);
    let down_payment_fraction = inputs.down_payment_pct / 100.0;
    let projected_down_payment_capital = final_net_worth.max(0.0) * down_payment_fraction;

    let dti_constrained_price = dti_constrained_price(max_affordable_mortgage, down_payment_fraction);
    let asset_constrained_price =
        projected_down_payment_capital / nonzero_or_one(down_payment_fraction);
    let affordable_home_price = dti_constrained_price.min(asset_constrained_price).max(0.0);

    let candidate_monthly_payment = monthly_payment(
        inputs.candidate_mortgage,
        inputs.mortgage_rate,
        inputs.mortgage_term,
    );
    let candidate_housing_cost =
        candidate_monthly_payment + pti_overlay(inputs, down_payment_fraction);
    let candidate_dti = (first_year_gross_monthly != 0.0)
        .then(|| candidate_housing_cost / first_year_gross_monthly * 100.0);

    AffordabilitySummary {
        first_year_gross_monthly,
        dti_payment_cap,
        max_affordable_mortgage,
        affordable_home_price,
        projected_down_payment_capital,
        candidate_monthly_payment,
        candidate_housing_cost,
        candidate_dti,
        final_net_worth,
    }
}

fn monthly_rate(annual_rate_pct: f64) -> f64 {
    annual_rate_pct / 100.0 / 12.0
}

fn payment_count(term_years: u32) -> f64 {
    f64::from(term_years) * 12.0
}

fn nonzero_or_one(divisor: f64) -> f64 {
    if divisor == 0.0 { 1.0 } else { divisor }
}

fn dti_constrained_price(max_mortgage: f64, down_payment_fraction: f64) -> f64 {
    let financed_share = 1.0 - down_payment_fraction;
    if financed_share <= 0.0 {
        // Nothing is borrowed, so the DTI cap cannot bind.
        return f64::INFINITY;
    }
    max_mortgage / financed_share
}

fn pti_overlay(inputs: &ProjectionInputs, down_payment_fraction: f64) -> f64 {
    let implied_price = inputs.candidate_mortgage / nonzero_or_one(1.0 - down_payment_fraction);
    implied_price * (inputs.pti_pct / 100.0) / 12.0
}
