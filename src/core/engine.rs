use super::affordability::affordability;
use super::error::ProjectionError;
use super::types::{
    AffordabilitySummary, CompensationScheduleEntry, MixScheduleEntry, ProjectionInputs,
    ScenarioResult, YearRecord,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Schedules<'a> {
    pub compensation: Option<&'a [CompensationScheduleEntry]>,
    pub mix: Option<&'a [MixScheduleEntry]>,
}

pub fn project(
    inputs: &ProjectionInputs,
    compensation: Option<&[CompensationScheduleEntry]>,
    mix: Option<&[MixScheduleEntry]>,
) -> Vec<YearRecord> {
    let mut records = Vec::new();
    // The mix schedule is not year-indexed: one weight covers the whole run.
    let equity_weight = equity_weight_pct(inputs, mix) / 100.0;
    let mut net_worth = inputs.savings;

    for year_index in 0..inputs.years {
        let gross = gross_for_year(inputs, compensation, year_index);
        let after_tax = gross * (1.0 - inputs.tax_rate / 100.0);
        let effective_return = effective_return_for_year(inputs, equity_weight, year_index);

        let cash_surplus = after_tax - inputs.annual_spend;
        let investment_return = growth_principal(net_worth) * effective_return;
        net_worth += cash_surplus + investment_return;

        records.push(YearRecord {
            year: year_index + 1,
            gross,
            after_tax,
            spend: inputs.annual_spend,
            investment_return,
            ending_net_worth: net_worth,
        });
    }

    records
}

pub fn run_scenario(
    inputs: &ProjectionInputs,
    schedules: Schedules<'_>,
) -> Result<ScenarioResult, ProjectionError> {
    let years = project(inputs, schedules.compensation, schedules.mix);
    let summary = affordability(&years, inputs);
    ensure_finite(&years, &summary)?;
    tracing::debug!(
        years = years.len(),
        final_net_worth = summary.final_net_worth,
        affordable_home_price = summary.affordable_home_price,
        "projection complete"
    );
    Ok(ScenarioResult { years, summary })
}

pub fn ensure_finite(
    years: &[YearRecord],
    summary: &AffordabilitySummary,
) -> Result<(), ProjectionError> {
    for record in years {
        for (field, value) in [
            ("gross", record.gross),
            ("afterTax", record.after_tax),
            ("spend", record.spend),
            ("investmentReturn", record.investment_return),
            ("endingNetWorth", record.ending_net_worth),
        ] {
            if !value.is_finite() {
                return Err(ProjectionError::NonFiniteYear {
                    year: record.year,
                    field,
                });
            }
        }
    }

    for (field, value) in [
        ("firstYearGrossMonthly", summary.first_year_gross_monthly),
        ("dtiPaymentCap", summary.dti_payment_cap),
        ("maxAffordableMortgage", summary.max_affordable_mortgage),
        ("affordableHomePrice", summary.affordable_home_price),
        (
            "projectedDownPaymentCapital",
            summary.projected_down_payment_capital,
        ),
        ("candidateMonthlyPayment", summary.candidate_monthly_payment),
        ("candidateHousingCost", summary.candidate_housing_cost),
        ("candidateDti", summary.candidate_dti.unwrap_or(0.0)),
        ("finalNetWorth", summary.final_net_worth),
    ] {
        if !value.is_finite() {
            return Err(ProjectionError::NonFiniteSummary { field });
        }
    }
    Ok(())
}

fn gross_for_year(
    inputs: &ProjectionInputs,
    compensation: Option<&[CompensationScheduleEntry]>,
    year_index: u32,
) -> f64 {
    if let Some(entry) = compensation.and_then(|rows| rows.get(year_index as usize)) {
        return entry.total();
    }
    compounded_compensation(inputs.base_compensation(), inputs.income_growth, year_index)
}

fn compounded_compensation(base: f64, growth_pct: f64, year_index: u32) -> f64 {
    base * (1.0 + growth_pct / 100.0).powf(year_index as f64)
}

fn equity_weight_pct(inputs: &ProjectionInputs, mix: Option<&[MixScheduleEntry]>) -> f64 {
    mix.and_then(|rows| {
        rows.iter()
            .find(|row| row.asset.eq_ignore_ascii_case("equity"))
    })
    .and_then(|row| row.weight)
    .unwrap_or(inputs.equity_mix)
}

fn effective_return_for_year(
    inputs: &ProjectionInputs,
    equity_weight: f64,
    year_index: u32,
) -> f64 {
    let shock = if year_index + 1 == inputs.shock_year {
        inputs.equity_shock / 100.0
    } else {
        0.0
    };
    inputs.portfolio_return / 100.0 + equity_weight * shock
}

fn growth_principal(net_worth: f64) -> f64 {
    // A deficit earns nothing; losses flow through cash surplus only.
    if net_worth > 0.0 { net_worth } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::option;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> ProjectionInputs {
        ProjectionInputs {
            salary: 100_000.0,
            bonus: 0.0,
            deferred: 0.0,
            income_growth: 0.0,
            tax_rate: 20.0,
            annual_spend: 50_000.0,
            savings: 10_000.0,
            years: 1,
            equity_mix: 60.0,
            portfolio_return: 5.0,
            equity_shock: 0.0,
            shock_year: 0,
            mortgage_rate: 6.0,
            mortgage_term: 30,
            dti_cap: 36.0,
            down_payment_pct: 20.0,
            pti_pct: 1.5,
            candidate_mortgage: 400_000.0,
        }
    }

    fn effective_return_of(prev_net_worth: f64, record: &YearRecord) -> f64 {
        record.investment_return / prev_net_worth
    }

    #[test]
    fn oracle_single_year_matches_hand_calculation() {
        let records = project(&sample_inputs(), None, None);

        assert_eq!(records.len(), 1);
        let year = records[0];
        assert_eq!(year.year, 1);
        assert_approx(year.gross, 100_000.0);
        assert_approx(year.after_tax, 80_000.0);
        assert_approx(year.spend, 50_000.0);
        assert_approx(year.investment_return, 500.0);
        assert_approx(year.ending_net_worth, 40_500.0);
    }

    #[test]
    fn zero_years_yields_empty_projection() {
        let mut inputs = sample_inputs();
        inputs.years = 0;
        assert!(project(&inputs, None, None).is_empty());
    }

    #[test]
    fn growth_compounds_on_total_compensation() {
        let mut inputs = sample_inputs();
        inputs.salary = 80_000.0;
        inputs.bonus = 15_000.0;
        inputs.deferred = 5_000.0;
        inputs.income_growth = 10.0;
        inputs.years = 3;

        let records = project(&inputs, None, None);
        assert_approx(records[0].gross, 100_000.0);
        assert_approx(records[1].gross, 110_000.0);
        assert_approx(records[2].gross, 121_000.0);
    }

    #[test]
    fn compensation_schedule_replaces_growth_for_covered_years_only() {
        let mut inputs = sample_inputs();
        inputs.income_growth = 10.0;
        inputs.years = 3;
        let schedule = [
            CompensationScheduleEntry {
                salary: 50_000.0,
                bonus: 5_000.0,
                deferred: 0.0,
            },
            CompensationScheduleEntry {
                salary: 0.0,
                bonus: 0.0,
                deferred: 1_000.0,
            },
        ];

        let records = project(&inputs, Some(&schedule), None);
        assert_approx(records[0].gross, 55_000.0);
        assert_approx(records[1].gross, 1_000.0);
        // Beyond the schedule the growth formula resumes at its own year index.
        assert_approx(records[2].gross, 121_000.0);
    }

    #[test]
    fn mix_schedule_equity_weight_matches_case_insensitively() {
        let mut inputs = sample_inputs();
        inputs.years = 2;
        inputs.equity_shock = -50.0;
        inputs.shock_year = 2;
        let mix = vec![
            MixScheduleEntry {
                asset: "Bonds".to_string(),
                weight: Some(60.0),
            },
            MixScheduleEntry {
                asset: "EQUITY".to_string(),
                weight: Some(40.0),
            },
        ];

        let records = project(&inputs, None, Some(&mix));
        let prev = records[0].ending_net_worth;
        // 0.05 + 0.40 * -0.50
        assert_approx(effective_return_of(prev, &records[1]), -0.15);
    }

    #[test]
    fn mix_schedule_without_equity_falls_back_to_default_mix() {
        let mut inputs = sample_inputs();
        inputs.years = 1;
        inputs.equity_shock = -50.0;
        inputs.shock_year = 1;
        let mix = vec![
            MixScheduleEntry {
                asset: "cash".to_string(),
                weight: Some(100.0),
            },
            MixScheduleEntry {
                asset: "equity".to_string(),
                weight: None,
            },
        ];

        let records = project(&inputs, None, Some(&mix));
        // 0.05 + 0.60 * -0.50
        assert_approx(effective_return_of(10_000.0, &records[0]), -0.25);
    }

    #[test]
    fn shock_lands_only_in_its_year() {
        let mut inputs = sample_inputs();
        inputs.years = 4;
        inputs.equity_shock = -30.0;
        inputs.shock_year = 3;

        let records = project(&inputs, None, None);
        let mut prev = inputs.savings;
        for record in &records {
            let expected = if record.year == 3 { 0.05 + 0.6 * -0.30 } else { 0.05 };
            assert_approx(effective_return_of(prev, record), expected);
            prev = record.ending_net_worth;
        }
    }

    #[test]
    fn negative_net_worth_earns_no_investment_return() {
        let mut inputs = sample_inputs();
        inputs.savings = -20_000.0;
        inputs.years = 2;
        inputs.annual_spend = 90_000.0;

        let records = project(&inputs, None, None);
        assert_approx(records[0].investment_return, 0.0);
        assert_approx(records[0].ending_net_worth, -30_000.0);
        assert_approx(records[1].investment_return, 0.0);
        assert_approx(records[1].ending_net_worth, -40_000.0);
    }

    #[test]
    fn run_scenario_rejects_overflowing_growth() {
        let mut inputs = sample_inputs();
        inputs.income_growth = 1.0e6;
        inputs.years = 150;

        let err = run_scenario(&inputs, Schedules::default()).expect_err("must overflow");
        assert!(matches!(err, ProjectionError::NonFiniteYear { field: "gross", .. }));
    }

    #[test]
    fn run_scenario_pairs_records_with_summary() {
        let mut inputs = sample_inputs();
        inputs.years = 5;
        let result = run_scenario(&inputs, Schedules::default()).expect("finite scenario");
        assert_eq!(result.years.len(), 5);
        assert_approx(
            result.summary.final_net_worth,
            result.years[4].ending_net_worth,
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_net_worth_recurrence_holds_every_year(
            salary in 0u32..400_000,
            bonus in 0u32..100_000,
            savings in -200_000i32..1_000_000,
            spend in 0u32..250_000,
            years in 1u32..40,
            growth_bp in -500i32..1_500,
            tax_bp in 0u32..6_000,
            return_bp in -1_000i32..1_500,
            equity_bp in 0u32..10_001,
            shock_bp in -6_000i32..3_000,
            shock_year in 0u32..45,
            scheduled_pay in option::of(vec(0u32..300_000, 0..12)),
            mix_weight_bp in option::of(option::of(0u32..10_001))
        ) {
            let mut inputs = sample_inputs();
            inputs.salary = salary as f64;
            inputs.bonus = bonus as f64;
            inputs.savings = savings as f64;
            inputs.annual_spend = spend as f64;
            inputs.years = years;
            inputs.income_growth = growth_bp as f64 / 100.0;
            inputs.tax_rate = tax_bp as f64 / 100.0;
            inputs.portfolio_return = return_bp as f64 / 100.0;
            inputs.equity_mix = equity_bp as f64 / 100.0;
            inputs.equity_shock = shock_bp as f64 / 100.0;
            inputs.shock_year = shock_year;

            let compensation: Option<Vec<CompensationScheduleEntry>> = scheduled_pay.map(|pay| {
                pay.into_iter()
                    .map(|salary| CompensationScheduleEntry {
                        salary: salary as f64,
                        ..CompensationScheduleEntry::default()
                    })
                    .collect()
            });
            let mix: Option<Vec<MixScheduleEntry>> = mix_weight_bp.map(|weight| {
                vec![
                    MixScheduleEntry { asset: "bonds".to_string(), weight: Some(100.0) },
                    MixScheduleEntry {
                        asset: "Equity".to_string(),
                        weight: weight.map(|bp| bp as f64 / 100.0),
                    },
                ]
            });
            let resolved_equity_pct = mix
                .as_ref()
                .and_then(|rows| rows[1].weight)
                .unwrap_or(inputs.equity_mix);

            let records = project(&inputs, compensation.as_deref(), mix.as_deref());
            prop_assert!(records.len() == years as usize);

            let mut prev = inputs.savings;
            for (idx, record) in records.iter().enumerate() {
                prop_assert!(record.year == idx as u32 + 1);
                if let Some(entry) = compensation.as_ref().and_then(|rows| rows.get(idx)) {
                    prop_assert!(record.gross == entry.total());
                }
                let shock = if record.year == shock_year { inputs.equity_shock / 100.0 } else { 0.0 };
                let effective = inputs.portfolio_return / 100.0 + resolved_equity_pct / 100.0 * shock;
                let surplus = record.after_tax - record.spend;
                let growth = prev.max(0.0) * effective;
                let expected = prev + surplus + growth;
                let tol = 1e-9 * (prev.abs() + surplus.abs() + growth.abs()).max(1.0);
                prop_assert!((record.ending_net_worth - expected).abs() <= tol);
                prev = record.ending_net_worth;
            }
        }

        #[test]
        fn prop_zero_growth_keeps_gross_constant(
            salary in 0u32..500_000,
            bonus in 0u32..200_000,
            deferred in 0u32..100_000,
            years in 1u32..60
        ) {
            let mut inputs = sample_inputs();
            inputs.salary = salary as f64;
            inputs.bonus = bonus as f64;
            inputs.deferred = deferred as f64;
            inputs.income_growth = 0.0;
            inputs.years = years;

            let expected = inputs.base_compensation();
            for record in project(&inputs, None, None) {
                prop_assert!(record.gross == expected);
            }
        }
    }

    #[test]
    fn schedule_gross_ignores_nonzero_growth() {
        let mut inputs = sample_inputs();
        inputs.income_growth = 25.0;
        inputs.years = 3;
        let schedule = vec![CompensationScheduleEntry {
            salary: 70_000.0,
            bonus: 7_000.0,
            deferred: 3_000.0,
        }; 3];

        for record in project(&inputs, Some(&schedule), None) {
            assert_approx_tol(record.gross, 80_000.0, 1e-9);
        }
    }
}
