//! Property tests for the engine fold.
//!
//! Random timelines - including degenerate and unknown stages - must never
//! break the share-sum invariant, percent derivation, or determinism.

use captable_core::stages::convertible_note::ConvertibleNoteParams;
use captable_core::stages::exit::{ExitMode, ExitParams};
use captable_core::stages::founding::{FounderAllocation, FoundingParams};
use captable_core::stages::post_money_safe::PostMoneySafeParams;
use captable_core::stages::pre_money_safe::PreMoneySafeParams;
use captable_core::stages::priced_round::{OptionPoolRefresh, PricedRoundParams};
use captable_core::{run, RunOptions, Scenario, Stage, StageParams};
use proptest::prelude::*;

fn founding_stage_strategy() -> impl Strategy<Value = Stage> {
    (
        proptest::collection::vec(0u32..20_000_000, 0..4),
        0.0f64..1.2,
    )
        .prop_map(|(founder_shares, esop_percent)| {
            let founders = founder_shares
                .iter()
                .enumerate()
                .map(|(index, shares)| FounderAllocation {
                    id: format!("founder_{index}"),
                    name: format!("Founder {index}"),
                    shares: *shares as f64,
                })
                .collect();
            Stage::new(
                "stage_0",
                "Founding",
                StageParams::Founding(FoundingParams {
                    company_name: "NewCo".to_string(),
                    total_authorized_shares: 10_000_000.0,
                    esop_percent,
                    founders,
                }),
            )
        })
}

fn later_stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![
        (0.0f64..10_000_000.0, 0.0f64..1.0, 0.0f64..5.0, 0.0f64..50_000_000.0).prop_map(
            |(principal, rate, years, cap)| {
                Stage::new(
                    "stage_note",
                    "Convertible Note",
                    StageParams::ConvertibleNote(ConvertibleNoteParams {
                        investor_name: "Angel".to_string(),
                        principal,
                        interest_rate: rate,
                        accrual_years: years,
                        valuation_cap: cap,
                        discount: 0.2,
                        ..ConvertibleNoteParams::default()
                    }),
                )
            }
        ),
        (0.0f64..5_000_000.0, 0.0f64..1.0, 0.0f64..50_000_000.0).prop_map(
            |(investment, discount, cap)| {
                Stage::new(
                    "stage_presafe",
                    "Pre-Money SAFE",
                    StageParams::PreMoneySafe(PreMoneySafeParams {
                        investor_name: "Scout".to_string(),
                        investment,
                        discount,
                        valuation_cap: cap,
                        ..PreMoneySafeParams::default()
                    }),
                )
            }
        ),
        (0.0f64..5_000_000.0, 0.0f64..50_000_000.0).prop_map(|(investment, valuation)| {
            Stage::new(
                "stage_postsafe",
                "Post-Money SAFE",
                StageParams::PostMoneySafe(PostMoneySafeParams {
                    investor_name: "Seed Fund".to_string(),
                    investment,
                    post_money_valuation: valuation,
                    ..PostMoneySafeParams::default()
                }),
            )
        }),
        (
            0.0f64..20_000_000.0,
            0.0f64..100_000_000.0,
            any::<bool>(),
            0.0f64..0.9
        )
            .prop_map(|(investment, valuation, refresh, target)| {
                Stage::new(
                    "stage_round",
                    "Priced Round",
                    StageParams::PricedRound(PricedRoundParams {
                        round_name: "Series X".to_string(),
                        investor_name: "Lead".to_string(),
                        investment,
                        post_money_valuation: valuation,
                        security_class: "Preferred".to_string(),
                        holder_id: "lead".to_string(),
                        option_pool_refresh: OptionPoolRefresh {
                            enabled: refresh,
                            target_percent: target,
                        },
                    }),
                )
            }),
        (0.0f64..500_000_000.0, any::<bool>()).prop_map(|(price, ipo)| {
            Stage::new(
                "stage_exit",
                "Exit Event",
                StageParams::Exit(ExitParams {
                    sale_price: price,
                    mode: if ipo {
                        ExitMode::Ipo
                    } else {
                        ExitMode::MergerAcquisition
                    },
                    ipo_price_per_share: 10.0,
                }),
            )
        }),
        Just(Stage::new(
            "stage_mystery",
            "Mystery",
            StageParams::Unknown {
                kind: "SECONDARY_SALE".to_string(),
                params: serde_json::Value::Null,
            },
        )),
    ]
}

fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    (
        founding_stage_strategy(),
        proptest::collection::vec(later_stage_strategy(), 0..6),
    )
        .prop_map(|(founding, rest)| {
            let mut timeline = vec![founding];
            for (index, mut stage) in rest.into_iter().enumerate() {
                stage.id = format!("{}_{}", stage.id, index + 1);
                timeline.push(stage);
            }
            Scenario {
                id: "scenario_prop".to_string(),
                name: "Property Journey".to_string(),
                description: String::new(),
                timeline,
            }
        })
}

proptest! {
    #[test]
    fn share_sum_matches_total_after_every_stage(scenario in scenario_strategy()) {
        let result = run(&scenario, &RunOptions::default());

        let final_sum: u64 = result.cap_table.iter().map(|row| row.shares).sum();
        prop_assert_eq!(final_sum, result.total_shares);

        for stage_result in &result.stage_results {
            let table_sum: u64 = stage_result.cap_table.iter().map(|row| row.shares).sum();
            if table_sum > 0 {
                let percent_sum: f64 = stage_result.cap_table.iter().map(|row| row.percent).sum();
                prop_assert!((percent_sum - 1.0).abs() < 1e-6,
                    "percent sum {} for stage {}", percent_sum, stage_result.id);
            }
        }
    }

    #[test]
    fn identical_scenarios_produce_identical_results(scenario in scenario_strategy()) {
        let first = run(&scenario, &RunOptions::default());
        let second = run(&scenario, &RunOptions::default());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn truncated_runs_are_prefixes(scenario in scenario_strategy()) {
        let full = run(&scenario, &RunOptions::default());
        let until = scenario.timeline[0].id.clone();
        let truncated = run(&scenario, &RunOptions { until_stage_id: Some(until) });

        prop_assert!(truncated.stage_results.len() <= full.stage_results.len());
        prop_assert_eq!(&truncated.stage_results[0], &full.stage_results[0]);
    }
}
