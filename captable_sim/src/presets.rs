//! Preset scenario catalog for the CLI harness.
//!
//! Each preset is a pure factory: every call builds a fresh `Scenario`
//! with stable ids, so repeated runs (and Monte Carlo clones) never share
//! mutable state.

use captable_core::stages::convertible_note::ConvertibleNoteParams;
use captable_core::stages::exit::{ExitMode, ExitParams};
use captable_core::stages::founding::{FounderAllocation, FoundingParams};
use captable_core::stages::post_money_safe::PostMoneySafeParams;
use captable_core::stages::pre_money_safe::PreMoneySafeParams;
use captable_core::stages::priced_round::{OptionPoolRefresh, PricedRoundParams};
use captable_core::stages::{SpecialRights, SuperProRataConfig};
use captable_core::{Scenario, Stage, StageParams};

/// Preset identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetId {
    /// Founding only - the baseline cap table
    FoundingOnly,
    /// Two stacked post-money SAFEs into a seed round and an IPO
    SafeStack,
    /// Bridge note with super pro-rata rights across two priced rounds
    BridgeNote,
    /// The full journey: note + both SAFE flavors + Series A + sale
    SeedToExit,
    /// Degenerate inputs that exercise every warning path
    Degenerate,
}

impl PresetId {
    /// Returns all presets, in catalog order.
    pub fn all() -> Vec<PresetId> {
        vec![
            PresetId::FoundingOnly,
            PresetId::SafeStack,
            PresetId::BridgeNote,
            PresetId::SeedToExit,
            PresetId::Degenerate,
        ]
    }

    /// Returns the preset name.
    pub fn name(&self) -> &'static str {
        match self {
            PresetId::FoundingOnly => "founding_only",
            PresetId::SafeStack => "safe_stack",
            PresetId::BridgeNote => "bridge_note",
            PresetId::SeedToExit => "seed_to_exit",
            PresetId::Degenerate => "degenerate",
        }
    }

    /// Returns a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetId::FoundingOnly => "Founding stage only: 2 founders plus a 10% option pool",
            PresetId::SafeStack => "Two post-money SAFEs stacked before a seed round and IPO",
            PresetId::BridgeNote => "Bridge note with super pro-rata rights over two priced rounds",
            PresetId::SeedToExit => "Note + SAFEs + Series A + $250M sale, end to end",
            PresetId::Degenerate => "Zero-share founding and an unknown stage: warning showcase",
        }
    }

    /// Builds a fresh scenario for this preset.
    pub fn build(&self) -> Scenario {
        match self {
            PresetId::FoundingOnly => founding_only(),
            PresetId::SafeStack => safe_stack(),
            PresetId::BridgeNote => bridge_note(),
            PresetId::SeedToExit => seed_to_exit(),
            PresetId::Degenerate => degenerate(),
        }
    }
}

impl std::fmt::Display for PresetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PresetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "founding_only" | "founding" => Ok(PresetId::FoundingOnly),
            "safe_stack" | "safes" => Ok(PresetId::SafeStack),
            "bridge_note" | "bridge" => Ok(PresetId::BridgeNote),
            "seed_to_exit" | "journey" => Ok(PresetId::SeedToExit),
            "degenerate" | "edge" => Ok(PresetId::Degenerate),
            _ => Err(format!("Unknown preset: {s}")),
        }
    }
}

fn founding(prefix: &str) -> Stage {
    Stage::new(
        format!("{prefix}_founding"),
        "Founding",
        StageParams::Founding(FoundingParams {
            company_name: "NewCo".to_string(),
            total_authorized_shares: 10_000_000.0,
            esop_percent: 0.1,
            founders: vec![
                FounderAllocation {
                    id: format!("{prefix}_founder_1"),
                    name: "Founder 1".to_string(),
                    shares: 6_000_000.0,
                },
                FounderAllocation {
                    id: format!("{prefix}_founder_2"),
                    name: "Founder 2".to_string(),
                    shares: 3_000_000.0,
                },
            ],
        }),
    )
}

fn sale_exit(prefix: &str, sale_price: f64) -> Stage {
    Stage::new(
        format!("{prefix}_exit"),
        "Exit Event",
        StageParams::Exit(ExitParams {
            sale_price,
            mode: ExitMode::MergerAcquisition,
            ipo_price_per_share: 0.0,
        }),
    )
}

fn founding_only() -> Scenario {
    Scenario {
        id: "preset_founding_only".to_string(),
        name: "Founding Only".to_string(),
        description: "Baseline cap table".to_string(),
        timeline: vec![founding("fo")],
    }
}

fn safe_stack() -> Scenario {
    let first_safe = Stage::new(
        "ss_safe_1",
        "Post-Money SAFE",
        StageParams::PostMoneySafe(PostMoneySafeParams {
            investor_name: "First Believer".to_string(),
            investment: 125_000.0,
            post_money_valuation: 3_000_000.0,
            holder_id: "ss_believer".to_string(),
            special_rights: SpecialRights::default(),
        }),
    );
    let second_safe = Stage::new(
        "ss_safe_2",
        "Post-Money SAFE",
        StageParams::PostMoneySafe(PostMoneySafeParams {
            investor_name: "Seed Syndicate".to_string(),
            investment: 250_000.0,
            post_money_valuation: 8_000_000.0,
            holder_id: "ss_syndicate".to_string(),
            special_rights: SpecialRights::default(),
        }),
    );
    let seed_round = Stage::new(
        "ss_round",
        "Priced Round",
        StageParams::PricedRound(PricedRoundParams {
            round_name: "Seed".to_string(),
            investor_name: "Seed Lead".to_string(),
            investment: 2_000_000.0,
            post_money_valuation: 12_000_000.0,
            security_class: "Preferred Seed".to_string(),
            holder_id: "ss_lead".to_string(),
            option_pool_refresh: OptionPoolRefresh {
                enabled: false,
                target_percent: 0.0,
            },
        }),
    );
    let ipo = Stage::new(
        "ss_exit",
        "Exit Event",
        StageParams::Exit(ExitParams {
            sale_price: 0.0,
            mode: ExitMode::Ipo,
            ipo_price_per_share: 12.0,
        }),
    );
    Scenario {
        id: "preset_safe_stack".to_string(),
        name: "SAFE Stack".to_string(),
        description: "Stacked post-money SAFEs into a seed round".to_string(),
        timeline: vec![founding("ss"), first_safe, second_safe, seed_round, ipo],
    }
}

fn bridge_note() -> Scenario {
    let note = Stage::new(
        "bn_note",
        "Convertible Note",
        StageParams::ConvertibleNote(ConvertibleNoteParams {
            investor_name: "Bridge Angel".to_string(),
            principal: 500_000.0,
            interest_rate: 0.08,
            accrual_years: 1.5,
            valuation_cap: 8_000_000.0,
            discount: 0.2,
            holder_id: "bn_angel".to_string(),
            special_rights: SpecialRights {
                super_pro_rata: SuperProRataConfig {
                    enabled: true,
                    rounds: 2.0,
                    amount: 250_000.0,
                },
            },
        }),
    );
    let series_a = Stage::new(
        "bn_series_a",
        "Priced Round",
        StageParams::PricedRound(PricedRoundParams {
            round_name: "Series A".to_string(),
            investor_name: "Series A Lead".to_string(),
            investment: 5_000_000.0,
            post_money_valuation: 25_000_000.0,
            security_class: "Preferred A".to_string(),
            holder_id: "bn_lead_a".to_string(),
            option_pool_refresh: OptionPoolRefresh {
                enabled: true,
                target_percent: 0.10,
            },
        }),
    );
    let series_b = Stage::new(
        "bn_series_b",
        "Priced Round",
        StageParams::PricedRound(PricedRoundParams {
            round_name: "Series B".to_string(),
            investor_name: "Series B Lead".to_string(),
            investment: 10_000_000.0,
            post_money_valuation: 60_000_000.0,
            security_class: "Preferred B".to_string(),
            holder_id: "bn_lead_b".to_string(),
            option_pool_refresh: OptionPoolRefresh {
                enabled: false,
                target_percent: 0.0,
            },
        }),
    );
    Scenario {
        id: "preset_bridge_note".to_string(),
        name: "Bridge Note".to_string(),
        description: "Super pro-rata bridge across two priced rounds".to_string(),
        timeline: vec![
            founding("bn"),
            note,
            series_a,
            series_b,
            sale_exit("bn", 250_000_000.0),
        ],
    }
}

fn seed_to_exit() -> Scenario {
    let note = Stage::new(
        "se_note",
        "Convertible Note",
        StageParams::ConvertibleNote(ConvertibleNoteParams {
            investor_name: "Angel Investor".to_string(),
            principal: 250_000.0,
            interest_rate: 0.05,
            accrual_years: 1.0,
            valuation_cap: 6_000_000.0,
            discount: 0.2,
            holder_id: "se_angel".to_string(),
            special_rights: SpecialRights::default(),
        }),
    );
    let pre_safe = Stage::new(
        "se_pre_safe",
        "Pre-Money SAFE",
        StageParams::PreMoneySafe(PreMoneySafeParams {
            investor_name: "Scout Fund".to_string(),
            investment: 200_000.0,
            discount: 0.2,
            valuation_cap: 6_000_000.0,
            holder_id: "se_scout".to_string(),
            special_rights: SpecialRights::default(),
        }),
    );
    let post_safe = Stage::new(
        "se_post_safe",
        "Post-Money SAFE",
        StageParams::PostMoneySafe(PostMoneySafeParams {
            investor_name: "Seed Fund".to_string(),
            investment: 250_000.0,
            post_money_valuation: 8_000_000.0,
            holder_id: "se_seed_fund".to_string(),
            special_rights: SpecialRights::default(),
        }),
    );
    let series_a = Stage::new(
        "se_series_a",
        "Priced Round",
        StageParams::PricedRound(PricedRoundParams {
            round_name: "Series A".to_string(),
            investor_name: "Series A Lead".to_string(),
            investment: 8_000_000.0,
            post_money_valuation: 32_000_000.0,
            security_class: "Preferred A".to_string(),
            holder_id: "se_lead".to_string(),
            option_pool_refresh: OptionPoolRefresh {
                enabled: true,
                target_percent: 0.15,
            },
        }),
    );
    Scenario {
        id: "preset_seed_to_exit".to_string(),
        name: "Seed to Exit".to_string(),
        description: "Full journey from founding to a $250M sale".to_string(),
        timeline: vec![
            founding("se"),
            note,
            pre_safe,
            post_safe,
            series_a,
            sale_exit("se", 250_000_000.0),
        ],
    }
}

fn degenerate() -> Scenario {
    let hollow_founding = Stage::new(
        "dg_founding",
        "Founding",
        StageParams::Founding(FoundingParams {
            company_name: "GhostCo".to_string(),
            total_authorized_shares: 0.0,
            esop_percent: 0.0,
            founders: vec![FounderAllocation {
                id: "dg_founder".to_string(),
                name: "Solo".to_string(),
                shares: 0.0,
            }],
        }),
    );
    let impossible_round = Stage::new(
        "dg_round",
        "Priced Round",
        StageParams::PricedRound(PricedRoundParams {
            round_name: "Phantom Round".to_string(),
            investor_name: "Phantom Lead".to_string(),
            investment: 1_000_000.0,
            post_money_valuation: 5_000_000.0,
            security_class: "Preferred".to_string(),
            holder_id: "dg_lead".to_string(),
            option_pool_refresh: OptionPoolRefresh {
                enabled: false,
                target_percent: 0.0,
            },
        }),
    );
    let mystery = Stage::new(
        "dg_mystery",
        "Secondary Sale",
        StageParams::Unknown {
            kind: "SECONDARY_SALE".to_string(),
            params: serde_json::Value::Null,
        },
    );
    Scenario {
        id: "preset_degenerate".to_string(),
        name: "Degenerate".to_string(),
        description: "Exercises the warning paths".to_string(),
        timeline: vec![
            hollow_founding,
            impossible_round,
            mystery,
            sale_exit("dg", 100_000_000.0),
        ],
    }
}
