//! Programmed agent strategies.
//!
//! Every strategy answers the three questions of a round: which institution
//! to join, how much to contribute and whom to sanction. Strategies only see
//! their own record plus the anonymized public snapshots of the previous
//! round, so they work as well against humans as against each other.

use crate::core::stats::{Aggregate, Group};
use crate::core::world::{ParticipantState, WorldView};
use crate::domain::model::{Allegiance, Metric};
use crate::domain::ports::Strategy;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

mod egoist;
mod heuristics;
mod punisher;
mod random;

pub use egoist::ModerateEgoist;
pub use heuristics::SimpleHeuristics;
pub use punisher::{EgoistPunisher, SimpleHeuristicsPunisher};
pub use random::Random;

/// The built-in strategy classes a population can be assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Random,
    ModerateEgoist,
    SimpleHeuristics,
    EgoistPunisher,
    SimpleHeuristicsPunisher,
}

impl StrategyKind {
    pub fn all() -> &'static [StrategyKind] {
        &[
            StrategyKind::Random,
            StrategyKind::ModerateEgoist,
            StrategyKind::SimpleHeuristics,
            StrategyKind::EgoistPunisher,
            StrategyKind::SimpleHeuristicsPunisher,
        ]
    }

    /// Class label under which agents of this kind appear in chronicles.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Random => "Random",
            StrategyKind::ModerateEgoist => "ModerateEgoist",
            StrategyKind::SimpleHeuristics => "SimpleHeuristics",
            StrategyKind::EgoistPunisher => "EgoistPunisher",
            StrategyKind::SimpleHeuristicsPunisher => "SimpleHeuristicsPunisher",
        }
    }

    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Random => Box::new(Random),
            StrategyKind::ModerateEgoist => Box::new(ModerateEgoist),
            StrategyKind::SimpleHeuristics => Box::new(SimpleHeuristics),
            StrategyKind::EgoistPunisher => Box::new(EgoistPunisher::default()),
            StrategyKind::SimpleHeuristicsPunisher => {
                Box::new(SimpleHeuristicsPunisher::default())
            }
        }
    }
}

/// Stick with the current institution unless the other one's median profit
/// looks better, and even then switch reluctantly.
pub(crate) fn profit_based_choice(
    me: &ParticipantState<'_>,
    world: &WorldView<'_>,
    rng: &mut StdRng,
) -> Allegiance {
    if world.round == 0 {
        return if rng.gen_bool(0.5) {
            Allegiance::Sanctioning
        } else {
            Allegiance::SanctionFree
        };
    }
    let stats = world.statistics;
    let sfi_profit = stats.aggregate(Aggregate::Median, Group::Sfi, Metric::Profit);
    let si_profit = stats.aggregate(Aggregate::Median, Group::Si, Metric::Profit);
    if sfi_profit > si_profit && rng.gen::<f64>() < 0.3 {
        Allegiance::SanctionFree
    } else if sfi_profit < si_profit && rng.gen::<f64>() < 0.3 {
        Allegiance::Sanctioning
    } else {
        me.record.allegiance.unwrap_or(Allegiance::SanctionFree)
    }
}

/// Statistics group matching an allegiance.
pub(crate) fn group_of(allegiance: Option<Allegiance>) -> Group {
    match allegiance {
        Some(Allegiance::Sanctioning) => Group::Si,
        _ => Group::Sfi,
    }
}
