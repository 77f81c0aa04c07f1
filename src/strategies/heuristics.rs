use crate::core::stats::Aggregate;
use crate::core::world::{ParticipantState, WorldView};
use crate::domain::model::{Allegiance, Metric};
use crate::domain::ports::Strategy;
use crate::strategies::{group_of, profit_based_choice};
use rand::rngs::StdRng;
use rand::Rng;

/// Cooperative rule of thumb: starts generously, repeats whatever worked,
/// doubles down after punishment and halves the contribution otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleHeuristics;

impl Strategy for SimpleHeuristics {
    fn name(&self) -> &'static str {
        "SimpleHeuristics"
    }

    fn choose_institution(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> Allegiance {
        profit_based_choice(me, world, rng)
    }

    fn contribute(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> u32 {
        let tokens = world.contribution_tokens;
        if world.round == 0 {
            return rng.gen_range(tokens / 2..=tokens);
        }

        let previous = me.history.last().and_then(|r| r.allegiance);
        if previous != me.record.allegiance {
            let group = group_of(me.record.allegiance);
            return world
                .statistics
                .aggregate(Aggregate::Mean, group, Metric::Contribution) as u32;
        }

        match me.record.allegiance {
            Some(Allegiance::Sanctioning) => {
                if me.record.net_profit() > me.record.contribution as f64 {
                    me.record.contribution
                } else if me.record.received_sanct < 0 {
                    tokens.min(me.record.contribution * 2)
                } else {
                    me.record.contribution / 2
                }
            }
            _ => me.record.contribution / 2,
        }
    }
}
