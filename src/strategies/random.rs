use crate::core::world::{ParticipantState, WorldView};
use crate::domain::model::Allegiance;
use crate::domain::ports::Strategy;
use rand::rngs::StdRng;
use rand::Rng;

/// Coin-flip baseline: random institution, random contribution, never
/// sanctions. Useful as noise in a population and as a control class.
#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl Strategy for Random {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn choose_institution(
        &mut self,
        _me: &ParticipantState<'_>,
        _world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> Allegiance {
        if rng.gen_bool(0.5) {
            Allegiance::Sanctioning
        } else {
            Allegiance::SanctionFree
        }
    }

    fn contribute(
        &mut self,
        _me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> u32 {
        rng.gen_range(0..=world.contribution_tokens)
    }
}
