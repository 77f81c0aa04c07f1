use crate::core::world::{ParticipantState, SessionSetup, WorldView};
use crate::domain::model::{AgentRecord, Allegiance, Sanctions};
use crate::utils::error::Result;
use rand::rngs::StdRng;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// Payoff rule of the economic game an institution's members play.
pub trait Game: Send {
    fn label(&self) -> String;

    /// Return per contributed token, for a group of the given size at the
    /// given contribution ratio.
    fn marginal_per_capita_return(&self, contribution_ratio: f64, group_size: usize) -> f64;

    /// Smallest group for which contributing is socially beneficial but
    /// individually unprofitable.
    fn min_group_size(&self) -> usize;

    /// The return every group member receives from the common pool.
    fn per_capita_return(&self, contributions: &[f64], max_contribution: u32) -> f64 {
        debug_assert!(max_contribution >= 1);
        debug_assert!(!contributions.is_empty());
        let group_size = contributions.len();
        let total: f64 = contributions.iter().sum();
        let ratio = total / (max_contribution as f64 * group_size as f64);
        self.marginal_per_capita_return(ratio, group_size) * total
    }
}

/// Decision rules of one agent. Implementations may keep internal state;
/// all randomness must come from the rng handed in, so that runs stay
/// reproducible under a fixed seed.
pub trait Strategy: Send {
    /// Class label recorded in chronicles.
    fn name(&self) -> &'static str;

    fn choose_institution(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> Allegiance;

    fn contribute(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> u32;

    /// Sanction decision against fellow institution members, given by their
    /// anonymized indices. Non-sanctioning strategies keep the default.
    fn sanction(
        &mut self,
        _me: &ParticipantState<'_>,
        _world: &WorldView<'_>,
        _peers: &[usize],
        _rng: &mut StdRng,
    ) -> Sanctions {
        Sanctions::none()
    }
}

/// Observer of a running experiment session.
pub trait Recorder {
    fn on_setup(&mut self, _setup: &SessionSetup) {}

    fn on_round_complete(&mut self, _round: usize, _records: &[AgentRecord]) -> Result<()> {
        Ok(())
    }
}

/// No-op recorder for sessions nobody needs to keep.
impl Recorder for () {}
