use crate::core::world::{ParticipantState, WorldView};
use crate::domain::model::{Allegiance, PublicRecord, Sanctions};
use crate::domain::ports::Strategy;
use crate::strategies::{ModerateEgoist, SimpleHeuristics};
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Spreads `strength` tokens of sanction over every peer the selector
/// matches, as far as the budget carries, and returns the tokens left.
/// Peers already sanctioned keep their earlier amount.
fn select_for_sanction<F>(
    sanctions: &mut HashMap<usize, u32>,
    mut tokens: u32,
    infos: &[PublicRecord],
    peers: &[usize],
    selector: F,
    strength: u32,
) -> u32
where
    F: Fn(u32) -> bool,
{
    let targets: Vec<usize> = peers
        .iter()
        .copied()
        .filter(|&i| {
            infos[i].allegiance == Some(Allegiance::Sanctioning) && selector(infos[i].contribution)
        })
        .collect();
    if targets.is_empty() {
        return tokens;
    }
    let sanction = strength.min(tokens / targets.len() as u32).max(1);
    for i in targets {
        if !sanctions.contains_key(&i) && tokens >= sanction {
            sanctions.insert(i, sanction);
            tokens -= sanction;
        }
    }
    tokens
}

/// Quartile-based sanctioning: punish hard below the first quartile of the
/// contribution scale, mildly below the second, and spend a cut-down rest on
/// commendations for (nearly) full contributors. Commendations only flow
/// once punishments have actually drawn from the budget.
pub(crate) fn stepwise_sanctions(world: &WorldView<'_>, peers: &[usize]) -> Sanctions {
    let budget = world.sanction_tokens;
    let q1 = world.contribution_tokens / 4;
    let q2 = world.contribution_tokens * 2 / 4;
    let q3 = world.contribution_tokens * 3 / 4;
    let q4 = world.contribution_tokens;
    let infos = world.public_records;

    let mut sanctions = Sanctions::none();
    let mut tokens = budget;
    tokens = select_for_sanction(&mut sanctions.negative, tokens, infos, peers, |c| c < q1, 2);
    tokens = select_for_sanction(
        &mut sanctions.negative,
        tokens,
        infos,
        peers,
        |c| c >= q1 && c < q2,
        1,
    );

    // Commendations count less than punishments
    tokens /= 3;
    if tokens < budget / 3 {
        tokens = select_for_sanction(&mut sanctions.positive, tokens, infos, peers, |c| c == q4, 2);
        tokens = select_for_sanction(
            &mut sanctions.positive,
            tokens,
            infos,
            peers,
            |c| c >= q3 && c < q4,
            1,
        );
    }
    select_for_sanction(
        &mut sanctions.negative,
        tokens,
        infos,
        peers,
        |c| c >= q2 && c < q3,
        1,
    );
    sanctions
}

/// A [`ModerateEgoist`] that additionally metes out stepwise sanctions.
#[derive(Debug, Default, Clone, Copy)]
pub struct EgoistPunisher {
    inner: ModerateEgoist,
}

impl Strategy for EgoistPunisher {
    fn name(&self) -> &'static str {
        "EgoistPunisher"
    }

    fn choose_institution(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> Allegiance {
        self.inner.choose_institution(me, world, rng)
    }

    fn contribute(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> u32 {
        self.inner.contribute(me, world, rng)
    }

    fn sanction(
        &mut self,
        _me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        peers: &[usize],
        _rng: &mut StdRng,
    ) -> Sanctions {
        stepwise_sanctions(world, peers)
    }
}

/// A [`SimpleHeuristics`] agent that additionally metes out stepwise
/// sanctions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleHeuristicsPunisher {
    inner: SimpleHeuristics,
}

impl Strategy for SimpleHeuristicsPunisher {
    fn name(&self) -> &'static str {
        "SimpleHeuristicsPunisher"
    }

    fn choose_institution(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> Allegiance {
        self.inner.choose_institution(me, world, rng)
    }

    fn contribute(
        &mut self,
        me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> u32 {
        self.inner.contribute(me, world, rng)
    }

    fn sanction(
        &mut self,
        _me: &ParticipantState<'_>,
        world: &WorldView<'_>,
        peers: &[usize],
        _rng: &mut StdRng,
    ) -> Sanctions {
        stepwise_sanctions(world, peers)
    }
}
