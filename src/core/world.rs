//! The experiment world: participants, institutions and the round loop.

use crate::core::institution::Institution;
use crate::core::stats::RoundStatistics;
use crate::domain::model::{AgentRecord, Allegiance, PublicRecord};
use crate::domain::ports::{Game, Recorder, Strategy};
use crate::utils::error::{LabError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Immutable session parameters, announced to recorders before the first
/// round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub agent_ids: Vec<String>,
    pub agent_classes: Vec<String>,
    pub game: String,
    pub institutions: Vec<String>,
    pub max_rounds: usize,
    pub contribution_tokens: u32,
    pub sanction_tokens: u32,
}

/// Numeric knobs of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    pub max_rounds: usize,
    pub contribution_tokens: u32,
    pub sanction_tokens: u32,
    pub seed: u64,
}

/// One experimental subject: its bookkeeping, its past and its decision
/// rules.
pub struct Participant {
    pub id: String,
    pub class_id: String,
    pub record: AgentRecord,
    pub history: Vec<AgentRecord>,
    pub strategy: Box<dyn Strategy>,
}

impl Participant {
    pub fn new(index: usize, strategy: Box<dyn Strategy>) -> Self {
        let class_id = strategy.name().to_string();
        Self {
            id: format!("{:04}.{}", index + 1, class_id),
            class_id,
            record: AgentRecord::new(),
            history: Vec::new(),
            strategy,
        }
    }
}

/// What a strategy may see of its own agent.
pub struct ParticipantState<'a> {
    pub record: &'a AgentRecord,
    pub history: &'a [AgentRecord],
}

/// The public state a strategy may consult while deciding. Public records
/// and statistics describe the previous round, in the anonymized order of
/// the current one.
pub struct WorldView<'a> {
    pub round: usize,
    pub max_rounds: usize,
    pub num_agents: usize,
    pub contribution_tokens: u32,
    pub sanction_tokens: u32,
    pub game: &'a dyn Game,
    pub public_records: &'a [PublicRecord],
    pub statistics: &'a RoundStatistics,
}

/// Permutation between real agent indices and the anonymized positions
/// agents see each other under. Reshuffled every round so nobody can be
/// tracked between rounds.
#[derive(Debug, Clone)]
pub struct AnonOrder {
    order: Vec<usize>,
    position: Vec<usize>,
}

impl AnonOrder {
    pub(crate) fn identity(n: usize) -> Self {
        let order: Vec<usize> = (0..n).collect();
        Self {
            position: order.clone(),
            order,
        }
    }

    fn shuffle(&mut self, rng: &mut StdRng) {
        self.order.shuffle(rng);
        for (position, &agent) in self.order.iter().enumerate() {
            self.position[agent] = position;
        }
    }

    /// Real index of the agent at an anonymized position.
    pub fn agent_at(&self, position: usize) -> usize {
        self.order[position]
    }

    /// Anonymized position of a real agent index.
    pub fn position_of(&self, agent: usize) -> usize {
        self.position[agent]
    }
}

pub struct World<R: Recorder> {
    game: Box<dyn Game>,
    participants: Vec<Participant>,
    params: SessionParams,
    round: usize,
    started: bool,
    si: Institution,
    sfi: Institution,
    anon: AnonOrder,
    statistics: RoundStatistics,
    recorder: R,
    rng: StdRng,
}

impl<R: Recorder> World<R> {
    pub fn new(
        game: Box<dyn Game>,
        participants: Vec<Participant>,
        params: SessionParams,
        mut recorder: R,
    ) -> Result<Self> {
        if params.max_rounds < 1 {
            return Err(LabError::SetupError {
                message: "a session needs at least one round".to_string(),
            });
        }
        if params.contribution_tokens < 1 || params.sanction_tokens < 1 {
            return Err(LabError::SetupError {
                message: "token endowments must be at least 1".to_string(),
            });
        }
        if participants.len() < 2 {
            return Err(LabError::SetupError {
                message: format!(
                    "a session needs at least 2 agents, got {}",
                    participants.len()
                ),
            });
        }

        let setup = SessionSetup {
            agent_ids: participants.iter().map(|p| p.id.clone()).collect(),
            agent_classes: participants.iter().map(|p| p.class_id.clone()).collect(),
            game: game.label(),
            institutions: vec![
                "SanctioningInstitution".to_string(),
                "SanctionFreeInstitution".to_string(),
            ],
            max_rounds: params.max_rounds,
            contribution_tokens: params.contribution_tokens,
            sanction_tokens: params.sanction_tokens,
        };
        recorder.on_setup(&setup);

        let n = participants.len();
        Ok(Self {
            game,
            participants,
            params,
            round: 0,
            started: false,
            si: Institution::new(Allegiance::Sanctioning),
            sfi: Institution::new(Allegiance::SanctionFree),
            anon: AnonOrder::identity(n),
            statistics: RoundStatistics::empty(),
            recorder,
            rng: StdRng::seed_from_u64(params.seed),
        })
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn rounds_completed(&self) -> usize {
        self.round
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn into_recorder(self) -> R {
        self.recorder
    }

    /// Runs the whole session. A world refuses to run twice, because agent
    /// histories would otherwise carry over between sessions.
    pub fn run(&mut self) -> Result<()> {
        if self.started {
            return Err(LabError::SetupError {
                message: "the session has already been run".to_string(),
            });
        }
        self.started = true;
        tracing::debug!(
            "starting session: {} agents, {} rounds, seed {}",
            self.participants.len(),
            self.params.max_rounds,
            self.params.seed
        );
        for _ in 0..self.params.max_rounds {
            self.next_round()?;
        }
        Ok(())
    }

    fn next_round(&mut self) -> Result<()> {
        // New anonymized order, then snapshot the previous round under it.
        self.anon.shuffle(&mut self.rng);
        let snapshots: Vec<PublicRecord> = (0..self.participants.len())
            .map(|position| {
                let agent = self.anon.agent_at(position);
                PublicRecord::from_record(
                    &self.participants[agent].record,
                    self.params.sanction_tokens,
                )
            })
            .collect();
        let completed_round = self.round.checked_sub(1);
        self.statistics = RoundStatistics::new(snapshots, completed_round);

        let view = WorldView {
            round: self.round,
            max_rounds: self.params.max_rounds,
            num_agents: self.participants.len(),
            contribution_tokens: self.params.contribution_tokens,
            sanction_tokens: self.params.sanction_tokens,
            game: self.game.as_ref(),
            public_records: self.statistics.records(crate::core::stats::Group::All),
            statistics: &self.statistics,
        };

        // Stage 1: institution choice
        self.si.members.clear();
        self.sfi.members.clear();
        for index in 0..self.participants.len() {
            let p = &mut self.participants[index];
            let state = ParticipantState {
                record: &p.record,
                history: &p.history,
            };
            let choice = p.strategy.choose_institution(&state, &view, &mut self.rng);
            p.record.allegiance = Some(choice);
            match choice {
                Allegiance::Sanctioning => self.si.members.push(index),
                Allegiance::SanctionFree => self.sfi.members.push(index),
            }
        }
        tracing::debug!(
            "round {}/{}: {} SI / {} SFI members",
            self.round + 1,
            self.params.max_rounds,
            self.si.members.len(),
            self.sfi.members.len()
        );

        // Stage 2: voluntary contribution
        self.si
            .contribution_stage(&mut self.participants, &view, &mut self.rng)?;
        self.sfi
            .contribution_stage(&mut self.participants, &view, &mut self.rng)?;

        // Stage 3: sanctioning
        self.si
            .sanctioning_stage(&mut self.participants, &view, &self.anon, &mut self.rng)?;
        self.sfi
            .sanctioning_stage(&mut self.participants, &view, &self.anon, &mut self.rng)?;

        for p in &mut self.participants {
            p.history.push(p.record.clone());
        }
        let records: Vec<AgentRecord> = self
            .participants
            .iter()
            .map(|p| p.record.clone())
            .collect();
        self.recorder.on_round_complete(self.round, &records)?;
        self.round += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::game::LinearPublicGoods;
    use crate::domain::model::Sanctions;

    const PARAMS: SessionParams = SessionParams {
        max_rounds: 3,
        contribution_tokens: 20,
        sanction_tokens: 20,
        seed: 7,
    };

    /// Scripted strategy with a fixed allegiance and contribution.
    struct Scripted {
        allegiance: Allegiance,
        contribution: u32,
    }

    impl Strategy for Scripted {
        fn name(&self) -> &'static str {
            "Scripted"
        }

        fn choose_institution(
            &mut self,
            _me: &ParticipantState<'_>,
            _world: &WorldView<'_>,
            _rng: &mut StdRng,
        ) -> Allegiance {
            self.allegiance
        }

        fn contribute(
            &mut self,
            _me: &ParticipantState<'_>,
            _world: &WorldView<'_>,
            _rng: &mut StdRng,
        ) -> u32 {
            self.contribution
        }
    }

    /// Punishes the anonymized peer with the lowest previous contribution.
    struct PunishLowest {
        contribution: u32,
    }

    impl Strategy for PunishLowest {
        fn name(&self) -> &'static str {
            "PunishLowest"
        }

        fn choose_institution(
            &mut self,
            _me: &ParticipantState<'_>,
            _world: &WorldView<'_>,
            _rng: &mut StdRng,
        ) -> Allegiance {
            Allegiance::Sanctioning
        }

        fn contribute(
            &mut self,
            _me: &ParticipantState<'_>,
            _world: &WorldView<'_>,
            _rng: &mut StdRng,
        ) -> u32 {
            self.contribution
        }

        fn sanction(
            &mut self,
            _me: &ParticipantState<'_>,
            world: &WorldView<'_>,
            peers: &[usize],
            _rng: &mut StdRng,
        ) -> Sanctions {
            let mut sanctions = Sanctions::none();
            let lowest = peers.iter().min_by_key(|&&pos| {
                world.public_records[pos].contribution
            });
            if let Some(&target) = lowest {
                sanctions.negative.insert(target, 2);
            }
            sanctions
        }
    }

    fn world_of(
        strategies: Vec<Box<dyn Strategy>>,
        params: SessionParams,
    ) -> World<()> {
        let participants = strategies
            .into_iter()
            .enumerate()
            .map(|(i, s)| Participant::new(i, s))
            .collect();
        World::new(
            Box::new(LinearPublicGoods::new(1.6).unwrap()),
            participants,
            params,
            (),
        )
        .unwrap()
    }

    #[test]
    fn setup_validation() {
        let game = || Box::new(LinearPublicGoods::new(1.6).unwrap());
        let two = || {
            vec![
                Participant::new(0, Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 0 }) as Box<dyn Strategy>),
                Participant::new(1, Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 0 })),
            ]
        };

        assert!(World::new(game(), two(), PARAMS, ()).is_ok());

        let mut bad = PARAMS;
        bad.max_rounds = 0;
        assert!(World::new(game(), two(), bad, ()).is_err());

        let mut bad = PARAMS;
        bad.contribution_tokens = 0;
        assert!(World::new(game(), two(), bad, ()).is_err());

        let lonely = vec![Participant::new(
            0,
            Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 0 }) as Box<dyn Strategy>,
        )];
        assert!(World::new(game(), lonely, PARAMS, ()).is_err());
    }

    #[test]
    fn one_round_accounting_in_the_sanction_free_institution() {
        let mut params = PARAMS;
        params.max_rounds = 1;
        let mut world = world_of(
            vec![
                Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 5 }),
                Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 15 }),
            ],
            params,
        );
        world.run().unwrap();

        // mcpr = 1.6 / 2 = 0.8, pool = 20, pcr = 16
        let p = world.participants();
        assert_eq!(p[0].record.contribution, 5);
        assert!((p[0].record.profit - 31.0).abs() < 1e-9);
        assert!((p[1].record.profit - 21.0).abs() < 1e-9);
        // Unspent sanctioning endowment on top
        assert!((p[0].record.account - 51.0).abs() < 1e-9);
        assert!((p[1].record.account - 41.0).abs() < 1e-9);
        assert_eq!(p[0].history.len(), 1);
    }

    #[test]
    fn accounts_sum_overall_results() {
        let mut world = world_of(
            vec![
                Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 3 }),
                Box::new(Scripted { allegiance: Allegiance::Sanctioning, contribution: 20 }),
                Box::new(PunishLowest { contribution: 18 }),
                Box::new(PunishLowest { contribution: 12 }),
            ],
            PARAMS,
        );
        world.run().unwrap();

        for p in world.participants() {
            let total: f64 = p
                .history
                .iter()
                .map(|r| r.overall_result(PARAMS.sanction_tokens))
                .sum();
            assert!(
                (p.record.account - total).abs() < 1e-9,
                "agent {} account {} != overall sum {}",
                p.id,
                p.record.account,
                total
            );
        }
    }

    #[test]
    fn sanctioning_institution_holds_fire_in_round_zero() {
        let mut params = PARAMS;
        params.max_rounds = 1;
        let mut world = world_of(
            vec![
                Box::new(PunishLowest { contribution: 10 }),
                Box::new(PunishLowest { contribution: 20 }),
            ],
            params,
        );
        world.run().unwrap();

        for p in world.participants() {
            assert_eq!(p.record.punishments, 0);
            assert_eq!(p.record.sanctioning(), 0);
        }
    }

    #[test]
    fn punishment_lands_on_the_lowest_contributor() {
        let mut params = PARAMS;
        params.max_rounds = 2;
        let mut world = world_of(
            vec![
                Box::new(Scripted { allegiance: Allegiance::Sanctioning, contribution: 2 }),
                Box::new(PunishLowest { contribution: 20 }),
                Box::new(PunishLowest { contribution: 20 }),
            ],
            params,
        );
        world.run().unwrap();

        let p = world.participants();
        // Both punishers target the scripted low contributor in round 1: the
        // snapshots they see carry its round-0 contribution of 2.
        let low = &p[0].record;
        assert_eq!(low.punishments, 4);
        assert_eq!(low.received_sanct, -12);
        for punisher in &p[1..] {
            assert_eq!(punisher.record.sanctioning(), 2);
            assert_eq!(punisher.record.sanct_negative.values().sum::<u32>(), 2);
            // Decisions are stored under the real index of the target
            assert!(punisher.record.sanct_negative.contains_key(&0));
        }
    }

    #[test]
    fn run_twice_is_refused() {
        let mut world = world_of(
            vec![
                Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 5 }),
                Box::new(Scripted { allegiance: Allegiance::SanctionFree, contribution: 15 }),
            ],
            PARAMS,
        );
        world.run().unwrap();
        assert!(world.run().is_err());
        assert_eq!(world.rounds_completed(), PARAMS.max_rounds);
    }

    #[test]
    fn same_seed_same_history() {
        let build = |seed: u64| {
            let mut params = PARAMS;
            params.seed = seed;
            params.max_rounds = 5;
            let mut world = world_of(
                vec![
                    Box::new(Scripted { allegiance: Allegiance::Sanctioning, contribution: 4 }),
                    Box::new(PunishLowest { contribution: 16 }),
                    Box::new(PunishLowest { contribution: 11 }),
                ],
                params,
            );
            world.run().unwrap();
            world
                .participants()
                .iter()
                .map(|p| p.history.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(build(42), build(42));
    }
}
