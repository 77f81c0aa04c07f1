//! Institutions and the stage mechanics their members go through.

use crate::core::world::{AnonOrder, Participant, ParticipantState, WorldView};
use crate::domain::model::Allegiance;
use crate::utils::error::{LabError, Result};
use rand::rngs::StdRng;

/// One of the two institutions agents can join each round. Membership is
/// rebuilt from scratch in every institution choice stage and holds real
/// agent indices.
pub struct Institution {
    pub kind: Allegiance,
    pub members: Vec<usize>,
}

impl Institution {
    pub fn new(kind: Allegiance) -> Self {
        Self {
            kind,
            members: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Stage 2: collect contributions, check them against the endowment and
    /// pay every member the per capita return plus the kept tokens.
    pub fn contribution_stage(
        &self,
        participants: &mut [Participant],
        view: &WorldView<'_>,
        rng: &mut StdRng,
    ) -> Result<()> {
        if self.members.is_empty() {
            return Ok(());
        }
        let mut contributions = Vec::with_capacity(self.members.len());
        for &index in &self.members {
            let p = &mut participants[index];
            let state = ParticipantState {
                record: &p.record,
                history: &p.history,
            };
            let amount = p.strategy.contribute(&state, view, rng);
            if amount > view.contribution_tokens {
                return Err(LabError::InvalidContribution {
                    agent: p.id.clone(),
                    amount,
                    max: view.contribution_tokens,
                });
            }
            p.record.contribution = amount;
            contributions.push(amount as f64);
        }
        let pcr = view.game.per_capita_return(&contributions, view.contribution_tokens);
        for &index in &self.members {
            let record = &mut participants[index].record;
            record.profit = pcr + view.contribution_tokens as f64 - record.contribution as f64;
            record.account += record.profit;
        }
        Ok(())
    }

    /// Stage 3: wipe last round's sanction bookkeeping and credit the
    /// sanctioning endowment, then let members of a sanctioning institution
    /// spend it on each other. Unspent tokens stay on the account.
    ///
    /// A sanctioning institution holds fire in round 0: there is no prior
    /// behaviour to react to yet.
    pub fn sanctioning_stage(
        &self,
        participants: &mut [Participant],
        view: &WorldView<'_>,
        anon: &AnonOrder,
        rng: &mut StdRng,
    ) -> Result<()> {
        for &index in &self.members {
            let record = &mut participants[index].record;
            record.clear_sanctions();
            record.account += view.sanction_tokens as f64;
        }
        if self.kind == Allegiance::SanctionFree || view.round == 0 {
            return Ok(());
        }

        let positions: Vec<usize> = self.members.iter().map(|&i| anon.position_of(i)).collect();
        let mut impacts: Vec<(usize, u32, bool)> = Vec::new();
        for (m, &index) in self.members.iter().enumerate() {
            let peers: Vec<usize> = positions
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != m)
                .map(|(_, &position)| position)
                .collect();
            let p = &mut participants[index];
            let state = ParticipantState {
                record: &p.record,
                history: &p.history,
            };
            let sanctions = p.strategy.sanction(&state, view, &peers, rng);
            if let Err(reason) = sanctions.validate(&peers, view.sanction_tokens) {
                return Err(LabError::InvalidSanction {
                    agent: p.id.clone(),
                    reason,
                });
            }
            p.record.account -= sanctions.spent() as f64;
            // Decisions are taken under anonymized positions but stored and
            // applied under real indices.
            for (&position, &tokens) in &sanctions.positive {
                let target = anon.agent_at(position);
                p.record.sanct_positive.insert(target, tokens);
                impacts.push((target, tokens, true));
            }
            for (&position, &tokens) in &sanctions.negative {
                let target = anon.agent_at(position);
                p.record.sanct_negative.insert(target, tokens);
                impacts.push((target, tokens, false));
            }
        }
        for (target, tokens, positive) in impacts {
            let record = &mut participants[target].record;
            if positive {
                record.commendations += tokens;
                record.received_sanct += tokens as i64;
                record.account += tokens as f64;
            } else {
                record.punishments += tokens;
                record.received_sanct -= 3 * tokens as i64;
                record.account -= 3.0 * tokens as f64;
            }
        }
        Ok(())
    }
}
