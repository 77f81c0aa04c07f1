use crate::core::stats::{Aggregate, Group};
use crate::core::world::{ParticipantState, WorldView};
use crate::domain::model::{Allegiance, Metric};
use crate::domain::ports::Strategy;
use crate::strategies::{group_of, profit_based_choice};
use rand::rngs::StdRng;
use rand::Rng;

/// Contributes as little as it can get away with. In the sanction-free
/// institution it tracks the group only while falling behind; under a
/// sanctioning institution it raises its contribution when punished and
/// slowly lets it decay when left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModerateEgoist;

impl Strategy for ModerateEgoist {
    fn name(&self) -> &'static str {
        "ModerateEgoist"
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
            return rng.gen_range(0..=tokens / 2);
        }

        let stats = world.statistics;
        let previous = me.history.last().and_then(|r| r.allegiance);
        if previous != me.record.allegiance {
            // Just changed allegiance: when in Rome, do as the Romans do.
            let group = group_of(me.record.allegiance);
            return stats.aggregate(Aggregate::Mean, group, Metric::Contribution) as u32;
        }

        match me.record.allegiance {
            Some(Allegiance::Sanctioning) => {
                if me.record.received_sanct < 0 {
                    // Would full cooperation have paid off better?
                    let mut pool = stats.values(Group::Si, Metric::Contribution);
                    let own = me.record.contribution as f64;
                    if let Some(i) = pool.iter().position(|&v| v == own) {
                        pool.remove(i);
                    }
                    pool.push(tokens as f64);
                    let pcr = world.game.per_capita_return(&pool, tokens);
                    if pcr > me.record.net_profit() {
                        tokens
                    } else {
                        me.record.contribution
                    }
                } else if me.record.received_sanct > 0 {
                    me.record.contribution
                } else {
                    me.record.contribution * 9 / 10
                }
            }
            _ => {
                let m_profit = stats.aggregate(Aggregate::Median, Group::Sfi, Metric::Profit);
                let m_contrib = stats.aggregate(Aggregate::Mean, Group::Sfi, Metric::Contribution);
                if m_profit >= me.record.profit {
                    me.record.contribution * 2 / 3
                } else {
                    (m_contrib as u32).max(me.record.contribution)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testbed::{own_record, snapshot, Fixture};
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn opening_contribution_stays_below_half_the_endowment() {
        let fixture = Fixture::new(Vec::new());
        let record = own_record(Allegiance::SanctionFree, 0);
        let me = ParticipantState {
            record: &record,
            history: &[],
        };
        let mut strategy = ModerateEgoist;
        let mut rng = rng();
        for _ in 0..100 {
            assert!(strategy.contribute(&me, &fixture.view(0), &mut rng) <= 10);
        }
    }

    #[test]
    fn switcher_copies_the_new_group_mean() {
        let fixture = Fixture::new(vec![
            snapshot(Allegiance::SanctionFree, 4, 20.0, 0),
            snapshot(Allegiance::SanctionFree, 8, 20.0, 0),
            snapshot(Allegiance::Sanctioning, 20, 20.0, 0),
        ]);
        let record = own_record(Allegiance::SanctionFree, 20);
        let history = vec![own_record(Allegiance::Sanctioning, 20)];
        let me = ParticipantState {
            record: &record,
            history: &history,
        };

        let amount = ModerateEgoist.contribute(&me, &fixture.view(2), &mut rng());
        assert_eq!(amount, 6);
    }

    #[test]
    fn keeps_up_only_while_falling_behind_the_group() {
        let fixture = Fixture::new(vec![
            snapshot(Allegiance::SanctionFree, 10, 30.0, 0),
            snapshot(Allegiance::SanctionFree, 14, 30.0, 0),
        ]);

        // Median profit 30 >= own 25: cut the contribution to two thirds
        let behind = own_record(Allegiance::SanctionFree, 9);
        let mut record = behind.clone();
        record.profit = 25.0;
        let history = vec![behind];
        let me = ParticipantState {
            record: &record,
            history: &history,
        };
        assert_eq!(ModerateEgoist.contribute(&me, &fixture.view(2), &mut rng()), 6);

        // Median profit 30 < own 35: match the mean contribution of 12
        let mut record = own_record(Allegiance::SanctionFree, 9);
        record.profit = 35.0;
        let history = vec![record.clone()];
        let me = ParticipantState {
            record: &record,
            history: &history,
        };
        assert_eq!(ModerateEgoist.contribute(&me, &fixture.view(2), &mut rng()), 12);
    }

    #[test]
    fn punishment_triggers_full_cooperation_when_it_pays() {
        let fixture = Fixture::new(vec![
            snapshot(Allegiance::Sanctioning, 0, 10.0, -6),
            snapshot(Allegiance::Sanctioning, 20, 30.0, 0),
        ]);
        let mut record = own_record(Allegiance::Sanctioning, 0);
        record.profit = 10.0;
        record.received_sanct = -6;
        let history = vec![record.clone()];
        let me = ParticipantState {
            record: &record,
            history: &history,
        };

        // Hypothetical pool [20, 20]: pcr = 0.8 * 40 = 32 > net profit 4
        assert_eq!(ModerateEgoist.contribute(&me, &fixture.view(2), &mut rng()), 20);
    }

    #[test]
    fn unsanctioned_contribution_decays() {
        let fixture = Fixture::new(vec![
            snapshot(Allegiance::Sanctioning, 19, 30.0, 0),
            snapshot(Allegiance::Sanctioning, 10, 30.0, 0),
        ]);
        let record = own_record(Allegiance::Sanctioning, 19);
        let history = vec![record.clone()];
        let me = ParticipantState {
            record: &record,
            history: &history,
        };

        assert_eq!(ModerateEgoist.contribute(&me, &fixture.view(2), &mut rng()), 17);
    }
}
