//! Statistical toolbox over agent records, per-round grouping, and the
//! whole-experiment evaluation series.

use crate::domain::model::{AgentRecord, Allegiance, Metric, PublicRecord};
use crate::utils::error::{LabError, Result};
use serde::Serialize;

/// Mean of a list of values, zero for an empty list.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a list of values, zero for an empty list. Averages the middle
/// pair on even length.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

fn extreme_records<'a, T, F>(items: &'a [T], values: &[f64], better: F) -> Vec<&'a T>
where
    F: Fn(f64, f64) -> bool,
{
    debug_assert_eq!(items.len(), values.len());
    let mut result: Vec<&T> = Vec::new();
    let mut pivot = f64::NAN;
    for (item, &value) in items.iter().zip(values) {
        if result.is_empty() || better(value, pivot) {
            pivot = value;
            result = vec![item];
        } else if value == pivot {
            result.push(item);
        }
    }
    result
}

/// All items attaining the highest value.
pub fn max_records<'a, T>(items: &'a [T], values: &[f64]) -> Vec<&'a T> {
    extreme_records(items, values, |a, b| a > b)
}

/// All items attaining the lowest value.
pub fn min_records<'a, T>(items: &'a [T], values: &[f64]) -> Vec<&'a T> {
    extreme_records(items, values, |a, b| a < b)
}

/// Items whose value matches the pivot; failing that, the items with the
/// greatest value below it followed by those with the smallest value above.
pub fn nearest_records<'a, T>(items: &'a [T], values: &[f64], pivot: f64) -> Vec<&'a T> {
    debug_assert_eq!(items.len(), values.len());
    let exact: Vec<&T> = items
        .iter()
        .zip(values)
        .filter(|(_, &v)| v == pivot)
        .map(|(item, _)| item)
        .collect();
    if !exact.is_empty() || items.is_empty() {
        return exact;
    }

    let mut below = f64::NEG_INFINITY;
    let mut above = f64::INFINITY;
    for &value in values {
        if value < pivot && value > below {
            below = value;
        } else if value > pivot && value < above {
            above = value;
        }
    }
    let mut result: Vec<&T> = items
        .iter()
        .zip(values)
        .filter(|(_, &v)| v == below)
        .map(|(item, _)| item)
        .collect();
    result.extend(
        items
            .iter()
            .zip(values)
            .filter(|(_, &v)| v == above)
            .map(|(item, _)| item),
    );
    result
}

/// Items whose value lies closest to the pivot, ties included.
pub fn closest_records<'a, T>(items: &'a [T], values: &[f64], pivot: f64) -> Vec<&'a T> {
    debug_assert_eq!(items.len(), values.len());
    let mut min_delta = f64::INFINITY;
    let mut result: Vec<&T> = Vec::new();
    for (item, &value) in items.iter().zip(values) {
        let delta = (pivot - value).abs();
        if delta < min_delta {
            min_delta = delta;
            result = vec![item];
        } else if delta == min_delta {
            result.push(item);
        }
    }
    result
}

/// Items closest to the mean of the value list.
pub fn mean_records<'a, T>(items: &'a [T], values: &[f64]) -> Vec<&'a T> {
    closest_records(items, values, mean(values))
}

/// Items at (or flanking) the median of the value list.
pub fn median_records<'a, T>(items: &'a [T], values: &[f64]) -> Vec<&'a T> {
    nearest_records(items, values, median(values))
}

/// Which agents a statistic ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    All,
    Si,
    Sfi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Mean,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector {
    Max,
    Min,
    Closest(f64),
    Nearest(f64),
    AtMean,
    AtMedian,
}

/// Grouped statistics over the public records of one round.
#[derive(Debug, Clone)]
pub struct RoundStatistics {
    round: Option<usize>,
    all: Vec<PublicRecord>,
    si: Vec<PublicRecord>,
    sfi: Vec<PublicRecord>,
}

impl RoundStatistics {
    pub fn new(records: Vec<PublicRecord>, round: Option<usize>) -> Self {
        let si = records
            .iter()
            .filter(|r| r.allegiance == Some(Allegiance::Sanctioning))
            .cloned()
            .collect();
        let sfi = records
            .iter()
            .filter(|r| r.allegiance == Some(Allegiance::SanctionFree))
            .cloned()
            .collect();
        Self {
            round,
            all: records,
            si,
            sfi,
        }
    }

    /// Statistics for the time before any round completed.
    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn round(&self) -> Option<usize> {
        self.round
    }

    pub fn records(&self, group: Group) -> &[PublicRecord] {
        match group {
            Group::All => &self.all,
            Group::Si => &self.si,
            Group::Sfi => &self.sfi,
        }
    }

    pub fn values(&self, group: Group, metric: Metric) -> Vec<f64> {
        self.records(group).iter().map(|r| r.metric(metric)).collect()
    }

    pub fn aggregate(&self, aggregate: Aggregate, group: Group, metric: Metric) -> f64 {
        let values = self.values(group, metric);
        match aggregate {
            Aggregate::Mean => mean(&values),
            Aggregate::Median => median(&values),
        }
    }

    pub fn select(&self, selector: Selector, group: Group, metric: Metric) -> Vec<&PublicRecord> {
        let records = self.records(group);
        let values = self.values(group, metric);
        match selector {
            Selector::Max => max_records(records, &values),
            Selector::Min => min_records(records, &values),
            Selector::Closest(pivot) => closest_records(records, &values, pivot),
            Selector::Nearest(pivot) => nearest_records(records, &values, pivot),
            Selector::AtMean => mean_records(records, &values),
            Selector::AtMedian => median_records(records, &values),
        }
    }
}

/// Time series of one agent across all rounds. Contribution and sanctioning
/// are ratios of the respective endowment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesBundle {
    pub si: Vec<f64>,
    pub sfi: Vec<f64>,
    pub payoff: Vec<f64>,
    pub contribution: Vec<f64>,
    pub sanctioning: Vec<f64>,
    pub punishments: Vec<f64>,
    pub commendations: Vec<f64>,
}

impl SeriesBundle {
    /// The per-agent series with their column labels, in export order.
    pub fn fields(&self) -> [(&'static str, &[f64]); 7] {
        [
            ("si", &self.si),
            ("sfi", &self.sfi),
            ("payoff", &self.payoff),
            ("contribution", &self.contribution),
            ("sanctioning", &self.sanctioning),
            ("punishments", &self.punishments),
            ("commendations", &self.commendations),
        ]
    }

    fn from_records(
        series: &[&PublicRecord],
        contribution_tokens: u32,
        sanction_tokens: u32,
    ) -> Self {
        let si: Vec<f64> = series
            .iter()
            .map(|r| {
                if r.allegiance == Some(Allegiance::Sanctioning) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            sfi: si.iter().map(|v| 1.0 - v).collect(),
            si,
            payoff: series.iter().map(|r| r.overall_result).collect(),
            contribution: series
                .iter()
                .map(|r| r.contribution as f64 / contribution_tokens as f64)
                .collect(),
            sanctioning: series
                .iter()
                .map(|r| r.sanctioning as f64 / sanction_tokens as f64)
                .collect(),
            punishments: series.iter().map(|r| r.punishments as f64).collect(),
            commendations: series.iter().map(|r| r.commendations as f64).collect(),
        }
    }

    /// Element-wise mean and population standard deviation over several
    /// agents' bundles, round by round.
    fn aggregate(rows: &[&SeriesBundle]) -> (SeriesBundle, SeriesBundle) {
        let pick = |f: fn(&SeriesBundle) -> &Vec<f64>| {
            let columns: Vec<&[f64]> = rows.iter().map(|b| f(b).as_slice()).collect();
            mean_deviation_rows(&columns)
        };
        let (si_m, si_d) = pick(|b| &b.si);
        let (sfi_m, sfi_d) = pick(|b| &b.sfi);
        let (payoff_m, payoff_d) = pick(|b| &b.payoff);
        let (contribution_m, contribution_d) = pick(|b| &b.contribution);
        let (sanctioning_m, sanctioning_d) = pick(|b| &b.sanctioning);
        let (punishments_m, punishments_d) = pick(|b| &b.punishments);
        let (commendations_m, commendations_d) = pick(|b| &b.commendations);
        (
            SeriesBundle {
                si: si_m,
                sfi: sfi_m,
                payoff: payoff_m,
                contribution: contribution_m,
                sanctioning: sanctioning_m,
                punishments: punishments_m,
                commendations: commendations_m,
            },
            SeriesBundle {
                si: si_d,
                sfi: sfi_d,
                payoff: payoff_d,
                contribution: contribution_d,
                sanctioning: sanctioning_d,
                punishments: punishments_d,
                commendations: commendations_d,
            },
        )
    }
}

fn mean_deviation_rows(rows: &[&[f64]]) -> (Vec<f64>, Vec<f64>) {
    let rounds = rows.first().map_or(0, |r| r.len());
    let k = rows.len() as f64;
    let mut means = Vec::with_capacity(rounds);
    let mut deviations = Vec::with_capacity(rounds);
    for t in 0..rounds {
        let m = rows.iter().map(|r| r[t]).sum::<f64>() / k;
        let var = rows
            .iter()
            .map(|r| {
                let d = r[t] - m;
                d * d
            })
            .sum::<f64>()
            / k;
        means.push(m);
        deviations.push(var.sqrt());
    }
    (means, deviations)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSeries {
    pub name: String,
    pub class_id: String,
    #[serde(flatten)]
    pub series: SeriesBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSeries {
    pub name: String,
    pub members: usize,
    pub mean: SeriesBundle,
    pub deviation: SeriesBundle,
}

/// Whole-experiment evaluation: one value per round in every series. NaN
/// marks rounds where the underlying group was empty.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub si_members: Vec<f64>,
    pub sfi_members: Vec<f64>,
    pub avg_contribution_si: Vec<f64>,
    pub avg_contribution_sfi: Vec<f64>,
    pub high_contributors: Vec<f64>,
    pub free_riders: Vec<f64>,
    pub payoff_high_contributors: Vec<f64>,
    pub payoff_free_riders: Vec<f64>,
    pub non_punishing_high_contributors: Vec<f64>,
    pub punishing_high_contributors: Vec<f64>,
    pub payoff_non_punishing_hc: Vec<f64>,
    pub payoff_punishing_hc: Vec<f64>,
    pub agents: Vec<AgentSeries>,
    pub classes: Vec<ClassSeries>,
}

impl Evaluation {
    pub fn rounds(&self) -> usize {
        self.si_members.len()
    }

    /// The global series with their display labels, in presentation order.
    pub fn global_series(&self) -> Vec<(&'static str, &[f64])> {
        vec![
            ("Subjects choosing SI", &self.si_members),
            ("Subjects choosing SFI", &self.sfi_members),
            ("Average contribution in SI", &self.avg_contribution_si),
            ("Average contribution in SFI", &self.avg_contribution_sfi),
            ("High contributors in SI", &self.high_contributors),
            ("Free-riders in SFI", &self.free_riders),
            (
                "Average payoff of high contributors in SI",
                &self.payoff_high_contributors,
            ),
            (
                "Average payoff of free-riders in SFI",
                &self.payoff_free_riders,
            ),
            (
                "High contributors & non-punishers",
                &self.non_punishing_high_contributors,
            ),
            (
                "High contributors & punishers",
                &self.punishing_high_contributors,
            ),
            (
                "Average payoff of high contributors & non-punishers",
                &self.payoff_non_punishing_hc,
            ),
            (
                "Average payoff of high contributors & punishers",
                &self.payoff_punishing_hc,
            ),
        ]
    }
}

fn mean_or_nan(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Accumulates the round statistics of a whole experiment and evaluates
/// them into the time series of `Evaluation`.
#[derive(Debug, Clone)]
pub struct ExperimentStatistics {
    contribution_tokens: u32,
    sanction_tokens: u32,
    agent_names: Vec<String>,
    agent_classes: Vec<String>,
    rounds: Vec<RoundStatistics>,
}

impl ExperimentStatistics {
    pub fn new(
        contribution_tokens: u32,
        sanction_tokens: u32,
        agent_names: Vec<String>,
        agent_classes: Vec<String>,
    ) -> Self {
        debug_assert_eq!(agent_names.len(), agent_classes.len());
        Self {
            contribution_tokens,
            sanction_tokens,
            agent_names,
            agent_classes,
            rounds: Vec::new(),
        }
    }

    /// Adds one completed round. Records must arrive in round order and in
    /// a constant agent order, or the per-agent series would not line up.
    pub fn add(&mut self, records: &[AgentRecord], round: usize) -> Result<()> {
        if round != self.rounds.len() {
            return Err(LabError::ProcessingError {
                message: format!(
                    "round {} recorded out of order, expected {}",
                    round,
                    self.rounds.len()
                ),
            });
        }
        if records.len() != self.agent_names.len() {
            return Err(LabError::ProcessingError {
                message: format!(
                    "round {} has {} agents, session has {}",
                    round,
                    records.len(),
                    self.agent_names.len()
                ),
            });
        }
        let public: Vec<PublicRecord> = records
            .iter()
            .map(|r| PublicRecord::from_record(r, self.sanction_tokens))
            .collect();
        self.rounds.push(RoundStatistics::new(public, Some(round)));
        Ok(())
    }

    pub fn rounds_recorded(&self) -> usize {
        self.rounds.len()
    }

    pub fn round_stats(&self, round: usize) -> Option<&RoundStatistics> {
        self.rounds.get(round)
    }

    pub fn agent_names(&self) -> &[String] {
        &self.agent_names
    }

    pub fn agent_classes(&self) -> &[String] {
        &self.agent_classes
    }

    pub fn evaluation(&self) -> Result<Evaluation> {
        if self.rounds.is_empty() {
            return Err(LabError::ProcessingError {
                message: "nothing to evaluate yet".to_string(),
            });
        }

        let num_agents = self.agent_names.len() as f64;
        let max_contribution = self.contribution_tokens as f64;
        let hc_threshold = (3 * self.contribution_tokens) / 4;
        let fr_threshold = self.contribution_tokens / 4;

        let rounds = self.rounds.len();
        let mut evaluation = Evaluation {
            si_members: Vec::with_capacity(rounds),
            sfi_members: Vec::with_capacity(rounds),
            avg_contribution_si: Vec::with_capacity(rounds),
            avg_contribution_sfi: Vec::with_capacity(rounds),
            high_contributors: Vec::with_capacity(rounds),
            free_riders: Vec::with_capacity(rounds),
            payoff_high_contributors: Vec::with_capacity(rounds),
            payoff_free_riders: Vec::with_capacity(rounds),
            non_punishing_high_contributors: Vec::with_capacity(rounds),
            punishing_high_contributors: Vec::with_capacity(rounds),
            payoff_non_punishing_hc: Vec::with_capacity(rounds),
            payoff_punishing_hc: Vec::with_capacity(rounds),
            agents: Vec::new(),
            classes: Vec::new(),
        };

        for stats in &self.rounds {
            let si = stats.records(Group::Si);
            let sfi = stats.records(Group::Sfi);

            let high_contributors: Vec<&PublicRecord> = si
                .iter()
                .filter(|r| r.contribution >= hc_threshold)
                .collect();
            let free_riders: Vec<&PublicRecord> = sfi
                .iter()
                .filter(|r| r.contribution <= fr_threshold)
                .collect();
            let punishers: Vec<&PublicRecord> = high_contributors
                .iter()
                .copied()
                .filter(|r| r.sanctioning > 0)
                .collect();
            let non_punishers: Vec<&PublicRecord> = high_contributors
                .iter()
                .copied()
                .filter(|r| r.sanctioning == 0)
                .collect();

            let si_share = si.len() as f64 / num_agents;
            evaluation.si_members.push(si_share);
            evaluation.sfi_members.push(1.0 - si_share);

            evaluation.avg_contribution_si.push(if si.is_empty() {
                f64::NAN
            } else {
                si.iter().map(|r| r.contribution as f64).sum::<f64>()
                    / (max_contribution * si.len() as f64)
            });
            evaluation.avg_contribution_sfi.push(if sfi.is_empty() {
                f64::NAN
            } else {
                sfi.iter().map(|r| r.contribution as f64).sum::<f64>()
                    / (max_contribution * sfi.len() as f64)
            });

            evaluation
                .high_contributors
                .push(high_contributors.len() as f64 / num_agents);
            evaluation
                .free_riders
                .push(free_riders.len() as f64 / num_agents);

            let hc_payoffs: Vec<f64> = high_contributors.iter().map(|r| r.overall_result).collect();
            let fr_payoffs: Vec<f64> = free_riders.iter().map(|r| r.overall_result).collect();
            evaluation
                .payoff_high_contributors
                .push(mean_or_nan(&hc_payoffs));
            evaluation.payoff_free_riders.push(mean_or_nan(&fr_payoffs));

            evaluation
                .non_punishing_high_contributors
                .push(if si.is_empty() {
                    f64::NAN
                } else {
                    non_punishers.len() as f64 / si.len() as f64
                });
            evaluation.punishing_high_contributors.push(if si.is_empty() {
                f64::NAN
            } else {
                punishers.len() as f64 / si.len() as f64
            });

            let np_payoffs: Vec<f64> = non_punishers.iter().map(|r| r.overall_result).collect();
            let p_payoffs: Vec<f64> = punishers.iter().map(|r| r.overall_result).collect();
            evaluation
                .payoff_non_punishing_hc
                .push(mean_or_nan(&np_payoffs));
            evaluation.payoff_punishing_hc.push(mean_or_nan(&p_payoffs));
        }

        self.agent_evaluation(&mut evaluation);
        Ok(evaluation)
    }

    // Per-agent time series rely on every round listing the agents in the
    // same order, which add() guarantees by taking non-anonymized records.
    fn agent_evaluation(&self, evaluation: &mut Evaluation) {
        for (index, (name, class_id)) in self
            .agent_names
            .iter()
            .zip(&self.agent_classes)
            .enumerate()
        {
            let series: Vec<&PublicRecord> = self
                .rounds
                .iter()
                .map(|stats| &stats.records(Group::All)[index])
                .collect();
            evaluation.agents.push(AgentSeries {
                name: name.clone(),
                class_id: class_id.clone(),
                series: SeriesBundle::from_records(
                    &series,
                    self.contribution_tokens,
                    self.sanction_tokens,
                ),
            });
        }

        let mut class_order: Vec<&String> = Vec::new();
        for class_id in &self.agent_classes {
            if !class_order.contains(&class_id) {
                class_order.push(class_id);
            }
        }
        for class_id in class_order {
            let rows: Vec<&SeriesBundle> = evaluation
                .agents
                .iter()
                .filter(|a| &a.class_id == class_id)
                .map(|a| &a.series)
                .collect();
            let (mean, deviation) = SeriesBundle::aggregate(&rows);
            evaluation.classes.push(ClassSeries {
                name: class_id.clone(),
                members: rows.len(),
                mean,
                deviation,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(allegiance: Option<Allegiance>, contribution: u32, profit: f64) -> PublicRecord {
        let mut r = AgentRecord::new();
        r.allegiance = allegiance;
        r.contribution = contribution;
        r.profit = profit;
        PublicRecord::from_record(&r, 20)
    }

    #[test]
    fn mean_and_median_basics() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn extreme_selectors_keep_ties() {
        let items = ["a", "b", "c", "d"];
        let values = [3.0, 7.0, 7.0, 1.0];
        assert_eq!(max_records(&items, &values), vec![&"b", &"c"]);
        assert_eq!(min_records(&items, &values), vec![&"d"]);
    }

    #[test]
    fn nearest_prefers_exact_matches() {
        let items = ["a", "b", "c"];
        let values = [1.0, 2.0, 3.0];
        assert_eq!(nearest_records(&items, &values, 2.0), vec![&"b"]);
        // Flanking groups, below first
        assert_eq!(nearest_records(&items, &values, 2.5), vec![&"b", &"c"]);
        // Nothing below the pivot
        assert_eq!(nearest_records(&items, &values, 0.5), vec![&"a"]);
        let empty: Vec<&&str> = Vec::new();
        assert_eq!(nearest_records(&items[..0], &values[..0], 1.0), empty);
    }

    #[test]
    fn closest_collects_ties_on_both_sides() {
        let items = ["a", "b", "c"];
        let values = [1.0, 3.0, 2.0];
        assert_eq!(closest_records(&items, &values, 2.5), vec![&"b", &"c"]);
    }

    #[test]
    fn round_statistics_groups_and_aggregates() {
        let records = vec![
            record(Some(Allegiance::Sanctioning), 10, 12.0),
            record(Some(Allegiance::SanctionFree), 4, 20.0),
            record(Some(Allegiance::Sanctioning), 20, 8.0),
        ];
        let stats = RoundStatistics::new(records, Some(3));

        assert_eq!(stats.round(), Some(3));
        assert_eq!(stats.records(Group::All).len(), 3);
        assert_eq!(stats.records(Group::Si).len(), 2);
        assert_eq!(stats.records(Group::Sfi).len(), 1);
        assert_eq!(
            stats.aggregate(Aggregate::Mean, Group::Si, Metric::Contribution),
            15.0
        );
        assert_eq!(
            stats.aggregate(Aggregate::Median, Group::All, Metric::Contribution),
            10.0
        );
        let top = stats.select(Selector::Max, Group::Si, Metric::Contribution);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].contribution, 20);
    }

    #[test]
    fn empty_round_statistics() {
        let stats = RoundStatistics::empty();
        assert_eq!(stats.round(), None);
        assert!(stats.records(Group::All).is_empty());
        assert_eq!(stats.aggregate(Aggregate::Mean, Group::Sfi, Metric::Profit), 0.0);
    }

    fn agent_record(allegiance: Allegiance, contribution: u32, profit: f64) -> AgentRecord {
        let mut r = AgentRecord::new();
        r.allegiance = Some(allegiance);
        r.contribution = contribution;
        r.profit = profit;
        r
    }

    fn experiment() -> ExperimentStatistics {
        ExperimentStatistics::new(
            20,
            20,
            vec!["0001.A".into(), "0002.A".into(), "0003.B".into(), "0004.B".into()],
            vec!["A".into(), "A".into(), "B".into(), "B".into()],
        )
    }

    #[test]
    fn add_enforces_ordering_and_agent_count() {
        let mut stats = experiment();
        let round: Vec<AgentRecord> = (0..4)
            .map(|_| agent_record(Allegiance::SanctionFree, 5, 10.0))
            .collect();
        assert!(stats.add(&round, 1).is_err());
        assert!(stats.add(&round, 0).is_ok());
        assert!(stats.add(&round[..3], 1).is_err());
        assert!(stats.add(&round, 1).is_ok());
        assert_eq!(stats.rounds_recorded(), 2);
    }

    #[test]
    fn evaluation_global_series() {
        let mut stats = experiment();
        // Round 0: everyone sanction-free, two free-riders
        stats
            .add(
                &[
                    agent_record(Allegiance::SanctionFree, 2, 10.0),
                    agent_record(Allegiance::SanctionFree, 5, 10.0),
                    agent_record(Allegiance::SanctionFree, 18, 4.0),
                    agent_record(Allegiance::SanctionFree, 12, 8.0),
                ],
                0,
            )
            .unwrap();
        // Round 1: half move to the SI, one high contributor there
        stats
            .add(
                &[
                    agent_record(Allegiance::Sanctioning, 16, 12.0),
                    agent_record(Allegiance::SanctionFree, 4, 14.0),
                    agent_record(Allegiance::Sanctioning, 10, 9.0),
                    agent_record(Allegiance::SanctionFree, 0, 16.0),
                ],
                1,
            )
            .unwrap();

        let evaluation = stats.evaluation().unwrap();
        assert_eq!(evaluation.rounds(), 2);
        assert_eq!(evaluation.si_members, vec![0.0, 0.5]);
        assert_eq!(evaluation.sfi_members, vec![1.0, 0.5]);
        // SI empty in round 0
        assert!(evaluation.avg_contribution_si[0].is_nan());
        assert!((evaluation.avg_contribution_si[1] - 26.0 / 40.0).abs() < 1e-12);
        // Threshold 15 for high contributors, 5 for free-riders
        assert_eq!(evaluation.high_contributors, vec![0.0, 0.25]);
        assert_eq!(evaluation.free_riders, vec![0.5, 0.5]);
        assert!(evaluation.payoff_high_contributors[0].is_nan());
        // 12 profit + 20 unspent sanction tokens
        assert!((evaluation.payoff_high_contributors[1] - 32.0).abs() < 1e-12);
        // Nobody sanctioned, so every SI high contributor is a non-punisher
        assert!(evaluation.non_punishing_high_contributors[0].is_nan());
        assert_eq!(evaluation.non_punishing_high_contributors[1], 0.5);
        assert_eq!(evaluation.punishing_high_contributors[1], 0.0);
    }

    #[test]
    fn evaluation_agent_and_class_series() {
        let mut stats = experiment();
        for round in 0..2 {
            stats
                .add(
                    &[
                        agent_record(Allegiance::Sanctioning, 20, 10.0),
                        agent_record(Allegiance::Sanctioning, 10, 10.0),
                        agent_record(Allegiance::SanctionFree, 0, 10.0),
                        agent_record(Allegiance::SanctionFree, 10, 10.0),
                    ],
                    round,
                )
                .unwrap();
        }
        let evaluation = stats.evaluation().unwrap();

        assert_eq!(evaluation.agents.len(), 4);
        let first = &evaluation.agents[0];
        assert_eq!(first.name, "0001.A");
        assert_eq!(first.series.si, vec![1.0, 1.0]);
        assert_eq!(first.series.contribution, vec![1.0, 1.0]);

        assert_eq!(evaluation.classes.len(), 2);
        let class_a = &evaluation.classes[0];
        assert_eq!(class_a.name, "A");
        assert_eq!(class_a.members, 2);
        // Contributions 1.0 and 0.5: mean 0.75, population deviation 0.25
        assert_eq!(class_a.mean.contribution, vec![0.75, 0.75]);
        assert_eq!(class_a.deviation.contribution, vec![0.25, 0.25]);
        let class_b = &evaluation.classes[1];
        assert_eq!(class_b.mean.si, vec![0.0, 0.0]);
    }

    #[test]
    fn evaluation_needs_data() {
        let stats = experiment();
        assert!(stats.evaluation().is_err());
    }
}
