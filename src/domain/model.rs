use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Institution an agent belongs to in a given round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Allegiance {
    #[serde(rename = "SI")]
    Sanctioning,
    #[serde(rename = "SFI")]
    SanctionFree,
}

impl fmt::Display for Allegiance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allegiance::Sanctioning => write!(f, "SI"),
            Allegiance::SanctionFree => write!(f, "SFI"),
        }
    }
}

/// Per-agent bookkeeping for one round. Sanction maps are keyed by the
/// receiving agent's real index, so chronicles stay readable across the
/// per-round anonymization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub account: f64,
    pub allegiance: Option<Allegiance>,
    pub commendations: u32,
    pub contribution: u32,
    pub profit: f64,
    pub punishments: u32,
    pub received_sanct: i64,
    pub sanct_negative: HashMap<usize, u32>,
    pub sanct_positive: HashMap<usize, u32>,
}

impl AgentRecord {
    /// Canonical variable names, stored in chronicles as a schema guard.
    pub const VARIABLES: [&'static str; 9] = [
        "account",
        "allegiance",
        "commendations",
        "contribution",
        "profit",
        "punishments",
        "received_sanct",
        "sanct_negative",
        "sanct_positive",
    ];

    pub fn new() -> Self {
        Self {
            account: 0.0,
            allegiance: None,
            commendations: 0,
            contribution: 0,
            profit: 0.0,
            punishments: 0,
            received_sanct: 0,
            sanct_negative: HashMap::new(),
            sanct_positive: HashMap::new(),
        }
    }

    /// Tokens this agent spent on sanctioning others this round.
    pub fn sanctioning(&self) -> u32 {
        self.sanct_positive.values().sum::<u32>() + self.sanct_negative.values().sum::<u32>()
    }

    /// Round profit after the sanctions received.
    pub fn net_profit(&self) -> f64 {
        self.profit + self.received_sanct as f64
    }

    /// Round result including the unspent sanctioning endowment.
    pub fn overall_result(&self, sanction_tokens: u32) -> f64 {
        self.net_profit() + sanction_tokens as f64 - self.sanctioning() as f64
    }

    /// Wipes the sanction bookkeeping at the start of a sanctioning stage.
    pub fn clear_sanctions(&mut self) {
        self.received_sanct = 0;
        self.commendations = 0;
        self.punishments = 0;
        self.sanct_positive.clear();
        self.sanct_negative.clear();
    }
}

impl Default for AgentRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Publicly observable numeric variables of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Contribution,
    Profit,
    ReceivedSanct,
    Commendations,
    Punishments,
    NetProfit,
    OverallResult,
    Sanctioning,
}

/// Anonymized snapshot of an agent that other agents may inspect. The
/// account balance and the sanction maps stay private; derived values are
/// baked in at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRecord {
    pub allegiance: Option<Allegiance>,
    pub commendations: u32,
    pub contribution: u32,
    pub profit: f64,
    pub punishments: u32,
    pub received_sanct: i64,
    pub net_profit: f64,
    pub overall_result: f64,
    pub sanctioning: u32,
}

impl PublicRecord {
    pub fn from_record(record: &AgentRecord, sanction_tokens: u32) -> Self {
        Self {
            allegiance: record.allegiance,
            commendations: record.commendations,
            contribution: record.contribution,
            profit: record.profit,
            punishments: record.punishments,
            received_sanct: record.received_sanct,
            net_profit: record.net_profit(),
            overall_result: record.overall_result(sanction_tokens),
            sanctioning: record.sanctioning(),
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Contribution => self.contribution as f64,
            Metric::Profit => self.profit,
            Metric::ReceivedSanct => self.received_sanct as f64,
            Metric::Commendations => self.commendations as f64,
            Metric::Punishments => self.punishments as f64,
            Metric::NetProfit => self.net_profit,
            Metric::OverallResult => self.overall_result,
            Metric::Sanctioning => self.sanctioning as f64,
        }
    }
}

/// One agent's sanction decision for a round, expressed in the anonymized
/// indices of its fellow institution members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sanctions {
    pub positive: HashMap<usize, u32>,
    pub negative: HashMap<usize, u32>,
}

impl Sanctions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn spent(&self) -> u32 {
        self.positive.values().sum::<u32>() + self.negative.values().sum::<u32>()
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    /// Checks that only allowed peers are targeted and the budget holds.
    pub fn validate(&self, allowed: &[usize], budget: u32) -> std::result::Result<(), String> {
        for &index in self.positive.keys().chain(self.negative.keys()) {
            if !allowed.contains(&index) {
                return Err(format!("target {} is not a fellow member", index));
            }
        }
        let spent = self.spent();
        if spent > budget {
            return Err(format!("spent {} tokens of a budget of {}", spent, budget));
        }
        Ok(())
    }
}
