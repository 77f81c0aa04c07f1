//! Chronicles record the full history of a session and load it back later.
//!
//! A chronicle hangs off the world as a [`Recorder`]. It keeps the
//! non-anonymized per-round records, feeds the running statistics and
//! serializes everything to a self describing JSON document that can be
//! evaluated long after the session ran.

use crate::core::stats::{Evaluation, ExperimentStatistics};
use crate::core::world::SessionSetup;
use crate::domain::model::AgentRecord;
use crate::domain::ports::Recorder;
use crate::utils::error::{LabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything worth knowing about how a session was set up, including the
/// variable names as a schema guard for old files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupRecord {
    pub title: String,
    pub experimenters: String,
    pub description: String,
    pub date: String,
    #[serde(flatten)]
    pub session: SessionSetup,
    pub variables: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChronicleFile {
    setup: SetupRecord,
    results: Vec<Vec<AgentRecord>>,
}

/// Follows a session's progress and keeps the collected data.
#[derive(Debug)]
pub struct Chronicle {
    title: String,
    experimenters: String,
    description: String,
    setup: Option<SetupRecord>,
    rounds: Vec<Vec<AgentRecord>>,
    statistics: Option<ExperimentStatistics>,
}

impl Chronicle {
    pub fn new(title: &str, experimenters: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            experimenters: experimenters.to_string(),
            description: description.to_string(),
            setup: None,
            rounds: Vec::new(),
            statistics: None,
        }
    }

    pub fn setup(&self) -> Option<&SetupRecord> {
        self.setup.as_ref()
    }

    pub fn rounds(&self) -> &[Vec<AgentRecord>] {
        &self.rounds
    }

    pub fn stats(&self) -> Option<&ExperimentStatistics> {
        self.statistics.as_ref()
    }

    /// Setup information as ordered label/value rows, for display.
    pub fn setup_table(&self) -> Vec<(String, String)> {
        let setup = match &self.setup {
            Some(setup) => setup,
            None => return Vec::new(),
        };
        let mut classes: Vec<&str> = Vec::new();
        for class in &setup.session.agent_classes {
            if !classes.contains(&class.as_str()) {
                classes.push(class);
            }
        }
        vec![
            ("Title".to_string(), setup.title.clone()),
            ("Date".to_string(), setup.date.clone()),
            ("Experimenters".to_string(), setup.experimenters.clone()),
            ("Description".to_string(), setup.description.clone()),
            ("Game".to_string(), setup.session.game.clone()),
            (
                "Institutions".to_string(),
                setup.session.institutions.join(", "),
            ),
            (
                "Agents".to_string(),
                setup.session.agent_ids.len().to_string(),
            ),
            ("Agent classes".to_string(), classes.join(", ")),
            (
                "Rounds".to_string(),
                setup.session.max_rounds.to_string(),
            ),
            (
                "Tokens for contribution".to_string(),
                setup.session.contribution_tokens.to_string(),
            ),
            (
                "Tokens for sanctioning".to_string(),
                setup.session.sanction_tokens.to_string(),
            ),
            ("Basic variables".to_string(), setup.variables.join(", ")),
        ]
    }

    /// Evaluates the recorded data. Only complete sessions can be
    /// evaluated; a chronicle of a session that is still running is
    /// rejected.
    pub fn evaluation(&self) -> Result<Evaluation> {
        let setup = self.setup.as_ref().ok_or_else(|| LabError::ChronicleError {
            message: "no session has been recorded".to_string(),
        })?;
        if self.rounds.len() != setup.session.max_rounds {
            return Err(LabError::ChronicleError {
                message: format!(
                    "the session is still running: {} of {} rounds recorded",
                    self.rounds.len(),
                    setup.session.max_rounds
                ),
            });
        }
        let statistics = self.statistics.as_ref().ok_or_else(|| LabError::ChronicleError {
            message: "no statistics collected".to_string(),
        })?;
        statistics.evaluation()
    }

    pub fn to_json(&self) -> Result<String> {
        let setup = self.setup.as_ref().ok_or_else(|| LabError::ChronicleError {
            message: "no session has been recorded".to_string(),
        })?;
        if self.rounds.is_empty() {
            return Err(LabError::ChronicleError {
                message: "no rounds have been recorded".to_string(),
            });
        }
        let file = ChronicleFile {
            setup: setup.clone(),
            results: self.rounds.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Rebuilds a chronicle, including its statistics, from a stored JSON
    /// document.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: ChronicleFile = serde_json::from_str(text)?;

        let expected: HashSet<&str> = AgentRecord::VARIABLES.iter().copied().collect();
        let found: HashSet<&str> = file.setup.variables.iter().map(|v| v.as_str()).collect();
        if expected != found {
            return Err(LabError::ChronicleError {
                message: format!(
                    "variable names in the chronicle do not match this version, expected {:?}",
                    AgentRecord::VARIABLES
                ),
            });
        }
        if file.results.is_empty() {
            return Err(LabError::ChronicleError {
                message: "the chronicle holds no recorded rounds".to_string(),
            });
        }

        let mut statistics = ExperimentStatistics::new(
            file.setup.session.contribution_tokens,
            file.setup.session.sanction_tokens,
            file.setup.session.agent_ids.clone(),
            file.setup.session.agent_classes.clone(),
        );
        for (round, records) in file.results.iter().enumerate() {
            statistics.add(records, round)?;
        }

        Ok(Self {
            title: file.setup.title.clone(),
            experimenters: file.setup.experimenters.clone(),
            description: file.setup.description.clone(),
            setup: Some(file.setup),
            rounds: file.results,
            statistics: Some(statistics),
        })
    }
}

impl Default for Chronicle {
    fn default() -> Self {
        Self::new("?", "N.N.", "-")
    }
}

impl Recorder for Chronicle {
    fn on_setup(&mut self, setup: &SessionSetup) {
        self.setup = Some(SetupRecord {
            title: self.title.clone(),
            experimenters: self.experimenters.clone(),
            description: self.description.clone(),
            date: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
            session: setup.clone(),
            variables: AgentRecord::VARIABLES.iter().map(|v| v.to_string()).collect(),
        });
        self.statistics = Some(ExperimentStatistics::new(
            setup.contribution_tokens,
            setup.sanction_tokens,
            setup.agent_ids.clone(),
            setup.agent_classes.clone(),
        ));
        self.rounds.clear();
    }

    fn on_round_complete(&mut self, round: usize, records: &[AgentRecord]) -> Result<()> {
        let statistics = self.statistics.as_mut().ok_or_else(|| LabError::ChronicleError {
            message: "a round was reported before the session setup".to_string(),
        })?;
        statistics.add(records, round)?;
        self.rounds.push(records.to_vec());
        Ok(())
    }
}
