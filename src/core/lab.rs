use std::time::Instant;

use crate::config::cli::LocalStorage;
use crate::config::toml_config::ExperimentConfig;
use crate::core::chronicle::Chronicle;
use crate::core::game::LinearPublicGoods;
use crate::core::stats::{mean, Evaluation};
use crate::core::world::{Participant, SessionParams, World};
use crate::domain::ports::{Game, Storage};
use crate::utils::error::{LabError, Result};
use crate::utils::monitor::SystemMonitor;

/// 實驗引擎:把一份設定檔變成一場完整的模擬與其輸出檔案
pub struct LabEngine<S: Storage> {
    storage: S,
    config: ExperimentConfig,
    monitor: SystemMonitor,
}

impl LabEngine<LocalStorage> {
    pub fn new(config: ExperimentConfig) -> Self {
        let monitoring = config.monitoring_enabled();
        Self::new_with_monitoring(config, monitoring)
    }

    /// 建立引擎並明確指定是否監控系統資源
    pub fn new_with_monitoring(config: ExperimentConfig, monitoring: bool) -> Self {
        let storage = LocalStorage::new(config.output.directory.clone());
        Self {
            storage,
            config,
            monitor: SystemMonitor::new(monitoring),
        }
    }
}

impl<S: Storage> LabEngine<S> {
    pub fn with_storage(storage: S, config: ExperimentConfig) -> Self {
        let monitoring = config.monitoring_enabled();
        Self {
            storage,
            config,
            monitor: SystemMonitor::new(monitoring),
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// 執行完整實驗流程,回傳輸出目錄
    pub fn run(&self) -> Result<String> {
        let start = Instant::now();
        tracing::info!("🚀 Starting experiment: {}", self.config.experiment.title);
        self.monitor.log_stats("Experiment started.");

        // 第一階段:依設定組建受試群體
        let game = LinearPublicGoods::new(self.config.game.gain_factor)?;
        let participants = self.build_population()?;
        if participants.len() < game.min_group_size() {
            return Err(LabError::SetupError {
                message: format!(
                    "population of {} is below the minimum group size {} for gain factor {}",
                    participants.len(),
                    game.min_group_size(),
                    self.config.game.gain_factor
                ),
            });
        }
        tracing::info!(
            "👥 Population ready: {} agents from {} strategy groups",
            participants.len(),
            self.config.population.len()
        );
        self.monitor.log_stats("Population built.");

        // 第二階段:跑完整場賽局
        let seed = self.config.seed_or_random();
        tracing::info!("🎲 Session seed: {}", seed);
        let params = SessionParams {
            max_rounds: self.config.session.rounds,
            contribution_tokens: self.config.session.contribution_tokens,
            sanction_tokens: self.config.session.sanction_tokens,
            seed,
        };
        let chronicle = Chronicle::new(
            &self.config.experiment.title,
            &self.config.experiment.experimenters,
            &self.config.experiment.description,
        );
        let mut world = World::new(Box::new(game), participants, params, chronicle)?;
        world.run()?;
        let chronicle = world.into_recorder();
        tracing::info!("✅ Simulation finished: {} rounds", chronicle.rounds().len());
        self.monitor.log_stats("Simulation finished.");

        // 第三階段:統計評估
        let evaluation = chronicle.evaluation()?;
        tracing::info!("📊 Evaluation computed over {} rounds", evaluation.rounds());
        self.monitor.log_stats("Evaluation computed.");

        // 第四階段:匯出成果
        let written = self.export(&chronicle, &evaluation)?;
        tracing::info!(
            "💾 Wrote {} files to {}",
            written.len(),
            self.config.output.directory
        );
        self.monitor.log_stats("Export finished.");

        println!("{}", summarize(&evaluation));

        tracing::info!("✅ Experiment completed in {:?}", start.elapsed());
        self.monitor.log_final_stats();
        Ok(self.config.output.directory.clone())
    }

    fn build_population(&self) -> Result<Vec<Participant>> {
        if self.config.population.is_empty() {
            return Err(LabError::MissingConfigError {
                field: "population".to_string(),
            });
        }
        let mut participants = Vec::with_capacity(self.config.total_agents());
        for group in &self.config.population {
            for _ in 0..group.count {
                let strategy = group.strategy.build();
                participants.push(Participant::new(participants.len(), strategy));
            }
        }
        Ok(participants)
    }

    fn export(&self, chronicle: &Chronicle, evaluation: &Evaluation) -> Result<Vec<String>> {
        let mut written = Vec::new();

        // 實驗紀錄永遠保存,它是重建其他輸出的依據
        self.storage
            .write_file("chronicle.json", chronicle.to_json()?.as_bytes())?;
        written.push("chronicle.json".to_string());

        for format in self.config.formats() {
            match format.as_str() {
                "csv" => {
                    self.storage
                        .write_file("evaluation.csv", &global_series_csv(evaluation)?)?;
                    self.storage
                        .write_file("agents.csv", &agent_series_csv(evaluation)?)?;
                    self.storage
                        .write_file("classes.csv", &class_series_csv(evaluation)?)?;
                    written.push("evaluation.csv".to_string());
                    written.push("agents.csv".to_string());
                    written.push("classes.csv".to_string());
                }
                "json" => {
                    let text = serde_json::to_string_pretty(evaluation)?;
                    self.storage
                        .write_file("evaluation.json", text.as_bytes())?;
                    written.push("evaluation.json".to_string());
                }
                other => {
                    return Err(LabError::InvalidConfigValueError {
                        field: "output.formats".to_string(),
                        value: other.to_string(),
                        reason: "supported formats are csv and json".to_string(),
                    });
                }
            }
        }
        Ok(written)
    }
}

/// End-of-run summary table: the final-round value and the whole-run mean
/// of every global series. Rounds without observations are skipped in the
/// mean; a series with no observations at all shows NaN.
pub fn summarize(evaluation: &Evaluation) -> String {
    let mut lines = Vec::with_capacity(13);
    lines.push(format!("{:<52} {:>10} {:>10}", "Series", "final", "mean"));
    for (label, values) in evaluation.global_series() {
        let last = values.last().copied().unwrap_or(f64::NAN);
        let observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let avg = if observed.is_empty() {
            f64::NAN
        } else {
            mean(&observed)
        };
        lines.push(format!("{:<52} {:>10.3} {:>10.3}", label, last, avg));
    }
    lines.join("\n")
}

/// One row per round, one column per global series. NaN cells mark rounds
/// where the series' group was empty.
fn global_series_csv(evaluation: &Evaluation) -> Result<Vec<u8>> {
    let series = evaluation.global_series();
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["round".to_string()];
    header.extend(series.iter().map(|(label, _)| label.to_string()));
    writer.write_record(&header)?;

    for round in 0..evaluation.rounds() {
        let mut row = vec![(round + 1).to_string()];
        row.extend(series.iter().map(|(_, values)| values[round].to_string()));
        writer.write_record(&row)?;
    }
    finish(writer)
}

/// Long format: one row per agent and round.
fn agent_series_csv(evaluation: &Evaluation) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["agent".to_string(), "class".to_string(), "round".to_string()];
    if let Some(agent) = evaluation.agents.first() {
        header.extend(agent.series.fields().iter().map(|(label, _)| label.to_string()));
    }
    writer.write_record(&header)?;

    for agent in &evaluation.agents {
        for round in 0..evaluation.rounds() {
            let mut row = vec![
                agent.name.clone(),
                agent.class_id.clone(),
                (round + 1).to_string(),
            ];
            row.extend(
                agent
                    .series
                    .fields()
                    .iter()
                    .map(|(_, values)| values[round].to_string()),
            );
            writer.write_record(&row)?;
        }
    }
    finish(writer)
}

/// One row per strategy class and round, with the class mean and standard
/// deviation of every per-agent series.
fn class_series_csv(evaluation: &Evaluation) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "class".to_string(),
        "members".to_string(),
        "round".to_string(),
    ];
    if let Some(class) = evaluation.classes.first() {
        for (label, _) in class.mean.fields() {
            header.push(format!("mean_{}", label));
            header.push(format!("sd_{}", label));
        }
    }
    writer.write_record(&header)?;

    for class in &evaluation.classes {
        for round in 0..evaluation.rounds() {
            let mut row = vec![
                class.name.clone(),
                class.members.to_string(),
                (round + 1).to_string(),
            ];
            for ((_, means), (_, deviations)) in
                class.mean.fields().iter().zip(class.deviation.fields().iter())
            {
                row.push(means[round].to_string());
                row.push(deviations[round].to_string());
            }
            writer.write_record(&row)?;
        }
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| LabError::ProcessingError {
        message: format!("failed to flush CSV buffer: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemoryStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemoryStorage {
        fn text(&self, path: &str) -> String {
            let files = self.files.lock().unwrap();
            let data = files.get(path).cloned().unwrap_or_default();
            String::from_utf8(data).unwrap()
        }

        fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl Storage for MemoryStorage {
        fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| LabError::ProcessingError {
                    message: format!("no such file: {}", path),
                })
        }

        fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn small_config() -> ExperimentConfig {
        ExperimentConfig::from_toml_str(
            r#"
            [experiment]
            title = "Institution choice under punishment"
            experimenters = "Unit Test"
            description = "Five agents over four rounds"

            [game]
            gain_factor = 1.6

            [session]
            rounds = 4
            contribution_tokens = 20
            sanction_tokens = 20
            seed = 7

            [[population]]
            strategy = "random"
            count = 2

            [[population]]
            strategy = "egoist_punisher"
            count = 3

            [output]
            directory = "unused"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn run_writes_every_artifact() {
        let storage = MemoryStorage::default();
        let engine = LabEngine::with_storage(storage.clone(), small_config());

        let output_dir = engine.run().unwrap();

        assert_eq!(output_dir, "unused");
        assert_eq!(
            storage.names(),
            vec![
                "agents.csv",
                "chronicle.json",
                "classes.csv",
                "evaluation.csv",
                "evaluation.json"
            ]
        );

        let chronicle = Chronicle::from_json(&storage.text("chronicle.json")).unwrap();
        assert_eq!(chronicle.rounds().len(), 4);
        assert_eq!(chronicle.evaluation().unwrap().rounds(), 4);
    }

    #[test]
    fn csv_exports_have_one_row_per_subject() {
        let storage = MemoryStorage::default();
        let engine = LabEngine::with_storage(storage.clone(), small_config());
        engine.run().unwrap();

        let evaluation = storage.text("evaluation.csv");
        assert_eq!(evaluation.lines().count(), 1 + 4);
        let header = evaluation.lines().next().unwrap();
        assert!(header.starts_with("round,Subjects choosing SI,"));

        // 5 agents and 2 classes, 4 rounds each
        assert_eq!(storage.text("agents.csv").lines().count(), 1 + 5 * 4);
        assert_eq!(storage.text("classes.csv").lines().count(), 1 + 2 * 4);

        let agents = storage.text("agents.csv");
        let mut rows = agents.lines();
        assert_eq!(
            rows.next().unwrap(),
            "agent,class,round,si,sfi,payoff,contribution,sanctioning,punishments,commendations"
        );
        assert!(rows.next().unwrap().starts_with("0001.Random,Random,1,"));
    }

    #[test]
    fn population_below_minimum_group_size_is_refused() {
        let mut config = small_config();
        config.game.gain_factor = 3.5;
        config.population[0].count = 1;
        config.population[1].count = 2;

        let engine = LabEngine::with_storage(MemoryStorage::default(), config);
        let err = engine.run().unwrap_err();
        assert!(matches!(err, LabError::SetupError { .. }));
    }

    #[test]
    fn unknown_export_format_is_refused() {
        let mut config = small_config();
        config.output.formats = Some(vec!["xlsx".to_string()]);

        let engine = LabEngine::with_storage(MemoryStorage::default(), config);
        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            LabError::InvalidConfigValueError { field, .. } if field == "output.formats"
        ));
    }

    #[test]
    fn same_seed_gives_identical_exports() {
        let first = MemoryStorage::default();
        LabEngine::with_storage(first.clone(), small_config())
            .run()
            .unwrap();

        let second = MemoryStorage::default();
        LabEngine::with_storage(second.clone(), small_config())
            .run()
            .unwrap();

        assert_eq!(first.text("evaluation.json"), second.text("evaluation.json"));
        assert_eq!(first.text("agents.csv"), second.text("agents.csv"));
    }

    #[test]
    fn summary_covers_every_global_series() {
        let storage = MemoryStorage::default();
        let engine = LabEngine::with_storage(storage.clone(), small_config());
        engine.run().unwrap();

        let chronicle = Chronicle::from_json(&storage.text("chronicle.json")).unwrap();
        let summary = summarize(&chronicle.evaluation().unwrap());

        assert_eq!(summary.lines().count(), 13);
        assert!(summary.contains("Subjects choosing SI"));
        assert!(summary.contains("Average payoff of high contributors & punishers"));
    }
}
