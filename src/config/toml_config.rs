use crate::strategies::StrategyKind;
use crate::utils::error::{LabError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentSection,
    pub game: GameSection,
    pub session: SessionSection,
    pub population: Vec<PopulationGroup>,
    pub output: OutputSection,
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSection {
    pub title: String,
    pub experimenters: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSection {
    pub gain_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    pub rounds: usize,
    pub contribution_tokens: u32,
    pub sanction_tokens: u32,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationGroup {
    pub strategy: StrategyKind,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub directory: String,
    pub formats: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
    pub system_stats: Option<bool>,
}

impl ExperimentConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LabError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LabError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RESULT_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        // 使用正規表達式匹配 ${VAR_NAME} 格式
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_non_empty_string(
            "experiment.title",
            &self.experiment.title,
        )?;

        // 收益係數必須大於 1,否則不構成社會困境
        if self.game.gain_factor <= 1.0 {
            return Err(LabError::InvalidConfigValueError {
                field: "game.gain_factor".to_string(),
                value: self.game.gain_factor.to_string(),
                reason: "The gain factor must exceed 1.0 for a social dilemma".to_string(),
            });
        }

        crate::utils::validation::validate_positive_number(
            "session.rounds",
            self.session.rounds,
            1,
        )?;
        crate::utils::validation::validate_positive_number(
            "session.contribution_tokens",
            self.session.contribution_tokens as usize,
            1,
        )?;
        crate::utils::validation::validate_positive_number(
            "session.sanction_tokens",
            self.session.sanction_tokens as usize,
            1,
        )?;

        // 驗證母體設定
        if self.population.is_empty() {
            return Err(LabError::MissingConfigError {
                field: "population".to_string(),
            });
        }
        for group in &self.population {
            crate::utils::validation::validate_positive_number(
                "population.count",
                group.count,
                1,
            )?;
        }
        let minimum = self.game.gain_factor as usize + 1;
        if self.total_agents() < minimum.max(2) {
            return Err(LabError::InvalidConfigValueError {
                field: "population".to_string(),
                value: self.total_agents().to_string(),
                reason: format!(
                    "A gain factor of {} needs at least {} agents",
                    self.game.gain_factor,
                    minimum.max(2)
                ),
            });
        }

        // 驗證輸出設定
        crate::utils::validation::validate_path("output.directory", &self.output.directory)?;
        if let Some(formats) = &self.output.formats {
            crate::utils::validation::validate_choice("output.formats", formats, &["csv", "json"])?;
        }

        Ok(())
    }

    /// 取得代理人總數
    pub fn total_agents(&self) -> usize {
        self.population.iter().map(|group| group.count).sum()
    }

    /// 取得輸出格式,預設同時輸出 CSV 與 JSON
    pub fn formats(&self) -> Vec<String> {
        self.output
            .formats
            .clone()
            .unwrap_or_else(|| vec!["csv".to_string(), "json".to_string()])
    }

    /// 取得隨機種子,未設定時隨機產生
    pub fn seed_or_random(&self) -> u64 {
        self.session.seed.unwrap_or_else(rand::random)
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// Built-in demo setup: a mixed population in a thirty round session.
    pub fn demo() -> Self {
        Self {
            experiment: ExperimentSection {
                title: "Demo Simulation".to_string(),
                experimenters: "N.N.".to_string(),
                description: "A demo run of the simulation engine with the built-in strategies"
                    .to_string(),
            },
            game: GameSection { gain_factor: 1.6 },
            session: SessionSection {
                rounds: 30,
                contribution_tokens: 20,
                sanction_tokens: 20,
                seed: None,
            },
            population: vec![
                PopulationGroup {
                    strategy: StrategyKind::Random,
                    count: 2,
                },
                PopulationGroup {
                    strategy: StrategyKind::ModerateEgoist,
                    count: 10,
                },
                PopulationGroup {
                    strategy: StrategyKind::EgoistPunisher,
                    count: 10,
                },
                PopulationGroup {
                    strategy: StrategyKind::SimpleHeuristics,
                    count: 10,
                },
                PopulationGroup {
                    strategy: StrategyKind::SimpleHeuristicsPunisher,
                    count: 10,
                },
            ],
            output: OutputSection {
                directory: "./output".to_string(),
                formats: None,
            },
            monitoring: None,
        }
    }
}

impl Validate for ExperimentConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
