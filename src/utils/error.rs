use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Session setup error: {message}")]
    SetupError { message: String },

    #[error("Agent {agent} contributed {amount} tokens, endowment is {max}")]
    InvalidContribution { agent: String, amount: u32, max: u32 },

    #[error("Invalid sanction decision by agent {agent}: {reason}")]
    InvalidSanction { agent: String, reason: String },

    #[error("Chronicle error: {message}")]
    ChronicleError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, LabError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Data,
    Simulation,
    System,
}

impl LabError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LabError::ConfigError { .. }
            | LabError::MissingConfigError { .. }
            | LabError::InvalidConfigValueError { .. }
            | LabError::ValidationError { .. } => ErrorSeverity::Medium,
            LabError::IoError(_)
            | LabError::SerializationError(_)
            | LabError::CsvError(_)
            | LabError::ChronicleError { .. }
            | LabError::ProcessingError { .. } => ErrorSeverity::High,
            LabError::SetupError { .. }
            | LabError::InvalidContribution { .. }
            | LabError::InvalidSanction { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LabError::ConfigError { .. }
            | LabError::MissingConfigError { .. }
            | LabError::InvalidConfigValueError { .. }
            | LabError::ValidationError { .. } => ErrorCategory::Config,
            LabError::SerializationError(_)
            | LabError::CsvError(_)
            | LabError::ChronicleError { .. } => ErrorCategory::Data,
            LabError::SetupError { .. }
            | LabError::InvalidContribution { .. }
            | LabError::InvalidSanction { .. }
            | LabError::ProcessingError { .. } => ErrorCategory::Simulation,
            LabError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LabError::ConfigError { .. } => {
                "Check the experiment TOML file for syntax errors".to_string()
            }
            LabError::MissingConfigError { field } => {
                format!("Add the '{}' field to the experiment configuration", field)
            }
            LabError::InvalidConfigValueError { field, .. } => {
                format!("Correct the '{}' field in the experiment configuration", field)
            }
            LabError::ValidationError { .. } => {
                "Review the session parameters against their documented bounds".to_string()
            }
            LabError::IoError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            LabError::SerializationError(_) => {
                "The chronicle file may be truncated or from an older version".to_string()
            }
            LabError::CsvError(_) => {
                "Check free disk space and permissions on the output directory".to_string()
            }
            LabError::ChronicleError { .. } => {
                "Re-run the simulation to produce a fresh chronicle".to_string()
            }
            LabError::SetupError { .. } => {
                "Adjust rounds, token endowments or population size".to_string()
            }
            LabError::InvalidContribution { .. } | LabError::InvalidSanction { .. } => {
                "A strategy produced an out-of-bounds decision; report this as a bug".to_string()
            }
            LabError::ProcessingError { .. } => {
                "Re-run with --verbose to see the failing phase".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LabError::ConfigError { message } => {
                format!("The experiment configuration is invalid: {}", message)
            }
            LabError::MissingConfigError { field } => {
                format!("The experiment configuration is missing '{}'", field)
            }
            LabError::InvalidConfigValueError { field, value, .. } => {
                format!(
                    "The experiment configuration value '{}' is not valid for '{}'",
                    value, field
                )
            }
            LabError::ValidationError { message } => {
                format!("Invalid session parameters: {}", message)
            }
            LabError::IoError(e) => format!("File access failed: {}", e),
            LabError::SerializationError(e) => format!("Could not read or write JSON data: {}", e),
            LabError::CsvError(e) => format!("Could not write CSV data: {}", e),
            LabError::ChronicleError { message } => format!("Chronicle problem: {}", message),
            LabError::SetupError { message } => {
                format!("The session could not be set up: {}", message)
            }
            LabError::InvalidContribution { agent, amount, max } => format!(
                "Agent {} tried to contribute {} of {} tokens",
                agent, amount, max
            ),
            LabError::InvalidSanction { agent, reason } => {
                format!("Agent {} made an invalid sanction decision: {}", agent, reason)
            }
            LabError::ProcessingError { message } => {
                format!("The experiment run failed: {}", message)
            }
        }
    }
}
