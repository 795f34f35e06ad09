use thiserror::Error;

/// Rule parsing and expansion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Unknown rule parameter: {0}")]
    UnknownParam(String),

    #[error("Invalid value for rule parameter {param}: {value}")]
    InvalidParamValue { param: String, value: String },

    #[error("Unknown frequency: {0}")]
    UnknownFrequency(String),

    #[error("RRule validation error: {0}")]
    RRuleValidationError(String),
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
