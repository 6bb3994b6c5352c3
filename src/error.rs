use thiserror::Error;

/// Failure to turn a route path into a matcher.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid path template '{template}': {reason}")]
    Template { template: String, reason: String },

    #[error("error parsing path '{template}': {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

impl CompileError {
    pub(crate) fn template(template: &str, reason: impl Into<String>) -> Self {
        CompileError::Template {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("method not allowed: '{0}'")]
    UnsupportedMethod(String),

    #[error("error registering route '{template}': {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: CompileError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("path parameter '{0}' is not declared by the matched route")]
    Unknown(String),

    #[error("request was not dispatched through a route table")]
    Missing,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid rate limiter configuration: {0}")]
    RateLimiter(String),
}

pub type Result<T, E = RegistrationError> = std::result::Result<T, E>;
