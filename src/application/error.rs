use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::episodes::EpisodeError, domain::error::DomainError, infra::error::InfraError,
};

/// Flattened error chain, outermost message first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Episodes(#[from] EpisodeError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short label used as the `kind` field when the error is logged.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "validation"
            }
            AppError::Infra(InfraError::Configuration { .. }) => "configuration",
            AppError::Infra(InfraError::Telemetry(_)) => "telemetry",
            AppError::Infra(InfraError::Io(_)) | AppError::Infra(InfraError::Fixture { .. }) => {
                "io"
            }
            AppError::Episodes(EpisodeError::Timeout(_)) => "timeout",
            AppError::Episodes(_) => "content_store",
            AppError::Unexpected(_) => "unexpected",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::application::repos::RepoError;

    #[test]
    fn report_walks_the_source_chain() {
        let error = AppError::Infra(InfraError::Io(std::io::Error::other("disk gone")));
        let report = error.report();
        assert_eq!(report.messages.first().map(String::as_str), Some("io error: disk gone"));
        assert!(report.chain().contains("disk gone"));
    }

    #[test]
    fn episode_errors_are_classified() {
        let timeout = AppError::from(EpisodeError::Timeout(Duration::from_secs(10)));
        assert_eq!(timeout.kind(), "timeout");

        let store = AppError::from(EpisodeError::Store(RepoError::Unavailable(
            "offline".to_string(),
        )));
        assert_eq!(store.kind(), "content_store");
        assert_eq!(store.to_string(), "content store unavailable: offline");
    }
}
