use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::delegate::ProcessOutput;

/// Errors that can occur during document conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("delegate error: {0}")]
    Delegate(#[from] DelegateError),
}

/// Failure while parsing a source document or writing its PDF in-process.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}

/// Failure of the external conversion engine.
#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conversion engine exited with {}: {}", describe_status(.0.status), .0.diagnostics())]
    ExitStatus(ProcessOutput),

    #[error("conversion engine timed out after {0:?}")]
    TimedOut(Duration),

    #[error("conversion was cancelled")]
    Cancelled,

    #[error("conversion engine produced no output at {0:?}")]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    UnsupportedFormat,
    RenderError,
    DelegateError,
}

/// Serializable projection of a [`ConvertError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            Self::Render(_) => FailureKind::RenderError,
            Self::Delegate(_) => FailureKind::DelegateError,
        }
    }

    pub fn to_failure(&self) -> ConversionFailure {
        ConversionFailure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<&ConvertError> for ConversionFailure {
    fn from(err: &ConvertError) -> Self {
        err.to_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let unsupported = ConvertError::UnsupportedFormat("rtf".to_string());
        assert_eq!(unsupported.kind(), FailureKind::UnsupportedFormat);

        let render = ConvertError::from(RenderError::Parse("bad zip".to_string()));
        assert_eq!(render.kind(), FailureKind::RenderError);

        let delegate = ConvertError::from(DelegateError::Cancelled);
        assert_eq!(delegate.kind(), FailureKind::DelegateError);
    }

    #[test]
    fn test_failure_message_carries_cause() {
        let err = ConvertError::from(RenderError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        )));
        let failure = err.to_failure();
        assert_eq!(failure.kind, FailureKind::RenderError);
        assert!(failure.message.contains("no such file"), "{}", failure.message);
    }

    #[test]
    fn test_exit_status_display_includes_stderr() {
        let err = DelegateError::ExitStatus(ProcessOutput {
            status: Some(81),
            stdout: Vec::new(),
            stderr: b"Error: source file could not be loaded\n".to_vec(),
        });
        let msg = err.to_string();
        assert!(msg.contains("status 81"), "{msg}");
        assert!(msg.contains("could not be loaded"), "{msg}");
    }

    #[test]
    fn test_signal_termination_display() {
        let err = DelegateError::ExitStatus(ProcessOutput {
            status: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        });
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_failure_serializes_kind_name() {
        let failure = ConversionFailure {
            kind: FailureKind::DelegateError,
            message: "boom".to_string(),
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert_eq!(json, r#"{"kind":"DelegateError","message":"boom"}"#);
    }
}
