use docgate_core::{ErrorMetadata, LogLevel};
use docgate_drive::DriveError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error("Candidate not found: {0}")]
    CandidateNotFound(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Stage {stage_id} is not part of process {process_id}")]
    StageNotInProcess { process_id: String, stage_id: String },

    #[error("Unknown document category {category_id} for process {process_id}")]
    UnknownCategory {
        process_id: String,
        category_id: String,
    },

    #[error("A move is already in progress (transaction {0})")]
    MoveInProgress(Uuid),

    #[error("Candidate store error: {0}")]
    Store(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Drive(err) => err.error_code(),
            PipelineError::CandidateNotFound(_) => "CANDIDATE_NOT_FOUND",
            PipelineError::ProcessNotFound(_) => "PROCESS_NOT_FOUND",
            PipelineError::StageNotInProcess { .. } => "STAGE_NOT_IN_PROCESS",
            PipelineError::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            PipelineError::MoveInProgress(_) => "MOVE_IN_PROGRESS",
            PipelineError::Store(_) => "STORE_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::Drive(err) => err.is_recoverable(),
            PipelineError::MoveInProgress(_) | PipelineError::Store(_) => true,
            _ => false,
        }
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            PipelineError::Drive(err) => err.suggested_action(),
            PipelineError::MoveInProgress(_) => Some("Wait for the current move to finish"),
            PipelineError::UnknownCategory { .. } => Some("Pick one of the process's categories"),
            _ => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            PipelineError::Drive(err) => err.client_message(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::Drive(err) => err.log_level(),
            PipelineError::MoveInProgress(_) => LogLevel::Debug,
            PipelineError::Store(_) => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}
