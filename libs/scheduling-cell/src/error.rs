// libs/scheduling-cell/src/error.rs
use thiserror::Error;

use shared_models::AppError;

use crate::models::WizardStage;

/// A date or date+time rejected for lying in the past. The display text is
/// what the user sees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Cannot select a past date. Please choose a future date.")]
    PastDate,

    #[error("The selected date and time is in the past. Please choose a future date and time.")]
    PastInstant,
}

/// Failure reported by the booking/appointment store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// The store refused the operation; the message is shown verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("{0}")]
    MissingSelection(&'static str),

    #[error(transparent)]
    TemporalPolicy(#[from] PolicyViolation),

    #[error("The selected time slot is not available")]
    SlotUnavailable,

    #[error("Available time slots have not been loaded for this doctor and date")]
    SlotsNotLoaded,

    #[error("Unknown {kind} option: {id}")]
    UnknownOption { kind: &'static str, id: i64 },

    #[error("Invalid date or time format")]
    InvalidTimestamp,

    #[error("Operation not available at stage {0}")]
    WrongStage(WizardStage),

    #[error("A booking submission is already in progress")]
    SubmissionInFlight,

    #[error("{0}")]
    Submission(StoreError),

    #[error("{what}: {source}")]
    Load { what: &'static str, source: StoreError },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RescheduleError {
    #[error("Please select both date and time")]
    Incomplete,

    #[error(transparent)]
    TemporalPolicy(#[from] PolicyViolation),

    #[error("Invalid date or time format")]
    InvalidTimestamp,

    #[error("Appointment {0} can no longer be rescheduled")]
    NotModifiable(i64),

    #[error("A reschedule request is already in progress")]
    SubmissionInFlight,

    #[error("{0}")]
    Submission(StoreError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentBoardError {
    #[error("Appointment {0} is not in the current list")]
    UnknownAppointment(i64),

    #[error("Appointment {0} can no longer be modified")]
    NotModifiable(i64),

    #[error("{0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized => AppError::Auth(err.to_string()),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Rejected(msg) => AppError::ExternalService(msg),
            StoreError::Transport(msg) | StoreError::Decode(msg) => AppError::ExternalService(msg),
        }
    }
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Submission(store) | WizardError::Load { source: store, .. } => store.into(),
            WizardError::SubmissionInFlight => AppError::Conflict(err.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}

impl From<RescheduleError> for AppError {
    fn from(err: RescheduleError) -> Self {
        match err {
            RescheduleError::Submission(store) => store.into(),
            RescheduleError::SubmissionInFlight => AppError::Conflict(err.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}

impl From<AppointmentBoardError> for AppError {
    fn from(err: AppointmentBoardError) -> Self {
        match err {
            AppointmentBoardError::Store(store) => store.into(),
            AppointmentBoardError::UnknownAppointment(_) => AppError::NotFound(err.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}
