//! State for upload tracking.

use crate::error::ScreenletError;
use crate::mvi::State;

/// Aggregate status of a form's document uploads.
///
/// `Uploading` always has `active >= 1`; the last success moves to `Idle`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,

    Uploading {
        active: usize,
        /// Submit runs once the count drops to zero.
        submit_requested: bool,
    },

    /// Some upload failed. `in_flight` counts uploads still running, and
    /// stays 0 under [`UploadFailurePolicy::Reset`](super::UploadFailurePolicy::Reset).
    Failed {
        error: ScreenletError,
        in_flight: usize,
    },
}

impl State for UploadStatus {}

impl UploadStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, Self::Uploading { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Uploads known to be running.
    pub fn active_count(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Uploading { active, .. } => *active,
            Self::Failed { in_flight, .. } => *in_flight,
        }
    }

    pub fn submit_requested(&self) -> bool {
        matches!(
            self,
            Self::Uploading {
                submit_requested: true,
                ..
            }
        )
    }

    pub fn error(&self) -> Option<&ScreenletError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
