//! Reducers for upload tracking.

use serde::{Deserialize, Serialize};

use crate::mvi::Reducer;

use super::intent::UploadIntent;
use super::state::UploadStatus;

/// What a failure does to the count of uploads still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadFailurePolicy {
    /// Forget the running uploads. A retry counts only the retried fields,
    /// so a late success of an older upload can end the wait early.
    #[default]
    Reset,

    /// Keep counting running uploads while failed, and carry them into the
    /// retry.
    TrackInFlight,
}

impl UploadFailurePolicy {
    /// Apply `intent` with the reducer for this policy.
    pub fn reduce(self, state: UploadStatus, intent: UploadIntent) -> UploadStatus {
        match self {
            Self::Reset => UploadReducer::reduce(state, intent),
            Self::TrackInFlight => TrackingUploadReducer::reduce(state, intent),
        }
    }
}

/// Upload reducer with [`UploadFailurePolicy::Reset`].
pub struct UploadReducer;

impl Reducer for UploadReducer {
    type State = UploadStatus;
    type Intent = UploadIntent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State {
        transition(UploadFailurePolicy::Reset, state, intent)
    }
}

/// Upload reducer with [`UploadFailurePolicy::TrackInFlight`].
pub struct TrackingUploadReducer;

impl Reducer for TrackingUploadReducer {
    type State = UploadStatus;
    type Intent = UploadIntent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State {
        transition(UploadFailurePolicy::TrackInFlight, state, intent)
    }
}

fn transition(policy: UploadFailurePolicy, state: UploadStatus, intent: UploadIntent) -> UploadStatus {
    match intent {
        UploadIntent::Started => match state {
            UploadStatus::Idle => UploadStatus::Uploading {
                active: 1,
                submit_requested: false,
            },
            UploadStatus::Uploading {
                active,
                submit_requested,
            } => UploadStatus::Uploading {
                active: active + 1,
                submit_requested,
            },
            // A new upload after a failure starts a fresh wait
            UploadStatus::Failed { in_flight, .. } => UploadStatus::Uploading {
                active: in_flight + 1,
                submit_requested: false,
            },
        },

        UploadIntent::Succeeded => match state {
            UploadStatus::Uploading {
                active,
                submit_requested,
            } if active > 1 => UploadStatus::Uploading {
                active: active - 1,
                submit_requested,
            },
            UploadStatus::Uploading { .. } => UploadStatus::Idle,
            UploadStatus::Failed { error, in_flight } => UploadStatus::Failed {
                error,
                in_flight: in_flight.saturating_sub(1),
            },
            UploadStatus::Idle => UploadStatus::Idle,
        },

        UploadIntent::Failed { error } => {
            let in_flight = match (policy, state) {
                (UploadFailurePolicy::Reset, _) => 0,
                (_, UploadStatus::Uploading { active, .. }) => active.saturating_sub(1),
                (_, UploadStatus::Failed { in_flight, .. }) => in_flight.saturating_sub(1),
                (_, UploadStatus::Idle) => 0,
            };
            UploadStatus::Failed { error, in_flight }
        }

        UploadIntent::SubmitRequested => match state {
            UploadStatus::Uploading { active, .. } => UploadStatus::Uploading {
                active,
                submit_requested: true,
            },
            other => other,
        },
    }
}
