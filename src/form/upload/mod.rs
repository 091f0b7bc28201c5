//! Document upload tracking for a form.
//!
//! Counts uploads in flight and remembers whether a submit is waiting for
//! them. Same MVI split as the rest of the crate:
//! - `state.rs` - Aggregate status (Idle, Uploading, Failed)
//! - `intent.rs` - Upload lifecycle events and submit requests
//! - `reducer.rs` - Transitions, one reducer per failure policy

mod intent;
mod reducer;
mod state;

pub use intent::UploadIntent;
pub use reducer::{TrackingUploadReducer, UploadFailurePolicy, UploadReducer};
pub use state::UploadStatus;
