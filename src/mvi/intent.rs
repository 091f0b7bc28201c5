//! Base trait for intents in MVI architecture.

/// Marker trait for intent objects.
///
/// Intents represent:
/// - Operation lifecycle events (started, succeeded, failed)
/// - Host requests that only change bookkeeping (submit requested)
///
/// Intents are processed by reducers to produce new states.
pub trait Intent: Send + 'static {}
