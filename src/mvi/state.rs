//! Base trait for state in MVI architecture.

/// Marker trait for reducer-owned state.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Comparable (PartialEq for detecting changes)
/// - Defaulted to their initial state
pub trait State: Clone + PartialEq + Default + Send + 'static {}
