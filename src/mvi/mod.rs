//! Model-View-Intent primitives for screenlet state machines.
//!
//! # Architecture
//!
//! ```text
//! Intent ──→ Reducer ──→ State ──→ Screenlet side effects
//!    ↑                                  │
//!    └──────────────────────────────────┘
//! ```
//!
//! - **State**: Immutable snapshot owned by a screenlet
//! - **Intent**: Operation lifecycle event or host request
//! - **Reducer**: Pure function that transforms state based on intents

mod intent;
mod reducer;
mod state;

pub use intent::Intent;
pub use reducer::Reducer;
pub use state::State;
