//! Headless screenlets over a JSON web-service API.
//!
//! A screenlet maps named actions to one-shot [`interactor`]s. Each
//! interactor runs one [`operation`] on a background task through the
//! [`transport`] layer, and its completion is applied on the screenlet's
//! coordination context (see [`screenlet::Coordinated`]).

pub mod config;
pub mod coordination;
pub mod error;
pub mod form;
pub mod interactor;
pub mod list;
pub mod logging;
pub mod login;
pub mod mvi;
pub mod operation;
pub mod screenlet;
pub mod session;
pub mod transport;

pub use error::ScreenletError;
pub use screenlet::{next_event, run_until_idle, Coordinated, ScreenletView};
pub use session::{Credentials, Session};
