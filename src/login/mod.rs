//! Login screenlet: basic authentication against the user service.

pub mod interactor;
mod screenlet;

pub use interactor::{AuthMethod, LoginInteractor};
pub use screenlet::{LoginMessage, LoginScreenlet, LoginScreenletDelegate};

pub const LOGIN_ACTION: &str = "login";
