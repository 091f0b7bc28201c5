//! One-shot orchestration of a named action.
//!
//! An [`Interactor`] builds one operation, is moved onto a background task
//! while the operation runs, and comes back to its screenlet inside a
//! [`Completion`]. Resolving the completion on the screenlet's coordination
//! context populates the interactor's typed result fields and yields
//! exactly one of success or failure.

mod runner;

use serde_json::Value;

use crate::error::ScreenletError;
use crate::operation::{CacheStrategy, CompletedOperation, OperationId, OperationRequest};

pub use runner::InteractorRunner;

/// Subtype hooks of an interactor.
pub trait Interactor: Send + 'static {
    /// Action name this interactor serves.
    fn action_name(&self) -> &'static str;

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::RemoteFirst
    }

    /// Operation factory. Errors reject the action before anything is sent.
    fn create_operation(&self) -> Result<OperationRequest, ScreenletError>;

    /// Populate result fields from a successful payload.
    ///
    /// A payload of unexpected shape is reported through the same error
    /// channel as transport and server failures.
    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError>;
}

/// Interactor returned to its screenlet with the finished operation.
pub struct Completion<I> {
    interactor: I,
    operation: CompletedOperation,
}

/// Outcome of resolving a [`Completion`].
pub enum Resolved<I> {
    Success(I),
    Failure { interactor: I, error: ScreenletError },
}

/// Interactor whose operation could not be created.
pub struct Rejected<I> {
    pub interactor: I,
    pub error: ScreenletError,
}

impl<I: Interactor> Completion<I> {
    pub fn new(interactor: I, operation: CompletedOperation) -> Self {
        Self {
            interactor,
            operation,
        }
    }

    pub fn id(&self) -> OperationId {
        self.operation.id()
    }

    pub fn interactor(&self) -> &I {
        &self.interactor
    }

    /// Apply the operation outcome to the interactor.
    ///
    /// On error the result fields are left untouched.
    pub fn resolve(self) -> Resolved<I> {
        let Completion {
            mut interactor,
            operation,
        } = self;

        match operation.into_outcome() {
            Err(error) => Resolved::Failure { interactor, error },
            Ok(payload) => match interactor.completed_operation(payload) {
                Ok(()) => Resolved::Success(interactor),
                Err(error) => {
                    tracing::warn!(
                        action = interactor.action_name(),
                        error = %error,
                        "Could not process operation result"
                    );
                    Resolved::Failure { interactor, error }
                }
            },
        }
    }

    /// Resolve and run exactly one of the two handlers.
    pub fn dispatch<S, F>(self, on_success: S, on_failure: F)
    where
        S: FnOnce(I),
        F: FnOnce(I, ScreenletError),
    {
        match self.resolve() {
            Resolved::Success(interactor) => on_success(interactor),
            Resolved::Failure { interactor, error } => on_failure(interactor, error),
        }
    }
}

impl<I> std::fmt::Debug for Completion<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("operation", &self.operation)
            .finish()
    }
}
