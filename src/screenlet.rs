//! Plumbing shared by every screenlet.
//!
//! A screenlet owns a [`ScreenletCore`]: the runner that executes its
//! interactors, the completion queue that forms its coordination context,
//! and the cancel tokens of its in-flight operations.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::coordination;
use crate::interactor::{Completion, Interactor, InteractorRunner, Rejected};
use crate::operation::{CacheStrategy, CancelToken, OperationId};
use crate::transport::UploadProgress;

/// Presentation signals emitted by screenlets. All methods default to no-op.
pub trait ScreenletView: Send {
    /// Show a blocking progress indicator with a message key.
    fn show_progress(&mut self, _message_key: &str) {}

    fn hide_progress(&mut self) {}

    /// View-model state changed and should be redrawn.
    fn refresh(&mut self) {}

    fn document_status_changed(&mut self, _field: &str) {}

    /// Scroll to / highlight a field that needs attention.
    fn show_field(&mut self, _field: &str) {}
}

/// View that ignores every signal.
#[derive(Debug, Default)]
pub struct HeadlessView;

impl ScreenletView for HeadlessView {}

/// Payload accompanying an action invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSender {
    /// A form field, by name.
    Field(String),
    /// A list page, by index.
    Page(usize),
}

struct InFlight {
    action: &'static str,
    cancel: CancelToken,
}

pub struct ScreenletCore<M> {
    runner: InteractorRunner,
    sender: mpsc::UnboundedSender<M>,
    receiver: mpsc::UnboundedReceiver<M>,
    in_flight: HashMap<OperationId, InFlight>,
    cache_strategy: CacheStrategy,
}

impl<M: Send + 'static> ScreenletCore<M> {
    pub fn new(runner: InteractorRunner, cache_strategy: CacheStrategy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            runner,
            sender,
            receiver,
            in_flight: HashMap::new(),
            cache_strategy,
        }
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        self.cache_strategy
    }

    pub fn start<I, W>(&mut self, interactor: I, wrap: W) -> Result<OperationId, Rejected<I>>
    where
        I: Interactor,
        W: FnOnce(Completion<I>) -> M + Send + 'static,
    {
        let action = interactor.action_name();
        let cancel = CancelToken::new();
        let id = self
            .runner
            .execute(interactor, &self.sender, cancel.clone(), wrap)?;
        self.in_flight.insert(id, InFlight { action, cancel });
        Ok(id)
    }

    pub fn start_with_progress<I, W, P>(
        &mut self,
        interactor: I,
        wrap: W,
        on_progress: P,
    ) -> Result<OperationId, Rejected<I>>
    where
        I: Interactor,
        W: FnOnce(Completion<I>) -> M + Send + 'static,
        P: Fn(UploadProgress) -> M + Send + Sync + 'static,
    {
        let action = interactor.action_name();
        let cancel = CancelToken::new();
        let id = self.runner.execute_with_progress(
            interactor,
            &self.sender,
            cancel.clone(),
            wrap,
            on_progress,
        )?;
        self.in_flight.insert(id, InFlight { action, cancel });
        Ok(id)
    }

    /// Forget a completed operation.
    pub fn finished(&mut self, id: OperationId) {
        self.in_flight.remove(&id);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cancel one operation. Its completion still arrives, as a failure.
    pub fn cancel(&self, id: OperationId) -> bool {
        match self.in_flight.get(&id) {
            Some(op) => {
                tracing::debug!(operation = %id, action = op.action, "Cancelling operation");
                op.cancel.cancel()
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        self.in_flight
            .values()
            .filter(|op| op.cancel.cancel())
            .inspect(|op| tracing::debug!(action = op.action, "Operation cancelled"))
            .count()
    }

    /// Next queued message without waiting.
    pub fn try_next(&mut self) -> Option<M> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next message. Returns `None` when nothing is queued and
    /// no operation is in flight.
    pub async fn next(&mut self) -> Option<M> {
        if self.in_flight.is_empty() {
            return self.try_next();
        }
        self.receiver.recv().await
    }
}

/// Event loop hooks implemented by each screenlet.
///
/// `handle` runs inside a coordination context; the provided methods drain
/// the completion queue through it.
pub trait Coordinated {
    type Message: Send + 'static;

    fn core_mut(&mut self) -> &mut ScreenletCore<Self::Message>;

    fn handle(&mut self, message: Self::Message);

    /// Apply every message already queued. Returns how many were handled.
    fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.core_mut().try_next() {
            let _guard = coordination::enter();
            self.handle(message);
            handled += 1;
        }
        handled
    }
}

/// Await and apply one message. Returns false when the screenlet is idle.
pub async fn next_event<S: Coordinated>(screenlet: &mut S) -> bool {
    match screenlet.core_mut().next().await {
        Some(message) => {
            let _guard = coordination::enter();
            screenlet.handle(message);
            true
        }
        None => false,
    }
}

/// Apply messages until no operation is in flight.
pub async fn run_until_idle<S: Coordinated>(screenlet: &mut S) {
    while next_event(screenlet).await {}
}
