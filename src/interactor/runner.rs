use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::interactor::{Completion, Interactor, Rejected};
use crate::operation::{CancelToken, OperationId};
use crate::transport::{OperationDispatcher, ProgressFn, UploadProgress};

/// Spawns interactor operations and routes their completions back.
#[derive(Clone)]
pub struct InteractorRunner {
    dispatcher: OperationDispatcher,
    handle: Handle,
}

impl InteractorRunner {
    pub fn new(dispatcher: OperationDispatcher, handle: Handle) -> Self {
        Self { dispatcher, handle }
    }

    /// Runner bound to the runtime of the calling task.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn current(dispatcher: OperationDispatcher) -> Self {
        Self::new(dispatcher, Handle::current())
    }

    pub fn dispatcher(&self) -> &OperationDispatcher {
        &self.dispatcher
    }

    /// Start `interactor` in the background.
    ///
    /// When its operation finishes, `wrap` turns the [`Completion`] into
    /// the screenlet's message type and the message is sent on
    /// `completions`.
    pub fn execute<I, M, W>(
        &self,
        interactor: I,
        completions: &mpsc::UnboundedSender<M>,
        cancel: CancelToken,
        wrap: W,
    ) -> Result<OperationId, Rejected<I>>
    where
        I: Interactor,
        M: Send + 'static,
        W: FnOnce(Completion<I>) -> M + Send + 'static,
    {
        self.spawn(interactor, completions, cancel, None, wrap)
    }

    /// Like [`execute`](Self::execute), also forwarding upload progress as
    /// messages. Progress messages are always sent before the completion.
    pub fn execute_with_progress<I, M, W, P>(
        &self,
        interactor: I,
        completions: &mpsc::UnboundedSender<M>,
        cancel: CancelToken,
        wrap: W,
        on_progress: P,
    ) -> Result<OperationId, Rejected<I>>
    where
        I: Interactor,
        M: Send + 'static,
        W: FnOnce(Completion<I>) -> M + Send + 'static,
        P: Fn(UploadProgress) -> M + Send + Sync + 'static,
    {
        let sender = completions.clone();
        let report: ProgressFn = Arc::new(move |progress| {
            if sender.send(on_progress(progress)).is_err() {
                tracing::trace!("Progress dropped (screenlet gone)");
            }
        });
        self.spawn(interactor, completions, cancel, Some(report), wrap)
    }

    fn spawn<I, M, W>(
        &self,
        interactor: I,
        completions: &mpsc::UnboundedSender<M>,
        cancel: CancelToken,
        progress: Option<ProgressFn>,
        wrap: W,
    ) -> Result<OperationId, Rejected<I>>
    where
        I: Interactor,
        M: Send + 'static,
        W: FnOnce(Completion<I>) -> M + Send + 'static,
    {
        let request = match interactor.create_operation() {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(
                    action = interactor.action_name(),
                    error = %error,
                    "Interactor rejected before start"
                );
                return Err(Rejected { interactor, error });
            }
        };

        let id = request.id();
        let strategy = interactor.cache_strategy();
        let dispatcher = self.dispatcher.clone();
        let sender = completions.clone();

        tracing::debug!(action = interactor.action_name(), operation = %id, "Interactor started");

        self.handle.spawn(async move {
            let operation = dispatcher.dispatch(request, strategy, progress, &cancel).await;
            tracing::debug!(
                action = interactor.action_name(),
                operation = %id,
                success = operation.is_success(),
                "Interactor finished"
            );
            if sender.send(wrap(Completion::new(interactor, operation))).is_err() {
                tracing::trace!(operation = %id, "Completion dropped (screenlet gone)");
            }
        });

        Ok(id)
    }
}
