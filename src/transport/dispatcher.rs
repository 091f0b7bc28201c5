//! Applies a [`CacheStrategy`] around a [`Transport`].

use std::sync::Arc;

use serde_json::Value;

use crate::error::ScreenletError;
use crate::operation::{
    CacheStore, CacheStrategy, CancelToken, CompletedOperation, OperationKind, OperationRequest,
    ResultSource,
};
use crate::transport::{ProgressFn, Transport};

/// Entry point used by interactors to run operations.
#[derive(Clone)]
pub struct OperationDispatcher {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
}

impl OperationDispatcher {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn CacheStore>) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Run `request` to completion, failure or cancellation.
    pub async fn dispatch(
        &self,
        request: OperationRequest,
        strategy: CacheStrategy,
        progress: Option<ProgressFn>,
        cancel: &CancelToken,
    ) -> CompletedOperation {
        tracing::debug!(
            operation = %request.id(),
            path = %request.path(),
            strategy = strategy.as_str(),
            transport = self.transport.name(),
            "Dispatching operation"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScreenletError::Cancelled),
            outcome = self.run(&request, strategy, progress) => outcome,
        };

        match outcome {
            Ok((payload, source)) => CompletedOperation::succeeded(request, payload, source),
            Err(error) => {
                tracing::debug!(
                    operation = %request.id(),
                    error = %error,
                    "Operation failed"
                );
                CompletedOperation::failed(request, error)
            }
        }
    }

    async fn run(
        &self,
        request: &OperationRequest,
        strategy: CacheStrategy,
        progress: Option<ProgressFn>,
    ) -> Result<(Value, ResultSource), ScreenletError> {
        match request.kind() {
            OperationKind::Read => self.read(request, strategy).await,
            OperationKind::Write => self.write(request, strategy).await,
            // File contents are never cached.
            OperationKind::Upload => self
                .transport
                .send(request, progress)
                .await
                .map(|payload| (payload, ResultSource::Remote)),
        }
    }

    async fn read(
        &self,
        request: &OperationRequest,
        strategy: CacheStrategy,
    ) -> Result<(Value, ResultSource), ScreenletError> {
        let key = request.cache_key();

        match strategy {
            CacheStrategy::RemoteOnly => {
                let payload = self.transport.send(request, None).await?;
                self.cache.set(&key, payload.clone());
                Ok((payload, ResultSource::Remote))
            }
            CacheStrategy::CacheOnly => self
                .cached(&key)
                .ok_or(ScreenletError::CacheMiss { key }),
            CacheStrategy::RemoteFirst => match self.transport.send(request, None).await {
                Ok(payload) => {
                    self.cache.set(&key, payload.clone());
                    Ok((payload, ResultSource::Remote))
                }
                Err(error) if error.is_transport() => {
                    tracing::debug!(path = %request.path(), "Server unreachable, trying cache");
                    self.cached(&key).ok_or(error)
                }
                Err(error) => Err(error),
            },
            CacheStrategy::CacheFirst => {
                if let Some(hit) = self.cached(&key) {
                    return Ok(hit);
                }
                let payload = self.transport.send(request, None).await?;
                self.cache.set(&key, payload.clone());
                Ok((payload, ResultSource::Remote))
            }
        }
    }

    /// Writes that cannot (or must not) reach the server are kept as
    /// pending and complete with a `null` payload.
    async fn write(
        &self,
        request: &OperationRequest,
        strategy: CacheStrategy,
    ) -> Result<(Value, ResultSource), ScreenletError> {
        match strategy {
            CacheStrategy::RemoteOnly => self
                .transport
                .send(request, None)
                .await
                .map(|payload| (payload, ResultSource::Remote)),
            CacheStrategy::CacheOnly | CacheStrategy::CacheFirst => {
                self.cache.store_pending_write(request.clone());
                Ok((Value::Null, ResultSource::Cache))
            }
            CacheStrategy::RemoteFirst => match self.transport.send(request, None).await {
                Ok(payload) => Ok((payload, ResultSource::Remote)),
                Err(error) if error.is_transport() => {
                    tracing::info!(path = %request.path(), "Server unreachable, write stored for later sync");
                    self.cache.store_pending_write(request.clone());
                    Ok((Value::Null, ResultSource::Cache))
                }
                Err(error) => Err(error),
            },
        }
    }

    /// Replay writes stored while the server was unreachable, oldest first.
    ///
    /// Returns the outcome of every write that left the queue. On the first
    /// transport error that write and the ones after it go back to the
    /// queue in order.
    pub async fn sync_pending(&self) -> Vec<CompletedOperation> {
        let mut pending = self.cache.take_pending_writes().into_iter();
        let mut settled = Vec::new();

        while let Some(request) = pending.next() {
            match self.transport.send(&request, None).await {
                Ok(payload) => {
                    settled.push(CompletedOperation::succeeded(request, payload, ResultSource::Remote));
                }
                Err(error) if error.is_transport() => {
                    let remaining = 1 + pending.len();
                    tracing::info!(remaining, error = %error, "Server still unreachable, keeping pending writes");
                    self.cache.store_pending_write(request);
                    pending.by_ref().for_each(|request| self.cache.store_pending_write(request));
                    break;
                }
                Err(error) => {
                    tracing::warn!(path = %request.path(), error = %error, "Pending write rejected by server");
                    settled.push(CompletedOperation::failed(request, error));
                }
            }
        }

        tracing::debug!(synced = settled.len(), "Pending writes replayed");
        settled
    }

    fn cached(&self, key: &str) -> Option<(Value, ResultSource)> {
        let hit = self.cache.get(key)?;
        tracing::debug!("Cache hit");
        Some((hit, ResultSource::Cache))
    }
}
