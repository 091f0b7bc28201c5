//! Transport seam between operations and the server.

mod dispatcher;
mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ScreenletError;
use crate::operation::OperationRequest;

pub use dispatcher::OperationDispatcher;
pub use http::HttpTransport;

/// Bytes handed to the connection for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Size of the chunk just sent.
    pub chunk: u64,
    /// Bytes sent so far.
    pub sent: u64,
    /// Total bytes of the file.
    pub total: u64,
}

/// Progress callback invoked from the task running the upload.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Sends an operation to the server and returns its payload.
///
/// Implementations map every failure (unreachable server, error status,
/// exception body, malformed JSON) onto [`ScreenletError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of this transport for logging.
    fn name(&self) -> &'static str;

    /// Execute `request`. Batches resolve to a JSON array with one element
    /// per command, in order.
    async fn send(
        &self,
        request: &OperationRequest,
        progress: Option<ProgressFn>,
    ) -> Result<Value, ScreenletError>;
}
