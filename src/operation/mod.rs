//! Units of server work.
//!
//! An [`OperationRequest`] describes what to send; a [`CompletedOperation`]
//! pairs it with exactly one outcome. Completed operations are immutable.

mod cache;
mod cancel;

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ScreenletError;
use crate::session::Credentials;

pub use cache::{CacheStore, CacheStrategy, MemoryCache};
pub use cancel::CancelToken;

pub type OperationId = Uuid;

/// One JSON web-service invocation: a service path and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub path: String,
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Map::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// `{"<path>": {params}}`, the invoke body for a single command.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.path.clone(), Value::Object(self.params.clone()));
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
    Upload,
}

/// File attached to an upload operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

/// Descriptor of a unit of server work.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    id: OperationId,
    kind: OperationKind,
    commands: Vec<Command>,
    file: Option<FileUpload>,
    credentials: Option<Credentials>,
}

impl OperationRequest {
    fn build(kind: OperationKind, commands: Vec<Command>, file: Option<FileUpload>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            commands,
            file,
            credentials: None,
        }
    }

    /// Read of one command, or a batch read when more are given.
    pub fn read(commands: Vec<Command>) -> Self {
        Self::build(OperationKind::Read, commands, None)
    }

    pub fn write(command: Command) -> Self {
        Self::build(OperationKind::Write, vec![command], None)
    }

    /// Multipart upload: `command` parameters become form fields.
    pub fn upload(command: Command, file: FileUpload) -> Self {
        Self::build(OperationKind::Upload, vec![command], Some(file))
    }

    /// Override the session credentials for this request only.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn file(&self) -> Option<&FileUpload> {
        self.file.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_batch(&self) -> bool {
        self.commands.len() > 1
    }

    /// Path of the first command, used for logging.
    pub fn path(&self) -> &str {
        self.commands.first().map(|c| c.path.as_str()).unwrap_or("")
    }

    /// Invoke body: one command object, or an array for batches.
    pub fn body(&self) -> Value {
        match self.commands.as_slice() {
            [single] => single.to_json(),
            many => Value::Array(many.iter().map(Command::to_json).collect()),
        }
    }

    /// Stable key identifying the same request across invocations.
    pub fn cache_key(&self) -> String {
        self.body().to_string()
    }
}

/// Where a successful payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Remote,
    Cache,
}

/// A request together with its single outcome.
#[derive(Debug, Clone)]
pub struct CompletedOperation {
    request: OperationRequest,
    outcome: Result<Value, ScreenletError>,
    source: ResultSource,
}

impl CompletedOperation {
    pub fn succeeded(request: OperationRequest, payload: Value, source: ResultSource) -> Self {
        Self {
            request,
            outcome: Ok(payload),
            source,
        }
    }

    pub fn failed(request: OperationRequest, error: ScreenletError) -> Self {
        Self {
            request,
            outcome: Err(error),
            source: ResultSource::Remote,
        }
    }

    pub fn id(&self) -> OperationId {
        self.request.id
    }

    pub fn request(&self) -> &OperationRequest {
        &self.request
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ScreenletError> {
        self.outcome.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn source(&self) -> ResultSource {
        self.source
    }

    pub fn into_outcome(self) -> Result<Value, ScreenletError> {
        self.outcome
    }
}
