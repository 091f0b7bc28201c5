//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_server;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tokio::sync::oneshot;

use screenlets::error::ScreenletError;
use screenlets::form::{FormScreenletDelegate, Record};
use screenlets::interactor::InteractorRunner;
use screenlets::list::ListScreenletDelegate;
use screenlets::login::LoginScreenletDelegate;
use screenlets::operation::{MemoryCache, OperationRequest};
use screenlets::screenlet::ScreenletView;
use screenlets::session::Session;
use screenlets::transport::{OperationDispatcher, ProgressFn, Transport, UploadProgress};

type Outcome = Result<Value, ScreenletError>;

enum Script {
    Reply(Outcome),
    Held(oneshot::Receiver<Outcome>),
}

/// Completes a held request when the test decides.
pub struct Responder(oneshot::Sender<Outcome>);

impl Responder {
    pub fn succeed(self, payload: Value) {
        let _ = self.0.send(Ok(payload));
    }

    pub fn fail(self, error: ScreenletError) {
        let _ = self.0.send(Err(error));
    }
}

/// Transport answering from per-path queues of scripted responses.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    requests: Mutex<Vec<OperationRequest>>,
    report_progress: bool,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Uploads report their whole file as one progress chunk first.
    pub fn with_upload_progress() -> Arc<Self> {
        Arc::new(Self {
            report_progress: true,
            ..Self::default()
        })
    }

    fn push(&self, path: &str, script: Script) {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(script);
    }

    pub fn reply(&self, path: &str, payload: Value) {
        self.push(path, Script::Reply(Ok(payload)));
    }

    pub fn fail(&self, path: &str, error: ScreenletError) {
        self.push(path, Script::Reply(Err(error)));
    }

    /// Queue a response that stays pending until the responder is used.
    pub fn hold(&self, path: &str) -> Responder {
        let (sender, receiver) = oneshot::channel();
        self.push(path, Script::Held(receiver));
        Responder(sender)
    }

    pub fn requests(&self) -> Vec<OperationRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<OperationRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.path() == path)
            .cloned()
            .collect()
    }

    pub fn calls(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    /// Yield until `path` has been called `count` times.
    pub async fn wait_for_calls(&self, path: &str, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while self.calls(path) < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "Expected {} calls to {}", count, path);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(&self, request: &OperationRequest, progress: Option<ProgressFn>) -> Outcome {
        self.requests.lock().push(request.clone());

        let script = self
            .scripts
            .lock()
            .get_mut(request.path())
            .and_then(VecDeque::pop_front);

        if self.report_progress {
            if let (Some(report), Some(file)) = (&progress, request.file()) {
                let total = file.bytes.len() as u64;
                report(UploadProgress {
                    chunk: total,
                    sent: total,
                    total,
                });
            }
        }

        match script {
            Some(Script::Reply(outcome)) => outcome,
            Some(Script::Held(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(ScreenletError::Transport("Responder dropped".into()))),
            None => Err(ScreenletError::Transport(format!(
                "No scripted response for {}",
                request.path()
            ))),
        }
    }
}

/// Runner on the current runtime, backed by `transport` and a fresh cache.
pub fn runner_with(transport: Arc<ScriptedTransport>) -> (InteractorRunner, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let dispatcher = OperationDispatcher::new(transport, cache.clone());
    (InteractorRunner::current(dispatcher), cache)
}

pub fn session() -> Session {
    Session::anonymous("http://localhost:8080", 10154)
}

/// Create a temporary config file with the given TOML content.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

// -- Recording collaborators --------------------------------------------------

/// Event log shared between a recording delegate and the test.
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn count(events: &Events, prefix: &str) -> usize {
    events
        .lock()
        .iter()
        .filter(|event| event.starts_with(prefix))
        .count()
}

/// Records delegate callbacks as `name:detail` strings.
#[derive(Clone)]
pub struct Recorder(pub Events);

impl Recorder {
    fn log(&self, event: String) {
        self.0.lock().push(event);
    }
}

impl FormScreenletDelegate for Recorder {
    fn on_form_loaded(&mut self, record: &Record) {
        self.log(format!("form_loaded:{}", record.field_count()));
    }

    fn on_form_load_error(&mut self, error: &ScreenletError) {
        self.log(format!("form_load_error:{}", error.error_type()));
    }

    fn on_record_loaded(&mut self, record: &Record) {
        self.log(format!("record_loaded:{:?}", record.record_id));
    }

    fn on_record_load_error(&mut self, error: &ScreenletError) {
        self.log(format!("record_load_error:{}", error.error_type()));
    }

    fn on_form_submitted(&mut self, record: &Record) {
        self.log(format!("submitted:{:?}", record.record_id));
    }

    fn on_form_submit_error(&mut self, error: &ScreenletError) {
        self.log(format!("submit_error:{}", error.error_type()));
    }

    fn on_document_upload_started(&mut self, field: &str) {
        self.log(format!("upload_started:{}", field));
    }

    fn on_document_upload_progress(&mut self, field: &str, progress: &UploadProgress) {
        self.log(format!("upload_progress:{}:{}/{}", field, progress.sent, progress.total));
    }

    fn on_document_uploaded(&mut self, field: &str, _result: &Value) {
        self.log(format!("uploaded:{}", field));
    }

    fn on_document_upload_error(&mut self, field: &str, error: &ScreenletError) {
        self.log(format!("upload_error:{}:{}", field, error.error_type()));
    }
}

impl<R> ListScreenletDelegate<R> for Recorder {
    fn on_page_loaded(&mut self, page: usize, rows: &[R], row_count: usize) {
        self.log(format!("page_loaded:{}:{}:{}", page, rows.len(), row_count));
    }

    fn on_page_error(&mut self, page: usize, error: &ScreenletError) {
        self.log(format!("page_error:{}:{}", page, error.error_type()));
    }
}

impl LoginScreenletDelegate for Recorder {
    fn on_login_success(&mut self, user: &Map<String, Value>, _session: &Session) {
        self.log(format!("login_success:{}", user["userId"]));
    }

    fn on_login_error(&mut self, error: &ScreenletError) {
        self.log(format!("login_error:{}", error.error_type()));
    }
}

/// View recording presentation signals.
#[derive(Clone)]
pub struct RecordingView(pub Events);

impl ScreenletView for RecordingView {
    fn show_progress(&mut self, message_key: &str) {
        self.0.lock().push(format!("show_progress:{}", message_key));
    }

    fn hide_progress(&mut self) {
        self.0.lock().push("hide_progress".to_string());
    }

    fn refresh(&mut self) {
        self.0.lock().push("refresh".to_string());
    }

    fn document_status_changed(&mut self, field: &str) {
        self.0.lock().push(format!("document_status:{}", field));
    }

    fn show_field(&mut self, field: &str) {
        self.0.lock().push(format!("show_field:{}", field));
    }
}

// -- Server payloads ----------------------------------------------------------

/// Structure with a text field and two document fields.
pub fn structure_payload() -> Value {
    json!({
        "structureId": 21303,
        "userId": 10198,
        "definition": {
            "fields": [
                {"name": "title", "label": {"en_US": "Title"}, "dataType": "string", "type": "text"},
                {"name": "photo", "label": "Photo", "dataType": "document-library", "type": "ddm-documentlibrary"},
                {"name": "resume", "label": "Resume", "dataType": "document-library", "type": "ddm-documentlibrary"}
            ]
        }
    })
}

pub fn file_entry(uuid: &str) -> Value {
    json!({"groupId": 10184, "uuid": uuid, "version": "1.0", "title": "form-file-x"})
}
