//! JSON web-service transport over reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::config::ServerConfig;
use crate::error::ScreenletError;
use crate::operation::{FileUpload, OperationKind, OperationRequest};
use crate::session::Session;
use crate::transport::{ProgressFn, Transport, UploadProgress};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

pub struct HttpTransport {
    client: Client,
    session: Session,
}

impl HttpTransport {
    pub fn new(session: Session, server: &ServerConfig) -> Result<Self, ScreenletError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(server.connect_timeout_seconds as u64))
            .timeout(Duration::from_secs(server.timeout_seconds as u64))
            .build()?;

        Ok(Self { client, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn base_url(&self) -> &str {
        self.session.server().trim_end_matches('/')
    }

    fn authorize(&self, builder: RequestBuilder, request: &OperationRequest) -> RequestBuilder {
        let credentials = request
            .credentials()
            .unwrap_or_else(|| self.session.credentials());
        match credentials.authorization_header() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }

    async fn invoke(&self, request: &OperationRequest) -> Result<Value, ScreenletError> {
        let url = format!("{}/api/jsonws/invoke", self.base_url());
        let builder = self.authorize(self.client.post(url), request);

        let response = builder.json(&request.body()).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        parse_response(status, &body)
    }

    async fn upload(
        &self,
        request: &OperationRequest,
        file: &FileUpload,
        progress: Option<ProgressFn>,
    ) -> Result<Value, ScreenletError> {
        let command = request
            .commands()
            .first()
            .ok_or_else(|| ScreenletError::InvalidInput("Upload without command".to_string()))?;
        let url = format!("{}/api/jsonws{}", self.base_url(), command.path);

        let mut form = Form::new();
        for (name, value) in &command.params {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(name.clone(), text);
        }

        let total = file.bytes.len() as u64;
        let part = Part::stream_with_length(progress_body(file, progress), total)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        form = form.part("file", part);

        let builder = self.authorize(self.client.post(url), request);
        let response = builder.multipart(form).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        parse_response(status, &body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(
        &self,
        request: &OperationRequest,
        progress: Option<ProgressFn>,
    ) -> Result<Value, ScreenletError> {
        match (request.kind(), request.file()) {
            (OperationKind::Upload, Some(file)) => self.upload(request, file, progress).await,
            (OperationKind::Upload, None) => Err(ScreenletError::InvalidInput(
                "Upload operation without file".to_string(),
            )),
            _ => self.invoke(request).await,
        }
    }
}

/// Chunked request body reporting each chunk as the connection pulls it.
///
/// Chunks are copied out of the shared file buffer one at a time.
fn progress_body(file: &FileUpload, progress: Option<ProgressFn>) -> Body {
    let bytes = Arc::clone(&file.bytes);
    let total = bytes.len() as u64;

    let body = stream::iter((0..bytes.len()).step_by(UPLOAD_CHUNK_SIZE)).map(move |start| {
        let end = bytes.len().min(start + UPLOAD_CHUNK_SIZE);
        let chunk = bytes[start..end].to_vec();
        if let Some(report) = &progress {
            report(UploadProgress {
                chunk: chunk.len() as u64,
                sent: end as u64,
                total,
            });
        }
        Ok::<_, std::io::Error>(chunk)
    });

    Body::wrap_stream(body)
}

/// Map an HTTP response onto a payload or a server error.
///
/// The portal reports failures either with an error status or with a
/// 200 body carrying `exception` (or `error.message`).
pub(crate) fn parse_response(status: StatusCode, body: &[u8]) -> Result<Value, ScreenletError> {
    let parsed = serde_json::from_slice::<Value>(body);

    if !status.is_success() {
        let message = parsed
            .as_ref()
            .ok()
            .and_then(exception_message)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
        return Err(ScreenletError::Server {
            status: status.as_u16(),
            message,
        });
    }

    let value = parsed?;
    if let Some(message) = exception_message(&value) {
        return Err(ScreenletError::Server {
            status: status.as_u16(),
            message,
        });
    }

    Ok(value)
}

fn exception_message(value: &Value) -> Option<String> {
    if let Some(exception) = value.get("exception").and_then(Value::as_str) {
        return Some(exception.to_string());
    }
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
