//! HTTP transport against a mock portal.

mod common;

use std::sync::Arc;

use common::mock_server::{MockResponse, MockServer};
use parking_lot::Mutex;
use screenlets::config::ServerConfig;
use screenlets::error::ScreenletError;
use screenlets::operation::{Command, FileUpload, OperationRequest};
use screenlets::session::{Credentials, Session};
use screenlets::transport::{HttpTransport, ProgressFn, Transport, UploadProgress};
use serde_json::json;

fn transport(server: &MockServer, credentials: Credentials) -> HttpTransport {
    let session = Session::new(server.base_url(), 10154, credentials);
    HttpTransport::new(session, &ServerConfig::default()).unwrap()
}

fn get_user() -> OperationRequest {
    OperationRequest::read(vec![Command::new("/user/get-user-by-id").param("userId", 10198)])
}

#[tokio::test]
async fn invoke_posts_command_with_basic_auth() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(r#"{"userId": 10198}"#)).await;
    let http = transport(&server, Credentials::basic("test@liferay.com", "test"));

    let payload = http.send(&get_user(), None).await.unwrap();
    assert_eq!(payload, json!({"userId": 10198}));

    let captured = server.captured_requests().await;
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].method, "POST");
    assert_eq!(captured[0].path, "/api/jsonws/invoke");
    assert_eq!(
        captured[0].header("authorization"),
        Some("Basic dGVzdEBsaWZlcmF5LmNvbTp0ZXN0")
    );
    assert_eq!(
        captured[0].json(),
        json!({"/user/get-user-by-id": {"userId": 10198}})
    );
}

#[tokio::test]
async fn request_credentials_override_session() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(r#"{"userId": 1}"#)).await;
    let http = transport(&server, Credentials::Anonymous);

    let request = get_user().with_credentials(Credentials::basic("test@liferay.com", "test"));
    http.send(&request, None).await.unwrap();

    let captured = server.captured_requests().await;
    assert!(captured[0].header("authorization").is_some());
}

#[tokio::test]
async fn anonymous_session_sends_no_auth_header() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json("{}")).await;
    let http = transport(&server, Credentials::Anonymous);

    http.send(&get_user(), None).await.unwrap();
    assert!(server.captured_requests().await[0].header("authorization").is_none());
}

#[tokio::test]
async fn batch_sends_array_and_returns_array() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json(r#"[[{"a": 1}], 1]"#)).await;
    let http = transport(&server, Credentials::Anonymous);

    let request = OperationRequest::read(vec![
        Command::new("/screens.screensddlrecord/get-ddl-records").param("ddlRecordSetId", 1),
        Command::new("/screens.screensddlrecord/get-ddl-records-count").param("ddlRecordSetId", 1),
    ]);
    let payload = http.send(&request, None).await.unwrap();
    assert_eq!(payload, json!([[{"a": 1}], 1]));

    let body = server.captured_requests().await[0].json();
    assert!(body.is_array());
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn exception_body_and_error_status_are_server_errors() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(
            r#"{"exception": "No JSON web service action with path /user/get-user-by-id"}"#,
        ))
        .await;
    server
        .enqueue(MockResponse::status(403, "Authenticated access required"))
        .await;
    let http = transport(&server, Credentials::Anonymous);

    let err = http.send(&get_user(), None).await.unwrap_err();
    assert!(matches!(err, ScreenletError::Server { status: 200, .. }));

    let err = http.send(&get_user(), None).await.unwrap_err();
    assert_eq!(
        err,
        ScreenletError::Server {
            status: 403,
            message: "Authenticated access required".into()
        }
    );
    assert!(!err.is_transport());
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;
    server.enqueue(MockResponse::json("{not json")).await;
    let http = transport(&server, Credentials::Anonymous);

    let err = http.send(&get_user(), None).await.unwrap_err();
    assert_eq!(err.error_type(), "deserialize_error");
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let session = Session::anonymous(format!("http://127.0.0.1:{}", port), 10154);
    let http = HttpTransport::new(session, &ServerConfig::default()).unwrap();

    let err = http.send(&get_user(), None).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json("{}").with_delay(2_500))
        .await;
    let config = ServerConfig {
        timeout_seconds: 1,
        ..ServerConfig::default()
    };
    let http = HttpTransport::new(Session::anonymous(server.base_url(), 1), &config).unwrap();

    let err = http.send(&get_user(), None).await.unwrap_err();
    assert_eq!(err, ScreenletError::Timeout);
}

#[tokio::test]
async fn upload_is_multipart_with_progress() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(r#"{"uuid": "abc", "groupId": 10184, "version": "1.0"}"#))
        .await;
    let http = transport(&server, Credentials::basic("test", "test"));

    let command = Command::new("/dlapp/add-file-entry")
        .param("repositoryId", 10184)
        .param("sourceFileName", "notes.txt")
        .param("title", "form-file-1");
    let file = FileUpload {
        file_name: "notes.txt".into(),
        mime_type: "text/plain".into(),
        bytes: Arc::from(&b"hello upload"[..]),
    };

    let reports: Arc<Mutex<Vec<UploadProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    let progress: ProgressFn = Arc::new(move |p| sink.lock().push(p));

    let payload = http
        .send(&OperationRequest::upload(command, file), Some(progress))
        .await
        .unwrap();
    assert_eq!(payload["uuid"], json!("abc"));

    let captured = &server.captured_requests().await[0];
    assert_eq!(captured.path, "/api/jsonws/dlapp/add-file-entry");
    assert!(captured
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));
    let body = captured.body_text();
    assert!(body.contains("name=\"repositoryId\""));
    assert!(body.contains("10184"));
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("hello upload"));

    let reports = reports.lock();
    let last = reports.last().unwrap();
    assert_eq!(last.sent, 12);
    assert_eq!(last.total, 12);
}

#[tokio::test]
async fn large_upload_reports_each_chunk() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(r#"{"uuid": "big", "groupId": 10184}"#))
        .await;
    let http = transport(&server, Credentials::basic("test", "test"));

    let content: Vec<u8> = (0..150_000u32).map(|i| b'a' + (i % 26) as u8).collect();
    let file = FileUpload {
        file_name: "big.txt".into(),
        mime_type: "text/plain".into(),
        bytes: Arc::from(content.clone()),
    };
    let command = Command::new("/dlapp/add-file-entry").param("repositoryId", 10184);

    let reports: Arc<Mutex<Vec<UploadProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    let progress: ProgressFn = Arc::new(move |p| sink.lock().push(p));

    http.send(&OperationRequest::upload(command, file), Some(progress))
        .await
        .unwrap();

    let reports = reports.lock();
    let sent: Vec<u64> = reports.iter().map(|p| p.sent).collect();
    assert_eq!(sent, [65_536, 131_072, 150_000]);
    assert_eq!(reports.iter().map(|p| p.chunk).sum::<u64>(), 150_000);
    assert!(reports.iter().all(|p| p.total == 150_000));

    let captured = &server.captured_requests().await[0];
    let body = &captured.body;
    assert!(body.windows(content.len()).any(|window| window == &content[..]));
}
