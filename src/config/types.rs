use serde::{Deserialize, Serialize};

use crate::form::UploadFailurePolicy;
use crate::operation::CacheStrategy;

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub list: ListConfig,
}

/// Server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Portal base URL (e.g., "http://localhost:8080").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Company (portal instance) identifier.
    #[serde(default)]
    pub company_id: i64,
    /// Site identifier used as scope for writes.
    #[serde(default)]
    pub group_id: i64,
    /// Connection timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Offline policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// One of "remote-only", "cache-only", "remote-first", "cache-first".
    #[serde(default = "default_policy")]
    pub policy: String,
}

/// Credentials used for basic authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Login method: "email", "screen-name" or "user-id".
    #[serde(default = "default_auth_method")]
    pub method: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Form screenlet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(default)]
    pub structure_id: i64,
    #[serde(default)]
    pub record_set_id: i64,
    #[serde(default)]
    pub record_id: i64,
    #[serde(default)]
    pub repository_id: i64,
    #[serde(default)]
    pub folder_id: i64,
    /// Title prefix for uploaded documents.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_true")]
    pub auto_load: bool,
    #[serde(default)]
    pub upload_failure_policy: UploadFailurePolicy,
}

/// List screenlet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default)]
    pub record_set_id: i64,
    /// Rows requested for page 0 (default: 50).
    #[serde(default = "default_first_page_size")]
    pub first_page_size: usize,
    /// Rows requested for every later page (default: 25).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Field names joined to build an entry title.
    #[serde(default)]
    pub label_fields: Vec<String>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_timeout() -> u32 {
    30
}

fn default_policy() -> String {
    CacheStrategy::default().as_str().to_string()
}

fn default_auth_method() -> String {
    "email".to_string()
}

fn default_file_prefix() -> String {
    "form-file-".to_string()
}

fn default_true() -> bool {
    true
}

fn default_first_page_size() -> usize {
    50
}

fn default_page_size() -> usize {
    25
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            company_id: 0,
            group_id: 0,
            connect_timeout_seconds: default_connect_timeout(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
        }
    }
}

impl CacheConfig {
    /// Parsed policy; unknown names fall back to remote-first.
    pub fn strategy(&self) -> CacheStrategy {
        CacheStrategy::from_policy(Some(self.policy.as_str()))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: default_auth_method(),
            username: None,
            password: None,
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            structure_id: 0,
            record_set_id: 0,
            record_id: 0,
            repository_id: 0,
            folder_id: 0,
            file_prefix: default_file_prefix(),
            auto_load: true,
            upload_failure_policy: UploadFailurePolicy::default(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            record_set_id: 0,
            first_page_size: default_first_page_size(),
            page_size: default_page_size(),
            label_fields: Vec::new(),
        }
    }
}
