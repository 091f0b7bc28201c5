//! Authenticated session passed explicitly to transports and screenlets.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::config::Config;

/// Credentials sent with every request of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    Anonymous,
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header, if any.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            Credentials::Anonymous => None,
            Credentials::Basic { username, password } => {
                let token = STANDARD.encode(format!("{}:{}", username, password));
                Some(format!("Basic {}", token))
            }
        }
    }
}

/// Server identity plus the logged-in user, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    server: String,
    company_id: i64,
    credentials: Credentials,
    user: Option<Map<String, Value>>,
}

impl Session {
    pub fn new(server: impl Into<String>, company_id: i64, credentials: Credentials) -> Self {
        Self {
            server: server.into(),
            company_id,
            credentials,
            user: None,
        }
    }

    pub fn anonymous(server: impl Into<String>, company_id: i64) -> Self {
        Self::new(server, company_id, Credentials::Anonymous)
    }

    /// Session for the credentials in `[auth]`, anonymous if incomplete.
    pub fn from_config(config: &Config) -> Self {
        let credentials = match (&config.auth.username, &config.auth.password) {
            (Some(username), Some(password)) => Credentials::basic(username, password),
            _ => Credentials::Anonymous,
        };
        Self::new(&config.server.base_url, config.server.company_id, credentials)
    }

    /// Attach the attributes of the authenticated user.
    pub fn with_user(mut self, attributes: Map<String, Value>) -> Self {
        self.user = Some(attributes);
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn company_id(&self) -> i64 {
        self.company_id
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn user_attributes(&self) -> Option<&Map<String, Value>> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user
            .as_ref()
            .and_then(|attrs| attrs.get("userId"))
            .and_then(Value::as_i64)
    }

    /// True once a login has attached user attributes.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
