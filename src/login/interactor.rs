use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScreenletError;
use crate::interactor::Interactor;
use crate::operation::{CacheStrategy, Command, OperationRequest};
use crate::session::Credentials;

pub const GET_USER_BY_EMAIL: &str = "/user/get-user-by-email-address";
pub const GET_USER_BY_SCREEN_NAME: &str = "/user/get-user-by-screen-name";
pub const GET_USER_BY_ID: &str = "/user/get-user-by-id";

/// What the login name identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    Email,
    ScreenName,
    UserId,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Email => "email",
            AuthMethod::ScreenName => "screen-name",
            AuthMethod::UserId => "user-id",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(AuthMethod::Email),
            "screen-name" | "screenName" => Some(AuthMethod::ScreenName),
            "user-id" | "userId" => Some(AuthMethod::UserId),
            _ => None,
        }
    }
}

/// Fetch the user matching the login, authenticating with it.
pub struct LoginInteractor {
    method: AuthMethod,
    company_id: i64,
    login: String,
    password: String,
    pub result_user_attributes: Option<Map<String, Value>>,
}

impl LoginInteractor {
    pub fn new(
        method: AuthMethod,
        company_id: i64,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            method,
            company_id,
            login: login.into(),
            password: password.into(),
            result_user_attributes: None,
        }
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::basic(self.login.as_str(), self.password.as_str())
    }

    fn command(&self) -> Result<Command, ScreenletError> {
        match self.method {
            AuthMethod::Email => Ok(Command::new(GET_USER_BY_EMAIL)
                .param("companyId", self.company_id)
                .param("emailAddress", self.login.as_str())),
            AuthMethod::ScreenName => Ok(Command::new(GET_USER_BY_SCREEN_NAME)
                .param("companyId", self.company_id)
                .param("screenName", self.login.as_str())),
            AuthMethod::UserId => {
                let user_id: i64 = self.login.trim().parse().map_err(|_| {
                    ScreenletError::InvalidInput(format!("'{}' is not a user id", self.login))
                })?;
                Ok(Command::new(GET_USER_BY_ID).param("userId", user_id))
            }
        }
    }
}

impl Interactor for LoginInteractor {
    fn action_name(&self) -> &'static str {
        super::LOGIN_ACTION
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::RemoteOnly
    }

    fn create_operation(&self) -> Result<OperationRequest, ScreenletError> {
        if self.login.is_empty() {
            return Err(ScreenletError::InvalidInput("Login cannot be empty".into()));
        }
        if self.password.is_empty() {
            return Err(ScreenletError::InvalidInput("Password cannot be empty".into()));
        }
        Ok(OperationRequest::read(vec![self.command()?]).with_credentials(self.credentials()))
    }

    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError> {
        let Value::Object(attributes) = payload else {
            return Err(ScreenletError::shape("User is not an object"));
        };
        if !attributes.contains_key("userId") {
            return Err(ScreenletError::shape("User without userId"));
        }
        self.result_user_attributes = Some(attributes);
        Ok(())
    }
}
