use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::ScreenletError;
use crate::interactor::{Completion, InteractorRunner, Resolved};
use crate::operation::CacheStrategy;
use crate::screenlet::{ActionSender, Coordinated, HeadlessView, ScreenletCore, ScreenletView};
use crate::session::Session;

use super::interactor::{AuthMethod, LoginInteractor};
use super::LOGIN_ACTION;

/// Login events reported to the host.
pub trait LoginScreenletDelegate: Send {
    fn on_login_success(&mut self, _user: &Map<String, Value>, _session: &Session) {}

    fn on_login_error(&mut self, _error: &ScreenletError) {}
}

#[derive(Debug)]
pub enum LoginMessage {
    LoggedIn(Completion<LoginInteractor>),
}

pub struct LoginScreenlet {
    core: ScreenletCore<LoginMessage>,
    method: AuthMethod,
    session: Session,
    login: String,
    password: String,
    delegate: Option<Box<dyn LoginScreenletDelegate>>,
    view: Box<dyn ScreenletView>,
}

impl LoginScreenlet {
    /// `session` names the server; its credentials are replaced on login.
    pub fn new(runner: InteractorRunner, session: Session, method: AuthMethod) -> Self {
        Self {
            core: ScreenletCore::new(runner, CacheStrategy::RemoteOnly),
            method,
            session,
            login: String::new(),
            password: String::new(),
            delegate: None,
            view: Box::new(HeadlessView),
        }
    }

    pub fn from_config(runner: InteractorRunner, config: &Config) -> Self {
        let method = AuthMethod::parse(&config.auth.method).unwrap_or_else(|| {
            tracing::warn!(method = %config.auth.method, "Unknown auth method, using email");
            AuthMethod::Email
        });
        let session = Session::anonymous(&config.server.base_url, config.server.company_id);
        let mut screenlet = Self::new(runner, session, method);
        if let (Some(login), Some(password)) = (&config.auth.username, &config.auth.password) {
            screenlet.set_credentials(login, password);
        }
        screenlet
    }

    pub fn with_delegate(mut self, delegate: impl LoginScreenletDelegate + 'static) -> Self {
        self.delegate = Some(Box::new(delegate));
        self
    }

    pub fn with_view(mut self, view: impl ScreenletView + 'static) -> Self {
        self.view = Box::new(view);
        self
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn set_method(&mut self, method: AuthMethod) {
        self.method = method;
    }

    pub fn set_credentials(&mut self, login: impl Into<String>, password: impl Into<String>) {
        self.login = login.into();
        self.password = password.into();
    }

    /// Current session; authenticated after a successful login.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn login(&mut self) -> bool {
        self.perform_action(LOGIN_ACTION, None)
    }

    /// Drop the authenticated user and credentials.
    pub fn logout(&mut self) {
        self.session = Session::anonymous(self.session.server(), self.session.company_id());
        self.password.clear();
        tracing::info!("Logged out");
    }

    pub fn perform_action(&mut self, name: &str, sender: Option<ActionSender>) -> bool {
        let Some(interactor) = self.create_interactor(name, sender.as_ref()) else {
            tracing::debug!(action = name, "No interactor for action");
            return false;
        };

        match self.core.start(interactor, LoginMessage::LoggedIn) {
            Ok(_) => {
                self.view.show_progress("login-loading");
                true
            }
            Err(rejected) => {
                self.on_login_failure(rejected.error);
                false
            }
        }
    }

    pub fn create_interactor(
        &self,
        name: &str,
        sender: Option<&ActionSender>,
    ) -> Option<LoginInteractor> {
        match (name, sender) {
            (LOGIN_ACTION, None) => Some(LoginInteractor::new(
                self.method,
                self.session.company_id(),
                self.login.as_str(),
                self.password.as_str(),
            )),
            _ => None,
        }
    }

    fn on_login_success(&mut self, interactor: LoginInteractor) {
        self.view.hide_progress();
        let Some(user) = interactor.result_user_attributes.clone() else {
            return;
        };
        self.session = Session::new(
            self.session.server(),
            self.session.company_id(),
            interactor.credentials(),
        )
        .with_user(user);
        tracing::info!(user_id = ?self.session.user_id(), method = self.method.as_str(), "Logged in");

        if let (Some(delegate), Some(user)) = (self.delegate.as_mut(), self.session.user_attributes()) {
            delegate.on_login_success(user, &self.session);
        }
    }

    fn on_login_failure(&mut self, error: ScreenletError) {
        tracing::warn!(error = %error, "Login failed");
        self.view.hide_progress();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_login_error(&error);
        }
    }
}

impl Coordinated for LoginScreenlet {
    type Message = LoginMessage;

    fn core_mut(&mut self) -> &mut ScreenletCore<LoginMessage> {
        &mut self.core
    }

    fn handle(&mut self, message: LoginMessage) {
        let LoginMessage::LoggedIn(completion) = message;
        self.core.finished(completion.id());
        match completion.resolve() {
            Resolved::Success(interactor) => self.on_login_success(interactor),
            Resolved::Failure { error, .. } => self.on_login_failure(error),
        }
    }
}
