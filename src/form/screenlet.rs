use serde_json::Value;

use crate::config::Config;
use crate::error::ScreenletError;
use crate::interactor::{Completion, InteractorRunner, Resolved};
use crate::operation::{CacheStrategy, OperationId};
use crate::screenlet::{ActionSender, Coordinated, HeadlessView, ScreenletCore, ScreenletView};
use crate::transport::UploadProgress;

use super::delegate::FormScreenletDelegate;
use super::interactors::{
    LoadFormInteractor, LoadRecordInteractor, SubmitFormInteractor, UploadDocumentInteractor,
};
use super::model::{DocumentField, DocumentUploadStatus, LocalFile, Record};
use super::upload::{UploadFailurePolicy, UploadIntent, UploadStatus};
use super::{LOAD_FORM_ACTION, LOAD_RECORD_ACTION, SUBMIT_FORM_ACTION, UPLOAD_DOCUMENT_ACTION};

const DEFAULT_LOCALE: &str = "en_US";

/// Identifiers and behavior of a form screenlet. Ids of 0 mean unset.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSettings {
    pub structure_id: i64,
    pub group_id: i64,
    pub record_set_id: i64,
    pub record_id: i64,
    pub user_id: i64,
    pub repository_id: i64,
    pub folder_id: i64,
    pub file_prefix: String,
    pub locale: String,
    pub auto_load: bool,
    pub cache_strategy: CacheStrategy,
    pub upload_failure_policy: UploadFailurePolicy,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FormSettings {
    pub fn from_config(config: &Config) -> Self {
        let form = &config.form;
        // Documents go to the site repository unless configured otherwise
        let repository_id = if form.repository_id > 0 {
            form.repository_id
        } else {
            config.server.group_id
        };
        Self {
            structure_id: form.structure_id,
            group_id: config.server.group_id,
            record_set_id: form.record_set_id,
            record_id: form.record_id,
            user_id: 0,
            repository_id,
            folder_id: form.folder_id,
            file_prefix: form.file_prefix.clone(),
            locale: DEFAULT_LOCALE.to_string(),
            auto_load: form.auto_load,
            cache_strategy: config.cache.strategy(),
            upload_failure_policy: form.upload_failure_policy,
        }
    }
}

/// Interactor built for one form action.
pub enum FormInteractor {
    LoadForm(LoadFormInteractor),
    LoadRecord(LoadRecordInteractor),
    Submit(SubmitFormInteractor),
    Upload(UploadDocumentInteractor),
}

impl FormInteractor {
    pub fn action_name(&self) -> &'static str {
        match self {
            FormInteractor::LoadForm(_) => LOAD_FORM_ACTION,
            FormInteractor::LoadRecord(_) => LOAD_RECORD_ACTION,
            FormInteractor::Submit(_) => SUBMIT_FORM_ACTION,
            FormInteractor::Upload(_) => UPLOAD_DOCUMENT_ACTION,
        }
    }
}

/// Messages delivered to a form's coordination context.
#[derive(Debug)]
pub enum FormMessage {
    FormLoaded(Completion<LoadFormInteractor>),
    RecordLoaded(Completion<LoadRecordInteractor>),
    Submitted(Completion<SubmitFormInteractor>),
    Uploaded(Completion<UploadDocumentInteractor>),
    UploadProgress {
        field: String,
        progress: UploadProgress,
    },
}

/// Headless form screenlet.
pub struct FormScreenlet {
    core: ScreenletCore<FormMessage>,
    settings: FormSettings,
    record: Option<Record>,
    upload_status: UploadStatus,
    delegate: Option<Box<dyn FormScreenletDelegate>>,
    view: Box<dyn ScreenletView>,
}

impl FormScreenlet {
    pub fn new(runner: InteractorRunner, settings: FormSettings) -> Self {
        Self {
            core: ScreenletCore::new(runner, settings.cache_strategy),
            settings,
            record: None,
            upload_status: UploadStatus::default(),
            delegate: None,
            view: Box::new(HeadlessView),
        }
    }

    pub fn with_delegate(mut self, delegate: impl FormScreenletDelegate + 'static) -> Self {
        self.delegate = Some(Box::new(delegate));
        self
    }

    pub fn with_view(mut self, view: impl ScreenletView + 'static) -> Self {
        self.view = Box::new(view);
        self
    }

    pub fn set_delegate(&mut self, delegate: Option<Box<dyn FormScreenletDelegate>>) {
        self.delegate = delegate;
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut FormSettings {
        &mut self.settings
    }

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut Record> {
        self.record.as_mut()
    }

    pub fn upload_status(&self) -> &UploadStatus {
        &self.upload_status
    }

    pub fn in_flight(&self) -> usize {
        self.core.in_flight()
    }

    pub fn cancel(&self, id: OperationId) -> bool {
        self.core.cancel(id)
    }

    pub fn cancel_all(&self) -> usize {
        self.core.cancel_all()
    }

    /// Host lifecycle hook: auto-load the record if one is set, else the form.
    pub fn on_show(&mut self) -> bool {
        if !self.settings.auto_load {
            return false;
        }
        if self.settings.record_id != 0 {
            self.load_record()
        } else {
            self.load_form()
        }
    }

    pub fn load_form(&mut self) -> bool {
        self.perform_action(LOAD_FORM_ACTION, None)
    }

    pub fn load_record(&mut self) -> bool {
        self.perform_action(LOAD_RECORD_ACTION, None)
    }

    pub fn submit_form(&mut self) -> bool {
        self.perform_action(SUBMIT_FORM_ACTION, None)
    }

    pub fn clear_form(&mut self) {
        if let Some(record) = self.record.as_mut() {
            record.clear_values();
        }
        self.view.refresh();
    }

    /// Pick `file` for a document field and start uploading it.
    pub fn upload_document(&mut self, field: &str, file: LocalFile) -> bool {
        match self.document_mut(field) {
            Some(document) => document.set_source(file),
            None => {
                tracing::warn!(field, "Not a document field");
                return false;
            }
        }
        self.perform_action(UPLOAD_DOCUMENT_ACTION, Some(ActionSender::Field(field.to_string())))
    }

    /// Run the named action. Returns false if it was not started.
    pub fn perform_action(&mut self, name: &str, sender: Option<ActionSender>) -> bool {
        match self.create_interactor(name, sender.as_ref()) {
            Some(interactor) => self.start(interactor),
            None => {
                tracing::debug!(action = name, "No interactor for action");
                false
            }
        }
    }

    /// Interactor for `name`, or `None` for unknown actions, unsupported
    /// senders, or a submit that has to wait for uploads.
    pub fn create_interactor(
        &mut self,
        name: &str,
        sender: Option<&ActionSender>,
    ) -> Option<FormInteractor> {
        let strategy = self.core.cache_strategy();
        match (name, sender) {
            (LOAD_FORM_ACTION, _) => Some(FormInteractor::LoadForm(LoadFormInteractor::new(
                self.settings.structure_id,
                strategy,
            ))),
            (LOAD_RECORD_ACTION, _) => {
                let needed_structure = match &self.record {
                    Some(record) if !record.is_empty() => None,
                    _ => Some(self.settings.structure_id),
                };
                Some(FormInteractor::LoadRecord(LoadRecordInteractor::new(
                    self.settings.record_id,
                    needed_structure,
                    self.settings.locale.as_str(),
                    strategy,
                )))
            }
            (SUBMIT_FORM_ACTION, _) => {
                if self.wait_for_in_progress_upload() {
                    return None;
                }
                let record = self.record.clone()?;
                let user_id = (self.settings.user_id > 0).then_some(self.settings.user_id);
                Some(FormInteractor::Submit(SubmitFormInteractor::new(
                    self.settings.group_id,
                    self.settings.record_set_id,
                    user_id,
                    record,
                    strategy,
                )))
            }
            (UPLOAD_DOCUMENT_ACTION, Some(ActionSender::Field(field))) => {
                let file = self.document(field)?.source().cloned();
                Some(FormInteractor::Upload(UploadDocumentInteractor::new(
                    field.as_str(),
                    file,
                    self.settings.repository_id,
                    self.settings.folder_id,
                    &self.settings.file_prefix,
                )))
            }
            _ => None,
        }
    }

    fn start(&mut self, interactor: FormInteractor) -> bool {
        match interactor {
            FormInteractor::LoadForm(interactor) => {
                match self.core.start(interactor, FormMessage::FormLoaded) {
                    Ok(_) => true,
                    Err(rejected) => {
                        self.on_form_load_failure(rejected.error);
                        false
                    }
                }
            }
            FormInteractor::LoadRecord(interactor) => {
                match self.core.start(interactor, FormMessage::RecordLoaded) {
                    Ok(_) => true,
                    Err(rejected) => {
                        self.on_record_load_failure(rejected.error);
                        false
                    }
                }
            }
            FormInteractor::Submit(interactor) => {
                match self.core.start(interactor, FormMessage::Submitted) {
                    Ok(_) => true,
                    Err(rejected) => {
                        self.on_submit_failure(rejected.error);
                        false
                    }
                }
            }
            FormInteractor::Upload(interactor) => {
                let field = interactor.field_name().to_string();
                let total = interactor.total_bytes();
                let progress_field = field.clone();
                let started = self.core.start_with_progress(
                    interactor,
                    FormMessage::Uploaded,
                    move |progress| FormMessage::UploadProgress {
                        field: progress_field.clone(),
                        progress,
                    },
                );
                match started {
                    Ok(_) => {
                        self.on_upload_started(&field, total);
                        true
                    }
                    Err(rejected) => {
                        tracing::warn!(field = %field, error = %rejected.error, "Upload rejected");
                        if let Some(delegate) = self.delegate.as_mut() {
                            delegate.on_document_upload_error(&field, &rejected.error);
                        }
                        false
                    }
                }
            }
        }
    }

    /// Submit guard. Returns true when the submit has to wait for uploads.
    fn wait_for_in_progress_upload(&mut self) -> bool {
        match self.upload_status {
            UploadStatus::Idle => false,
            UploadStatus::Failed { .. } => {
                self.retry_uploads();
                true
            }
            UploadStatus::Uploading {
                submit_requested: true,
                ..
            } => true,
            UploadStatus::Uploading { active, .. } => {
                let message_key = if active == 1 {
                    "uploading-message-singular"
                } else {
                    "uploading-message-plural"
                };
                self.dispatch_upload(UploadIntent::SubmitRequested);
                self.view.show_progress(message_key);
                true
            }
        }
    }

    fn retry_uploads(&mut self) {
        let failed = self
            .record
            .as_ref()
            .map(Record::failed_document_fields)
            .unwrap_or_default();

        if failed.is_empty() {
            tracing::error!(status = ?self.upload_status, "No failed uploads to retry");
            panic!("Inconsistency: no failed uploads but upload status is failed");
        }

        tracing::info!(fields = failed.len(), "Retrying failed uploads");
        self.view.show_progress("uploading-retry");
        for field in failed {
            self.perform_action(UPLOAD_DOCUMENT_ACTION, Some(ActionSender::Field(field)));
        }
        self.dispatch_upload(UploadIntent::SubmitRequested);
    }

    /// Apply an upload intent; returns the previous status.
    fn dispatch_upload(&mut self, intent: UploadIntent) -> UploadStatus {
        let previous = std::mem::take(&mut self.upload_status);
        self.upload_status = self
            .settings
            .upload_failure_policy
            .reduce(previous.clone(), intent);
        tracing::debug!(from = ?previous, to = ?self.upload_status, "Upload status changed");
        previous
    }

    fn document(&self, field: &str) -> Option<&DocumentField> {
        self.record.as_ref()?.field(field)?.document()
    }

    fn document_mut(&mut self, field: &str) -> Option<&mut DocumentField> {
        self.record.as_mut()?.field_mut(field)?.document_mut()
    }

    fn set_document_status(&mut self, field: &str, status: DocumentUploadStatus) {
        if let Some(document) = self.document_mut(field) {
            document.set_status(status);
        }
        self.view.document_status_changed(field);
    }

    fn on_form_loaded(&mut self, interactor: LoadFormInteractor) {
        let Some(record) = interactor.result_record else {
            return;
        };
        if let Some(user_id) = interactor.result_user_id {
            self.settings.user_id = user_id;
        }
        tracing::info!(structure_id = record.structure_id, fields = record.field_count(), "Form loaded");
        let record = self.record.insert(record);
        self.view.refresh();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_form_loaded(record);
        }
    }

    fn on_form_load_failure(&mut self, error: ScreenletError) {
        tracing::warn!(error = %error, "Form load failed");
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_form_load_error(&error);
        }
    }

    fn on_record_loaded(&mut self, mut interactor: LoadRecordInteractor) {
        if let Some(form) = interactor.result_form_record.take() {
            if let Some(user_id) = interactor.result_form_user_id {
                self.settings.user_id = user_id;
            }
            if let Some(delegate) = self.delegate.as_mut() {
                delegate.on_form_loaded(&form);
            }
            self.record = Some(form);
        }

        let Some(record) = self.record.as_mut() else {
            return;
        };
        if let Some(values) = &interactor.result_record_data {
            record.update_current_values(values);
        }
        record.record_id = interactor.result_record_id;
        if let Some(record_id) = interactor.result_record_id {
            self.settings.record_id = record_id;
        }
        tracing::info!(record_id = ?record.record_id, "Record loaded");

        self.view.refresh();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_record_loaded(record);
        }
    }

    fn on_record_load_failure(&mut self, error: ScreenletError) {
        tracing::warn!(error = %error, "Record load failed");
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_record_load_error(&error);
        }
    }

    fn on_submitted(&mut self, interactor: SubmitFormInteractor) {
        self.view.hide_progress();
        let Some(record) = self.record.as_mut() else {
            return;
        };
        if let Some(record_id) = interactor.result_record_id {
            self.settings.record_id = record_id;
            record.record_id = Some(record_id);
        }
        tracing::info!(
            record_id = ?record.record_id,
            offline = interactor.stored_offline,
            "Form submitted"
        );
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_form_submitted(record);
        }
    }

    fn on_submit_failure(&mut self, error: ScreenletError) {
        tracing::warn!(error = %error, "Form submit failed");
        self.view.hide_progress();
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_form_submit_error(&error);
        }
    }

    fn on_upload_started(&mut self, field: &str, total: u64) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_document_upload_started(field);
        }
        self.set_document_status(field, DocumentUploadStatus::Uploading { sent: 0, total });
        self.dispatch_upload(UploadIntent::Started);
    }

    fn on_upload_progress(&mut self, field: &str, progress: UploadProgress) {
        // Late progress from an upload that already failed is dropped
        if !self.upload_status.is_uploading() {
            return;
        }
        self.set_document_status(
            field,
            DocumentUploadStatus::Uploading {
                sent: progress.sent,
                total: progress.total,
            },
        );
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_document_upload_progress(field, &progress);
        }
    }

    fn on_uploaded(&mut self, interactor: UploadDocumentInteractor) {
        let field = interactor.field_name().to_string();
        let response = interactor.result_response.unwrap_or(Value::Null);
        tracing::info!(field = %field, "Document uploaded");

        self.set_document_status(&field, DocumentUploadStatus::Uploaded(response.clone()));
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_document_uploaded(&field, &response);
        }

        let previous = self.dispatch_upload(UploadIntent::Succeeded);
        if previous.submit_requested() && self.upload_status.is_idle() {
            self.view.hide_progress();
            self.submit_form();
        }
    }

    fn on_upload_failure(&mut self, interactor: UploadDocumentInteractor, error: ScreenletError) {
        let field = interactor.field_name().to_string();
        tracing::warn!(field = %field, error = %error, "Document upload failed");

        self.set_document_status(&field, DocumentUploadStatus::Failed(error.clone()));
        let invalid = self
            .record
            .as_ref()
            .and_then(|record| record.field(&field))
            .is_some_and(|f| !f.validate());
        if invalid {
            self.view.show_field(&field);
        }
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_document_upload_error(&field, &error);
        }

        let previous = self.dispatch_upload(UploadIntent::Failed { error });
        if previous.submit_requested() {
            // The pending submit now waits for a retry
            self.view.hide_progress();
        }
    }
}

impl Coordinated for FormScreenlet {
    type Message = FormMessage;

    fn core_mut(&mut self) -> &mut ScreenletCore<FormMessage> {
        &mut self.core
    }

    fn handle(&mut self, message: FormMessage) {
        match message {
            FormMessage::FormLoaded(completion) => {
                self.core.finished(completion.id());
                match completion.resolve() {
                    Resolved::Success(interactor) => self.on_form_loaded(interactor),
                    Resolved::Failure { error, .. } => self.on_form_load_failure(error),
                }
            }
            FormMessage::RecordLoaded(completion) => {
                self.core.finished(completion.id());
                match completion.resolve() {
                    Resolved::Success(interactor) => self.on_record_loaded(interactor),
                    Resolved::Failure { error, .. } => self.on_record_load_failure(error),
                }
            }
            FormMessage::Submitted(completion) => {
                self.core.finished(completion.id());
                match completion.resolve() {
                    Resolved::Success(interactor) => self.on_submitted(interactor),
                    Resolved::Failure { error, .. } => self.on_submit_failure(error),
                }
            }
            FormMessage::Uploaded(completion) => {
                self.core.finished(completion.id());
                match completion.resolve() {
                    Resolved::Success(interactor) => self.on_uploaded(interactor),
                    Resolved::Failure { interactor, error } => {
                        self.on_upload_failure(interactor, error)
                    }
                }
            }
            FormMessage::UploadProgress { field, progress } => {
                self.on_upload_progress(&field, progress)
            }
        }
    }
}
