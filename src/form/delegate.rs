use serde_json::Value;

use crate::error::ScreenletError;
use crate::transport::UploadProgress;

use super::model::Record;

/// Form events reported to the host. Every method defaults to no-op.
pub trait FormScreenletDelegate: Send {
    fn on_form_loaded(&mut self, _record: &Record) {}

    fn on_form_load_error(&mut self, _error: &ScreenletError) {}

    fn on_record_loaded(&mut self, _record: &Record) {}

    fn on_record_load_error(&mut self, _error: &ScreenletError) {}

    fn on_form_submitted(&mut self, _record: &Record) {}

    fn on_form_submit_error(&mut self, _error: &ScreenletError) {}

    fn on_document_upload_started(&mut self, _field: &str) {}

    fn on_document_upload_progress(&mut self, _field: &str, _progress: &UploadProgress) {}

    fn on_document_uploaded(&mut self, _field: &str, _result: &Value) {}

    fn on_document_upload_error(&mut self, _field: &str, _error: &ScreenletError) {}
}
