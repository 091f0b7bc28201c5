//! Interactors behind the form actions.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::ScreenletError;
use crate::interactor::Interactor;
use crate::operation::{CacheStrategy, Command, OperationRequest};

use super::model::{LocalFile, Record};

pub const GET_STRUCTURE: &str = "/ddmstructure/get-structure";
pub const GET_RECORD: &str = "/screens.screensddlrecord/get-ddl-record";
pub const ADD_RECORD: &str = "/ddlrecord/add-record";
pub const UPDATE_RECORD: &str = "/ddlrecord/update-record";
pub const ADD_FILE_ENTRY: &str = "/dlapp/add-file-entry";

fn structure_command(structure_id: i64) -> Command {
    Command::new(GET_STRUCTURE).param("structureId", structure_id)
}

/// Record parsed from a `get-structure` response.
fn parse_structure(structure_id: i64, payload: &Value) -> Result<(Record, Option<i64>), ScreenletError> {
    let definition = payload
        .get("xsd")
        .or_else(|| payload.get("definition"))
        .ok_or_else(|| ScreenletError::shape("Structure without definition"))?;
    let mut record = Record::from_definition(structure_id, definition)?;
    let user_id = payload.get("userId").and_then(Value::as_i64);
    record.creator_user_id = user_id;
    Ok((record, user_id))
}

/// Fetch a structure and build an empty record from it.
pub struct LoadFormInteractor {
    structure_id: i64,
    strategy: CacheStrategy,
    pub result_record: Option<Record>,
    pub result_user_id: Option<i64>,
}

impl LoadFormInteractor {
    pub fn new(structure_id: i64, strategy: CacheStrategy) -> Self {
        Self {
            structure_id,
            strategy,
            result_record: None,
            result_user_id: None,
        }
    }
}

impl Interactor for LoadFormInteractor {
    fn action_name(&self) -> &'static str {
        super::LOAD_FORM_ACTION
    }

    fn cache_strategy(&self) -> CacheStrategy {
        self.strategy
    }

    fn create_operation(&self) -> Result<OperationRequest, ScreenletError> {
        if self.structure_id <= 0 {
            return Err(ScreenletError::InvalidInput(
                "structureId cannot be 0 or negative".into(),
            ));
        }
        Ok(OperationRequest::read(vec![structure_command(self.structure_id)]))
    }

    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError> {
        let (record, user_id) = parse_structure(self.structure_id, &payload)?;
        self.result_record = Some(record);
        self.result_user_id = user_id;
        Ok(())
    }
}

/// Fetch the values of a record, plus its structure when the form is not
/// loaded yet (batched in one request).
pub struct LoadRecordInteractor {
    record_id: i64,
    structure_id: Option<i64>,
    locale: String,
    strategy: CacheStrategy,
    pub result_form_record: Option<Record>,
    pub result_form_user_id: Option<i64>,
    pub result_record_data: Option<Map<String, Value>>,
    pub result_record_id: Option<i64>,
}

impl LoadRecordInteractor {
    /// `structure_id` is `Some` when the structure must be fetched too.
    pub fn new(
        record_id: i64,
        structure_id: Option<i64>,
        locale: impl Into<String>,
        strategy: CacheStrategy,
    ) -> Self {
        Self {
            record_id,
            structure_id,
            locale: locale.into(),
            strategy,
            result_form_record: None,
            result_form_user_id: None,
            result_record_data: None,
            result_record_id: None,
        }
    }
}

impl Interactor for LoadRecordInteractor {
    fn action_name(&self) -> &'static str {
        super::LOAD_RECORD_ACTION
    }

    fn cache_strategy(&self) -> CacheStrategy {
        self.strategy
    }

    fn create_operation(&self) -> Result<OperationRequest, ScreenletError> {
        if self.record_id <= 0 {
            return Err(ScreenletError::InvalidInput(
                "recordId cannot be 0 or negative".into(),
            ));
        }

        let mut commands = Vec::with_capacity(2);
        if let Some(structure_id) = self.structure_id {
            commands.push(structure_command(structure_id));
        }
        commands.push(
            Command::new(GET_RECORD)
                .param("ddlRecordId", self.record_id)
                .param("locale", self.locale.as_str()),
        );
        Ok(OperationRequest::read(commands))
    }

    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError> {
        let (structure, record) = match (self.structure_id, payload) {
            (Some(structure_id), Value::Array(mut results)) if results.len() == 2 => {
                let record = results.pop().unwrap_or(Value::Null);
                let structure = results.pop().unwrap_or(Value::Null);
                (Some(parse_structure(structure_id, &structure)?), record)
            }
            (Some(_), _) => {
                return Err(ScreenletError::shape(
                    "Expected structure and record in batch response",
                ))
            }
            (None, record) => (None, record),
        };

        let values = record
            .get("modelValues")
            .and_then(Value::as_object)
            .ok_or_else(|| ScreenletError::shape("Record without modelValues"))?
            .clone();
        let record_id = record
            .get("modelAttributes")
            .and_then(|attrs| attrs.get("recordId"))
            .or_else(|| record.get("recordId"))
            .and_then(Value::as_i64)
            .unwrap_or(self.record_id);

        if let Some((form, user_id)) = structure {
            self.result_form_record = Some(form);
            self.result_form_user_id = user_id;
        }
        self.result_record_data = Some(values);
        self.result_record_id = Some(record_id);
        Ok(())
    }
}

/// Add a new record or update an existing one.
pub struct SubmitFormInteractor {
    group_id: i64,
    record_set_id: i64,
    user_id: Option<i64>,
    record: Record,
    strategy: CacheStrategy,
    pub result_record_id: Option<i64>,
    /// True when the write was queued offline instead of sent.
    pub stored_offline: bool,
}

impl SubmitFormInteractor {
    pub fn new(
        group_id: i64,
        record_set_id: i64,
        user_id: Option<i64>,
        record: Record,
        strategy: CacheStrategy,
    ) -> Self {
        Self {
            group_id,
            record_set_id,
            user_id,
            record,
            strategy,
            result_record_id: None,
            stored_offline: false,
        }
    }

    pub fn is_update(&self) -> bool {
        self.record.record_id.is_some()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    fn validate(&self) -> Result<(), ScreenletError> {
        if self.group_id <= 0 {
            return Err(ScreenletError::InvalidInput(
                "groupId cannot be 0 or negative".into(),
            ));
        }
        if self.record.is_empty() {
            return Err(ScreenletError::InvalidInput(
                "Record's fields cannot be empty".into(),
            ));
        }
        match self.record.record_id {
            Some(record_id) if record_id <= 0 => Err(ScreenletError::InvalidInput(
                "Record's recordId cannot be 0 or negative".into(),
            )),
            None if self.record_set_id <= 0 => Err(ScreenletError::InvalidInput(
                "recordSetId cannot be 0 or negative".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl Interactor for SubmitFormInteractor {
    fn action_name(&self) -> &'static str {
        super::SUBMIT_FORM_ACTION
    }

    fn cache_strategy(&self) -> CacheStrategy {
        self.strategy
    }

    fn create_operation(&self) -> Result<OperationRequest, ScreenletError> {
        self.validate()?;

        let service_context = json!({
            "userId": self.user_id.or(self.record.creator_user_id),
            "scopeGroupId": self.group_id,
        });
        let fields = Value::Object(self.record.data());

        let command = match self.record.record_id {
            Some(record_id) => Command::new(UPDATE_RECORD)
                .param("recordId", record_id)
                .param("displayIndex", 0)
                .param("fieldsMap", fields)
                .param("mergeFields", true)
                .param("serviceContext", service_context),
            None => Command::new(ADD_RECORD)
                .param("groupId", self.group_id)
                .param("recordSetId", self.record_set_id)
                .param("displayIndex", 0)
                .param("fieldsMap", fields)
                .param("serviceContext", service_context),
        };
        Ok(OperationRequest::write(command))
    }

    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError> {
        if payload.is_null() {
            self.stored_offline = true;
            return Ok(());
        }
        let record_id = payload
            .get("recordId")
            .and_then(Value::as_i64)
            .ok_or_else(|| ScreenletError::shape("Submitted record without recordId"))?;
        self.result_record_id = Some(record_id);
        Ok(())
    }
}

/// Upload the file picked for a document field.
pub struct UploadDocumentInteractor {
    field_name: String,
    file: Option<LocalFile>,
    repository_id: i64,
    folder_id: i64,
    title: String,
    pub result_response: Option<Value>,
}

impl UploadDocumentInteractor {
    pub fn new(
        field_name: impl Into<String>,
        file: Option<LocalFile>,
        repository_id: i64,
        folder_id: i64,
        file_prefix: &str,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file,
            repository_id,
            folder_id,
            title: format!("{}{}", file_prefix, Uuid::new_v4()),
            result_response: None,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Size of the file being sent, 0 if none.
    pub fn total_bytes(&self) -> u64 {
        self.file.as_ref().map(LocalFile::len).unwrap_or(0)
    }
}

impl Interactor for UploadDocumentInteractor {
    fn action_name(&self) -> &'static str {
        super::UPLOAD_DOCUMENT_ACTION
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::RemoteOnly
    }

    fn create_operation(&self) -> Result<OperationRequest, ScreenletError> {
        let file = self.file.as_ref().ok_or_else(|| {
            ScreenletError::InvalidInput(format!("Field '{}' has no file to upload", self.field_name))
        })?;
        if self.repository_id <= 0 {
            return Err(ScreenletError::InvalidInput(
                "repositoryId cannot be 0 or negative".into(),
            ));
        }

        let command = Command::new(ADD_FILE_ENTRY)
            .param("repositoryId", self.repository_id)
            .param("folderId", self.folder_id)
            .param("sourceFileName", file.file_name.as_str())
            .param("mimeType", file.mime_type.as_str())
            .param("title", self.title.as_str())
            .param("description", "")
            .param("changeLog", "");
        Ok(OperationRequest::upload(command, file.to_upload()))
    }

    fn completed_operation(&mut self, payload: Value) -> Result<(), ScreenletError> {
        if !payload.is_object() {
            return Err(ScreenletError::shape("Upload response is not an object"));
        }
        self.result_response = Some(payload);
        Ok(())
    }
}
