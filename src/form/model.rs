//! Form records and their fields.

use std::sync::Arc;

use serde_json::{json, Map, Number, Value};

use crate::error::ScreenletError;
use crate::operation::FileUpload;

const DEFAULT_LOCALE: &str = "en_US";

/// One choice of a select or radio field.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub name: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    fn from_definition(data: &Value) -> Option<Self> {
        let value = data.get("value").and_then(Value::as_str)?;
        let label = data
            .get("label")
            .and_then(localized)
            .unwrap_or_else(|| value.to_string());
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(value)
            .to_string();
        Some(Self::new(label, name, value))
    }
}

/// String field restricted to a set of options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionsField {
    available: Vec<SelectOption>,
    selected: Vec<SelectOption>,
    multiple: bool,
}

impl OptionsField {
    pub fn new(available: Vec<SelectOption>, multiple: bool) -> Self {
        Self {
            available,
            selected: Vec::new(),
            multiple,
        }
    }

    /// Options from a definition's `options` array; missing means none.
    pub fn from_definition(data: &Value) -> Self {
        let available = data
            .get("options")
            .and_then(Value::as_array)
            .map(|options| options.iter().filter_map(SelectOption::from_definition).collect())
            .unwrap_or_default();
        let multiple = data.get("multiple").map(truthy).unwrap_or(false);
        Self::new(available, multiple)
    }

    pub fn available_options(&self) -> &[SelectOption] {
        &self.available
    }

    pub fn selected_options(&self) -> &[SelectOption] {
        &self.selected
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Select `option`; single-choice fields drop the previous selection.
    pub fn select_option(&mut self, option: &SelectOption) {
        if !self.multiple {
            self.selected.clear();
        }
        if !self.selected.contains(option) {
            self.selected.push(option.clone());
        }
    }

    /// Deselect `option` if selected.
    pub fn clear_option(&mut self, option: &SelectOption) {
        self.selected.retain(|selected| selected != option);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected values as a JSON array string, `[]` when none.
    pub fn to_data(&self) -> String {
        Value::Array(
            self.selected
                .iter()
                .map(|option| Value::String(option.value.clone()))
                .collect(),
        )
        .to_string()
    }

    /// Select options named in `data`: a JSON array, a string holding one,
    /// or a single value. Entries match by value, then by label.
    ///
    /// Bracketed text that is not valid JSON, such as `[option1]`, is read
    /// as a comma-separated list with stray quotes dropped.
    pub fn set_data(&mut self, data: &Value) {
        let entries: Vec<String> = match data {
            Value::Array(items) => items.iter().filter_map(as_text).collect(),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => items.iter().filter_map(as_text).collect(),
                _ if text.is_empty() => Vec::new(),
                _ if text.trim_start().starts_with('[') => loose_list(text),
                _ => vec![text.clone()],
            },
            Value::Null => Vec::new(),
            other => vec![other.to_string()],
        };

        self.selected.clear();
        for entry in entries {
            let found = self
                .available
                .iter()
                .find(|option| option.value == entry)
                .or_else(|| self.available.iter().find(|option| option.label == entry))
                .cloned();
            if let Some(option) = found {
                self.select_option(&option);
            }
        }
    }
}

/// File picked on the device for a document field.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl LocalFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn to_upload(&self) -> FileUpload {
        FileUpload {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

/// Upload progress of a single document field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DocumentUploadStatus {
    #[default]
    Idle,
    Uploading {
        sent: u64,
        total: u64,
    },
    Uploaded(Value),
    Failed(ScreenletError),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentField {
    source: Option<LocalFile>,
    remote: Option<Value>,
    status: DocumentUploadStatus,
}

impl DocumentField {
    pub fn source(&self) -> Option<&LocalFile> {
        self.source.as_ref()
    }

    /// Pick a new file. Any previous attempt is forgotten.
    pub fn set_source(&mut self, file: LocalFile) {
        self.source = Some(file);
        self.status = DocumentUploadStatus::Idle;
    }

    /// Server-side reference to the uploaded document.
    pub fn remote(&self) -> Option<&Value> {
        self.remote.as_ref()
    }

    pub fn status(&self) -> &DocumentUploadStatus {
        &self.status
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, DocumentUploadStatus::Failed(_))
    }

    pub(crate) fn set_status(&mut self, status: DocumentUploadStatus) {
        if let DocumentUploadStatus::Uploaded(result) = &status {
            self.remote = Some(result.clone());
        }
        self.status = status;
    }

    fn clear(&mut self) {
        *self = DocumentField::default();
    }

    fn to_data(&self) -> Option<String> {
        let remote = self.remote.as_ref()?;
        match remote.get("uuid") {
            Some(uuid) => Some(
                json!({
                    "groupId": remote.get("groupId").cloned().unwrap_or(Value::Null),
                    "uuid": uuid,
                    "version": remote.get("version").cloned().unwrap_or(Value::Null),
                })
                .to_string(),
            ),
            None => Some(remote.to_string()),
        }
    }

    fn set_data(&mut self, data: &Value) {
        self.remote = match data {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(serde_json::from_str(text).unwrap_or_else(|_| data.clone())),
            other => Some(other.clone()),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
    Options(OptionsField),
    Document(DocumentField),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    value: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: false,
            kind,
            value: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Build a field from one entry of a structure definition.
    pub fn from_definition(data: &Value) -> Result<Self, ScreenletError> {
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ScreenletError::shape("Field definition without name"))?;
        let label = data
            .get("label")
            .and_then(localized)
            .unwrap_or_else(|| name.to_string());
        let data_type = data.get("dataType").and_then(Value::as_str).unwrap_or("string");
        let editor = data.get("type").and_then(Value::as_str).unwrap_or("text");

        let kind = match (data_type, editor) {
            ("document-library", _) => FieldKind::Document(DocumentField::default()),
            ("boolean", _) => FieldKind::Boolean,
            ("date", _) => FieldKind::Date,
            ("integer" | "long" | "double" | "float" | "number", _) => FieldKind::Number,
            (_, "select" | "radio" | "checkbox_multiple" | "checkbox-multiple") => {
                FieldKind::Options(OptionsField::from_definition(data))
            }
            _ => FieldKind::Text,
        };

        let required = data.get("required").map(truthy).unwrap_or(false);
        Ok(Field::new(name, label, kind).required(required))
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Set the value of a text, number, boolean or date field.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
    }

    pub fn options(&self) -> Option<&OptionsField> {
        match &self.kind {
            FieldKind::Options(options) => Some(options),
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut OptionsField> {
        match &mut self.kind {
            FieldKind::Options(options) => Some(options),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&DocumentField> {
        match &self.kind {
            FieldKind::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn document_mut(&mut self) -> Option<&mut DocumentField> {
        match &mut self.kind {
            FieldKind::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.kind {
            FieldKind::Options(options) => options.selected_options().is_empty(),
            FieldKind::Document(document) => document.remote().is_none(),
            _ => match &self.value {
                None | Some(Value::Null) => true,
                Some(Value::String(text)) => text.is_empty(),
                Some(_) => false,
            },
        }
    }

    /// A failed upload is always invalid; otherwise only required fields
    /// must be filled.
    pub fn validate(&self) -> bool {
        if self.document().is_some_and(DocumentField::is_failed) {
            return false;
        }
        !self.required || !self.is_empty()
    }

    /// Value in the string form the server stores.
    pub fn to_data(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Options(options) => Some(options.to_data()),
            FieldKind::Document(document) => document.to_data(),
            _ => match self.value.as_ref()? {
                Value::Null => None,
                Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            },
        }
    }

    /// Load a value received from the server.
    pub fn set_data(&mut self, data: &Value) {
        match &mut self.kind {
            FieldKind::Options(options) => options.set_data(data),
            FieldKind::Document(document) => document.set_data(data),
            FieldKind::Number => {
                self.value = match data {
                    Value::String(text) => text
                        .parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(Value::Number)
                        .or_else(|| Some(data.clone())),
                    other => Some(other.clone()),
                };
            }
            FieldKind::Boolean => {
                self.value = match data {
                    Value::String(text) => Some(Value::Bool(text == "true")),
                    other => Some(other.clone()),
                };
            }
            FieldKind::Text | FieldKind::Date => {
                self.value = match data {
                    Value::Null => None,
                    Value::String(_) => Some(data.clone()),
                    other => Some(Value::String(other.to_string())),
                };
            }
        }
    }

    pub fn clear(&mut self) {
        self.value = None;
        match &mut self.kind {
            FieldKind::Options(options) => options.clear(),
            FieldKind::Document(document) => document.clear(),
            _ => {}
        }
    }
}

/// A form: structure fields plus the values of one record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub record_id: Option<i64>,
    pub structure_id: i64,
    pub creator_user_id: Option<i64>,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(structure_id: i64, fields: Vec<Field>) -> Self {
        Self {
            record_id: None,
            structure_id,
            creator_user_id: None,
            fields,
        }
    }

    /// Parse a structure definition (object or JSON string) with a
    /// `fields` array.
    pub fn from_definition(structure_id: i64, definition: &Value) -> Result<Self, ScreenletError> {
        let parsed;
        let definition = match definition {
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text)?;
                &parsed
            }
            other => other,
        };

        let fields = definition
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| ScreenletError::shape("Structure definition without fields"))?
            .iter()
            .map(Field::from_definition)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(structure_id, fields))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply server values by field name; unknown names are ignored.
    pub fn update_current_values(&mut self, values: &Map<String, Value>) {
        for field in &mut self.fields {
            if let Some(value) = values.get(&field.name) {
                field.set_data(value);
            }
        }
    }

    pub fn clear_values(&mut self) {
        self.fields.iter_mut().for_each(Field::clear);
    }

    /// `fieldsMap` sent on submit: name to string value, empty fields
    /// omitted.
    pub fn data(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|field| field.to_data().map(|data| (field.name.clone(), Value::String(data))))
            .collect()
    }

    /// Names of document fields whose last upload attempt failed.
    pub fn failed_document_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.document().is_some_and(DocumentField::is_failed))
            .map(|field| field.name.clone())
            .collect()
    }

    /// Names of fields that do not validate.
    pub fn invalid_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| !field.validate())
            .map(|field| field.name.clone())
            .collect()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "recordId": self.record_id,
            "structureId": self.structure_id,
            "values": self.data(),
        })
    }
}

/// Label text: plain string, or the default locale of a localized map.
fn localized(label: &Value) -> Option<String> {
    match label {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get(DEFAULT_LOCALE)
            .or_else(|| map.values().next())
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text == "true",
        _ => false,
    }
}

fn loose_list(text: &str) -> Vec<String> {
    const DELIMITERS: [char; 3] = ['[', ']', '"'];
    text.trim()
        .trim_matches(DELIMITERS)
        .split(',')
        .map(|entry| entry.trim().trim_matches(DELIMITERS).trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_field() -> OptionsField {
        OptionsField::from_definition(&json!({
            "options": [
                {"label": "Option 1", "name": "option987", "value": "option1"},
                {"label": "Option 2", "name": "option989", "value": "option2"},
            ]
        }))
    }

    #[test]
    fn stores_available_options() {
        let field = options_field();
        let options = field.available_options();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0], SelectOption::new("Option 1", "option987", "option1"));
        assert_eq!(options[1], SelectOption::new("Option 2", "option989", "option2"));
    }

    #[test]
    fn missing_options_store_empty_list() {
        let field = OptionsField::from_definition(&json!({}));
        assert!(field.available_options().is_empty());
    }

    #[test]
    fn clears_option_when_it_was_selected() {
        let mut field = options_field();
        let first = field.available_options()[0].clone();
        field.select_option(&first);
        field.clear_option(&first);
        assert!(field.selected_options().is_empty());
    }

    #[test]
    fn clearing_unselected_option_keeps_selection() {
        let mut field = options_field();
        let first = field.available_options()[0].clone();
        let second = field.available_options()[1].clone();
        field.select_option(&first);
        field.clear_option(&second);
        assert_eq!(field.selected_options().len(), 1);
    }

    #[test]
    fn single_choice_replaces_selection() {
        let mut field = options_field();
        let first = field.available_options()[0].clone();
        let second = field.available_options()[1].clone();
        field.select_option(&first);
        field.select_option(&second);
        assert_eq!(field.selected_options(), &[second]);
    }

    #[test]
    fn to_data_lists_selected_values() {
        let mut field = options_field();
        assert_eq!(field.to_data(), "[]");

        let first = field.available_options()[0].clone();
        field.select_option(&first);
        assert_eq!(field.to_data(), r#"["option1"]"#);
    }

    #[test]
    fn set_data_matches_value_then_label() {
        let mut field = options_field();
        field.set_data(&json!(r#"["option2"]"#));
        assert_eq!(field.selected_options()[0].value, "option2");

        field.set_data(&json!("Option 1"));
        assert_eq!(field.selected_options()[0].value, "option1");

        field.set_data(&json!("unknown"));
        assert!(field.selected_options().is_empty());
    }

    #[test]
    fn set_data_reads_unquoted_bracket_list_by_value() {
        let mut field = options_field();
        field.set_data(&json!("[option1]"));
        assert_eq!(field.selected_options(), &[SelectOption::new("Option 1", "option987", "option1")]);
    }

    #[test]
    fn set_data_reads_unquoted_bracket_list_by_label() {
        let mut field = options_field();
        field.set_data(&json!("[Option 1]"));
        assert_eq!(field.selected_options().len(), 1);
        assert_eq!(field.selected_options()[0].value, "option1");
    }

    #[test]
    fn set_data_reads_malformed_quoted_list() {
        let mut field = options_field();
        field.set_data(&json!(r#"["Option 1]""#));
        assert_eq!(field.selected_options().len(), 1);
        assert_eq!(field.selected_options()[0].name, "option987");
    }

    #[test]
    fn set_data_reads_loose_multiple_list() {
        let mut field = OptionsField::new(options_field().available_options().to_vec(), true);
        field.set_data(&json!(r#"[option1, "Option 2"]"#));
        let values: Vec<&str> = field.selected_options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["option1", "option2"]);
    }

    fn definition() -> Value {
        json!({
            "fields": [
                {"name": "title", "label": {"en_US": "Title"}, "dataType": "string", "type": "text", "required": true},
                {"name": "amount", "label": "Amount", "dataType": "double", "type": "ddm-number"},
                {"name": "agree", "dataType": "boolean", "type": "checkbox", "required": "true"},
                {"name": "color", "dataType": "string", "type": "select", "options": [
                    {"label": "Red", "value": "red"}, {"label": "Blue", "value": "blue"}
                ]},
                {"name": "photo", "dataType": "document-library", "type": "ddm-documentlibrary"}
            ]
        })
    }

    #[test]
    fn parses_definition_fields() {
        let record = Record::from_definition(21303, &definition()).unwrap();
        assert_eq!(record.field_count(), 5);
        assert_eq!(record.structure_id, 21303);

        let title = record.field("title").unwrap();
        assert_eq!(title.label, "Title");
        assert!(title.required);
        assert_eq!(title.kind, FieldKind::Text);

        assert_eq!(record.field("amount").unwrap().kind, FieldKind::Number);
        assert!(record.field("agree").unwrap().required);
        assert_eq!(record.field("color").unwrap().options().unwrap().available_options().len(), 2);
        assert!(record.field("photo").unwrap().document().is_some());
    }

    #[test]
    fn parses_definition_from_json_string() {
        let text = definition().to_string();
        let record = Record::from_definition(1, &Value::String(text)).unwrap();
        assert_eq!(record.field_count(), 5);
    }

    #[test]
    fn definition_without_fields_is_shape_error() {
        let err = Record::from_definition(1, &json!({"name": "x"})).unwrap_err();
        assert_eq!(err.error_type(), "deserialize_error");
    }

    #[test]
    fn update_and_export_values() {
        let mut record = Record::from_definition(1, &definition()).unwrap();
        let values = json!({
            "title": "Hello",
            "amount": "12.5",
            "agree": "true",
            "color": "[\"blue\"]",
            "photo": "{\"groupId\":10184,\"uuid\":\"abc\",\"version\":\"1.0\"}",
            "unknown": "ignored"
        });
        record.update_current_values(values.as_object().unwrap());

        let data = record.data();
        assert_eq!(data["title"], json!("Hello"));
        assert_eq!(data["amount"], json!("12.5"));
        assert_eq!(data["agree"], json!("true"));
        assert_eq!(data["color"], json!("[\"blue\"]"));
        let photo: Value = serde_json::from_str(data["photo"].as_str().unwrap()).unwrap();
        assert_eq!(photo["uuid"], json!("abc"));
        assert!(!data.contains_key("unknown"));
    }

    #[test]
    fn clear_values_empties_every_field() {
        let mut record = Record::from_definition(1, &definition()).unwrap();
        record.field_mut("title").unwrap().set_value("Hello");
        record.clear_values();
        assert!(record.field("title").unwrap().is_empty());
        assert_eq!(record.invalid_fields(), vec!["title".to_string(), "agree".to_string()]);
    }

    #[test]
    fn failed_upload_marks_field_invalid() {
        let mut record = Record::from_definition(1, &definition()).unwrap();
        let photo = record.field_mut("photo").unwrap().document_mut().unwrap();
        photo.set_status(DocumentUploadStatus::Failed(ScreenletError::Timeout));

        assert_eq!(record.failed_document_fields(), vec!["photo".to_string()]);
        assert!(!record.field("photo").unwrap().validate());
    }

    #[test]
    fn uploaded_status_sets_remote_reference() {
        let mut field = Field::new("photo", "Photo", FieldKind::Document(DocumentField::default()));
        let document = field.document_mut().unwrap();
        document.set_source(LocalFile::new("a.png", "image/png", vec![1u8, 2, 3]));
        document.set_status(DocumentUploadStatus::Uploaded(json!({"uuid": "u1", "groupId": 1})));

        assert!(!field.is_empty());
        let data: Value = serde_json::from_str(&field.to_data().unwrap()).unwrap();
        assert_eq!(data["uuid"], json!("u1"));
    }
}
