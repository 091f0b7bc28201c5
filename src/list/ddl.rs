//! Records of a dynamic data list as a [`ListSource`].

use serde_json::{Map, Value};

use crate::config::Config;
use crate::operation::Command;

use super::interactor::ListSource;
use super::pagination::RowConverter;

pub const GET_RECORDS: &str = "/screens.screensddlrecord/get-ddl-records";
pub const GET_RECORDS_COUNT: &str = "/screens.screensddlrecord/get-ddl-records-count";

/// One record of the list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DdlEntry {
    pub record_id: Option<i64>,
    pub values: Map<String, Value>,
}

impl DdlEntry {
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Values of `label_fields` joined by spaces; missing ones are skipped.
    pub fn title(&self, label_fields: &[String]) -> String {
        label_fields
            .iter()
            .filter_map(|field| match self.values.get(field)? {
                Value::String(text) => Some(text.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct DdlListSource {
    pub record_set_id: i64,
    /// Only records of this user when set.
    pub user_id: Option<i64>,
    pub locale: String,
    pub label_fields: Vec<String>,
}

impl DdlListSource {
    pub fn new(record_set_id: i64) -> Self {
        Self {
            record_set_id,
            user_id: None,
            locale: "en_US".to_string(),
            label_fields: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            label_fields: config.list.label_fields.clone(),
            ..Self::new(config.list.record_set_id)
        }
    }

    fn scoped(&self, command: Command) -> Command {
        let command = command.param("ddlRecordSetId", self.record_set_id);
        match self.user_id {
            Some(user_id) => command.param("userId", user_id),
            None => command,
        }
    }
}

impl RowConverter for DdlListSource {
    type Row = DdlEntry;

    fn convert(&self, raw: &Value) -> DdlEntry {
        let values = raw
            .get("modelValues")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let record_id = raw
            .get("modelAttributes")
            .and_then(|attrs| attrs.get("recordId"))
            .and_then(Value::as_i64);
        DdlEntry { record_id, values }
    }
}

impl ListSource for DdlListSource {
    fn page_commands(&self, start: usize, end: usize, compute_row_count: bool) -> Vec<Command> {
        let mut commands = vec![self
            .scoped(Command::new(GET_RECORDS))
            .param("locale", self.locale.as_str())
            .param("start", start)
            .param("end", end)];
        if compute_row_count {
            commands.push(self.scoped(Command::new(GET_RECORDS_COUNT)));
        }
        commands
    }
}
