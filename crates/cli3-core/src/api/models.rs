use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ModelError;
use crate::utils::error_helpers::convert_model_error;

/// Resolved `name -> value` pairs of a query, in declaration order.
pub type ParamValues = IndexMap<String, String>;

/// Converts a JSON scalar to the string the server expects back.
/// `null` becomes an empty string.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Custom deserializer: ids arrive as numbers or strings
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_string).unwrap_or_default())
}

fn deserialize_upper<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(name.to_uppercase())
}

/// Reference-table binding is either a bare table name or `{ "name": ... }`.
/// An empty object means "no binding".
fn deserialize_nci_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let name = match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Object(map)) => map.get("name").and_then(Value::as_str).map(String::from),
        _ => None,
    };
    Ok(name.filter(|s| !s.is_empty()))
}

/// Params arrive either as a list or as an object keyed by param name.
fn deserialize_params<'de, D>(deserializer: D) -> Result<Vec<Param>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ParamsShape {
        List(Vec<Param>),
        Map(IndexMap<String, Param>),
    }

    match Option::<ParamsShape>::deserialize(deserializer)? {
        Some(ParamsShape::List(params)) => Ok(params),
        Some(ParamsShape::Map(params)) => Ok(params.into_values().collect()),
        None => Ok(Vec::new()),
    }
}

// Query models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryKind {
    #[default]
    Table,
    Series,
    Text,
}

impl From<String> for QueryKind {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "SERIES" => QueryKind::Series,
            "TEXT" => QueryKind::Text,
            // unknown kinds open as tables
            _ => QueryKind::Table,
        }
    }
}

impl From<QueryKind> for String {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Table => "TABLE",
            QueryKind::Series => "SERIES",
            QueryKind::Text => "TEXT",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    Cursor,
    Text,
    String,
    Number,
    Integer,
    Date,
    DateTime,
    Bool,
    Other(String),
}

impl ParamType {
    /// Output-only params are never asked from the user.
    pub fn is_output(&self) -> bool {
        matches!(self, ParamType::Cursor | ParamType::Text)
    }
}

impl From<String> for ParamType {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "CURSOR" => ParamType::Cursor,
            "TEXT" => ParamType::Text,
            "STRING" | "VARCHAR" => ParamType::String,
            "NUMBER" => ParamType::Number,
            "INTEGER" => ParamType::Integer,
            "DATE" => ParamType::Date,
            "DATETIME" => ParamType::DateTime,
            "BOOL" => ParamType::Bool,
            _ => ParamType::Other(value),
        }
    }
}

impl From<ParamType> for String {
    fn from(param_type: ParamType) -> Self {
        match param_type {
            ParamType::Cursor => "CURSOR".to_string(),
            ParamType::Text => "TEXT".to_string(),
            ParamType::String => "STRING".to_string(),
            ParamType::Number => "NUMBER".to_string(),
            ParamType::Integer => "INTEGER".to_string(),
            ParamType::Date => "DATE".to_string(),
            ParamType::DateTime => "DATETIME".to_string(),
            ParamType::Bool => "BOOL".to_string(),
            ParamType::Other(name) => name,
        }
    }
}

/// Rendering hint for a parameter input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, deserialize_with = "deserialize_nci_name")]
    pub nci: Option<String>,
    #[serde(default)]
    pub nci_column: Option<String>,
    #[serde(default)]
    pub values: Option<Value>,
}

impl InputField {
    pub fn nci_binding(&self) -> Option<NciBinding> {
        NciBinding::new(self.nci.as_deref(), self.nci_column.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub value: String,
    #[serde(default, rename = "input")]
    pub field: Option<InputField>,
}

impl Param {
    /// Display label, falling back to the request key.
    pub fn title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: QueryKind,
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: Vec<Param>,
    #[serde(default)]
    pub subqueries: Vec<Query>,
}

impl Query {
    pub fn from_json(body: &str) -> Result<Self, ModelError> {
        serde_json::from_str(body).map_err(|e| convert_model_error(e, "query"))
    }

    pub fn in_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| !p.param_type.is_output())
    }

    pub fn has_in_params(&self) -> bool {
        self.in_params().next().is_some()
    }

    pub fn has_subqueries(&self) -> bool {
        !self.subqueries.is_empty()
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Sets the stored value of a param; returns false when no such param exists.
    pub fn set_param_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(param) => {
                param.value = value.into();
                true
            }
            None => false,
        }
    }

    /// One value per declared param: the override when present, else the stored value.
    pub fn resolve_params(&self, overrides: &ParamValues) -> ParamValues {
        self.params
            .iter()
            .map(|param| {
                let value = overrides
                    .get(&param.name)
                    .cloned()
                    .unwrap_or_else(|| param.value.clone());
                (param.name.clone(), value)
            })
            .collect()
    }

    /// URL-encoded request query string: `id=<id>` followed by every declared param.
    pub fn make_request(&self, overrides: &ParamValues) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("id", &self.id);
        for (name, value) in self.resolve_params(overrides) {
            serializer.append_pair(&name, &value);
        }
        serializer.finish()
    }

    /// Name with the in-param values, e.g. `Sales [Region=North, Year=2024]`.
    pub fn full_name(&self, params: &ParamValues) -> String {
        let parts: Vec<String> = self
            .in_params()
            .map(|param| {
                let value = params.get(&param.name).unwrap_or(&param.value);
                format!("{}={}", param.title(), value)
            })
            .collect();

        if parts.is_empty() {
            self.name.clone()
        } else {
            format!("{} [{}]", self.name, parts.join(", "))
        }
    }
}

/// Reference-table lookup target: translate through `table`, show `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NciBinding {
    pub table: String,
    pub column: String,
}

impl NciBinding {
    fn new(table: Option<&str>, column: Option<&str>) -> Option<Self> {
        match (table, column) {
            (Some(table), Some(column)) if !table.is_empty() && !column.is_empty() => Some(Self {
                table: table.to_string(),
                column: column.to_uppercase(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Number,
    Integer,
    Bool,
    Date,
    DateTime,
    Time,
}

impl ColumnType {
    pub fn parse(column: &str, type_name: Option<&str>) -> Result<Self, ModelError> {
        let Some(type_name) = type_name else {
            return Ok(ColumnType::String);
        };
        match type_name.to_uppercase().as_str() {
            "" | "STRING" => Ok(ColumnType::String),
            "NUMBER" => Ok(ColumnType::Number),
            "INTEGER" => Ok(ColumnType::Integer),
            "BOOL" => Ok(ColumnType::Bool),
            "DATE" => Ok(ColumnType::Date),
            "DATETIME" => Ok(ColumnType::DateTime),
            "TIME" => Ok(ColumnType::Time),
            _ => Err(ModelError::UnknownColumnType {
                column: column.to_string(),
                type_name: type_name.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Number => "NUMBER",
            ColumnType::Integer => "INTEGER",
            ColumnType::Bool => "BOOL",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Time => "TIME",
        }
    }
}

/// Result column metadata as described by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Column {
    #[serde(deserialize_with = "deserialize_upper")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, alias = "visible")]
    pub visable: bool,
    #[serde(default, deserialize_with = "deserialize_nci_name")]
    pub nci: Option<String>,
    #[serde(default)]
    pub nci_column: Option<String>,
    #[serde(default)]
    pub subqueries: Vec<Query>,
}

impl Column {
    pub fn column_type(&self) -> Result<ColumnType, ModelError> {
        ColumnType::parse(&self.name, self.type_name.as_deref())
    }

    /// Shown in the view only when titled and marked visible.
    pub fn is_visible(&self) -> bool {
        self.title.is_some() && self.visable
    }

    pub fn nci_binding(&self) -> Option<NciBinding> {
        NciBinding::new(self.nci.as_deref(), self.nci_column.as_deref())
    }
}

// Navigation models
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Folder {
    pub name: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub queries: Vec<Query>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FolderTree {
    #[serde(default)]
    pub folders: Vec<Folder>,
}

impl FolderTree {
    pub fn from_json(body: &str) -> Result<Self, ModelError> {
        serde_json::from_str(body).map_err(|e| convert_model_error(e, "folder tree"))
    }
}

// Reference data models
#[derive(Debug, Clone, Deserialize)]
pub struct NciDescriptor {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NciPayload {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}
