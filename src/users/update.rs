//! Allow-listed partial updates.
//!
//! Caller supplied keys are mapped onto the closed [`UpdateField`] set before
//! anything reaches SQL. Column names in the rendered statement only ever come
//! from [`UpdateField::column`]; values are always bound positionally.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;
use tracing::warn;

use super::dto::is_valid_email;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateField {
    Name,
    Email,
    Avatar,
}

impl UpdateField {
    /// `email` and `username` both address the login identifier column.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(UpdateField::Name),
            "email" | "username" => Some(UpdateField::Email),
            "avatar" => Some(UpdateField::Avatar),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            UpdateField::Name => "name",
            UpdateField::Email => "username",
            UpdateField::Avatar => "avatar",
        }
    }

    fn convert(self, value: Value) -> Option<FieldValue> {
        match (self, value) {
            (UpdateField::Name, Value::String(s)) => Some(FieldValue::Text(s)),
            (UpdateField::Email, Value::String(s)) => {
                let s = s.trim().to_lowercase();
                is_valid_email(&s).then_some(FieldValue::Text(s))
            }
            (UpdateField::Avatar, Value::String(s)) => {
                STANDARD.decode(s.as_bytes()).ok().map(FieldValue::Bytes)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub field: UpdateField,
    pub value: FieldValue,
}

/// Validated, non-empty list of column assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSet {
    assignments: Vec<Assignment>,
}

impl UpdateSet {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.assignments.iter().map(|a| &a.value)
    }

    #[cfg(test)]
    pub fn get(&self, field: UpdateField) -> Option<&FieldValue> {
        self.assignments
            .iter()
            .find(|a| a.field == field)
            .map(|a| &a.value)
    }

    /// Position of the trailing `id` parameter.
    pub fn id_param(&self) -> usize {
        self.assignments.len() + 1
    }

    /// `col = $1, ...` followed by the server managed `updated_at`.
    pub fn set_clause(&self) -> String {
        let mut parts: Vec<String> = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{} = ${}", a.field.column(), i + 1))
            .collect();
        parts.push("updated_at = NOW()".to_string());
        parts.join(", ")
    }

    pub fn to_sql(&self, returning: &str) -> String {
        format!(
            "UPDATE users SET {} WHERE id = ${} RETURNING {}",
            self.set_clause(),
            self.id_param(),
            returning
        )
    }
}

/// Build an [`UpdateSet`] from caller supplied key/value pairs, in the order given.
///
/// The whole update fails on the first key outside the allow-list, on a value
/// of the wrong shape, or on a second key addressing an already assigned
/// column. `null` values are treated as absent.
pub fn build_update<I, K>(fields: I) -> Result<UpdateSet, AppError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut fields = fields.into_iter().peekable();
    if fields.peek().is_none() {
        return Err(AppError::InvalidField("empty".into()));
    }

    let mut assignments: Vec<Assignment> = Vec::new();
    for (key, value) in fields {
        let key = key.as_ref();
        let Some(field) = UpdateField::from_key(key) else {
            warn!(key, "invalid update field");
            return Err(AppError::InvalidField(key.to_string()));
        };
        if value.is_null() {
            continue;
        }
        if assignments.iter().any(|a| a.field == field) {
            warn!(key, "update field assigned twice");
            return Err(AppError::InvalidField(key.to_string()));
        }
        let value = field.convert(value).ok_or_else(|| {
            warn!(key, "invalid value for update field");
            AppError::InvalidField(key.to_string())
        })?;
        assignments.push(Assignment { field, value });
    }

    if assignments.is_empty() {
        return Err(AppError::InvalidField("empty".into()));
    }
    Ok(UpdateSet { assignments })
}
