//! Request body parsing and validation.
//!
//! Runs before the gateway or any service is called. Bodies are read as a
//! JSON object first so that a mistyped field is reported under its own key.
//! Errors use the flattened `{ formErrors, fieldErrors }` shape clients
//! already understand.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use guardpost_core::models::duty::{ClockIn, ClockOut};

use crate::models::{ClockInRequest, ClockOutRequest};

/// Longest accepted clock-out note, in characters.
pub const MAX_NOTES_LEN: usize = 2000;

/// Collected validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            ..Self::default()
        }
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_errors.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Parse a request body as a JSON object. An empty body reads as `{}`.
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ValidationErrors> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ValidationErrors::form(format!(
            "Expected object, received {}",
            json_type(&other)
        ))),
        Err(_) => Err(ValidationErrors::form("Malformed JSON body")),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Optional string field. Absent and `null` both read as `None`.
fn string_field(
    body: &Map<String, Value>,
    errors: &mut ValidationErrors,
    field: &str,
) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.add_field(
                field,
                format!("Expected string, received {}", json_type(other)),
            );
            None
        }
    }
}

fn parse_id(errors: &mut ValidationErrors, field: &str, raw: Option<String>) -> Option<Uuid> {
    let raw = raw?;
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add_field(field, "Invalid id");
            None
        }
    }
}

impl ClockInRequest {
    /// Read and validate a clock-in body.
    pub fn parse(body: &[u8]) -> Result<ClockIn, ValidationErrors> {
        let body = parse_object(body)?;
        let mut errors = ValidationErrors::default();
        let request = Self {
            location_id: string_field(&body, &mut errors, "locationId"),
            shift_id: string_field(&body, &mut errors, "shiftId"),
        };
        request.validate_into(errors)
    }

    pub fn validate(self) -> Result<ClockIn, ValidationErrors> {
        self.validate_into(ValidationErrors::default())
    }

    fn validate_into(self, mut errors: ValidationErrors) -> Result<ClockIn, ValidationErrors> {
        let location_id = parse_id(&mut errors, "locationId", self.location_id);
        let shift_id = parse_id(&mut errors, "shiftId", self.shift_id);
        errors.finish(ClockIn {
            location_id,
            shift_id,
        })
    }
}

impl ClockOutRequest {
    /// Read and validate a clock-out body.
    pub fn parse(body: &[u8]) -> Result<ClockOut, ValidationErrors> {
        let body = parse_object(body)?;
        let mut errors = ValidationErrors::default();
        let request = Self {
            duty_session_id: string_field(&body, &mut errors, "dutySessionId"),
            notes: string_field(&body, &mut errors, "notes"),
        };
        request.validate_into(errors)
    }

    pub fn validate(self) -> Result<ClockOut, ValidationErrors> {
        self.validate_into(ValidationErrors::default())
    }

    fn validate_into(self, mut errors: ValidationErrors) -> Result<ClockOut, ValidationErrors> {
        let duty_session_id = match self.duty_session_id {
            Some(raw) => parse_id(&mut errors, "dutySessionId", Some(raw)),
            None => {
                // A wrong-typed id already carries its own message.
                if !errors.has_field("dutySessionId") {
                    errors.add_field("dutySessionId", "Required");
                }
                None
            }
        };
        if let Some(notes) = &self.notes
            && notes.chars().count() > MAX_NOTES_LEN
        {
            errors.add_field(
                "notes",
                format!("Must be at most {MAX_NOTES_LEN} characters"),
            );
        }
        match duty_session_id {
            Some(duty_session_id) => errors.finish(ClockOut {
                duty_session_id,
                notes: self.notes,
            }),
            None => Err(errors),
        }
    }
}
