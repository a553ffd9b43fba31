use bson::{Bson, Document};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::db::models::DefaultValue;
use crate::error::AppError;

/// Convert a JSON request body into a BSON document.
pub fn from_json(body: Map<String, Value>) -> Result<Document, AppError> {
    bson::to_document(&body)
        .map_err(|e| AppError::BadRequest(format!("Unsupported JSON value: {e}")))
}

/// Render a stored document as JSON.
///
/// `_id` becomes a hex string and dates become RFC 3339 strings, so clients
/// never see MongoDB extended-JSON wrappers.
pub fn to_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect(),
    )
}

/// Render a single stored value as JSON, with the same rules as [`to_json`].
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => {
            Value::String(dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Bson::Document(doc) => to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Int32(n) => Value::Number(n.into()),
        Bson::Int64(n) => Value::Number(n.into()),
        Bson::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        other => other.into_relaxed_extjson(),
    }
}

/// Merge server-assigned defaults over the request body.
///
/// Defaults win on key collision.
pub fn apply_defaults(doc: &mut Document, defaults: &[(&'static str, DefaultValue)]) {
    for (field, value) in defaults {
        doc.insert(*field, value.to_bson());
    }
}

/// Presence check for a field that must hold a non-empty string.
pub fn required_str<'a>(doc: &'a Document, field: &str) -> Result<&'a str, AppError> {
    match doc.get(field) {
        Some(Bson::String(value)) if !value.trim().is_empty() => Ok(value.as_str()),
        Some(Bson::String(_)) => Err(AppError::BadRequest(format!("{field} cannot be empty"))),
        Some(_) => Err(AppError::BadRequest(format!("{field} must be a string"))),
        None => Err(AppError::BadRequest(format!("{field} is required"))),
    }
}

/// Reject keys the store would interpret instead of storing.
///
/// `_id` is server-assigned and `$`-prefixed keys are operators.
pub fn reject_reserved_keys(doc: &Document) -> Result<(), AppError> {
    for key in doc.keys() {
        if key == "_id" {
            return Err(AppError::BadRequest("_id is assigned by the server".into()));
        }
        if key.starts_with('$') {
            return Err(AppError::BadRequest(format!(
                "Field names cannot start with '$': {key}"
            )));
        }
    }
    Ok(())
}
