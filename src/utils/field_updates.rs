use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::model::person::{FULL_NAME_FIELD, is_modelled_field};
use crate::store::{FieldPath, FieldUpdate};

/// ===============================
/// Person patch -> field updates
/// ===============================
///
/// Every top-level key of the patch becomes one path-scoped update, so
/// fields absent from the patch stay as they are. Ledger and day-book
/// fields have their own endpoints and are refused here.
pub fn build_field_updates(payload: &Value) -> Result<Vec<FieldUpdate>, ApiError> {
    let fields = checked_fields(payload)?;

    if fields.is_empty() {
        return Err(ApiError::BadRequest("No fields provided for update".to_string()));
    }

    Ok(fields
        .iter()
        .map(|(key, value)| FieldUpdate::new(FieldPath::new([key.as_str()]), value.clone()))
        .collect())
}

/// ===============================
/// Body of a new person record
/// ===============================
pub fn build_new_person(payload: &Value) -> Result<Value, ApiError> {
    let fields = checked_fields(payload)?;

    if !fields.contains_key(FULL_NAME_FIELD) {
        return Err(ApiError::BadRequest(format!("{FULL_NAME_FIELD} is required")));
    }

    Ok(Value::Object(fields.clone()))
}

fn checked_fields(payload: &Value) -> Result<&Map<String, Value>, ApiError> {
    let fields = payload
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Payload must be a JSON object".to_string()))?;

    if let Some(reserved) = fields
        .keys()
        .find(|key| key.as_str() != FULL_NAME_FIELD && is_modelled_field(key))
    {
        return Err(ApiError::BadRequest(format!(
            "Field `{reserved}` cannot be set through this endpoint"
        )));
    }

    if let Some(name) = fields.get(FULL_NAME_FIELD) {
        match name.as_str() {
            Some(name) if !name.trim().is_empty() => {}
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "{FULL_NAME_FIELD} must be a non-empty string"
                )));
            }
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_keys_become_single_segment_paths() {
        let updates = build_field_updates(&json!({"fullName": "Samir", "phone": "0661"})).unwrap();

        let mut paths: Vec<String> = updates.iter().map(|u| u.path.to_string()).collect();
        paths.sort();
        assert_eq!(paths, ["fullName", "phone"]);
    }

    #[test]
    fn ledger_fields_are_refused() {
        for field in ["salaries", "absences", "leaves", "id", "kind"] {
            let err = build_field_updates(&json!({ field: {} })).unwrap_err();
            assert!(err.to_string().contains(field), "{field}");
        }
    }

    #[test]
    fn empty_or_non_object_patch_is_rejected() {
        assert!(build_field_updates(&json!({})).is_err());
        assert!(build_field_updates(&json!(["fullName"])).is_err());
        assert!(build_field_updates(&json!({"fullName": "  "})).is_err());
    }

    #[test]
    fn new_person_cannot_choose_its_kind() {
        let err = build_new_person(&json!({"fullName": "Samir", "kind": "employee"})).unwrap_err();
        assert!(err.to_string().contains("kind"));
    }

    #[test]
    fn new_person_needs_a_name() {
        assert!(build_new_person(&json!({"phone": "0661"})).is_err());

        let body = build_new_person(&json!({"fullName": "Samir", "subjects": ["physics"]})).unwrap();
        assert_eq!(body["subjects"], json!(["physics"]));
    }
}
