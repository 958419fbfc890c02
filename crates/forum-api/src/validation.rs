use serde_json::Value;

use forum_types::api::Lenient;

use crate::error::FieldErrors;

pub const NAME_MAX_CHARS: usize = 500;
pub const USERNAME_MAX_CHARS: usize = 150;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const PASSWORD_MIN_CHARS: usize = 8;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";

/// Required text field: must be present and non-blank.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Lenient<String>>,
    max_chars: Option<usize>,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some(value) => {
            let value = text(errors, field, Some(value))?;
            checked_text(errors, field, value, max_chars)
        }
    }
}

/// Text field of a partial update: absent is fine, present must be non-blank.
pub fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Lenient<String>>,
    max_chars: Option<usize>,
) -> Option<String> {
    text(errors, field, value).and_then(|value| checked_text(errors, field, value, max_chars))
}

/// Any string, blank included. Numbers are taken as their decimal text.
pub fn text(errors: &mut FieldErrors, field: &str, value: Option<Lenient<String>>) -> Option<String> {
    match value? {
        Lenient::Valid(value) => Some(value),
        Lenient::Invalid(Value::Number(n)) => Some(n.to_string()),
        Lenient::Invalid(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Required reference to another row by id.
pub fn required_pk(errors: &mut FieldErrors, field: &str, value: Option<Lenient<i64>>) -> Option<i64> {
    if value.is_none() {
        errors.add(field, REQUIRED);
        return None;
    }
    pk(errors, field, value)
}

/// Optional reference by id. A numeric string is accepted.
pub fn pk(errors: &mut FieldErrors, field: &str, value: Option<Lenient<i64>>) -> Option<i64> {
    match value? {
        Lenient::Valid(id) => Some(id),
        Lenient::Invalid(raw) => {
            let parsed = raw.as_str().and_then(|s| s.trim().parse::<i64>().ok());
            if parsed.is_none() {
                errors.add(
                    field,
                    format!("Incorrect type. Expected pk value, received {}.", json_type(&raw)),
                );
            }
            parsed
        }
    }
}

pub fn boolean(errors: &mut FieldErrors, field: &str, value: Option<Lenient<bool>>) -> Option<bool> {
    match value? {
        Lenient::Valid(flag) => Some(flag),
        Lenient::Invalid(raw) => {
            let parsed = match &raw {
                Value::String(s) => parse_bool(s),
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(true),
                    Some(0) => Some(false),
                    _ => None,
                },
                _ => None,
            };
            if parsed.is_none() {
                errors.add(field, NOT_A_BOOLEAN);
            }
            parsed
        }
    }
}

fn checked_text(errors: &mut FieldErrors, field: &str, value: String, max_chars: Option<usize>) -> Option<String> {
    if value.trim().is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            errors.add(field, format!("Ensure this field has no more than {} characters.", max));
            return None;
        }
    }
    Some(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Type names used in `Incorrect type` messages.
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub fn missing_object(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

pub fn validate_username(errors: &mut FieldErrors, username: &str) {
    let len = username.chars().count();
    if len < USERNAME_MIN_CHARS || len > USERNAME_MAX_CHARS {
        errors.add(
            "username",
            format!(
                "Ensure this field has between {} and {} characters.",
                USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
            ),
        );
    } else if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub fn validate_password(errors: &mut FieldErrors, password: &str) {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.add(
            "password",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_CHARS
            ),
        );
    }
}

// -- Query string filters --

pub fn id_filter(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

pub fn bool_filter(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<bool> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_bool(raw);
    if parsed.is_none() {
        errors.add(field, "Enter a valid boolean.");
    }
    parsed
}
