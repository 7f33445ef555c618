use cty::{Number, Path, PathError, Type, Value};

use crate::Conversion;

/// Conversions among number, string and bool. Anything can become a string,
/// but going back the other way depends on the string's content.
pub(crate) fn conversion(in_ty: &Type, out: &Type, allow_unsafe: bool) -> Option<Conversion> {
    match (in_ty, out) {
        (Type::Number, Type::String) => Some(Conversion::new(|value, _| {
            Ok(Value::string(value.as_number().to_string()))
        })),
        (Type::Bool, Type::String) => Some(Conversion::new(|value, _| {
            Ok(Value::string(if value.as_bool() { "true" } else { "false" }))
        })),
        (Type::String, Type::Number) if allow_unsafe => Some(Conversion::new(string_to_number)),
        (Type::String, Type::Bool) if allow_unsafe => Some(Conversion::new(string_to_bool)),
        _ => None,
    }
}

fn string_to_number(value: &Value, path: &mut Path) -> Result<Value, PathError> {
    match Number::parse(value.as_string()) {
        Ok(number) => Ok(Value::number(number)),
        Err(_) => Err(path.new_error("a number is required")),
    }
}

fn string_to_bool(value: &Value, path: &mut Path) -> Result<Value, PathError> {
    match value.as_string() {
        "true" | "1" => Ok(Value::bool(true)),
        "false" | "0" => Ok(Value::bool(false)),
        other => {
            let message = match other.to_lowercase().as_str() {
                "true" => "a bool is required; to convert from string, use lowercase \"true\"",
                "false" => "a bool is required; to convert from string, use lowercase \"false\"",
                _ => "a bool is required",
            };
            Err(path.new_error(message))
        }
    }
}
