//! Field value encoding
//!
//! Turns a field value into a URL-safe query token. Booleans become `1`/`0`,
//! numbers their shortest decimal form, objects and arrays compact JSON.
//! Everything is then percent-encoded with the component-safe set.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Number, Value};

use crate::error::{BiError, Result};

/// Everything but alphanumerics and `- _ . ! ~ * ' ( )` is escaped
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a string as a single URI component
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Decimal form of a number; integral floats drop the `.0`
pub fn number_token(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        return int.to_string();
    }
    if let Some(uint) = number.as_u64() {
        return uint.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => (float as i64).to_string(),
        Some(float) => float.to_string(),
        None => number.to_string(),
    }
}

/// Encode one field value for the wire
pub fn encode(field: &str, value: &Value) -> Result<String> {
    let token = match value {
        Value::Bool(flag) => String::from(if *flag { "1" } else { "0" }),
        Value::Number(number) => number_token(number),
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => value.to_string(),
        Value::Null => {
            return Err(BiError::UnsupportedValue {
                field: field.to_string(),
            });
        }
    };
    Ok(encode_component(&token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_component_keeps_unreserved() {
        assert_eq!(encode_component("AZaz09-_.!~*'()"), "AZaz09-_.!~*'()");
    }

    #[test]
    fn test_encode_component_escapes_reserved() {
        assert_eq!(encode_component("a b&c=d/e?f"), "a%20b%26c%3Dd%2Fe%3Ff");
        assert_eq!(encode_component("100%"), "100%25");
        assert_eq!(encode_component("#[]@$,;+:"), "%23%5B%5D%40%24%2C%3B%2B%3A");
    }

    #[test]
    fn test_encode_component_utf8() {
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("日"), "%E6%97%A5");
    }

    #[test]
    fn test_encode_booleans() {
        assert_eq!(encode("f", &json!(true)).unwrap(), "1");
        assert_eq!(encode("f", &json!(false)).unwrap(), "0");
    }

    #[test]
    fn test_encode_numbers() {
        assert_eq!(encode("n", &json!(5)).unwrap(), "5");
        assert_eq!(encode("n", &json!(-3)).unwrap(), "-3");
        assert_eq!(encode("n", &json!(1.5)).unwrap(), "1.5");
        assert_eq!(encode("n", &json!(2.0)).unwrap(), "2");
        assert_eq!(encode("n", &json!(u64::MAX)).unwrap(), "18446744073709551615");
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(encode("s", &json!("two")).unwrap(), "two");
        assert_eq!(encode("s", &json!("hello world")).unwrap(), "hello%20world");
    }

    #[test]
    fn test_encode_object_is_json_in_insertion_order() {
        let value = json!({"b": 1, "a": "x"});
        assert_eq!(encode("o", &value).unwrap(), "%7B%22b%22%3A1%2C%22a%22%3A%22x%22%7D");
        assert_eq!(encode("o", &json!([1, 2])).unwrap(), "%5B1%2C2%5D");
    }

    #[test]
    fn test_encode_null_is_unsupported() {
        let err = encode("missing", &Value::Null).unwrap_err();
        assert!(matches!(err, BiError::UnsupportedValue { ref field } if field == "missing"));
    }
}
