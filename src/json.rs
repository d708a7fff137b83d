//! Host JSON data in and out of kernel values.
//!
//! Embedders use this to seed the host namespace with structured data and
//! to hand evaluation results back to the host. JSON objects become kernel
//! objects with string keys, arrays become lists, and `null` becomes the
//! shared null value. Going the other way, symbols and keywords stringify,
//! non-finite numbers serialize as `null` the way the host does, and
//! callables are a type error.

use crate::ast::Value;
use crate::evaluator::HostScope;
use crate::{Error, ParseError, ParseErrorKind};

/// Convert a host JSON document into a kernel value.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::object_from(
            map.iter()
                .map(|(k, v)| (Value::String(k.clone()), from_json(v)))
                .collect(),
        ),
    }
}

/// Convert a kernel value into host JSON.
pub fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    Ok(match value {
        Value::Null | Value::Undefined => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) | Value::Symbol(s) | Value::Keyword(s) => {
            serde_json::Value::String(s.clone())
        }
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        Value::Object(entries) => {
            let mut map = serde_json::Map::new();
            for (key, val) in entries.borrow().iter() {
                let key = match key {
                    Value::String(s) | Value::Keyword(s) => s.clone(),
                    other => other.to_display(),
                };
                map.insert(key, to_json(val)?);
            }
            serde_json::Value::Object(map)
        }
        callable => {
            return Err(Error::TypeError(format!(
                "cannot serialize a {} to JSON",
                callable.type_name()
            )));
        }
    })
}

/// Parse JSON text into a kernel value.
pub fn parse_json(text: &str) -> Result<Value, Error> {
    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        Error::ReadError(ParseError::new(
            ParseErrorKind::InvalidSyntax,
            format!("invalid JSON: {e}"),
        ))
    })?;
    Ok(from_json(&json))
}

/// Pretty-print a kernel value as JSON text.
pub fn print_json(value: &Value) -> Result<String, Error> {
    serde_json::to_string_pretty(&to_json(value)?)
        .map_err(|e| Error::EvalError(format!("JSON serialization failed: {e}")))
}

/// Parse JSON text and bind the result in the host scope.
pub fn define_json(host: &HostScope, name: &str, text: &str) -> Result<(), Error> {
    host.define(name, parse_json(text)?);
    Ok(())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{kw, val};
    use crate::evaluator::{create_root_env, run};

    #[test]
    fn test_from_json_shapes() {
        let value = parse_json(r#"{"name": "crate", "tags": ["a", "b"], "count": 3, "gone": null}"#)
            .unwrap();
        let Value::Object(entries) = &value else {
            panic!("expected an object, got {value:?}");
        };
        let entries = entries.borrow();
        assert_eq!(entries.len(), 4);
        assert!(
            entries
                .iter()
                .any(|(k, v)| k == &val("name") && v == &val("crate"))
        );
        assert!(
            entries
                .iter()
                .any(|(k, v)| k == &val("tags") && v == &val(["a", "b"]))
        );
        assert!(
            entries
                .iter()
                .any(|(k, v)| k == &val("count") && v == &val(3))
        );
        assert!(
            entries
                .iter()
                .any(|(k, v)| k == &val("gone") && v == &Value::Null)
        );
    }

    #[test]
    fn test_to_json_shapes() {
        let cases: Vec<(Value, &str)> = vec![
            (Value::Null, "null"),
            (Value::Undefined, "null"),
            (Value::Number(f64::NAN), "null"),
            (val(1.5), "1.5"),
            (val(true), "true"),
            (val("s"), "\"s\""),
            (kw("tag"), "\"tag\""),
            (val([1, 2]), "[1,2]"),
        ];
        for (value, expected) in cases {
            assert_eq!(
                serde_json::to_string(&to_json(&value).unwrap()).unwrap(),
                expected
            );
        }

        let obj = Value::object_from(vec![(kw("a"), val(1)), (val("b"), val([true]))]);
        assert_eq!(
            serde_json::to_string(&to_json(&obj).unwrap()).unwrap(),
            r#"{"a":1,"b":[true]}"#
        );

        let env = create_root_env();
        let lambda = run("(lambda ())", &env).unwrap();
        assert!(matches!(to_json(&lambda), Err(Error::TypeError(_))));
    }

    #[test]
    fn test_invalid_json_is_a_read_error() {
        assert!(matches!(
            parse_json("{not json"),
            Err(Error::ReadError(_))
        ));
    }

    #[test]
    fn test_injected_data_is_reachable_from_scripts() {
        let env = create_root_env();
        define_json(
            &env.host(),
            "config",
            r#"{"retries": 3, "service": {"name": "api"}}"#,
        )
        .unwrap();

        assert_eq!(run("config.retries", &env).unwrap(), val(3));
        assert_eq!(run("config.service.name", &env).unwrap(), val("api"));
        assert_eq!(
            run("(getkey \"retries\" config)", &env).unwrap(),
            val(3)
        );

        // scripts mutate injected data in place
        run("(setq config.retries 5)", &env).unwrap();
        let stored = env.host().get("config").unwrap();
        assert_eq!(
            print_json(&stored).unwrap().replace([' ', '\n'], ""),
            r#"{"retries":5,"service":{"name":"api"}}"#
        );
    }
}
