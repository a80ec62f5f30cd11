//! Per-document type observation.
//!
//! Walks one decoded JSON value and reports the type seen at every path.
//! Array elements share one `[]` path and are merged through the lattice, so
//! a heterogeneous array either widens or fails right here.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::lattice::merge;
use crate::schema::temporal::{classify, Temporal};
use crate::schema::types::{FieldPath, IntWidth, ObservedType, StructField};
use serde_json::{Map, Number, Value};

/// Observe the type of a whole document.
pub fn walk(value: &Value, config: &Config) -> Result<ObservedType> {
    walk_at(value, &FieldPath::root(), config)
}

fn walk_at(value: &Value, path: &FieldPath, config: &Config) -> Result<ObservedType> {
    let observed = match value {
        Value::Null => ObservedType::Null,
        Value::Bool(_) => ObservedType::Boolean,
        Value::Number(n) => observe_number(n),
        Value::String(s) => observe_string(s, path, config)?,
        Value::Array(arr) => walk_array(arr, path, config)?,
        Value::Object(obj) => walk_object(obj, path, config)?,
    };
    Ok(observed)
}

fn observe_number(n: &Number) -> ObservedType {
    match n.as_i64() {
        Some(v) => ObservedType::Integer(IntWidth::for_value(v)),
        // Unsigned values past i64::MAX and all fractional numbers
        None => ObservedType::Float,
    }
}

fn observe_string(s: &str, path: &FieldPath, config: &Config) -> Result<ObservedType> {
    if !config.infer_time_units {
        return Ok(ObservedType::String);
    }

    let temporal = classify(s).map_err(|reason| Error::TemporalParse {
        path: path.clone(),
        value: s.to_string(),
        reason,
    })?;

    Ok(match temporal {
        Temporal::NotTemporal => ObservedType::String,
        Temporal::Date => ObservedType::Date,
        Temporal::Time(unit) => ObservedType::Time(unit),
        Temporal::Timestamp(unit) => ObservedType::Timestamp(unit),
    })
}

fn walk_array(arr: &[Value], path: &FieldPath, config: &Config) -> Result<ObservedType> {
    let element_path = path.element();
    let mut element = ObservedType::Null;

    for item in arr {
        let observed = walk_at(item, &element_path, config)?;
        element = merge(&element, &observed, config, &element_path)?;
    }

    Ok(ObservedType::List(Box::new(element)))
}

fn walk_object(obj: &Map<String, Value>, path: &FieldPath, config: &Config) -> Result<ObservedType> {
    let mut fields = Vec::with_capacity(obj.len());

    for (key, value) in obj.iter() {
        let observed = walk_at(value, &path.child(key), config)?;
        fields.push(StructField::new(key.as_str(), observed));
    }

    Ok(ObservedType::Struct(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::TimeUnit;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        let config = Config::default();
        assert_eq!(walk(&json!(null), &config).unwrap(), ObservedType::Null);
        assert_eq!(walk(&json!(true), &config).unwrap(), ObservedType::Boolean);
        assert_eq!(walk(&json!(42), &config).unwrap(), ObservedType::Integer(IntWidth::Bits8));
        assert_eq!(walk(&json!(4.5), &config).unwrap(), ObservedType::Float);
        assert_eq!(walk(&json!(u64::MAX), &config).unwrap(), ObservedType::Float);
        assert_eq!(walk(&json!("2021-01-01"), &config).unwrap(), ObservedType::String);
    }

    #[test]
    fn test_object_keeps_key_order() {
        let doc = json!({"zeta": 1, "alpha": "a", "mid": null});
        let observed = walk(&doc, &Config::default()).unwrap();

        assert_eq!(observed.to_string(), "struct<zeta: int8, alpha: utf8, mid?: null>");
    }

    #[test]
    fn test_nested_paths() {
        let doc = json!({
            "user": {
                "name": "Alice",
                "addresses": [{"zip": 12345}]
            }
        });
        let observed = walk(&doc, &Config::default()).unwrap();
        let paths: Vec<String> = observed
            .paths(FieldPath::root())
            .into_iter()
            .map(|(p, t)| format!("{} {}", p, t))
            .collect();

        assert_eq!(
            paths,
            vec![
                "user struct<name: utf8, addresses: list<struct<zip: int16>>>",
                "user.name utf8",
                "user.addresses list<struct<zip: int16>>",
                "user.addresses[] struct<zip: int16>",
                "user.addresses[].zip int16",
            ]
        );
    }

    #[test]
    fn test_array_elements_merge() {
        let doc = json!([{"id": 1}, {"id": 300, "tag": "x"}, null]);
        let observed = walk(&doc, &Config::default()).unwrap();
        assert_eq!(observed.to_string(), "list<struct<id: int16, tag?: utf8>>");
    }

    #[test]
    fn test_array_conflict_escalates() {
        let doc = json!({"values": [1, "two"]});
        let err = walk(&doc, &Config::default()).unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), "values[]");

        let config = Config {
            quoted_values_are_strings: true,
            ..Config::default()
        };
        let observed = walk(&doc, &config).unwrap();
        assert_eq!(observed.to_string(), "struct<values: list<utf8>>");
    }

    #[test]
    fn test_empty_containers_register_paths() {
        let doc = json!({"tags": [], "meta": {}});
        let observed = walk(&doc, &Config::default()).unwrap();
        assert_eq!(observed.to_string(), "struct<tags: list<null>, meta: struct<>>");
    }

    #[test]
    fn test_temporal_inference() {
        let config = Config {
            infer_time_units: true,
            ..Config::default()
        };
        let doc = json!({
            "day": "2024-03-01",
            "at": "2024-03-01T09:15:30.250",
            "clock": "12:30:15.1234567890",
            "note": "hello"
        });
        let observed = walk(&doc, &config).unwrap();

        assert_eq!(observed.field("day").unwrap().ty, ObservedType::Date);
        assert_eq!(
            observed.field("at").unwrap().ty,
            ObservedType::Timestamp(TimeUnit::Millisecond)
        );
        assert_eq!(
            observed.field("clock").unwrap().ty,
            ObservedType::Time(TimeUnit::Nanosecond)
        );
        assert_eq!(observed.field("note").unwrap().ty, ObservedType::String);
    }

    #[test]
    fn test_temporal_parse_error_carries_path() {
        let config = Config {
            infer_time_units: true,
            ..Config::default()
        };
        let doc = json!({"events": [{"at": "12:30:15.123456789012"}]});
        match walk(&doc, &config).unwrap_err() {
            Error::TemporalParse { path, value, .. } => {
                assert_eq!(path.to_string(), "events[].at");
                assert_eq!(value, "12:30:15.123456789012");
            }
            other => panic!("expected temporal error, got {:?}", other),
        }
    }
}
