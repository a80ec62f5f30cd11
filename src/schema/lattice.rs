//! Promotion rules for merging two observations of the same path.
//!
//! Rules are tried in order and the first that applies wins:
//!
//! 1. `null` merges into anything (the caller marks the field nullable)
//! 2. equal scalars stay put; integer widths, time units and date/timestamp widen
//! 3. integer + float becomes float, with `type_conversion`
//! 4. primitive + string becomes string, with `quoted_values_are_strings`
//!    (or, for temporal columns, with `type_conversion`)
//! 5. lists merge their element types
//! 6. structs merge field-wise; one-sided fields become nullable
//! 7. everything else is a conflict

use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::types::{FieldPath, ObservedType, StructField};
use arrow::datatypes::TimeUnit;

/// Merge `incoming` into `existing` for the value at `path`.
pub fn merge(
    existing: &ObservedType,
    incoming: &ObservedType,
    config: &Config,
    path: &FieldPath,
) -> Result<ObservedType> {
    use ObservedType::*;

    let merged = match (existing, incoming) {
        (Null, other) | (other, Null) => other.clone(),

        (Integer(a), Integer(b)) => Integer(*a.max(b)),
        (Time(a), Time(b)) => Time(finer(*a, *b)),
        (Timestamp(a), Timestamp(b)) => Timestamp(finer(*a, *b)),
        (Date, Timestamp(unit)) | (Timestamp(unit), Date) => Timestamp(*unit),
        (a, b) if a == b && a.is_primitive() => a.clone(),

        (Integer(_), Float) | (Float, Integer(_)) if config.type_conversion => Float,

        (String, other) | (other, String)
            if other.is_primitive() && string_promotion_allowed(other, config) =>
        {
            String
        }

        (List(a), List(b)) => List(Box::new(merge(a, b, config, &path.element())?)),

        (Struct(a), Struct(b)) => Struct(merge_struct_fields(a, b, config, path)?),

        _ => return Err(conflict(path, existing, incoming)),
    };

    Ok(merged)
}

/// Field-wise union of two structs, keeping `a`'s order and appending new fields from `b`.
pub fn merge_struct_fields(
    a: &[StructField],
    b: &[StructField],
    config: &Config,
    path: &FieldPath,
) -> Result<Vec<StructField>> {
    let mut fields = Vec::with_capacity(a.len().max(b.len()));

    for field in a {
        let merged = match b.iter().find(|other| other.name == field.name) {
            Some(other) => {
                let ty = merge(&field.ty, &other.ty, config, &path.child(&field.name))?;
                StructField {
                    name: field.name.clone(),
                    nullable: field.nullable
                        || other.nullable
                        || field.ty.is_null()
                        || other.ty.is_null(),
                    ty,
                }
            }
            None => StructField {
                name: field.name.clone(),
                ty: field.ty.clone(),
                nullable: true,
            },
        };
        fields.push(merged);
    }

    for other in b {
        if !a.iter().any(|field| field.name == other.name) {
            fields.push(StructField {
                name: other.name.clone(),
                ty: other.ty.clone(),
                nullable: true,
            });
        }
    }

    Ok(fields)
}

fn string_promotion_allowed(other: &ObservedType, config: &Config) -> bool {
    config.quoted_values_are_strings || (config.type_conversion && other.is_temporal())
}

fn finer(a: TimeUnit, b: TimeUnit) -> TimeUnit {
    if unit_rank(a) >= unit_rank(b) {
        a
    } else {
        b
    }
}

fn unit_rank(unit: TimeUnit) -> u8 {
    match unit {
        TimeUnit::Second => 0,
        TimeUnit::Millisecond => 1,
        TimeUnit::Microsecond => 2,
        TimeUnit::Nanosecond => 3,
    }
}

fn conflict(path: &FieldPath, existing: &ObservedType, incoming: &ObservedType) -> Error {
    Error::TypeConflict {
        path: path.clone(),
        existing: existing.clone(),
        incoming: incoming.clone(),
    }
}
