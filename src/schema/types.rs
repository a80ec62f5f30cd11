use arrow::datatypes::{DataType, Field, Fields, TimeUnit};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// One step in a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key
    Field(String),
    /// The shared position of every element of an array
    Element,
}

/// Position of a value inside a nested document, e.g. `user.addresses[].zip`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The document root, rendered as `$`
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of an object key below this one
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Field(name.to_string()));
        FieldPath(segments)
    }

    /// Path shared by the elements of an array at this position
    pub fn element(&self) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Element);
        FieldPath(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Name of the top-level column this path belongs to
    pub fn column(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// Parse the dotted form produced by `Display`.
    ///
    /// Keys containing `.` or `[]` cannot round-trip; this is meant for
    /// tests and command-line lookups, not for arbitrary keys.
    pub fn parse(s: &str) -> Self {
        if s == "$" || s.is_empty() {
            return FieldPath::root();
        }
        let mut segments = Vec::new();
        for part in s.split('.') {
            let mut name = part;
            let mut elements = 0;
            while let Some(stripped) = name.strip_suffix("[]") {
                name = stripped;
                elements += 1;
            }
            if !name.is_empty() {
                segments.push(PathSegment::Field(name.to_string()));
            }
            segments.extend(std::iter::repeat(PathSegment::Element).take(elements));
        }
        FieldPath(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        let mut first = true;
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Element => f.write_str("[]")?,
            }
            first = false;
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Smallest signed integer width that holds every value seen so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntWidth {
    Bits8,
    Bits16,
    Bits32,
    Bits64,
}

impl IntWidth {
    pub fn for_value(v: i64) -> Self {
        if i8::try_from(v).is_ok() {
            IntWidth::Bits8
        } else if i16::try_from(v).is_ok() {
            IntWidth::Bits16
        } else if i32::try_from(v).is_ok() {
            IntWidth::Bits32
        } else {
            IntWidth::Bits64
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IntWidth::Bits8 => 8,
            IntWidth::Bits16 => 16,
            IntWidth::Bits32 => 32,
            IntWidth::Bits64 => 64,
        }
    }
}

/// A named member of an [`ObservedType::Struct`]
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: ObservedType,
    pub nullable: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: ObservedType) -> Self {
        let nullable = ty.is_null();
        StructField {
            name: name.into(),
            ty,
            nullable,
        }
    }
}

/// The type inferred for a value, before and after unification
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedType {
    Null,
    Boolean,
    /// Integer with the width hint of the values observed; finalized as 64-bit
    Integer(IntWidth),
    Float,
    String,
    Date,
    Time(TimeUnit),
    Timestamp(TimeUnit),
    /// Element type shared by every array element; `List(Null)` is an empty array
    List(Box<ObservedType>),
    /// Object members in first-observed order
    Struct(Vec<StructField>),
}

impl ObservedType {
    pub fn is_null(&self) -> bool {
        matches!(self, ObservedType::Null)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ObservedType::Date | ObservedType::Time(_) | ObservedType::Timestamp(_)
        )
    }

    /// Scalars that can be written out as text without losing meaning
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            ObservedType::Null | ObservedType::List(_) | ObservedType::Struct(_)
        )
    }

    /// Look up a struct member by name
    pub fn field(&self, name: &str) -> Option<&StructField> {
        match self {
            ObservedType::Struct(fields) => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Every path below (and including) `base`, depth first, in field order
    pub fn paths(&self, base: FieldPath) -> Vec<(FieldPath, ObservedType)> {
        let mut out = Vec::new();
        self.collect_paths(base, &mut out);
        out
    }

    fn collect_paths(&self, path: FieldPath, out: &mut Vec<(FieldPath, ObservedType)>) {
        match self {
            ObservedType::Struct(fields) => {
                for field in fields {
                    let child = path.child(&field.name);
                    out.push((child.clone(), field.ty.clone()));
                    field.ty.collect_paths(child, out);
                }
            }
            ObservedType::List(elem) => {
                let child = path.element();
                out.push((child.clone(), (**elem).clone()));
                elem.collect_paths(child, out);
            }
            _ => {}
        }
    }

    /// Arrow type for this observation.
    ///
    /// Returns `None` when nothing concrete was ever seen (only nulls, empty
    /// arrays or empty objects); the innermost unresolved path is pushed to
    /// `unresolved`. Struct members that cannot be resolved are left out.
    pub fn to_arrow(&self, path: &FieldPath, unresolved: &mut Vec<FieldPath>) -> Option<DataType> {
        let data_type = match self {
            ObservedType::Null => {
                unresolved.push(path.clone());
                return None;
            }
            ObservedType::Boolean => DataType::Boolean,
            ObservedType::Integer(_) => DataType::Int64,
            ObservedType::Float => DataType::Float64,
            ObservedType::String => DataType::Utf8,
            ObservedType::Date => DataType::Date32,
            // Parquet TIME and TIMESTAMP have no seconds unit
            ObservedType::Time(TimeUnit::Second | TimeUnit::Millisecond) => {
                DataType::Time32(TimeUnit::Millisecond)
            }
            ObservedType::Time(unit) => DataType::Time64(*unit),
            ObservedType::Timestamp(TimeUnit::Second) => {
                DataType::Timestamp(TimeUnit::Millisecond, None)
            }
            ObservedType::Timestamp(unit) => DataType::Timestamp(*unit, None),
            ObservedType::List(elem) => {
                let item = elem.to_arrow(&path.element(), unresolved)?;
                DataType::List(Arc::new(Field::new("item", item, true)))
            }
            ObservedType::Struct(fields) => {
                if fields.is_empty() {
                    unresolved.push(path.clone());
                    return None;
                }
                let resolved: Vec<Field> = fields
                    .iter()
                    .filter_map(|f| {
                        f.ty.to_arrow(&path.child(&f.name), unresolved)
                            .map(|dt| Field::new(f.name.clone(), dt, f.nullable))
                    })
                    .collect();
                if resolved.is_empty() {
                    return None;
                }
                DataType::Struct(Fields::from(resolved))
            }
        };
        Some(data_type)
    }
}

fn unit_suffix(unit: &TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Second => "s",
        TimeUnit::Millisecond => "ms",
        TimeUnit::Microsecond => "us",
        TimeUnit::Nanosecond => "ns",
    }
}

impl fmt::Display for ObservedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedType::Null => f.write_str("null"),
            ObservedType::Boolean => f.write_str("boolean"),
            ObservedType::Integer(width) => write!(f, "int{}", width.bits()),
            ObservedType::Float => f.write_str("float64"),
            ObservedType::String => f.write_str("utf8"),
            ObservedType::Date => f.write_str("date"),
            ObservedType::Time(unit) => write!(f, "time[{}]", unit_suffix(unit)),
            ObservedType::Timestamp(unit) => write!(f, "timestamp[{}]", unit_suffix(unit)),
            ObservedType::List(elem) => write!(f, "list<{}>", elem),
            ObservedType::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    let marker = if field.nullable { "?" } else { "" };
                    write!(f, "{}{}: {}", field.name, marker, field.ty)?;
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = FieldPath::root().child("user").child("addresses").element().child("zip");
        assert_eq!(path.to_string(), "user.addresses[].zip");
        assert_eq!(FieldPath::root().to_string(), "$");
        assert_eq!(FieldPath::root().element().element().to_string(), "[][]");
    }

    #[test]
    fn test_path_parse() {
        let path = FieldPath::parse("user.addresses[].zip");
        assert_eq!(path, FieldPath::root().child("user").child("addresses").element().child("zip"));
        assert_eq!(FieldPath::parse("matrix[][]").to_string(), "matrix[][]");
        assert!(FieldPath::parse("$").is_root());
    }

    #[test]
    fn test_int_width() {
        assert_eq!(IntWidth::for_value(-128), IntWidth::Bits8);
        assert_eq!(IntWidth::for_value(200), IntWidth::Bits16);
        assert_eq!(IntWidth::for_value(70_000), IntWidth::Bits32);
        assert_eq!(IntWidth::for_value(i64::MIN), IntWidth::Bits64);
    }

    #[test]
    fn test_display_nested() {
        let ty = ObservedType::Struct(vec![
            StructField::new("id", ObservedType::Integer(IntWidth::Bits8)),
            StructField {
                name: "tags".to_string(),
                ty: ObservedType::List(Box::new(ObservedType::String)),
                nullable: true,
            },
        ]);
        assert_eq!(ty.to_string(), "struct<id: int8, tags?: list<utf8>>");
    }

    #[test]
    fn test_to_arrow_drops_unresolved_members() {
        let ty = ObservedType::Struct(vec![
            StructField::new("a", ObservedType::Float),
            StructField::new("b", ObservedType::Null),
            StructField::new("c", ObservedType::List(Box::new(ObservedType::Null))),
            StructField::new("d", ObservedType::Struct(vec![])),
        ]);
        let base = FieldPath::root().child("s");
        let mut unresolved = Vec::new();
        let dt = ty.to_arrow(&base, &mut unresolved).unwrap();

        match dt {
            DataType::Struct(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].name(), "a");
            }
            other => panic!("expected struct, got {:?}", other),
        }
        let names: Vec<String> = unresolved.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["s.b", "s.c[]", "s.d"]);
    }

    #[test]
    fn test_to_arrow_temporal_units() {
        let mut unresolved = Vec::new();
        let root = FieldPath::root();
        assert_eq!(
            ObservedType::Time(TimeUnit::Second).to_arrow(&root, &mut unresolved),
            Some(DataType::Time32(TimeUnit::Millisecond))
        );
        assert_eq!(
            ObservedType::Time(TimeUnit::Nanosecond).to_arrow(&root, &mut unresolved),
            Some(DataType::Time64(TimeUnit::Nanosecond))
        );
        assert_eq!(
            ObservedType::Timestamp(TimeUnit::Microsecond).to_arrow(&root, &mut unresolved),
            Some(DataType::Timestamp(TimeUnit::Microsecond, None))
        );
        assert!(unresolved.is_empty());
    }

    #[test]
    fn test_paths_flatten() {
        let ty = ObservedType::Struct(vec![StructField::new(
            "posts",
            ObservedType::List(Box::new(ObservedType::Struct(vec![StructField::new(
                "title",
                ObservedType::String,
            )]))),
        )]);
        let paths: Vec<String> = ty
            .paths(FieldPath::root())
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(paths, vec!["posts", "posts[]", "posts[].title"]);
    }
}
