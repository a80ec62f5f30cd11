//! # Ingot - JSON to Parquet with unified schema inference
//!
//! Turns a stream of loosely structured JSON documents into a strongly typed
//! Parquet file without a hand-written schema.
//!
//! ## Modules
//!
//! - **schema**: infer one columnar schema from a sample, tolerating type drift
//! - **convert**: two-phase conversion of a JSON stream into Parquet
//!
//! ## Quick Start
//!
//! ### Schema Unification
//!
//! ```rust
//! use ingot::Unifier;
//! use arrow::datatypes::DataType;
//!
//! # fn main() -> ingot::Result<()> {
//! let mut unifier = Unifier::builder().type_conversion().build();
//! unifier.ingest(br#"{"id": 1, "price": 3}"#)?;
//! unifier.ingest(br#"{"id": 2, "price": 4.5, "note": "sale"}"#)?;
//!
//! let schema = unifier.finalize()?;
//! assert_eq!(schema.field("price").unwrap().data_type, DataType::Float64);
//! assert!(schema.field("note").unwrap().nullable);
//! # Ok(())
//! # }
//! ```
//!
//! ### Conversion
//!
//! ```rust,no_run
//! use ingot::{convert_file, Config};
//!
//! # fn main() -> ingot::Result<()> {
//! let config = Config {
//!     max_count: Some(1000),
//!     infer_time_units: true,
//!     ..Config::default()
//! };
//! let summary = convert_file("events.jsonl", "events.parquet", &config, None)?;
//! println!("sampled {} documents, wrote {} rows", summary.sampled, summary.rows_written);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod scanner;
pub mod schema;

// Re-export commonly used types for convenience
pub use config::{CapBoundary, Config, ConflictPolicy, UnseenFieldPolicy};
pub use convert::{
    convert_file, records_from_file, records_from_reader, schema_from_file, schema_from_reader,
    ColumnarWriter, ConversionSummary, ParquetWriter, RecordCounts,
};
pub use error::{Error, Result, TemporalParseError, WriterError};
pub use schema::{FieldPath, ObservedType, SchemaField, UnifiedSchema, Unifier, UnifierBuilder};
