//! JSON to Parquet conversion
//!
//! Schema discovery runs a [`Unifier`](crate::schema::Unifier) over a bounded
//! prefix of the input. Materialization then re-reads the whole input, decodes
//! it in fixed-size batches against the frozen schema and hands each batch to
//! a [`ColumnarWriter`].
//!
//! Rows written can exceed the number of documents sampled when the sample cap
//! is smaller than the input; fields that never appeared in the sample are
//! dropped unless [`UnseenFieldPolicy::Error`](crate::config::UnseenFieldPolicy)
//! is set.

pub mod pipeline;
pub mod writer;

pub use pipeline::{
    convert_file, records_from_file, records_from_reader, schema_from_file, schema_from_reader,
    ConversionSummary, RecordCounts,
};
pub use writer::{ColumnarWriter, ParquetWriter};
