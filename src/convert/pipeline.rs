//! Two-phase conversion: discover a schema from a sample, then materialize
//! the whole input against it.

use crate::config::{Config, ConflictPolicy, UnseenFieldPolicy};
use crate::convert::writer::{ColumnarWriter, ParquetWriter};
use crate::error::{Error, Result};
use crate::scanner::DelimitedScanner;
use crate::schema::{complete_hour_only, UnifiedSchema, Unifier};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::error::ArrowError;
use arrow::json::reader::Decoder;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Read buffer for schema discovery
const SAMPLE_BUFFER_SIZE: usize = 32 * 1024;

/// Read buffer for materialization
const RECORD_BUFFER_SIZE: usize = 1024 * 1024;

/// Outcome of a full conversion
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub schema: UnifiedSchema,
    /// Documents sampled while discovering the schema
    pub sampled: usize,
    /// Rows committed to the output
    pub rows_written: usize,
    /// Documents left out of the output under [`ConflictPolicy::SkipDocument`]
    pub skipped: usize,
}

/// Row accounting for one materialization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub rows_written: usize,
    pub skipped: usize,
}

/// Phase 1: unify documents from `reader` until it is exhausted or the sample
/// cap trips. Returns the schema and the number of documents sampled.
pub fn schema_from_reader<R: BufRead>(reader: R, config: &Config) -> Result<(UnifiedSchema, usize)> {
    let mut unifier = Unifier::new(config.clone());
    let mut scanner = DelimitedScanner::new(reader, config.delimiter);

    unifier.scan(&mut scanner)?;
    let schema = unifier.finalize()?;

    info!(
        sampled = unifier.observation_count(),
        skipped = unifier.skipped_count(),
        columns = schema.len(),
        "schema discovery finished"
    );
    Ok((schema, unifier.observation_count()))
}

/// Phase 1 over a file
pub fn schema_from_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<(UnifiedSchema, usize)> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(SAMPLE_BUFFER_SIZE, file);
    schema_from_reader(reader, config)
}

/// Phase 2: decode every document in `reader` against `schema` and hand the
/// batches to `writer`.
///
/// Each delimited unit must hold exactly one JSON document. Under
/// [`ConflictPolicy::SkipDocument`] a document that does not fit the schema is
/// counted and left out; otherwise it fails the pass with its line number.
///
/// The writer is closed whether or not decoding succeeds; a close failure
/// after an earlier error is logged and the earlier error returned.
pub fn records_from_reader<R, W>(
    reader: R,
    schema: &UnifiedSchema,
    config: &Config,
    mut writer: W,
) -> Result<RecordCounts>
where
    R: BufRead,
    W: ColumnarWriter,
{
    let mut batcher = RecordBatcher::new(schema, config)?;
    let mut scanner = DelimitedScanner::new(reader, config.delimiter);

    match batcher.run(&mut scanner, &mut writer) {
        Ok(()) => {
            let counts = batcher.counts;
            writer.close().map_err(|source| Error::Writer {
                rows_written: counts.rows_written,
                source,
            })?;
            info!(rows = counts.rows_written, skipped = counts.skipped, "materialization finished");
            Ok(counts)
        }
        Err(err) => {
            if let Err(close_err) = writer.close() {
                warn!(error = %close_err, "failed to close writer after error");
            }
            Err(err)
        }
    }
}

/// Phase 2 from `input_file` into a Parquet file at `output_file`.
///
/// `props` of `None` uses [`ParquetWriter::default_properties`].
pub fn records_from_file<P, Q>(
    input_file: P,
    output_file: Q,
    schema: &UnifiedSchema,
    config: &Config,
    props: Option<WriterProperties>,
) -> Result<RecordCounts>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let file = File::open(input_file)?;
    let writer = ParquetWriter::create(output_file, schema.to_arrow(), props)
        .map_err(|source| Error::Writer { rows_written: 0, source })?;

    let reader = BufReader::with_capacity(RECORD_BUFFER_SIZE, file);
    records_from_reader(reader, schema, config, writer)
}

/// Discover the schema from `input_file`, then convert all of it to Parquet.
///
/// Schema discovery failures return before the output file is created.
pub fn convert_file<P, Q>(
    input_file: P,
    output_file: Q,
    config: &Config,
    props: Option<WriterProperties>,
) -> Result<ConversionSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input_file = input_file.as_ref();
    let (schema, sampled) = schema_from_file(input_file, config)?;
    let counts = records_from_file(input_file, output_file, &schema, config, props)?;

    Ok(ConversionSummary {
        schema,
        sampled,
        rows_written: counts.rows_written,
        skipped: counts.skipped,
    })
}

fn build_decoder(schema: &SchemaRef, config: &Config) -> Result<Decoder> {
    let decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(config.effective_batch_size())
        .with_strict_mode(config.unseen_fields == UnseenFieldPolicy::Error)
        // Columns widened to strings by `quoted_values_are_strings` still see bare numbers and booleans
        .with_coerce_primitive(config.quoted_values_are_strings)
        .build_decoder()?;
    Ok(decoder)
}

fn has_timestamp(data_type: &DataType) -> bool {
    match data_type {
        DataType::Timestamp(..) => true,
        DataType::List(item) => has_timestamp(item.data_type()),
        DataType::Struct(fields) => fields.iter().any(|f| has_timestamp(f.data_type())),
        _ => false,
    }
}

/// Complete hour-only strings wherever `data_type` expects a timestamp.
fn complete_timestamps(value: &mut Value, data_type: &DataType) {
    match (data_type, value) {
        (DataType::Timestamp(..), Value::String(s)) => {
            if let Some(full) = complete_hour_only(s) {
                *s = full;
            }
        }
        (DataType::List(item), Value::Array(items)) => {
            for element in items {
                complete_timestamps(element, item.data_type());
            }
        }
        (DataType::Struct(fields), Value::Object(map)) => {
            for field in fields.iter() {
                if let Some(child) = map.get_mut(field.name()) {
                    complete_timestamps(child, field.data_type());
                }
            }
        }
        _ => {}
    }
}

/// Buffers decoded documents and turns them into record batches.
///
/// Arrow reports type errors for a whole batch, so a failed batch is retried
/// one document at a time to find the offending line.
struct RecordBatcher<'a> {
    config: &'a Config,
    schema: SchemaRef,
    row_type: DataType,
    complete_hours: bool,
    decoder: Decoder,
    pending: Vec<Value>,
    lines: Vec<usize>,
    scratch: Vec<u8>,
    counts: RecordCounts,
}

impl<'a> RecordBatcher<'a> {
    fn new(schema: &UnifiedSchema, config: &'a Config) -> Result<Self> {
        let schema = schema.to_arrow();
        let row_type = DataType::Struct(schema.fields().clone());
        let complete_hours = config.infer_time_units && has_timestamp(&row_type);
        let decoder = build_decoder(&schema, config)?;

        Ok(RecordBatcher {
            config,
            schema,
            row_type,
            complete_hours,
            decoder,
            pending: Vec::new(),
            lines: Vec::new(),
            scratch: Vec::new(),
            counts: RecordCounts::default(),
        })
    }

    fn run<R, W>(&mut self, scanner: &mut DelimitedScanner<R>, writer: &mut W) -> Result<()>
    where
        R: BufRead,
        W: ColumnarWriter,
    {
        let batch_size = self.config.effective_batch_size();

        loop {
            match scanner.next_unit()? {
                Some(unit) => {
                    self.scratch.clear();
                    self.scratch.extend_from_slice(unit);
                }
                None => break,
            }
            let line = scanner.line();

            // One document per unit; trailing data is a decode error, not a second row
            let mut value: Value = match simd_json::serde::from_slice(&mut self.scratch) {
                Ok(value) => value,
                Err(err) => {
                    self.reject(line, ArrowError::JsonError(err.to_string()))?;
                    continue;
                }
            };
            if self.complete_hours {
                complete_timestamps(&mut value, &self.row_type);
            }

            self.pending.push(value);
            self.lines.push(line);
            if self.pending.len() == batch_size {
                self.flush(writer)?;
            }
        }

        self.flush(writer)
    }

    fn flush<W: ColumnarWriter>(&mut self, writer: &mut W) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(&mut self.pending);
        let lines = std::mem::take(&mut self.lines);

        let batch = match self.encode(&rows) {
            Ok(batch) => batch,
            Err(_) => self.encode_each(rows, &lines)?,
        };
        let Some(batch) = batch else {
            return Ok(());
        };

        writer.write_batch(&batch).map_err(|source| Error::Writer {
            rows_written: self.counts.rows_written,
            source,
        })?;
        self.counts.rows_written += batch.num_rows();
        debug!(rows = batch.num_rows(), line = lines.last().copied().unwrap_or(0), "wrote record batch");
        Ok(())
    }

    fn encode(&mut self, rows: &[Value]) -> std::result::Result<Option<RecordBatch>, ArrowError> {
        self.decoder.serialize(rows)?;
        self.decoder.flush()
    }

    /// Re-encode a failed batch row by row, keeping the rows that fit.
    fn encode_each(&mut self, rows: Vec<Value>, lines: &[usize]) -> Result<Option<RecordBatch>> {
        // A failed flush leaves its rows buffered in the decoder
        self.decoder = build_decoder(&self.schema, self.config)?;

        let mut kept = Vec::with_capacity(rows.len());
        for (value, &line) in rows.into_iter().zip(lines) {
            match self.encode(std::slice::from_ref(&value)) {
                Ok(_) => kept.push(value),
                Err(source) => {
                    self.decoder = build_decoder(&self.schema, self.config)?;
                    self.reject(line, source)?;
                }
            }
        }

        let line = lines.last().copied().unwrap_or(0);
        self.encode(&kept)
            .map_err(|source| Error::RecordDecode { line, source })
    }

    fn reject(&mut self, line: usize, source: ArrowError) -> Result<()> {
        if self.config.conflict_policy == ConflictPolicy::FailFast {
            return Err(Error::RecordDecode { line, source });
        }
        self.counts.skipped += 1;
        warn!(line, error = %source, skipped = self.counts.skipped, "skipping record");
        Ok(())
    }
}
