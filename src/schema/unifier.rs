//! Streaming schema unification.
//!
//! A [`Unifier`] keeps one [`FieldState`] per top-level column and folds every
//! ingested document into it through the promotion lattice. Nothing is built
//! until [`Unifier::finalize`], which turns the accumulated state into an
//! Arrow-ready [`UnifiedSchema`].

use crate::config::{CapBoundary, Config, ConflictPolicy, UnseenFieldPolicy};
use crate::error::{Error, Result};
use crate::scanner::DelimitedScanner;
use crate::schema::lattice::merge;
use crate::schema::types::{FieldPath, ObservedType};
use crate::schema::walker::walk;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use tracing::{debug, warn};

/// Read buffer used for sources attached with [`UnifierBuilder::io_reader`].
const SOURCE_BUFFER_SIZE: usize = 16 * 1024;

/// Running state of one top-level column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    path: FieldPath,
    ty: ObservedType,
    nullable: bool,
    conflicted: bool,
    occurrences: usize,
}

impl FieldState {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Merged type observed so far
    pub fn ty(&self) -> &ObservedType {
        &self.ty
    }

    /// True if the column was ever observed as `null`
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True if a document was skipped because of a conflict in this column
    pub fn is_conflicted(&self) -> bool {
        self.conflicted
    }

    /// Number of ingested documents that contained the column
    pub fn occurrences(&self) -> usize {
        self.occurrences
    }
}

/// A finalized column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub path: FieldPath,
    #[serde(serialize_with = "serialize_data_type")]
    pub data_type: DataType,
    pub nullable: bool,
}

fn serialize_data_type<S: Serializer>(data_type: &DataType, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(data_type)
}

/// Schema frozen from a sample, in first-observed column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedSchema {
    fields: Vec<SchemaField>,
    unresolved: Vec<FieldPath>,
}

impl UnifiedSchema {
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Paths that never had a concrete type and are left out of the columns
    pub fn unresolved(&self) -> &[FieldPath] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a column by name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.path.column() == Some(name))
    }

    /// Arrow schema handed to the record decoder and the columnar writer
    pub fn to_arrow(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(f.path.to_string(), f.data_type.clone(), f.nullable))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// Accumulates observations from a stream of JSON documents.
///
/// One unifier serves one input stream; ingestion takes `&mut self`, so a
/// unifier is never fed from two places at once.
pub struct Unifier {
    config: Config,
    source: Option<Box<dyn BufRead>>,
    fields: Vec<FieldState>,
    index: HashMap<String, usize>,
    count: usize,
    skipped: usize,
    scratch: Vec<u8>,
}

impl Unifier {
    /// Create a unifier from a finished config
    pub fn new(config: Config) -> Self {
        Unifier {
            config,
            source: None,
            fields: Vec::new(),
            index: HashMap::new(),
            count: 0,
            skipped: 0,
            scratch: Vec::new(),
        }
    }

    pub fn builder() -> UnifierBuilder {
        UnifierBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decode one raw document and fold it into the schema.
    ///
    /// Documents offered after sampling is done are ignored.
    pub fn ingest(&mut self, raw: &[u8]) -> Result<()> {
        if self.sampling_done() {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(raw);
        let value: Value = match simd_json::serde::from_slice(&mut self.scratch) {
            Ok(value) => value,
            Err(source) => return self.reject(Error::Decode { source }),
        };

        self.ingest_value(&value)
    }

    /// Fold an already decoded document into the schema.
    ///
    /// Every merge is computed before any state changes, so a document that
    /// fails leaves the unifier exactly as it was.
    pub fn ingest_value(&mut self, value: &Value) -> Result<()> {
        if self.sampling_done() {
            return Ok(());
        }

        let observed = match walk(value, &self.config) {
            Ok(observed) => observed,
            Err(err) => return self.reject(err),
        };

        let fields = match observed {
            ObservedType::Struct(fields) => fields,
            other => {
                return self.reject(Error::TypeConflict {
                    path: FieldPath::root(),
                    existing: ObservedType::Struct(Vec::new()),
                    incoming: other,
                })
            }
        };

        let mut updates = Vec::with_capacity(fields.len());
        for field in fields {
            let slot = self.index.get(&field.name).copied();
            let ty = match slot {
                Some(i) => {
                    let path = FieldPath::root().child(&field.name);
                    match merge(&self.fields[i].ty, &field.ty, &self.config, &path) {
                        Ok(ty) => ty,
                        Err(err) => return self.reject(err),
                    }
                }
                None => field.ty.clone(),
            };
            updates.push((slot, field, ty));
        }

        for (slot, field, ty) in updates {
            match slot {
                Some(i) => {
                    let state = &mut self.fields[i];
                    state.nullable |= field.nullable || state.ty.is_null();
                    state.ty = ty;
                    state.occurrences += 1;
                }
                None => {
                    self.index.insert(field.name.clone(), self.fields.len());
                    self.fields.push(FieldState {
                        path: FieldPath::root().child(&field.name),
                        ty,
                        nullable: field.nullable,
                        conflicted: false,
                        occurrences: 1,
                    });
                }
            }
        }

        self.count += 1;
        Ok(())
    }

    /// Scan the source attached with [`UnifierBuilder::io_reader`] until it is
    /// exhausted or sampling is done. Returns the observation count.
    pub fn unify_scan(&mut self) -> Result<usize> {
        let source = self.source.take().ok_or(Error::NoReader)?;
        let mut scanner = DelimitedScanner::new(source, self.config.delimiter);

        let outcome = self.scan(&mut scanner);
        self.source = Some(scanner.into_inner());
        outcome?;

        Ok(self.count)
    }

    /// Feed units from `scanner` until it runs dry or sampling is done.
    pub(crate) fn scan<R: BufRead>(&mut self, scanner: &mut DelimitedScanner<R>) -> Result<()> {
        while !self.sampling_done() {
            match scanner.next_unit()? {
                Some(unit) => self.ingest(unit)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Number of documents successfully ingested
    pub fn observation_count(&self) -> usize {
        self.count
    }

    /// Documents dropped under [`ConflictPolicy::SkipDocument`]
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// True once `max_count` documents have been ingested
    pub fn sampling_cap_reached(&self) -> bool {
        self.config.cap_reached(self.count)
    }

    /// True once no further documents will be accepted, see [`CapBoundary`]
    pub fn sampling_done(&self) -> bool {
        self.config.sampling_done(self.count)
    }

    /// Column states in first-observed order
    pub fn field_states(&self) -> impl Iterator<Item = &FieldState> {
        self.fields.iter()
    }

    /// Build the schema from everything ingested so far.
    pub fn finalize(&self) -> Result<UnifiedSchema> {
        if self.count == 0 {
            return Err(Error::EmptyInput);
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut unresolved = Vec::new();

        for state in &self.fields {
            let nullable = state.nullable || state.occurrences < self.count;
            if let Some(data_type) = state.ty.to_arrow(&state.path, &mut unresolved) {
                fields.push(SchemaField {
                    path: state.path.clone(),
                    data_type,
                    nullable,
                });
            }
        }

        for path in &unresolved {
            warn!(path = %path, "no concrete type observed, leaving it out of the schema");
        }
        debug!(
            columns = fields.len(),
            unresolved = unresolved.len(),
            sampled = self.count,
            skipped = self.skipped,
            "finalized unified schema"
        );

        Ok(UnifiedSchema { fields, unresolved })
    }

    fn reject(&mut self, err: Error) -> Result<()> {
        if self.config.conflict_policy == ConflictPolicy::FailFast {
            return Err(err);
        }

        if let Some(&i) = err.path().and_then(|p| p.column()).and_then(|c| self.index.get(c)) {
            self.fields[i].conflicted = true;
        }
        self.skipped += 1;
        warn!(error = %err, skipped = self.skipped, "skipping document");
        Ok(())
    }
}

/// Collects options before unification starts.
///
/// The builder is consumed by [`build`](UnifierBuilder::build), so options
/// cannot change once documents are being ingested.
#[derive(Default)]
pub struct UnifierBuilder {
    config: Config,
    source: Option<Box<dyn BufRead>>,
}

impl UnifierBuilder {
    /// Start from an existing config
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Recognize date, time and timestamp strings
    pub fn infer_time_units(mut self) -> Self {
        self.config.infer_time_units = true;
        self
    }

    /// Widen conflicting columns instead of failing
    pub fn type_conversion(mut self) -> Self {
        self.config.type_conversion = true;
        self
    }

    /// Resolve quoted/unquoted primitive clashes to string
    pub fn quoted_values_are_strings(mut self) -> Self {
        self.config.quoted_values_are_strings = true;
        self
    }

    /// Cap the number of sampled documents
    pub fn max_count(mut self, n: usize) -> Self {
        self.config.max_count = Some(n);
        self
    }

    /// Attach an input for [`Unifier::unify_scan`], split on `delimiter`
    pub fn io_reader<R: Read + 'static>(mut self, source: R, delimiter: u8) -> Self {
        self.source = Some(Box::new(BufReader::with_capacity(SOURCE_BUFFER_SIZE, source)));
        self.config.delimiter = delimiter;
        self
    }

    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.config.conflict_policy = policy;
        self
    }

    pub fn cap_boundary(mut self, boundary: CapBoundary) -> Self {
        self.config.cap_boundary = boundary;
        self
    }

    pub fn unseen_fields(mut self, policy: UnseenFieldPolicy) -> Self {
        self.config.unseen_fields = policy;
        self
    }

    pub fn batch_size(mut self, rows: usize) -> Self {
        self.config.batch_size = rows;
        self
    }

    pub fn build(self) -> Unifier {
        let mut unifier = Unifier::new(self.config);
        unifier.source = self.source;
        unifier
    }
}
