//! Unification and conversion options.
//!
//! A [`Config`] is a plain immutable snapshot. Build one with a struct literal
//! over [`Config::default`], or go through [`UnifierBuilder`](crate::UnifierBuilder)
//! which applies options one method at a time before handing out a unifier.

/// Rows per record batch handed to the columnar writer.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// What to do with a document that cannot be merged into the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Abort unification on the first bad document.
    #[default]
    FailFast,
    /// Leave the schema untouched, count the document as skipped and keep going.
    SkipDocument,
}

/// How the sample cap is applied while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapBoundary {
    /// Stop once the count exceeds `max_count`, so `max_count + 1` documents are sampled.
    #[default]
    Inclusive,
    /// Stop as soon as `max_count` documents are sampled.
    Exact,
}

/// Handling of record fields that never appeared in the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnseenFieldPolicy {
    /// Ignore fields the schema does not know about.
    #[default]
    Drop,
    /// Fail the conversion on the first unknown field.
    Error,
}

/// Options for schema unification and conversion
#[derive(Debug, Clone)]
pub struct Config {
    /// Recognize dates, times and timestamps inside string values
    pub infer_time_units: bool,

    /// Allow widening conflicting columns (integer to float, temporal to string)
    pub type_conversion: bool,

    /// Resolve a quoted/unquoted clash on a primitive column to string
    pub quoted_values_are_strings: bool,

    /// Maximum number of documents sampled for the schema (`None` = whole input)
    pub max_count: Option<usize>,

    /// Byte separating documents in the input stream
    pub delimiter: u8,

    pub conflict_policy: ConflictPolicy,

    pub cap_boundary: CapBoundary,

    pub unseen_fields: UnseenFieldPolicy,

    /// Records per batch during materialization
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            infer_time_units: false,
            type_conversion: false,
            quoted_values_are_strings: false,
            max_count: None,
            delimiter: b'\n',
            conflict_policy: ConflictPolicy::default(),
            cap_boundary: CapBoundary::default(),
            unseen_fields: UnseenFieldPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// True once `count` documents satisfy the configured cap.
    pub fn cap_reached(&self, count: usize) -> bool {
        self.max_count.is_some_and(|max| count >= max)
    }

    /// True once the scanner should stop feeding documents, honoring [`CapBoundary`].
    pub fn sampling_done(&self, count: usize) -> bool {
        match (self.max_count, self.cap_boundary) {
            (None, _) => false,
            (Some(max), CapBoundary::Inclusive) => count > max,
            (Some(max), CapBoundary::Exact) => count >= max,
        }
    }

    /// Batch size clamped to at least one row.
    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_done() {
        let config = Config::default();
        assert!(!config.cap_reached(1_000_000));
        assert!(!config.sampling_done(1_000_000));
    }

    #[test]
    fn test_inclusive_boundary_samples_one_extra() {
        let config = Config {
            max_count: Some(3),
            ..Config::default()
        };
        assert!(config.cap_reached(3));
        assert!(!config.sampling_done(3));
        assert!(config.sampling_done(4));
    }

    #[test]
    fn test_exact_boundary() {
        let config = Config {
            max_count: Some(3),
            cap_boundary: CapBoundary::Exact,
            ..Config::default()
        };
        assert!(!config.sampling_done(2));
        assert!(config.sampling_done(3));
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_batch_size(), 1);
    }
}
