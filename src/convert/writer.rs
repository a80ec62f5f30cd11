use crate::error::WriterError;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterPropertiesBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rows per Parquet row group in the default profile
pub const DEFAULT_MAX_ROW_GROUP_SIZE: usize = 128 * 1024;

/// Destination for record batches produced during materialization.
///
/// Batches arrive in input order. `close` consumes the writer, so it runs
/// exactly once, after the last batch.
pub trait ColumnarWriter {
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), WriterError>;

    fn close(self) -> Result<(), WriterError>;
}

/// Writes record batches to a Parquet file
pub struct ParquetWriter {
    inner: ArrowWriter<File>,
    path: PathBuf,
}

impl ParquetWriter {
    /// Encoding profile used when the caller supplies none: Snappy compression,
    /// column-chunk statistics and bounded row groups
    pub fn default_properties() -> WriterProperties {
        Self::default_builder().build()
    }

    /// The default profile, open for overrides
    pub fn default_builder() -> WriterPropertiesBuilder {
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_statistics_enabled(EnabledStatistics::Chunk)
            .set_max_row_group_size(DEFAULT_MAX_ROW_GROUP_SIZE)
    }

    /// Create the output file (and its parent directory) for `schema`
    pub fn create<P: AsRef<Path>>(
        path: P,
        schema: SchemaRef,
        props: Option<WriterProperties>,
    ) -> Result<Self, WriterError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let props = props.unwrap_or_else(Self::default_properties);
        let inner = ArrowWriter::try_new(file, schema, Some(props))?;

        Ok(ParquetWriter {
            inner,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ColumnarWriter for ParquetWriter {
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        self.inner.write(batch)?;
        Ok(())
    }

    fn close(self) -> Result<(), WriterError> {
        let metadata = self.inner.close()?;
        debug!(
            path = %self.path.display(),
            rows = metadata.num_rows,
            row_groups = metadata.row_groups.len(),
            "closed parquet file"
        );
        Ok(())
    }
}

/// In-memory sink: batches are appended to a caller-owned vector.
///
/// Use it with [`records_from_reader`](crate::convert::records_from_reader)
/// when the batches are consumed directly instead of being written to a file.
impl ColumnarWriter for &mut Vec<RecordBatch> {
    fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        self.push(batch.clone());
        Ok(())
    }

    fn close(self) -> Result<(), WriterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.parquet");
        let batch = sample_batch();

        let mut writer = ParquetWriter::create(&path, batch.schema(), None).unwrap();
        writer.write_batch(&batch).unwrap();
        writer.write_batch(&batch).unwrap();
        writer.close().unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 6);
    }

    #[test]
    fn test_default_properties() {
        let props = ParquetWriter::default_properties();
        assert_eq!(props.max_row_group_size(), DEFAULT_MAX_ROW_GROUP_SIZE);
    }

    #[test]
    fn test_default_builder_keeps_profile_under_override() {
        let props = ParquetWriter::default_builder()
            .set_compression(Compression::UNCOMPRESSED)
            .build();
        let column = parquet::schema::types::ColumnPath::from("id");
        assert_eq!(props.compression(&column), Compression::UNCOMPRESSED);
        assert_eq!(props.statistics_enabled(&column), EnabledStatistics::Chunk);
        assert_eq!(props.max_row_group_size(), DEFAULT_MAX_ROW_GROUP_SIZE);
    }

    #[test]
    fn test_vec_sink_collects_batches() {
        let batch = sample_batch();
        let mut collected: Vec<RecordBatch> = Vec::new();
        let mut sink = &mut collected;
        sink.write_batch(&batch).unwrap();
        sink.write_batch(&batch).unwrap();
        sink.close().unwrap();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].num_rows(), 3);
    }
}
