//! Core Parquet writing functionality

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basic::{Compression, DataPageVersion, Encoding};
use crate::chunk::{self, ChunkOptions};
use crate::column::ColumnTree;
use crate::column_store::ColumnStore;
use crate::compression::CompressorRegistry;
use crate::encoding;
use crate::format::{self, FileMetaData, KeyValue, RowGroup};
use crate::record;
use crate::{ErrorContext, ParquetError, Result, Row, Schema};

pub(crate) const MAGIC: &[u8; 4] = b"PAR1";

// Default configuration constants
pub const DEFAULT_PAGE_SIZE: usize = 1024 * 1024; // 1MB
pub const DEFAULT_ROW_GROUP_SIZE: usize = 128 * 1024 * 1024; // 128MB
pub const DEFAULT_CREATED_BY: &str = concat!("parquet-columnar version ", env!("CARGO_PKG_VERSION"));

/// Settings that shape the written file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterProperties {
    pub compression: Compression,
    pub data_page_version: DataPageVersion,
    /// Estimated uncompressed bytes at which a data page is closed
    pub max_page_size: usize,
    /// Estimated buffered bytes at which a row group is flushed
    pub max_row_group_size: usize,
    pub dictionary_enabled: bool,
    /// Value encoding per dotted leaf path; such columns never use a dictionary
    pub column_encodings: BTreeMap<String, Encoding>,
    pub created_by: String,
    pub key_value_metadata: BTreeMap<String, String>,
}

impl Default for WriterProperties {
    fn default() -> Self {
        Self {
            compression: Compression::Snappy,
            data_page_version: DataPageVersion::V1,
            max_page_size: DEFAULT_PAGE_SIZE,
            max_row_group_size: DEFAULT_ROW_GROUP_SIZE,
            dictionary_enabled: true,
            column_encodings: BTreeMap::new(),
            created_by: DEFAULT_CREATED_BY.to_string(),
            key_value_metadata: BTreeMap::new(),
        }
    }
}

impl WriterProperties {
    /// Checks the settings against the schema's columns and the registry.
    pub fn validate(&self, tree: &ColumnTree, registry: &CompressorRegistry) -> Result<()> {
        if self.max_page_size == 0 {
            return Err(ParquetError::invalid_argument("max page size must be positive"));
        }
        if self.max_row_group_size == 0 {
            return Err(ParquetError::invalid_argument(
                "max row group size must be positive",
            ));
        }
        if !registry.contains(self.compression) {
            return Err(ParquetError::unsupported(format!(
                "no compressor registered for {}",
                self.compression
            )));
        }
        for (path, encoding) in &self.column_encodings {
            let leaf = tree
                .leaf_index(path)
                .and_then(|i| tree.leaf(i))
                .ok_or_else(|| {
                    ParquetError::invalid_argument(format!(
                        "encoding set for unknown column '{}'",
                        path
                    ))
                })?;
            if !encoding::supports(*encoding, leaf.physical_type) {
                return Err(ParquetError::unsupported(format!(
                    "{} encoding for {} column '{}'",
                    encoding, leaf.physical_type, path
                )));
            }
        }
        Ok(())
    }
}

/// Builder for creating a configured Writer
#[derive(Debug, Default)]
pub struct WriterBuilder {
    properties: WriterProperties,
    registry: Option<CompressorRegistry>,
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing properties
    pub fn with_properties(mut self, properties: WriterProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Set the compression algorithm
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.properties.compression = compression;
        self
    }

    pub fn with_page_size(mut self, bytes: usize) -> Self {
        self.properties.max_page_size = bytes;
        self
    }

    pub fn with_row_group_size(mut self, bytes: usize) -> Self {
        self.properties.max_row_group_size = bytes;
        self
    }

    pub fn with_data_page_version(mut self, version: DataPageVersion) -> Self {
        self.properties.data_page_version = version;
        self
    }

    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.properties.dictionary_enabled = enabled;
        self
    }

    /// Forces the value encoding of the leaf at `path`
    pub fn with_column_encoding<S: Into<String>>(mut self, path: S, encoding: Encoding) -> Self {
        self.properties.column_encodings.insert(path.into(), encoding);
        self
    }

    pub fn with_created_by<S: Into<String>>(mut self, created_by: S) -> Self {
        self.properties.created_by = created_by.into();
        self
    }

    /// Adds a key/value pair to the footer
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.properties
            .key_value_metadata
            .insert(key.into(), value.into());
        self
    }

    /// Replaces the built-in compressors
    pub fn with_registry(mut self, registry: CompressorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build a Writer with the configured settings
    pub fn build<W: Write + Send>(self, writer: W, schema: Schema) -> Result<Writer<W>> {
        let tree = ColumnTree::new(&schema)?;
        let registry = self.registry.unwrap_or_default();
        self.properties.validate(&tree, &registry)?;
        let stores = tree
            .leaves()
            .iter()
            .map(|leaf| ColumnStore::new(leaf.clone()))
            .collect::<Result<Vec<_>>>()?;

        let mut writer = writer;
        writer.write_all(MAGIC).context("writing file header")?;
        Ok(Writer {
            writer: Some(writer),
            position: MAGIC.len() as u64,
            schema,
            tree,
            stores,
            properties: self.properties,
            registry,
            row_groups: Vec::new(),
            buffered_rows: 0,
            total_rows: 0,
        })
    }
}

/// Core Parquet writer that works with any type implementing Write
pub struct Writer<W: Write> {
    /// `None` once closed
    writer: Option<W>,
    position: u64,
    schema: Schema,
    tree: ColumnTree,
    stores: Vec<ColumnStore>,
    properties: WriterProperties,
    registry: CompressorRegistry,
    row_groups: Vec<RowGroup>,
    buffered_rows: usize,
    total_rows: u64,
}

impl<W> Writer<W>
where
    W: Write + Send,
{
    /// Create a new writer with default settings
    pub fn new(writer: W, schema: Schema) -> Result<Self> {
        WriterBuilder::new().build(writer, schema)
    }

    /// Create a new writer with custom properties
    pub fn new_with_properties(writer: W, schema: Schema, props: WriterProperties) -> Result<Self> {
        WriterBuilder::new()
            .with_properties(props)
            .build(writer, schema)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn properties(&self) -> &WriterProperties {
        &self.properties
    }

    /// Rows accepted so far, flushed or not
    pub fn total_rows(&self) -> u64 {
        self.total_rows + self.buffered_rows as u64
    }

    /// Row groups written so far
    pub fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    /// Estimated bytes buffered for the current row group
    pub fn buffered_size(&self) -> usize {
        self.stores.iter().map(ColumnStore::estimated_size).sum()
    }

    /// Write a batch of rows to the Parquet file
    pub fn write_rows<I: IntoIterator<Item = Row>>(&mut self, rows: I) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Write a single row to the Parquet file
    ///
    /// The row is checked against the schema before anything is buffered,
    /// so a rejected row leaves the writer unchanged. The row group is
    /// flushed once its estimated size reaches the configured maximum.
    pub fn write_row(&mut self, row: Row) -> Result<()> {
        if self.writer.is_none() {
            return Err(ParquetError::invalid_argument("writer is closed"));
        }
        record::shred(&self.tree, &row, &mut self.stores)?;
        for store in &mut self.stores {
            store.end_record(self.properties.max_page_size);
        }
        self.buffered_rows += 1;

        if self.buffered_size() >= self.properties.max_row_group_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes buffered rows as a row group. Does nothing when no row is
    /// buffered.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffered_rows == 0 {
            return Ok(());
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ParquetError::invalid_argument("writer is closed"))?;

        let mut buf = Vec::new();
        let mut columns = Vec::with_capacity(self.stores.len());
        for store in &mut self.stores {
            let options = ChunkOptions {
                codec: self.properties.compression,
                page_version: self.properties.data_page_version,
                dictionary_enabled: self.properties.dictionary_enabled,
                encoding: self
                    .properties
                    .column_encodings
                    .get(&store.descriptor().dotted_path())
                    .copied(),
                registry: &self.registry,
            };
            columns.push(chunk::write_chunk(store, &options, self.position, &mut buf)?);
            store.reset();
        }

        let total_byte_size = columns
            .iter()
            .filter_map(|c| c.meta_data.as_ref())
            .map(|m| m.total_uncompressed_size)
            .sum();
        let ordinal = i16::try_from(self.row_groups.len()).ok();
        let row_group = RowGroup {
            columns,
            total_byte_size,
            num_rows: self.buffered_rows as i64,
            file_offset: Some(self.position as i64),
            total_compressed_size: Some(buf.len() as i64),
            ordinal,
        };

        writer
            .write_all(&buf)
            .with_context(|| format!("writing row group at offset {}", self.position))?;
        debug!(
            rows = self.buffered_rows,
            bytes = buf.len(),
            offset = self.position,
            "flushed row group"
        );
        self.position += buf.len() as u64;
        self.total_rows += self.buffered_rows as u64;
        self.buffered_rows = 0;
        self.row_groups.push(row_group);
        Ok(())
    }

    /// Flushes remaining rows, writes the footer and returns the sink.
    pub fn close(mut self) -> Result<W> {
        self.flush()?;
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| ParquetError::invalid_argument("writer is closed"))?;

        let key_value_metadata = if self.properties.key_value_metadata.is_empty() {
            None
        } else {
            Some(
                self.properties
                    .key_value_metadata
                    .iter()
                    .map(|(key, value)| KeyValue {
                        key: key.clone(),
                        value: Some(value.clone()),
                    })
                    .collect(),
            )
        };
        let metadata = FileMetaData {
            version: 1,
            schema: self.schema.to_elements(),
            num_rows: self.total_rows as i64,
            row_groups: std::mem::take(&mut self.row_groups),
            key_value_metadata,
            created_by: Some(self.properties.created_by.clone()),
        };

        let mut footer = Vec::new();
        format::write_record(&metadata, &mut footer)?;
        let footer_len = u32::try_from(footer.len())
            .map_err(|_| ParquetError::invalid_argument("footer exceeds 4 GiB"))?;
        footer.extend_from_slice(&footer_len.to_le_bytes());
        footer.extend_from_slice(MAGIC);
        writer.write_all(&footer).context("writing footer")?;
        writer.flush()?;
        debug!(
            row_groups = metadata.row_groups.len(),
            rows = metadata.num_rows,
            footer_bytes = footer_len,
            "wrote footer"
        );
        Ok(writer)
    }
}
