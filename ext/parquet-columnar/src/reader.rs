//! Core Parquet reading functionality

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::chunk;
use crate::column::ColumnTree;
use crate::column_store::{ColumnData, ColumnStatistics};
use crate::compression::CompressorRegistry;
use crate::format::{self, ColumnMetaData, FileMetaData, KeyValue};
use crate::memory::MemoryBudget;
use crate::record::RecordAssembler;
use crate::writer::MAGIC;
use crate::{ErrorContext, ParquetError, Result, Row, Schema};

/// Footer length plus trailing magic
const FOOTER_TAIL: u64 = 8;

/// Builder for creating a configured Reader
#[derive(Debug, Default)]
pub struct ReaderBuilder {
    projection: Option<Vec<String>>,
    memory_ceiling: Option<usize>,
    registry: Option<CompressorRegistry>,
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only reads the named columns. A name selects a leaf by its dotted
    /// path, or every leaf below a group.
    pub fn with_projection<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Caps the bytes decoded for one row group.
    pub fn with_memory_ceiling(mut self, bytes: usize) -> Self {
        self.memory_ceiling = Some(bytes);
        self
    }

    /// Replaces the built-in compressors
    pub fn with_registry(mut self, registry: CompressorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reads the footer and prepares row iteration
    pub fn build<R: Read + Seek>(self, mut reader: R) -> Result<Reader<R>> {
        let metadata = read_footer(&mut reader)?;
        let schema = Schema::from_elements(&metadata.schema)?;
        let mut tree = ColumnTree::new(&schema)?;
        if let Some(columns) = &self.projection {
            tree.project(columns)?;
        }
        for (i, row_group) in metadata.row_groups.iter().enumerate() {
            if row_group.columns.len() != tree.leaf_count() {
                return Err(ParquetError::format(format!(
                    "row group {} has {} column chunks for {} leaf columns",
                    i,
                    row_group.columns.len(),
                    tree.leaf_count()
                )));
            }
            if row_group.num_rows < 0 {
                return Err(ParquetError::format(format!(
                    "row group {} declares {} rows",
                    i, row_group.num_rows
                )));
            }
        }
        debug!(
            row_groups = metadata.row_groups.len(),
            rows = metadata.num_rows,
            columns = tree.leaf_count(),
            "read footer"
        );
        Ok(Reader {
            inner: reader,
            metadata,
            schema,
            tree,
            registry: self.registry.unwrap_or_default(),
            budget: MemoryBudget::new(self.memory_ceiling),
            next_group: 0,
            current: None,
        })
    }
}

fn read_footer<R: Read + Seek>(reader: &mut R) -> Result<FileMetaData> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    if file_len < MAGIC.len() as u64 + FOOTER_TAIL {
        return Err(ParquetError::format(format!(
            "file of {} bytes is too small to be parquet",
            file_len
        )));
    }

    let mut head = [0u8; 4];
    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut head).context("reading file header")?;
    if &head != MAGIC {
        return Err(ParquetError::format("file does not start with PAR1"));
    }

    let mut tail = [0u8; FOOTER_TAIL as usize];
    reader.seek(SeekFrom::Start(file_len - FOOTER_TAIL))?;
    reader.read_exact(&mut tail).context("reading footer length")?;
    if &tail[4..] != MAGIC {
        return Err(ParquetError::format("file does not end with PAR1"));
    }
    let footer_len = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]) as u64;
    if footer_len + FOOTER_TAIL + MAGIC.len() as u64 > file_len {
        return Err(ParquetError::format(format!(
            "footer of {} bytes does not fit a {} byte file",
            footer_len, file_len
        )));
    }

    let mut footer = vec![0u8; footer_len as usize];
    reader.seek(SeekFrom::Start(file_len - FOOTER_TAIL - footer_len))?;
    reader.read_exact(&mut footer).context("reading footer")?;
    let (metadata, _) = format::read_record::<FileMetaData>(&footer).context("decoding footer")?;
    Ok(metadata)
}

/// Core Parquet reader that works with any source implementing Read + Seek
///
/// Row groups are loaded one at a time; every column chunk of the loaded
/// group is decoded up front and released when the next group is loaded.
pub struct Reader<R> {
    inner: R,
    metadata: FileMetaData,
    schema: Schema,
    tree: ColumnTree,
    registry: CompressorRegistry,
    budget: MemoryBudget,
    /// Next row group to load
    next_group: usize,
    /// Loaded row group and its assembly state
    current: Option<(usize, RecordAssembler)>,
}

impl<R: Read + Seek> Reader<R> {
    /// Create a new reader with default settings
    pub fn new(reader: R) -> Result<Self> {
        ReaderBuilder::new().build(reader)
    }

    /// Get the Parquet file metadata
    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn num_rows(&self) -> u64 {
        self.metadata.num_rows.max(0) as u64
    }

    pub fn row_group_count(&self) -> usize {
        self.metadata.row_groups.len()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.metadata.created_by.as_deref()
    }

    pub fn key_value_metadata(&self) -> &[KeyValue] {
        self.metadata.key_value_metadata.as_deref().unwrap_or_default()
    }

    /// Looks up one footer key/value entry.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.key_value_metadata()
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_deref())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Column tree with the projection applied.
    pub fn columns(&self) -> &ColumnTree {
        &self.tree
    }

    /// Metadata of the chunk holding leaf `path` in `row_group`.
    pub fn column_chunk_metadata(&self, row_group: usize, path: &str) -> Result<&ColumnMetaData> {
        let group = self.metadata.row_groups.get(row_group).ok_or_else(|| {
            ParquetError::invalid_argument(format!(
                "row group {} out of range, file has {}",
                row_group,
                self.row_group_count()
            ))
        })?;
        let leaf = self.tree.leaf_index(path).ok_or_else(|| {
            ParquetError::invalid_argument(format!("column '{}' is not in the schema", path))
        })?;
        group
            .columns
            .get(leaf)
            .and_then(|c| c.meta_data.as_ref())
            .ok_or_else(|| ParquetError::format(format!("column chunk '{}' has no metadata", path)))
    }

    /// Decoded statistics of a column chunk, if the writer stored any.
    pub fn column_statistics(&self, row_group: usize, path: &str) -> Result<Option<ColumnStatistics>> {
        let meta = self.column_chunk_metadata(row_group, path)?;
        meta.statistics
            .as_ref()
            .map(|s| ColumnStatistics::from_thrift(s, meta.physical_type))
            .transpose()
    }

    /// Index of the row group rows are currently read from.
    pub fn current_row_group(&self) -> Option<usize> {
        self.current.as_ref().map(|(i, _)| *i)
    }

    /// Bytes charged to the memory budget for the loaded row group.
    pub fn memory_used(&self) -> usize {
        self.budget.used()
    }

    /// Next row, loading the following row group when the current one is
    /// exhausted. `Ok(None)` marks the end of the file.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some((_, assembler)) = &mut self.current {
                if let Some(row) = assembler.next_record(&self.tree)? {
                    return Ok(Some(row));
                }
                self.current = None;
            }
            if self.next_group >= self.row_group_count() {
                return Ok(None);
            }
            self.load_row_group(self.next_group)?;
        }
    }

    /// Read rows from the Parquet file
    ///
    /// Returns an iterator over the remaining rows
    pub fn read_rows(&mut self) -> RowIterator<'_, R> {
        RowIterator {
            reader: self,
            failed: false,
        }
    }

    /// Reads every row of row group `index`. Iteration continues with the
    /// row group after it.
    pub fn read_row_group(&mut self, index: usize) -> Result<Vec<Row>> {
        if index >= self.row_group_count() {
            return Err(ParquetError::invalid_argument(format!(
                "row group {} out of range, file has {}",
                index,
                self.row_group_count()
            )));
        }
        self.load_row_group(index)?;
        let mut rows = Vec::new();
        if let Some((_, assembler)) = &mut self.current {
            while let Some(row) = assembler.next_record(&self.tree)? {
                rows.push(row);
            }
        }
        self.current = None;
        Ok(rows)
    }

    /// Skips the rest of the current row group, or the next one when none
    /// is loaded. Returns false at the end of the file.
    pub fn skip_row_group(&mut self) -> bool {
        if self.current.take().is_some() {
            return true;
        }
        if self.next_group < self.row_group_count() {
            self.next_group += 1;
            return true;
        }
        false
    }

    fn load_row_group(&mut self, index: usize) -> Result<()> {
        self.current = None;
        self.budget.reset();
        let group = self.metadata.row_groups.get(index).ok_or_else(|| {
            ParquetError::invalid_argument(format!("row group {} out of range", index))
        })?;
        let mut columns = Vec::with_capacity(self.tree.leaf_count());
        for (i, leaf) in self.tree.leaves().iter().enumerate() {
            if !self.tree.is_selected(i) {
                columns.push(ColumnData::new(leaf));
                continue;
            }
            let column = group.columns.get(i).ok_or_else(|| {
                ParquetError::format(format!("row group {} lacks column chunk {}", index, i))
            })?;
            let data = chunk::read_chunk(
                &mut self.inner,
                column,
                leaf,
                &self.registry,
                &mut self.budget,
            )
            .with_context(|| format!("row group {}", index))?;
            columns.push(data);
        }
        debug!(
            row_group = index,
            rows = group.num_rows,
            memory = self.budget.used(),
            "loaded row group"
        );
        let assembler = RecordAssembler::new(&self.tree, columns, group.num_rows as usize)?;
        self.current = Some((index, assembler));
        self.next_group = index + 1;
        Ok(())
    }
}

/// Iterator over rows, yielding errors in place of rows
pub struct RowIterator<'a, R> {
    reader: &'a mut Reader<R>,
    failed: bool,
}

impl<R: Read + Seek> Iterator for RowIterator<'_, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_row() {
            Ok(row) => row.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
