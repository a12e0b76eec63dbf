//! Column chunk writing and reading.

use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::basic::{Compression, DataPageVersion, Encoding, PageType};
use crate::column::LeafDescriptor;
use crate::column_store::{ColumnData, ColumnStore};
use crate::compression::CompressorRegistry;
use crate::encoding::{self, dictionary};
use crate::format::{self, ColumnChunk, ColumnMetaData, PageHeader};
use crate::memory::MemoryBudget;
use crate::page::{self, EncodedPage, PageContent, PageDecoder};
use crate::{ErrorContext, ParquetError, Result};

/// How the pages of a chunk are written.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions<'a> {
    pub codec: Compression,
    pub page_version: DataPageVersion,
    pub dictionary_enabled: bool,
    /// Value encoding of non-dictionary pages. An explicit encoding also
    /// disables the dictionary for the column.
    pub encoding: Option<Encoding>,
    pub registry: &'a CompressorRegistry,
}

/// Encodes everything buffered in `store` as one column chunk, appending
/// the bytes to `out`. `base_offset` is the file offset of `out[0]`.
pub fn write_chunk(
    store: &mut ColumnStore,
    options: &ChunkOptions<'_>,
    base_offset: u64,
    out: &mut Vec<u8>,
) -> Result<ColumnChunk> {
    let pages = store.finish_pages().to_vec();
    let leaf = store.descriptor().clone();
    let use_dictionary =
        options.dictionary_enabled && options.encoding.is_none() && store.prefers_dictionary();
    let value_encoding = if use_dictionary {
        Encoding::RleDictionary
    } else {
        options.encoding.unwrap_or(Encoding::Plain)
    };

    let chunk_start = out.len();
    let offset_of = |pos: usize| (base_offset + pos as u64) as i64;
    let mut compressed_size = 0usize;
    let mut uncompressed_size = 0usize;
    let mut append = |page: &EncodedPage, out: &mut Vec<u8>| -> Result<usize> {
        let start = out.len();
        let header_len = page.write_to(out)?;
        compressed_size += header_len + page.body.len();
        uncompressed_size += header_len + page.header.uncompressed_page_size as usize;
        Ok(start)
    };

    let mut dictionary_page_offset = None;
    if use_dictionary {
        let dict_page = page::encode_dictionary_page(
            &leaf,
            store.values().dictionary(),
            options.codec,
            options.registry,
        )?;
        dictionary_page_offset = Some(offset_of(append(&dict_page, out)?));
    }

    let mut data_page_offset = None;
    for bounds in &pages {
        let rep_levels = if leaf.max_rep_level > 0 {
            store.rep_levels().encode_range(bounds.levels.clone())?
        } else {
            Vec::new()
        };
        let def_levels = if leaf.max_def_level > 0 {
            store.def_levels().encode_range(bounds.levels.clone())?
        } else {
            Vec::new()
        };
        let values = if use_dictionary {
            let codes = store
                .values()
                .codes()
                .get(bounds.values.clone())
                .ok_or_else(|| ParquetError::internal("page value range out of bounds"))?;
            dictionary::encode_indices(codes, store.values().distinct_count())?
        } else {
            let mut encoded = Vec::new();
            encoding::encode_values(
                value_encoding,
                leaf.physical_type,
                leaf.type_length,
                &store.values().values_in(bounds.values.clone()),
                &mut encoded,
            )
            .with_context(|| format!("column '{}'", leaf.dotted_path()))?;
            encoded
        };
        let content = PageContent {
            num_values: bounds.num_values(),
            num_rows: bounds.num_rows,
            null_count: bounds.null_count(),
            rep_levels,
            def_levels,
            encoding: value_encoding,
            values,
        };
        let encoded = page::encode_data_page(options.page_version, content, options.codec, options.registry)?;
        let start = append(&encoded, out)?;
        data_page_offset.get_or_insert(offset_of(start));
    }

    let data_page_offset = data_page_offset.ok_or_else(|| {
        ParquetError::internal(format!("column '{}' has no data pages", leaf.dotted_path()))
    })?;
    let mut encodings = vec![value_encoding, Encoding::Rle];
    if use_dictionary {
        encodings.push(Encoding::Plain);
    }
    encodings.sort();
    encodings.dedup();

    let mut statistics = store.statistics().clone();
    statistics.distinct_count = Some(store.values().distinct_count() as u64);

    debug!(
        column = %leaf.dotted_path(),
        pages = pages.len(),
        dictionary = use_dictionary,
        compressed_size,
        uncompressed_size,
        "wrote column chunk"
    );

    let meta = ColumnMetaData {
        physical_type: leaf.physical_type,
        encodings,
        path_in_schema: leaf.path.clone(),
        codec: options.codec,
        num_values: store.num_values() as i64,
        total_uncompressed_size: uncompressed_size as i64,
        total_compressed_size: compressed_size as i64,
        key_value_metadata: None,
        data_page_offset,
        index_page_offset: None,
        dictionary_page_offset,
        statistics: Some(statistics.to_thrift()),
    };
    Ok(ColumnChunk {
        file_path: None,
        file_offset: offset_of(chunk_start),
        meta_data: Some(meta),
    })
}

/// Page reader states for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    ExpectDictionaryOrData,
    ReadingData,
    Done,
}

/// Reads and decodes every page of one column chunk.
///
/// The chunk's compressed bytes are read in one piece and charged to
/// `budget`, as is every decompressed page.
pub fn read_chunk<R: Read + Seek>(
    reader: &mut R,
    chunk: &ColumnChunk,
    leaf: &LeafDescriptor,
    registry: &CompressorRegistry,
    budget: &mut MemoryBudget,
) -> Result<ColumnData> {
    let path = leaf.dotted_path();
    let meta = chunk
        .meta_data
        .as_ref()
        .ok_or_else(|| ParquetError::format(format!("column chunk '{}' has no metadata", path)))?;
    if meta.physical_type != leaf.physical_type || meta.path_in_schema != leaf.path {
        return Err(ParquetError::format(format!(
            "column chunk {} '{}' does not match schema column {} '{}'",
            meta.physical_type,
            meta.path_in_schema.join("."),
            leaf.physical_type,
            path
        )));
    }
    if chunk.file_path.is_some() {
        return Err(ParquetError::unsupported(format!(
            "column chunk '{}' is stored in another file",
            path
        )));
    }
    let data_offset = offset(meta.data_page_offset, "data_page_offset")?;
    let start = match meta.dictionary_page_offset {
        Some(dict) if dict > 0 && (dict as u64) < data_offset => dict as u64,
        _ => data_offset,
    };
    let total = usize::try_from(meta.total_compressed_size).map_err(|_| {
        ParquetError::format(format!(
            "column chunk '{}' declares {} bytes",
            path, meta.total_compressed_size
        ))
    })?;
    let num_values = usize::try_from(meta.num_values)
        .map_err(|_| ParquetError::format(format!("column chunk '{}' declares {} values", path, meta.num_values)))?;

    let file_len = reader.seek(SeekFrom::End(0))?;
    if start
        .checked_add(total as u64)
        .is_none_or(|end| end > file_len)
    {
        return Err(ParquetError::format(format!(
            "column chunk '{}' spans {} bytes at offset {}, past the end of the {} byte file",
            path, total, start, file_len
        )));
    }

    budget.reserve(total)?;
    let mut buf = vec![0u8; total];
    reader.seek(SeekFrom::Start(start))?;
    reader
        .read_exact(&mut buf)
        .with_context(|| format!("reading column chunk '{}' at offset {}", path, start))?;

    let decoder = PageDecoder {
        leaf,
        codec: meta.codec,
        registry,
    };
    let mut data = ColumnData::new(leaf);
    let mut dictionary = None;
    let mut state = ChunkState::ExpectDictionaryOrData;
    let mut pos = 0usize;
    let mut pages = 0usize;

    while state != ChunkState::Done {
        if pos >= buf.len() {
            state = ChunkState::Done;
            continue;
        }
        let (header, header_len) = format::read_record::<PageHeader>(&buf[pos..])
            .with_context(|| format!("page header of column '{}' at chunk offset {}", path, pos))?;
        let body_start = pos + header_len;
        let body_end = usize::try_from(header.compressed_page_size)
            .ok()
            .and_then(|size| body_start.checked_add(size));
        let body = body_end.and_then(|end| buf.get(body_start..end)).ok_or_else(|| {
            ParquetError::format(format!(
                "page of column '{}' runs past the end of its chunk",
                path
            ))
        })?;
        let body_end = body_start + body.len();
        trace!(column = %path, page_type = %header.page_type, offset = start + pos as u64, "page");

        match (state, header.page_type) {
            (ChunkState::ExpectDictionaryOrData, PageType::DictionaryPage) => {
                dictionary = Some(decoder.decode_dictionary_page(&header, body, budget)?);
                state = ChunkState::ReadingData;
                pos = body_end;
                // The first data page may not follow the dictionary directly.
                let data_pos = (data_offset - start) as usize;
                if data_pos > pos && data_pos < buf.len() {
                    pos = data_pos;
                }
                continue;
            }
            (_, PageType::DictionaryPage) => {
                return Err(ParquetError::format(format!(
                    "column chunk '{}' has a second dictionary page",
                    path
                )))
            }
            (_, PageType::DataPage) | (_, PageType::DataPageV2) => {
                let page = decoder.decode_data_page(&header, body, dictionary.as_deref(), budget)?;
                data.push_page(page.rep_levels, page.def_levels, page.values)
                    .with_context(|| format!("column '{}'", path))?;
                state = ChunkState::ReadingData;
                pages += 1;
            }
            (_, PageType::IndexPage) => {
                return Err(ParquetError::format(format!(
                    "unexpected index page in column chunk '{}'",
                    path
                )))
            }
        }
        pos = body_end;
    }

    if data.len() != num_values {
        return Err(ParquetError::format(format!(
            "column chunk '{}' declares {} values, pages hold {}",
            path,
            num_values,
            data.len()
        )));
    }
    debug!(column = %path, offset = start, pages, values = num_values, "read column chunk");
    Ok(data)
}

fn offset(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| ParquetError::format(format!("negative {}: {}", field, value)))
}
