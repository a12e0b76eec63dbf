//! Data page (V1 and V2) and dictionary page codecs.
//!
//! A V1 data page body is `[rep levels][def levels][values]`, each level
//! stream prefixed by its 4-byte little-endian length and omitted when the
//! column's maximum level is 0; the whole body is compressed as one block.
//! A V2 page stores the level streams uncompressed, without prefixes, with
//! their lengths in the header; only the values are compressed.

use tracing::trace;

use crate::basic::{Compression, DataPageVersion, Encoding, PageType};
use crate::column::LeafDescriptor;
use crate::compression::CompressorRegistry;
use crate::encoding::bitutil::{num_required_bits, ByteReader};
use crate::encoding::dictionary::decode_indices;
use crate::encoding::hybrid::HybridDecoder;
use crate::encoding::{self, plain};
use crate::format::{self, DataPageHeader, DataPageHeaderV2, DictionaryPageHeader, PageHeader};
use crate::memory::MemoryBudget;
use crate::{ErrorContext, ParquetError, ParquetValue, Result};

fn to_i32(n: usize, what: &str) -> Result<i32> {
    i32::try_from(n).map_err(|_| {
        ParquetError::invalid_argument(format!("{} of {} does not fit a page header", what, n))
    })
}

/// A page ready to be written: its header and its (compressed) body.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub header: PageHeader,
    pub body: Vec<u8>,
}

impl EncodedPage {
    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    /// Appends header and body to `out`, returning the header length.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<usize> {
        let start = out.len();
        format::write_record(&self.header, out)?;
        let header_len = out.len() - start;
        out.extend_from_slice(&self.body);
        Ok(header_len)
    }
}

/// Level and value streams of one data page, already encoded.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Level entries, nulls included.
    pub num_values: usize,
    pub num_rows: usize,
    pub null_count: usize,
    /// Hybrid streams without length prefix; empty when the maximum level is 0.
    pub rep_levels: Vec<u8>,
    pub def_levels: Vec<u8>,
    pub encoding: Encoding,
    pub values: Vec<u8>,
}

pub fn encode_data_page(
    version: DataPageVersion,
    content: PageContent,
    codec: Compression,
    registry: &CompressorRegistry,
) -> Result<EncodedPage> {
    match version {
        DataPageVersion::V1 => {
            let mut body = Vec::with_capacity(
                content.rep_levels.len() + content.def_levels.len() + content.values.len() + 8,
            );
            for levels in [&content.rep_levels, &content.def_levels] {
                if !levels.is_empty() {
                    body.extend_from_slice(&to_i32(levels.len(), "level stream")?.to_le_bytes());
                    body.extend_from_slice(levels);
                }
            }
            body.extend_from_slice(&content.values);
            let compressed = registry.compress(codec, &body)?;
            Ok(EncodedPage {
                header: PageHeader {
                    page_type: PageType::DataPage,
                    uncompressed_page_size: to_i32(body.len(), "page size")?,
                    compressed_page_size: to_i32(compressed.len(), "page size")?,
                    crc: None,
                    data_page_header: Some(DataPageHeader {
                        num_values: to_i32(content.num_values, "value count")?,
                        encoding: content.encoding,
                        definition_level_encoding: Encoding::Rle,
                        repetition_level_encoding: Encoding::Rle,
                        statistics: None,
                    }),
                    dictionary_page_header: None,
                    data_page_header_v2: None,
                },
                body: compressed,
            })
        }
        DataPageVersion::V2 => {
            let is_compressed = codec != Compression::Uncompressed;
            let values_len = content.values.len();
            let values = if is_compressed {
                registry.compress(codec, &content.values)?
            } else {
                content.values
            };
            let levels_len = content.rep_levels.len() + content.def_levels.len();
            let mut body = Vec::with_capacity(levels_len + values.len());
            body.extend_from_slice(&content.rep_levels);
            body.extend_from_slice(&content.def_levels);
            body.extend_from_slice(&values);
            Ok(EncodedPage {
                header: PageHeader {
                    page_type: PageType::DataPageV2,
                    uncompressed_page_size: to_i32(levels_len + values_len, "page size")?,
                    compressed_page_size: to_i32(body.len(), "page size")?,
                    crc: None,
                    data_page_header: None,
                    dictionary_page_header: None,
                    data_page_header_v2: Some(DataPageHeaderV2 {
                        num_values: to_i32(content.num_values, "value count")?,
                        num_nulls: to_i32(content.null_count, "null count")?,
                        num_rows: to_i32(content.num_rows, "row count")?,
                        encoding: content.encoding,
                        definition_levels_byte_length: to_i32(content.def_levels.len(), "level stream")?,
                        repetition_levels_byte_length: to_i32(content.rep_levels.len(), "level stream")?,
                        is_compressed: Some(is_compressed),
                        statistics: None,
                    }),
                },
                body,
            })
        }
    }
}

/// PLAIN encodes the distinct values of a chunk.
pub fn encode_dictionary_page(
    leaf: &LeafDescriptor,
    dictionary: &[ParquetValue],
    codec: Compression,
    registry: &CompressorRegistry,
) -> Result<EncodedPage> {
    let mut body = Vec::new();
    plain::encode(leaf.physical_type, leaf.type_length, dictionary, &mut body)?;
    let compressed = registry.compress(codec, &body)?;
    Ok(EncodedPage {
        header: PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: to_i32(body.len(), "page size")?,
            compressed_page_size: to_i32(compressed.len(), "page size")?,
            crc: None,
            data_page_header: None,
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: to_i32(dictionary.len(), "dictionary size")?,
                encoding: Encoding::Plain,
                is_sorted: Some(false),
            }),
            data_page_header_v2: None,
        },
        body: compressed,
    })
}

/// Levels and non-null values of one data page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    pub rep_levels: Vec<u8>,
    pub def_levels: Vec<u8>,
    pub values: Vec<ParquetValue>,
}

/// Shared state for decoding the pages of one chunk.
pub struct PageDecoder<'a> {
    pub leaf: &'a LeafDescriptor,
    pub codec: Compression,
    pub registry: &'a CompressorRegistry,
}

impl PageDecoder<'_> {
    fn decompress(
        &self,
        input: &[u8],
        uncompressed_size: usize,
        budget: &mut MemoryBudget,
    ) -> Result<Vec<u8>> {
        budget.reserve(uncompressed_size)?;
        let out = self
            .registry
            .decompress(self.codec, input, uncompressed_size)
            .with_context(|| format!("column '{}'", self.leaf.dotted_path()))?;
        if out.len() != uncompressed_size {
            return Err(ParquetError::format(format!(
                "page of column '{}' decompressed to {} bytes, header declares {}",
                self.leaf.dotted_path(),
                out.len(),
                uncompressed_size
            )));
        }
        Ok(out)
    }

    pub fn decode_dictionary_page(
        &self,
        header: &PageHeader,
        body: &[u8],
        budget: &mut MemoryBudget,
    ) -> Result<Vec<ParquetValue>> {
        let dict_header = header.dictionary_page_header.as_ref().ok_or_else(|| {
            ParquetError::format("dictionary page without dictionary_page_header")
        })?;
        if !matches!(dict_header.encoding, Encoding::Plain | Encoding::PlainDictionary) {
            return Err(ParquetError::format(format!(
                "dictionary page encoded as {}",
                dict_header.encoding
            )));
        }
        if dict_header.num_values < 0 {
            return Err(ParquetError::format(format!(
                "dictionary page declares {} values",
                dict_header.num_values
            )));
        }
        let size = non_negative(header.uncompressed_page_size, "uncompressed_page_size")?;
        let data = self.decompress(body, size, budget)?;
        let mut reader = ByteReader::new(&data);
        plain::decode(
            self.leaf.physical_type,
            self.leaf.type_length,
            &mut reader,
            dict_header.num_values as usize,
        )
        .with_context(|| format!("dictionary page of column '{}'", self.leaf.dotted_path()))
    }

    pub fn decode_data_page(
        &self,
        header: &PageHeader,
        body: &[u8],
        dictionary: Option<&[ParquetValue]>,
        budget: &mut MemoryBudget,
    ) -> Result<DecodedPage> {
        match header.page_type {
            PageType::DataPage => self.decode_v1(header, body, dictionary, budget),
            PageType::DataPageV2 => self.decode_v2(header, body, dictionary, budget),
            other => Err(ParquetError::format(format!(
                "expected a data page, found {}",
                other
            ))),
        }
    }

    fn decode_v1(
        &self,
        header: &PageHeader,
        body: &[u8],
        dictionary: Option<&[ParquetValue]>,
        budget: &mut MemoryBudget,
    ) -> Result<DecodedPage> {
        let page = header
            .data_page_header
            .as_ref()
            .ok_or_else(|| ParquetError::format("data page without data_page_header"))?;
        let num_values = non_negative(page.num_values, "num_values")?;
        for level_encoding in [page.repetition_level_encoding, page.definition_level_encoding] {
            if level_encoding != Encoding::Rle {
                return Err(ParquetError::unsupported(format!(
                    "{} level encoding",
                    level_encoding
                )));
            }
        }

        let size = non_negative(header.uncompressed_page_size, "uncompressed_page_size")?;
        let data = self.decompress(body, size, budget)?;
        let mut reader = ByteReader::new(&data);
        let mut prefixed = |max_level: u8| -> Result<Vec<u8>> {
            if max_level == 0 {
                return Ok(vec![0; num_values]);
            }
            let len = reader.read_u32_le()? as usize;
            decode_levels(reader.read_bytes(len)?, max_level, num_values)
        };
        let rep_levels = prefixed(self.leaf.max_rep_level)?;
        let def_levels = prefixed(self.leaf.max_def_level)?;
        let values = self.decode_values(page.encoding, reader.rest(), &def_levels, dictionary)?;
        trace!(
            column = %self.leaf.dotted_path(),
            num_values,
            encoding = %page.encoding,
            "decoded data page"
        );
        Ok(DecodedPage {
            rep_levels,
            def_levels,
            values,
        })
    }

    fn decode_v2(
        &self,
        header: &PageHeader,
        body: &[u8],
        dictionary: Option<&[ParquetValue]>,
        budget: &mut MemoryBudget,
    ) -> Result<DecodedPage> {
        let page = header
            .data_page_header_v2
            .as_ref()
            .ok_or_else(|| ParquetError::format("data page without data_page_header_v2"))?;
        let num_values = non_negative(page.num_values, "num_values")?;
        let rep_len = non_negative(page.repetition_levels_byte_length, "repetition_levels_byte_length")?;
        let def_len = non_negative(page.definition_levels_byte_length, "definition_levels_byte_length")?;
        let levels_len = rep_len + def_len;
        let uncompressed = non_negative(header.uncompressed_page_size, "uncompressed_page_size")?;
        if levels_len > body.len() || levels_len > uncompressed {
            return Err(ParquetError::format(format!(
                "level streams of {} bytes exceed the page",
                levels_len
            )));
        }

        let level_stream = |data: &[u8], max_level: u8| -> Result<Vec<u8>> {
            if max_level == 0 {
                Ok(vec![0; num_values])
            } else {
                decode_levels(data, max_level, num_values)
            }
        };
        let rep_levels = level_stream(&body[..rep_len], self.leaf.max_rep_level)?;
        let def_levels = level_stream(&body[rep_len..levels_len], self.leaf.max_def_level)?;

        let values_data = &body[levels_len..];
        let decompressed;
        let values_data = if page.is_compressed.unwrap_or(true) && self.codec != Compression::Uncompressed {
            decompressed = self.decompress(values_data, uncompressed - levels_len, budget)?;
            &decompressed[..]
        } else {
            budget.reserve(values_data.len())?;
            values_data
        };
        let values = self.decode_values(page.encoding, values_data, &def_levels, dictionary)?;
        if page.num_nulls >= 0 && page.num_nulls as usize != num_values - values.len() {
            return Err(ParquetError::format(format!(
                "data page declares {} nulls, levels hold {}",
                page.num_nulls,
                num_values - values.len()
            )));
        }
        Ok(DecodedPage {
            rep_levels,
            def_levels,
            values,
        })
    }

    fn decode_values(
        &self,
        encoding: Encoding,
        data: &[u8],
        def_levels: &[u8],
        dictionary: Option<&[ParquetValue]>,
    ) -> Result<Vec<ParquetValue>> {
        let max_def = self.leaf.max_def_level;
        let count = def_levels.iter().filter(|&&d| d == max_def).count();
        let context = || format!("{} values of column '{}'", encoding, self.leaf.dotted_path());
        if encoding.is_dictionary() {
            let dictionary = dictionary.ok_or_else(|| {
                ParquetError::format(format!(
                    "column '{}' has dictionary encoded data but no dictionary page",
                    self.leaf.dotted_path()
                ))
            })?;
            let indices = decode_indices(data, count, dictionary.len())
                .with_context(context)?;
            indices
                .into_iter()
                .map(|i| {
                    dictionary.get(i as usize).cloned().ok_or_else(|| {
                        ParquetError::format(format!(
                            "dictionary index {} out of range for {} entries",
                            i,
                            dictionary.len()
                        ))
                    })
                })
                .collect()
        } else {
            encoding::decode_values(
                encoding,
                self.leaf.physical_type,
                self.leaf.type_length,
                data,
                count,
            )
            .with_context(context)
        }
    }
}

fn non_negative(n: i32, field: &str) -> Result<usize> {
    usize::try_from(n)
        .map_err(|_| ParquetError::format(format!("page header {} is negative: {}", field, n)))
}

/// Hybrid-encodes levels with the width implied by `max_level`.
pub fn encode_levels<I: IntoIterator<Item = u32>>(levels: I, max_level: u8) -> Result<Vec<u8>> {
    if max_level == 0 {
        return Ok(Vec::new());
    }
    crate::encoding::hybrid::encode(num_required_bits(max_level as u64), levels)
}

fn decode_levels(data: &[u8], max_level: u8, count: usize) -> Result<Vec<u8>> {
    let width = num_required_bits(max_level as u64);
    let levels = HybridDecoder::new(data, width)?.decode(count)?;
    levels
        .into_iter()
        .map(|l| {
            if l > max_level as u32 {
                Err(ParquetError::format(format!(
                    "level {} exceeds the maximum {}",
                    l, max_level
                )))
            } else {
                Ok(l as u8)
            }
        })
        .collect()
}
