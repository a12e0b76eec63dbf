//! Columnar Parquet engine: nested records in, pages and column chunks out,
//! and back again.
//!
//! `parquet-columnar` implements the Parquet on-disk format without
//! depending on another Parquet implementation. Rows are exchanged as
//! [`Row`] maps of [`ParquetValue`]s; the crate shreds them into
//! per-column repetition/definition levels and values (the Dremel model),
//! encodes those streams, and frames them into pages, column chunks, row
//! groups and a footer.
//!
//! # Key Components
//!
//! - **Writer**: [`Writer`] buffers rows per leaf column and flushes a row
//!   group once its estimated size reaches the configured limit
//!   - Configured through [`WriterBuilder`] / [`WriterProperties`]
//!   - Dictionary or plain encoding chosen per column chunk
//!   - V1 and V2 data pages, pluggable compression
//!
//! - **Reader**: [`Reader`] loads one row group at a time and reassembles
//!   rows from the decoded columns
//!   - Column projection by leaf or group path
//!   - Optional ceiling on the memory decoded per row group
//!
//! - **Schema**: [`Schema`] / [`SchemaNode`] describe the record tree,
//!   including the canonical LIST and MAP shapes
//!   - Introspection through the [`traits::SchemaInspector`] trait
//!
//! - **Codecs**: bit packing, the RLE/bit-packed hybrid, delta binary
//!   packing, byte array and dictionary encodings live in [`encoding`]
//!
//! # Example Usage
//!
//! ```no_run
//! use std::io::Cursor;
//! use parquet_columnar::basic::{PhysicalType, Repetition};
//! use parquet_columnar::{ParquetValue, Reader, Row, SchemaBuilder, SchemaNode, Writer};
//!
//! # fn main() -> parquet_columnar::Result<()> {
//! let schema = SchemaBuilder::new()
//!     .with_field(SchemaNode::primitive("id", Repetition::Required, PhysicalType::Int64))
//!     .with_field(SchemaNode::string("name", Repetition::Optional))
//!     .build()?;
//!
//! let mut writer = Writer::new(Vec::new(), schema)?;
//! let mut row = Row::new();
//! row.insert("id".into(), ParquetValue::Int64(1));
//! row.insert("name".into(), ParquetValue::string("one"));
//! writer.write_row(row)?;
//! let bytes = writer.close()?;
//!
//! let mut reader = Reader::new(Cursor::new(bytes))?;
//! while let Some(row) = reader.next_row()? {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod basic;
pub mod chunk;
pub mod column;
pub mod column_store;
pub mod compression;
pub mod dict_store;
pub mod encoding;
pub mod error;
pub mod format;
pub mod memory;
pub mod packed_array;
pub mod page;
pub mod reader;
pub mod record;
pub mod schema;
pub mod traits;
pub mod value;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use basic::{
    Compression, ConvertedType, DataPageVersion, Encoding, LogicalType, PhysicalType, Repetition,
    TimeUnit,
};
pub use compression::{BlockCompressor, CompressorRegistry};
pub use error::{ErrorContext, ParquetError, Result};
pub use memory::MemoryBudget;
pub use reader::{Reader, ReaderBuilder, RowIterator};
pub use schema::{Schema, SchemaBuilder, SchemaNode};
pub use value::{ParquetValue, Row};
pub use writer::{Writer, WriterBuilder, WriterProperties};
