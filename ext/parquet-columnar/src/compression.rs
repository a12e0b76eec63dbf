//! Block compression codecs and the registry that maps codec identifiers to
//! implementations.
//!
//! A registry is owned by each reader and writer. [`CompressorRegistry::default`]
//! holds the built-in codecs; others can be added with
//! [`CompressorRegistry::register`].

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use ahash::AHashMap;

use crate::basic::Compression;
use crate::{ErrorContext, ParquetError, Result};

/// Compresses and decompresses whole page bodies.
pub trait BlockCompressor: Send + Sync + fmt::Debug {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// `uncompressed_size` is the size recorded in the page header; codecs
    /// may use it to size their output buffer.
    fn decompress(&self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Uncompressed;

impl BlockCompressor for Uncompressed {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8], _uncompressed_size: usize) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

/// Raw (unframed) snappy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Snappy;

impl BlockCompressor for Snappy {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(input)
            .map_err(|e| ParquetError::internal(format!("snappy compression failed: {}", e)))
    }

    fn decompress(&self, input: &[u8], _uncompressed_size: usize) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(input)
            .map_err(|e| ParquetError::format(format!("invalid snappy block: {}", e)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    level: u32,
}

impl Gzip {
    pub fn new(level: u32) -> Self {
        Gzip {
            level: level.min(9),
        }
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Gzip::new(6)
    }
}

impl BlockCompressor for Gzip {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(self.level));
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(uncompressed_size);
        flate2::read::MultiGzDecoder::new(input)
            .read_to_end(&mut out)
            .map_err(|e| ParquetError::format(format!("invalid gzip block: {}", e)))?;
        Ok(out)
    }
}

#[cfg(feature = "zstd")]
#[derive(Debug, Clone, Copy)]
pub struct Zstd {
    level: i32,
}

#[cfg(feature = "zstd")]
impl Zstd {
    pub fn new(level: i32) -> Self {
        Zstd { level }
    }
}

#[cfg(feature = "zstd")]
impl Default for Zstd {
    fn default() -> Self {
        Zstd::new(1)
    }
}

#[cfg(feature = "zstd")]
impl BlockCompressor for Zstd {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::encode_all(input, self.level).context("zstd compression failed")
    }

    fn decompress(&self, input: &[u8], _uncompressed_size: usize) -> Result<Vec<u8>> {
        zstd::stream::decode_all(input)
            .map_err(|e| ParquetError::format(format!("invalid zstd block: {}", e)))
    }
}

/// Codec identifier to implementation map.
#[derive(Clone)]
pub struct CompressorRegistry {
    codecs: AHashMap<Compression, Arc<dyn BlockCompressor>>,
}

impl CompressorRegistry {
    /// A registry without any codec, not even UNCOMPRESSED.
    pub fn empty() -> Self {
        CompressorRegistry {
            codecs: AHashMap::new(),
        }
    }

    /// Adds or replaces the implementation for `codec`.
    pub fn register(&mut self, codec: Compression, compressor: Arc<dyn BlockCompressor>) {
        self.codecs.insert(codec, compressor);
    }

    pub fn with(mut self, codec: Compression, compressor: Arc<dyn BlockCompressor>) -> Self {
        self.register(codec, compressor);
        self
    }

    pub fn contains(&self, codec: Compression) -> bool {
        self.codecs.contains_key(&codec)
    }

    pub fn get(&self, codec: Compression) -> Result<&dyn BlockCompressor> {
        self.codecs
            .get(&codec)
            .map(|c| c.as_ref())
            .ok_or_else(|| ParquetError::unsupported(format!("no compressor registered for {}", codec)))
    }

    pub fn compress(&self, codec: Compression, input: &[u8]) -> Result<Vec<u8>> {
        self.get(codec)?.compress(input)
    }

    pub fn decompress(
        &self,
        codec: Compression,
        input: &[u8],
        uncompressed_size: usize,
    ) -> Result<Vec<u8>> {
        self.get(codec)?.decompress(input, uncompressed_size)
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        let registry = CompressorRegistry::empty()
            .with(Compression::Uncompressed, Arc::new(Uncompressed))
            .with(Compression::Snappy, Arc::new(Snappy))
            .with(Compression::Gzip, Arc::new(Gzip::default()));
        #[cfg(feature = "zstd")]
        let registry = registry.with(Compression::Zstd, Arc::new(Zstd::default()));
        registry
    }
}

impl fmt::Debug for CompressorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codecs: Vec<_> = self.codecs.keys().map(|c| c.as_i32()).collect();
        codecs.sort_unstable();
        f.debug_struct("CompressorRegistry")
            .field("codecs", &codecs)
            .finish()
    }
}
