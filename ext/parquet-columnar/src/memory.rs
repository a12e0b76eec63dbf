use tracing::trace;

use crate::{ParquetError, Result};

/// Tracks bytes decoded for the row group currently loaded by a reader.
///
/// Every chunk read and page decompression reserves its size up front; when
/// a ceiling is configured and a reservation would cross it, the reservation
/// fails with [`ParquetError::ResourceExhausted`] and nothing is recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryBudget {
    ceiling: Option<usize>,
    used: usize,
}

impl MemoryBudget {
    pub fn new(ceiling: Option<usize>) -> Self {
        MemoryBudget {
            ceiling,
            used: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn ceiling(&self) -> Option<usize> {
        self.ceiling
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn reserve(&mut self, bytes: usize) -> Result<()> {
        let next = self.used.saturating_add(bytes);
        if let Some(ceiling) = self.ceiling {
            if next > ceiling {
                return Err(ParquetError::ResourceExhausted {
                    requested: bytes,
                    used: self.used,
                    ceiling,
                });
            }
        }
        self.used = next;
        trace!(bytes, used = self.used, "reserved decode memory");
        Ok(())
    }

    /// Drops all reservations, done when a new row group is loaded.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}
