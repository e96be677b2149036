//! Memory Mapping - Anonymous Mappings for Space Buffers
//!
//! Thin wrapper over memmap2. Each space owns one fixed-capacity anonymous
//! mapping for its whole lifetime; the mapping's base address never changes,
//! which is what makes segment-containment tests the sole means of
//! identifying an address's owning space.

use crate::error::{HeapError, Result};
use memmap2::{MmapMut, MmapOptions};

/// A fixed anonymous memory mapping
pub struct MemoryMapping {
    mmap: MmapMut,
    base: usize,
}

impl MemoryMapping {
    /// Create an anonymous mapping of exactly `size` bytes
    ///
    /// Memory is zero-initialized by the OS.
    pub fn anonymous(size: usize) -> Result<Self> {
        let mmap = MmapOptions::new().len(size).map_anon().map_err(|e| {
            HeapError::MappingFailed(format!("anonymous mapping of {size} bytes: {e}"))
        })?;

        let base = mmap.as_ptr() as usize;

        Ok(Self { mmap, base })
    }

    /// Base address of the mapping
    pub fn base(&self) -> usize {
        self.base
    }

    /// Length of the mapping in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// One past the last byte of the mapping
    pub fn end(&self) -> usize {
        self.base + self.mmap.len()
    }

    /// Whether `address` lies inside the mapping
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end()
    }
}

impl std::fmt::Debug for MemoryMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMapping")
            .field("base", &format_args!("{:#x}", self.base))
            .field("len", &self.mmap.len())
            .finish()
    }
}
