//! Error Module - MGC Error Types
//!
//! Defines all error types used by the managed heap.

use thiserror::Error;

/// Main error type for all heap operations
#[derive(Debug, Error)]
pub enum HeapError {
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Collection overflow in '{space}': {live} live bytes exceed {free} free bytes in the target")]
    CollectionOverflow {
        space: &'static str,
        live: usize,
        free: usize,
    },

    #[error("Invalid allocation size {0}: must be a positive multiple of the word size")]
    InvalidSize(usize),

    #[error("Address {address:#x} is not present in the {set} set")]
    AddressNotInSet {
        set: &'static str,
        address: usize,
    },

    #[error("Address {address:#x} does not lie in any heap space")]
    InvalidReference { address: usize },

    #[error("Memory mapping failed: {0}")]
    MappingFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl HeapError {
    /// Check if this error is recoverable by the caller
    ///
    /// `OutOfMemory` and `MappingFailed` come from the host allocator and a
    /// caller may retry after releasing memory. `CollectionOverflow` is fatal
    /// to the runtime: the live set no longer fits its target space.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HeapError::OutOfMemory { .. } | HeapError::MappingFailed(_)
        )
    }

    /// Check if this error indicates a bug in the embedding runtime
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            HeapError::AddressNotInSet { .. } | HeapError::InvalidReference { .. }
        )
    }
}

/// Result type alias for heap operations
pub type Result<T> = std::result::Result<T, HeapError>;
