//! Configuration Module - Heap Sizing Parameters
//!
//! Manages all configuration parameters for the managed heap. The defaults
//! match the canonical generation shape: a small eden where allocations
//! land, two identical semi-spaces for the middle generation, and a larger
//! tenured old space.

use crate::error::{HeapError, Result};
use crate::util::alignment::{is_word_aligned, WORD};

const KB: usize = 1024;
const MB: usize = 1024 * 1024;

/// Main configuration for the Mica managed heap
///
/// # Examples
///
/// ```rust
/// use mgc::HeapConfig;
///
/// // Default configuration
/// let config = HeapConfig::default();
///
/// // Small heap for an embedded tool
/// let config = HeapConfig {
///     eden_size: 64 * 1024,
///     semi_space_size: 256 * 1024,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Eden capacity in bytes
    ///
    /// All allocations land in eden. A full eden tenures its survivors into
    /// from-space.
    ///
    /// Default: 1MB
    pub eden_size: usize,

    /// Capacity of each semi-space (from-space and to-space) in bytes
    ///
    /// The two semi-spaces must have identical capacity; a scavenge copies
    /// the live set between them and swaps.
    ///
    /// Default: 4MB
    pub semi_space_size: usize,

    /// Initial old-space capacity in bytes
    ///
    /// Objects that survive repeated scavenges tenure here. Old space is not
    /// collected; growth is deferred.
    ///
    /// Default: 16MB
    pub old_size: usize,

    /// Enable verbose GC logging
    ///
    /// Emits collection events through the global logger.
    /// Default: false
    pub verbose: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            eden_size: MB,
            semi_space_size: 4 * MB,
            old_size: 16 * MB,
            verbose: false,
        }
    }
}

impl HeapConfig {
    /// Validate configuration
    ///
    /// Checks that all capacities are positive multiples of the machine
    /// word. Returns an error describing the first violation found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mgc::HeapConfig;
    ///
    /// let config = HeapConfig {
    ///     eden_size: 0, // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("eden_size", self.eden_size),
            ("semi_space_size", self.semi_space_size),
            ("old_size", self.old_size),
        ] {
            if size == 0 {
                return Err(HeapError::Configuration(format!("{name} must be > 0")));
            }
            if !is_word_aligned(size) {
                return Err(HeapError::Configuration(format!(
                    "{name} ({size}) must be a multiple of the word size ({WORD})"
                )));
            }
        }

        if self.eden_size > self.semi_space_size {
            return Err(HeapError::Configuration(
                "eden_size cannot exceed semi_space_size: a full eden must fit its tenure target"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - MGC_EDEN_SIZE
    /// - MGC_SEMI_SPACE_SIZE
    /// - MGC_OLD_SIZE
    /// - MGC_VERBOSE
    ///
    /// # Examples
    ///
    /// ```bash
    /// export MGC_EDEN_SIZE=2097152     # 2MB
    /// export MGC_VERBOSE=1
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MGC_EDEN_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.eden_size = size;
            }
        }

        if let Ok(val) = std::env::var("MGC_SEMI_SPACE_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.semi_space_size = size;
            }
        }

        if let Ok(val) = std::env::var("MGC_OLD_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.old_size = size;
            }
        }

        if let Ok(val) = std::env::var("MGC_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Total mapped capacity across all four spaces
    pub fn total_capacity(&self) -> usize {
        self.eden_size + 2 * self.semi_space_size + self.old_size
    }

    /// Small configuration for tests (a few KB per space)
    pub fn small_for_tests() -> Self {
        HeapConfig {
            eden_size: 4 * KB,
            semi_space_size: 8 * KB,
            old_size: 32 * KB,
            verbose: false,
        }
    }
}
