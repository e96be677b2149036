//! # MGC - Managed Heap for the Mica Runtime
//!
//! MGC is the generational garbage collector of Mica, a Self-like
//! prototype-based language runtime. It is a semi-space copying collector
//! with a tenured old generation, precise root scanning through the
//! interpreter's activation stack and an external handle table, and a write
//! barrier driven by per-space remembered sets.
//!
//! ## Overview
//!
//! The heap is four fixed regions:
//!
//! - **Eden**: where every allocation lands. Collecting eden evacuates its
//!   survivors directly into from-space.
//! - **From-space / To-space**: the two semi-spaces of the middle
//!   generation. A scavenge copies the live set from one to the other and
//!   the two swap memory; repeated scavenging reclaims short-lived objects.
//! - **Old space**: the tenured generation. Objects that outlive the
//!   semi-spaces are promoted here; old space is never collected.
//!
//! Each space is a contiguous mapped region with two bump cursors growing
//! toward each other: objects from the low end, byte arrays from the high
//! end. Evacuation is Cheney's algorithm with forwarding references stashed
//! in the vacated object headers.
//!
//! ## Quick Start
//!
//! ```rust
//! use mgc::HeapError;
//!
//! fn main() -> Result<(), HeapError> {
//!     let mut heap = mgc::init()?;
//!
//!     // Allocate a two-word object and a byte array
//!     let obj = heap.allocate_object(16)?;
//!     let bytes = heap.allocate_bytes(32)?;
//!
//!     // Pin a reference across collections
//!     let word = mgc::value_from_address(obj);
//!     let pinned = heap.track(word)?;
//!
//!     // ... mutator runs, collections happen ...
//!
//!     let current = heap.read_tracked(&pinned);
//!     heap.untrack(&pinned)?;
//!     let _ = (bytes, current);
//!     Ok(())
//! }
//! ```
//!
//! ## Collaborators
//!
//! The heap interprets nothing by itself. The runtime supplies:
//!
//! - an [`ObjectModel`](object::ObjectModel): object sizes, forwarding
//!   headers, finalizers, and the value tagging scheme;
//! - an [`ActivationStack`](roots::ActivationStack): one root reference per
//!   activation that the collector may read and overwrite.
//!
//! [`MicaObjectModel`](object::MicaObjectModel) is the runtime's default
//! model: one-word tagged headers, low-bit-tagged small integers, 8-aligned
//! reference words.
//!
//! ## Modules
//!
//! - [`heap`]: the four spaces and their composition
//! - [`relocate`]: the evacuator
//! - [`barrier`]: the generational write barrier
//! - [`handles`]: the external handle table
//! - [`object`]: the object-model capability seam
//! - [`roots`]: the activation-stack capability seam
//! - [`config`]: heap sizing and validation
//! - [`error`]: error types for all heap operations
//! - [`logging`]: collection event reporting
//! - [`stats`]: collection and allocation metrics
//! - [`memory`]: low-level word and byte primitives
//! - [`util`]: alignment helpers
//!
//! ## Limitations
//!
//! - Single mutator thread; collections run on it at allocation boundaries.
//! - Old space does not grow yet; an unsatisfiable tenure is fatal.
//! - No large-object space: an allocation must fit eden.

pub mod barrier;
pub mod config;
pub mod error;
pub mod handles;
pub mod heap;
pub mod logging;
pub mod memory;
pub mod object;
pub mod relocate;
pub mod roots;
pub mod stats;
pub mod util;

pub use config::HeapConfig;
pub use error::{HeapError, Result};
pub use handles::Tracked;
pub use heap::{Heap, SpaceId};
pub use object::{MicaObjectModel, ObjectModel};
pub use roots::{ActivationStack, ShadowStack};
pub use stats::{HeapStats, SpaceUsage};

/// Rebuild a value word from an object address, using the default Mica
/// value encoding
pub fn value_from_address(address: usize) -> u64 {
    address as u64
}

/// Initialize a heap with the default configuration and object model
///
/// # Examples
///
/// ```rust
/// let heap = mgc::init()?;
/// assert!(heap.free_in_eden() > 0);
/// # Ok::<(), mgc::HeapError>(())
/// ```
pub fn init() -> Result<Heap<MicaObjectModel>> {
    Heap::new(HeapConfig::default(), MicaObjectModel::new())
}

/// Initialize a heap with a custom configuration
///
/// # Examples
///
/// ```rust
/// use mgc::HeapConfig;
///
/// let config = HeapConfig {
///     eden_size: 64 * 1024,
///     semi_space_size: 64 * 1024,
///     ..Default::default()
/// };
/// let heap = mgc::init_with_config(config)?;
/// # Ok::<(), mgc::HeapError>(())
/// ```
pub fn init_with_config(config: HeapConfig) -> Result<Heap<MicaObjectModel>> {
    Heap::new(config, MicaObjectModel::new())
}
