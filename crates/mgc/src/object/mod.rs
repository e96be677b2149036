//! Object Model - Capabilities the Heap Requires from the Runtime
//!
//! The heap never interprets object layouts itself. Everything it needs from
//! the object model is expressed by the [`ObjectModel`] trait, which groups
//! two capabilities:
//!
//! - the **header capability**: given an object's starting address, report
//!   its total size, test and install forwarding, and run its finalizer;
//! - the **value capability**: decide whether a word encodes a heap
//!   reference, extract its address, and rebuild a word from a new address.
//!
//! The default implementation for the Mica runtime lives in [`header`].
//!
//! # Contract
//!
//! The evacuator interprets every word of an object segment through the
//! value capability, headers included. An implementation must therefore
//! guarantee that header words never decode as references (the default
//! header keeps its low bit set, the same trick Self uses for mark words).

pub mod header;

pub use header::MicaObjectModel;

/// Capabilities the heap requires from the object model
pub trait ObjectModel {
    // --- header capability ---

    /// Total size in bytes of the object starting at `address`, header
    /// included. Also valid for byte arrays.
    fn object_size(&self, address: usize) -> usize;

    /// Whether the header at `address` encodes a forwarding reference
    fn is_forwarded(&self, address: usize) -> bool;

    /// The forwarding address stored at `address`
    ///
    /// Only meaningful when `is_forwarded` is true.
    fn forwarding_address(&self, address: usize) -> usize;

    /// Overwrite the header at `address` with a forwarding reference to
    /// `new_address`
    fn forward_to(&self, address: usize, new_address: usize);

    /// Run the finalizer of the object at `address`
    fn finalize(&self, address: usize);

    // --- value capability ---

    /// Whether `word` encodes a heap reference
    fn is_reference(&self, word: u64) -> bool;

    /// The address encoded by a reference word
    fn reference_address(&self, word: u64) -> usize;

    /// Rebuild a reference word from an address
    fn reference_word(&self, address: usize) -> u64;
}
