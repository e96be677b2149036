//! Object Header - Default Header and Value Encoding for Mica
//!
//! Header Word Layout (one machine word, 64-bit):
//!
//! ```text
//! Ordinary header:
//! ┌───────────────────────────────┬─────────┬─────┬─────┐
//! │      Size in bytes            │  Type   │ Fwd │ Tag │
//! │        63-8                   │  7-2    │  1  │  0  │
//! └───────────────────────────────┴─────────┴─────┴─────┘
//! Tag is always 1, Fwd is 0.
//!
//! Forwarding header:
//! ┌─────────────────────────────────────────┬─────┬─────┐
//! │  New address (8-aligned, bits 63-3)     │ Fwd │ Tag │
//! └─────────────────────────────────────────┴─────┴─────┘
//! Tag is 1, Fwd is 1; the address is recovered by masking the
//! low three bits.
//! ```
//!
//! Value Word Layout:
//! - bit 0 set: small-integer literal, payload is `word >> 1`
//! - zero word: nil
//! - any other 8-aligned word: heap reference, address is the word itself
//!
//! Because the header tag bit is always set, a header word can never decode
//! as a reference. The evacuator relies on this when it scans object
//! segments word by word.

use crate::memory;
use crate::object::ObjectModel;
use crate::util::alignment::is_word_aligned;

/// Header tag bit, set on every header word
pub const HEADER_TAG_MASK: u64 = 0b001;

/// Forwarding flag bit
pub const FORWARD_MASK: u64 = 0b010;

/// Shift of the type tag field
pub const TYPE_SHIFT: u64 = 2;

/// Mask of the type tag field (six bits)
pub const TYPE_MASK: u64 = 0b11_1111 << TYPE_SHIFT;

/// Shift of the size field
pub const SIZE_SHIFT: u64 = 8;

/// Encode an ordinary header word
///
/// `size` is the total object size in bytes, header included, and must be a
/// positive multiple of the word size.
#[inline]
pub fn encode_header(type_tag: u8, size: usize) -> u64 {
    debug_assert!(size > 0 && is_word_aligned(size), "bad object size {size}");
    ((size as u64) << SIZE_SHIFT) | (((type_tag as u64) << TYPE_SHIFT) & TYPE_MASK) | HEADER_TAG_MASK
}

/// Size in bytes recorded in an ordinary header word
#[inline]
pub fn header_size(header: u64) -> usize {
    (header >> SIZE_SHIFT) as usize
}

/// Type tag recorded in an ordinary header word
#[inline]
pub fn header_type(header: u64) -> u8 {
    ((header & TYPE_MASK) >> TYPE_SHIFT) as u8
}

/// Whether a header word encodes a forwarding reference
#[inline]
pub fn is_forwarding_header(header: u64) -> bool {
    header & FORWARD_MASK != 0
}

/// Encode a forwarding header pointing at `new_address`
#[inline]
pub fn encode_forwarding(new_address: usize) -> u64 {
    debug_assert!(is_word_aligned(new_address), "unaligned forwarding target");
    new_address as u64 | FORWARD_MASK | HEADER_TAG_MASK
}

/// Address recorded in a forwarding header
#[inline]
pub fn forwarding_target(header: u64) -> usize {
    (header & !0b111) as usize
}

/// Write an ordinary header at `address`
///
/// # Safety
///
/// `address` must be word-aligned and valid for writing one word.
#[inline]
pub unsafe fn write_object_header(address: usize, type_tag: u8, size: usize) {
    memory::write_word(address, encode_header(type_tag, size));
}

/// Encode a small-integer literal value word
#[inline]
pub fn encode_small_int(value: i64) -> u64 {
    ((value as u64) << 1) | 1
}

/// Decode a small-integer literal value word
#[inline]
pub fn decode_small_int(word: u64) -> i64 {
    (word as i64) >> 1
}

/// The nil value word
pub const NIL: u64 = 0;

/// Default object model of the Mica runtime
///
/// Objects carry the one-word tagged header above; values use low-bit
/// tagging. An optional finalizer hook receives the address of every object
/// whose finalizer the heap runs; the runtime dispatches from the address to
/// the object's finalizer slot.
pub struct MicaObjectModel {
    finalizer: Option<Box<dyn Fn(usize)>>,
}

impl MicaObjectModel {
    /// Model without a finalizer hook
    pub fn new() -> Self {
        Self { finalizer: None }
    }

    /// Model with a finalizer hook
    pub fn with_finalizer(finalizer: impl Fn(usize) + 'static) -> Self {
        Self {
            finalizer: Some(Box::new(finalizer)),
        }
    }
}

impl Default for MicaObjectModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectModel for MicaObjectModel {
    fn object_size(&self, address: usize) -> usize {
        let header = unsafe { memory::read_word(address) };
        debug_assert!(
            !is_forwarding_header(header),
            "size read through a forwarding header at {address:#x}"
        );
        header_size(header)
    }

    fn is_forwarded(&self, address: usize) -> bool {
        is_forwarding_header(unsafe { memory::read_word(address) })
    }

    fn forwarding_address(&self, address: usize) -> usize {
        let header = unsafe { memory::read_word(address) };
        debug_assert!(is_forwarding_header(header));
        forwarding_target(header)
    }

    fn forward_to(&self, address: usize, new_address: usize) {
        unsafe { memory::write_word(address, encode_forwarding(new_address)) };
    }

    fn finalize(&self, address: usize) {
        if let Some(hook) = &self.finalizer {
            hook(address);
        }
    }

    fn is_reference(&self, word: u64) -> bool {
        word != 0 && word & 0b111 == 0
    }

    fn reference_address(&self, word: u64) -> usize {
        debug_assert!(self.is_reference(word));
        word as usize
    }

    fn reference_word(&self, address: usize) -> u64 {
        debug_assert!(is_word_aligned(address), "unaligned reference {address:#x}");
        address as u64
    }
}
