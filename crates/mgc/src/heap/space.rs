//! Space - One Region of the Generational Heap
//!
//! A space is a contiguous mapped region with two bump cursors growing
//! toward each other: an object segment from the low end and a byte-array
//! segment from the high end. Free memory is the gap between the cursors.
//!
//! Each space owns three auxiliary sets:
//! - the **remembered set**, mapping referrer address to referrer size, for
//!   objects in other spaces that hold references into this one;
//! - the **finalization set** of addresses whose finalizer must run if the
//!   object does not survive the next collection;
//! - the **tracked set** of handle cells whose current value lies here.
//!
//! Invariants:
//! - `base <= object_cursor <= byte_array_cursor <= end`
//! - every allocation size is a multiple of the machine word
//! - remembered and finalization addresses lie in the object segment;
//!   tracked cells may also point into the byte-array segment
//! - the scavenge target, when set, has identical capacity

use indexmap::{IndexMap, IndexSet};
use std::mem;

use super::mapping::MemoryMapping;
use super::SpaceId;
use crate::error::{HeapError, Result};
use crate::memory;
use crate::util::alignment::is_word_aligned;

/// Debug-build fill for freshly allocated memory, so uninitialized reads
/// stand out
pub const SCRUB_BYTE: u8 = 0xAB;

/// One region of the heap
pub struct Space {
    name: &'static str,
    mapping: MemoryMapping,
    /// First free word of the object segment, moves up
    object_cursor: usize,
    /// First used word of the byte-array segment, moves down
    byte_array_cursor: usize,
    /// Referrer address to referrer size, for objects elsewhere that
    /// reference this space
    remembered: IndexMap<usize, usize>,
    /// Addresses that demand a finalizer callback if not evacuated
    finalizable: IndexSet<usize>,
    /// Handle cells whose current value lies in this space
    tracked: IndexSet<usize>,
    scavenge_target: Option<SpaceId>,
    tenure_target: Option<SpaceId>,
}

impl Space {
    /// Create a space with a fresh anonymous mapping of `capacity` bytes
    pub fn new(name: &'static str, capacity: usize) -> Result<Self> {
        debug_assert!(is_word_aligned(capacity), "space capacity must be word-aligned");
        let mapping = MemoryMapping::anonymous(capacity)?;
        let object_cursor = mapping.base();
        let byte_array_cursor = mapping.end();

        Ok(Self {
            name,
            mapping,
            object_cursor,
            byte_array_cursor,
            remembered: IndexMap::new(),
            finalizable: IndexSet::new(),
            tracked: IndexSet::new(),
            scavenge_target: None,
            tenure_target: None,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base(&self) -> usize {
        self.mapping.base()
    }

    pub fn end(&self) -> usize {
        self.mapping.end()
    }

    pub fn capacity(&self) -> usize {
        self.mapping.len()
    }

    /// Free bytes between the two cursors
    pub fn free(&self) -> usize {
        self.byte_array_cursor - self.object_cursor
    }

    /// Used bytes across both segments
    pub fn used(&self) -> usize {
        self.capacity() - self.free()
    }

    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    pub fn object_cursor(&self) -> usize {
        self.object_cursor
    }

    pub fn byte_array_cursor(&self) -> usize {
        self.byte_array_cursor
    }

    // --- segment containment, the sole ownership tests ---

    /// Whether `address` lies in the allocated part of the object segment
    pub fn object_segment_contains(&self, address: usize) -> bool {
        address >= self.base() && address < self.object_cursor
    }

    /// Whether `address` lies in the allocated part of the byte-array
    /// segment
    pub fn byte_array_segment_contains(&self, address: usize) -> bool {
        address >= self.byte_array_cursor && address < self.end()
    }

    /// Whether `address` lies in either allocated segment
    pub fn contains(&self, address: usize) -> bool {
        self.object_segment_contains(address) || self.byte_array_segment_contains(address)
    }

    // --- bump allocation ---

    /// Bump-allocate `size` bytes in the object segment
    ///
    /// Returns the starting address, or `None` when the free gap is too
    /// small. The caller has already validated that `size` is a positive
    /// word multiple.
    pub fn try_allocate_object(&mut self, size: usize) -> Option<usize> {
        debug_assert!(size > 0 && is_word_aligned(size));
        if self.free() < size {
            return None;
        }

        let address = self.object_cursor;
        self.object_cursor += size;
        if cfg!(debug_assertions) {
            unsafe { memory::fill_memory(address, SCRUB_BYTE, size) };
        }
        Some(address)
    }

    /// Bump-allocate `size` bytes in the byte-array segment
    ///
    /// The byte-array cursor retreats; the returned address is the new
    /// cursor.
    pub fn try_allocate_bytes(&mut self, size: usize) -> Option<usize> {
        debug_assert!(size > 0 && is_word_aligned(size));
        if self.free() < size {
            return None;
        }

        self.byte_array_cursor -= size;
        if cfg!(debug_assertions) {
            unsafe { memory::fill_memory(self.byte_array_cursor, SCRUB_BYTE, size) };
        }
        Some(self.byte_array_cursor)
    }

    // --- remembered set ---

    /// Record that the object at `referrer` (of `size` bytes, in another
    /// space) holds a reference into this space
    pub fn remember(&mut self, referrer: usize, size: usize) {
        self.remembered.insert(referrer, size);
    }

    /// Remove a remembered-set entry
    ///
    /// Absence is a programming bug in the caller; the error carries the
    /// offending address.
    pub fn forget(&mut self, referrer: usize) -> Result<()> {
        self.remembered
            .swap_remove(&referrer)
            .map(|_| ())
            .ok_or(HeapError::AddressNotInSet {
                set: "remembered",
                address: referrer,
            })
    }

    pub fn is_remembered(&self, referrer: usize) -> bool {
        self.remembered.contains_key(&referrer)
    }

    pub fn remembered_len(&self) -> usize {
        self.remembered.len()
    }

    /// Snapshot of the remembered set, for fixup iteration while entries
    /// are rewritten
    pub fn remembered_snapshot(&self) -> Vec<(usize, usize)> {
        self.remembered.iter().map(|(&a, &s)| (a, s)).collect()
    }

    /// Take the whole remembered set, leaving it empty
    pub fn drain_remembered(&mut self) -> Vec<(usize, usize)> {
        self.remembered.drain(..).collect()
    }

    // --- finalization set ---

    /// Mark the object at `address` as demanding finalization
    pub fn mark_finalizable(&mut self, address: usize) {
        debug_assert!(
            self.object_segment_contains(address),
            "finalizable address {address:#x} outside the object segment of '{}'",
            self.name
        );
        self.finalizable.insert(address);
    }

    /// Remove a finalization-set entry, erroring when absent
    pub fn remove_finalizable(&mut self, address: usize) -> Result<()> {
        if self.finalizable.swap_remove(&address) {
            Ok(())
        } else {
            Err(HeapError::AddressNotInSet {
                set: "finalization",
                address,
            })
        }
    }

    /// Clear a finalization-set entry if present, reporting whether it was
    ///
    /// The evacuator uses this to migrate entries for survivors; absence is
    /// the common case there, not a bug.
    pub(crate) fn clear_finalizable(&mut self, address: usize) -> bool {
        self.finalizable.swap_remove(&address)
    }

    pub fn is_finalizable(&self, address: usize) -> bool {
        self.finalizable.contains(&address)
    }

    pub fn finalizable_len(&self) -> usize {
        self.finalizable.len()
    }

    /// Take the whole finalization set, leaving it empty
    pub fn drain_finalizable(&mut self) -> Vec<usize> {
        self.finalizable.drain(..).collect()
    }

    // --- tracked set ---

    /// Register a handle cell whose current value lies in this space
    pub fn register_tracked(&mut self, cell: usize) {
        self.tracked.insert(cell);
    }

    /// Unregister a handle cell, erroring when absent
    pub fn unregister_tracked(&mut self, cell: usize) -> Result<()> {
        if self.tracked.swap_remove(&cell) {
            Ok(())
        } else {
            Err(HeapError::AddressNotInSet {
                set: "tracked",
                address: cell,
            })
        }
    }

    pub fn is_tracked(&self, cell: usize) -> bool {
        self.tracked.contains(&cell)
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// Take the whole tracked set, leaving it empty
    pub fn drain_tracked(&mut self) -> Vec<usize> {
        self.tracked.drain(..).collect()
    }

    // --- targets ---

    pub fn scavenge_target(&self) -> Option<SpaceId> {
        self.scavenge_target
    }

    pub fn tenure_target(&self) -> Option<SpaceId> {
        self.tenure_target
    }

    pub(crate) fn set_scavenge_target(&mut self, target: SpaceId) {
        self.scavenge_target = Some(target);
    }

    pub(crate) fn set_tenure_target(&mut self, target: SpaceId) {
        self.tenure_target = Some(target);
    }

    // --- swap and reset ---

    /// Exchange all identifying state with `other`: the buffer, both
    /// cursors, and the three auxiliary sets
    ///
    /// Names and target pointers stay put. The identity "this is eden"
    /// follows the `Space` value, not the memory it currently owns.
    pub fn swap_contents_with(&mut self, other: &mut Space) {
        debug_assert_eq!(
            self.capacity(),
            other.capacity(),
            "scavenge partners must have identical capacity"
        );
        mem::swap(&mut self.mapping, &mut other.mapping);
        mem::swap(&mut self.object_cursor, &mut other.object_cursor);
        mem::swap(&mut self.byte_array_cursor, &mut other.byte_array_cursor);
        mem::swap(&mut self.remembered, &mut other.remembered);
        mem::swap(&mut self.finalizable, &mut other.finalizable);
        mem::swap(&mut self.tracked, &mut other.tracked);
    }

    /// Empty the space: cursors back to the ends, auxiliary sets cleared
    /// with capacity retained
    pub fn reset(&mut self) {
        self.object_cursor = self.mapping.base();
        self.byte_array_cursor = self.mapping.end();
        self.remembered.clear();
        self.finalizable.clear();
        self.tracked.clear();
    }

    #[cfg(debug_assertions)]
    pub(crate) fn verify_invariants(&self) {
        assert!(self.base() <= self.object_cursor);
        assert!(self.object_cursor <= self.byte_array_cursor);
        assert!(self.byte_array_cursor <= self.end());
        assert!(is_word_aligned(self.object_cursor));
        assert!(is_word_aligned(self.byte_array_cursor));
        for &address in self.remembered.keys() {
            assert!(is_word_aligned(address));
        }
        for &address in &self.finalizable {
            assert!(
                self.object_segment_contains(address),
                "finalizable {address:#x} escaped the object segment of '{}'",
                self.name
            );
        }
    }
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Space")
            .field("name", &self.name)
            .field("base", &format_args!("{:#x}", self.base()))
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("remembered", &self.remembered.len())
            .field("finalizable", &self.finalizable.len())
            .field("tracked", &self.tracked.len())
            .finish()
    }
}
