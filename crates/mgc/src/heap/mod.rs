//! Heap - Composition of the Four Spaces
//!
//! The heap owns eden, from-space, to-space, and old-space, plus the handle
//! arena, and services every mutator request: allocation, ensure-space,
//! the write barrier, tracking, and finalization marking.
//!
//! Generation shape:
//!
//! ```text
//! ┌────────┐ tenure  ┌────────────┐ scavenge ┌──────────┐
//! │  eden  ├────────►│ from-space │◄────────►│ to-space │
//! └────────┘         └─────┬──────┘   swap   └──────────┘
//!                          │ tenure
//!                          ▼
//!                    ┌───────────┐
//!                    │ old-space │  (no targets; grows, open question)
//!                    └───────────┘
//! ```
//!
//! Spaces are created in fixed order (old, from, to, eden) and torn down in
//! reverse, running every remaining finalizer at teardown.

pub mod mapping;
pub mod space;

pub use mapping::MemoryMapping;
pub use space::Space;

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::HeapConfig;
use crate::error::{HeapError, Result};
use crate::handles::{HandleArena, Tracked};
use crate::logging::{log_event, GcEvent};
use crate::object::ObjectModel;
use crate::roots::ActivationStack;
use crate::stats::{HeapStats, SpaceUsage};
use crate::util::alignment::is_word_aligned;

/// Number of spaces in the canonical configuration
pub const SPACE_COUNT: usize = 4;

/// Identity of a space, stable across scavenge swaps
///
/// The discriminant doubles as the index into the heap's space array, which
/// is laid out in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceId {
    Old = 0,
    From = 1,
    To = 2,
    Eden = 3,
}

impl SpaceId {
    /// Containment-search order used by `track` and teardown: youngest
    /// first
    pub const SEARCH_ORDER: [SpaceId; SPACE_COUNT] =
        [SpaceId::Eden, SpaceId::From, SpaceId::To, SpaceId::Old];
}

/// The managed heap of the Mica runtime
///
/// Generic over the object model `M`, the capability seam to the runtime's
/// object layer.
pub struct Heap<M: ObjectModel> {
    spaces: [Space; SPACE_COUNT],
    handles: HandleArena,
    activation_stack: Option<Rc<RefCell<dyn ActivationStack>>>,
    model: M,
    stats: HeapStats,
    config: HeapConfig,
}

impl<M: ObjectModel> Heap<M> {
    /// Construct a heap from a validated configuration
    pub fn new(config: HeapConfig, model: M) -> Result<Self> {
        config.validate()?;

        let mut spaces = [
            Space::new("old", config.old_size)?,
            Space::new("from", config.semi_space_size)?,
            Space::new("to", config.semi_space_size)?,
            Space::new("eden", config.eden_size)?,
        ];

        spaces[SpaceId::Eden as usize].set_tenure_target(SpaceId::From);
        spaces[SpaceId::From as usize].set_scavenge_target(SpaceId::To);
        spaces[SpaceId::From as usize].set_tenure_target(SpaceId::Old);

        Ok(Self {
            spaces,
            handles: HandleArena::new(),
            activation_stack: None,
            model,
            stats: HeapStats::default(),
            config,
        })
    }

    // --- accessors ---

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }

    pub(crate) fn space(&self, id: SpaceId) -> &Space {
        &self.spaces[id as usize]
    }

    pub(crate) fn space_mut(&mut self, id: SpaceId) -> &mut Space {
        &mut self.spaces[id as usize]
    }

    pub(crate) fn stats_mut(&mut self) -> &mut HeapStats {
        &mut self.stats
    }

    pub(crate) fn handles_mut(&mut self) -> &mut HandleArena {
        &mut self.handles
    }

    pub(crate) fn activation_stack(&self) -> Option<Rc<RefCell<dyn ActivationStack>>> {
        self.activation_stack.clone()
    }

    /// Mutable access to two distinct spaces at once
    pub(crate) fn two_spaces_mut(&mut self, a: SpaceId, b: SpaceId) -> (&mut Space, &mut Space) {
        let (ai, bi) = (a as usize, b as usize);
        assert_ne!(ai, bi, "a space cannot pair with itself");
        if ai < bi {
            let (left, right) = self.spaces.split_at_mut(bi);
            (&mut left[ai], &mut right[0])
        } else {
            let (left, right) = self.spaces.split_at_mut(ai);
            (&mut right[0], &mut left[bi])
        }
    }

    // --- introspection ---

    /// Free bytes in eden
    pub fn free_in_eden(&self) -> usize {
        self.space(SpaceId::Eden).free()
    }

    /// Free bytes in a space
    pub fn free_in(&self, id: SpaceId) -> usize {
        self.space(id).free()
    }

    /// Used bytes in a space
    pub fn used_in(&self, id: SpaceId) -> usize {
        self.space(id).used()
    }

    /// Usage snapshot of a space
    pub fn space_usage(&self, id: SpaceId) -> SpaceUsage {
        let space = self.space(id);
        SpaceUsage {
            name: space.name(),
            capacity: space.capacity(),
            used: space.used(),
            free: space.free(),
        }
    }

    /// Whether the object at `referrer` is recorded in `id`'s remembered
    /// set
    pub fn is_remembered_in(&self, id: SpaceId, referrer: usize) -> bool {
        self.space(id).is_remembered(referrer)
    }

    /// Number of remembered-set entries in a space
    pub fn remembered_count(&self, id: SpaceId) -> usize {
        self.space(id).remembered_len()
    }

    /// The space whose allocated segments contain `address`, searched
    /// eden, from, to, old
    pub fn space_containing(&self, address: usize) -> Option<SpaceId> {
        SpaceId::SEARCH_ORDER
            .into_iter()
            .find(|&id| self.space(id).contains(address))
    }

    // --- allocation ---

    /// Allocate `size` bytes in eden's object segment
    ///
    /// `size` must be a positive multiple of 8. Collects eden first when
    /// the free gap is too small.
    pub fn allocate_object(&mut self, size: usize) -> Result<usize> {
        self.check_size(size)?;
        self.reserve_in_eden(size)?;
        self.space_mut(SpaceId::Eden)
            .try_allocate_object(size)
            .ok_or(HeapError::OutOfMemory {
                requested: size,
                available: 0,
            })
    }

    /// Allocate `size` bytes in eden's byte-array segment
    ///
    /// Same contract as `allocate_object`.
    pub fn allocate_bytes(&mut self, size: usize) -> Result<usize> {
        self.check_size(size)?;
        self.reserve_in_eden(size)?;
        self.space_mut(SpaceId::Eden)
            .try_allocate_bytes(size)
            .ok_or(HeapError::OutOfMemory {
                requested: size,
                available: 0,
            })
    }

    /// Force a collection now if eden cannot satisfy `size` bytes, so a
    /// following composite allocation sequence cannot collect mid-sequence
    pub fn ensure_space_in_eden(&mut self, size: usize) -> Result<()> {
        self.reserve_in_eden(size)
    }

    fn reserve_in_eden(&mut self, size: usize) -> Result<()> {
        if self.space(SpaceId::Eden).free() >= size {
            return Ok(());
        }
        self.collect_garbage(SpaceId::Eden, size, None).map_err(|e| {
            if self.config.verbose {
                log_event(GcEvent::AllocationFailure {
                    size,
                    free: self.space(SpaceId::Eden).free(),
                });
            }
            e
        })
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size == 0 || !is_word_aligned(size) {
            return Err(HeapError::InvalidSize(size));
        }
        Ok(())
    }

    // --- finalization marking ---

    /// Mark the object at `address` as demanding finalization
    ///
    /// Must be called immediately after allocation, while the address is
    /// still in eden's object segment.
    pub fn mark_needs_finalization(&mut self, address: usize) -> Result<()> {
        if !self.space(SpaceId::Eden).object_segment_contains(address) {
            return Err(HeapError::InvalidReference { address });
        }
        self.space_mut(SpaceId::Eden).mark_finalizable(address);
        Ok(())
    }

    // --- tracking ---

    /// Track a value across collections
    ///
    /// Literals are stored by value. For references, a handle cell is
    /// allocated and registered with the owning space; the evacuator keeps
    /// the cell current as the object moves.
    pub fn track(&mut self, word: u64) -> Result<Tracked> {
        if !self.model.is_reference(word) {
            return Ok(Tracked::Literal(word));
        }

        let address = self.model.reference_address(word);
        let owner = self
            .space_containing(address)
            .ok_or(HeapError::InvalidReference { address })?;
        let cell = self.handles.alloc(address);
        self.space_mut(owner).register_tracked(cell);
        Ok(Tracked::Handle(cell))
    }

    /// Stop tracking a value
    ///
    /// A no-op for literals. The cell itself is never freed; only its
    /// registration in the owning space is removed.
    pub fn untrack(&mut self, tracked: &Tracked) -> Result<()> {
        match tracked {
            Tracked::Literal(_) => Ok(()),
            Tracked::Handle(cell) => {
                let address = self.handles.get(*cell);
                let owner = self
                    .space_containing(address)
                    .ok_or(HeapError::InvalidReference { address })?;
                self.space_mut(owner).unregister_tracked(*cell)
            },
        }
    }

    /// Read a tracked value
    ///
    /// Dereferences the handle cell for references; returns the stored
    /// literal otherwise.
    pub fn read_tracked(&self, tracked: &Tracked) -> u64 {
        match tracked {
            Tracked::Literal(word) => *word,
            Tracked::Handle(cell) => self.model.reference_word(self.handles.get(*cell)),
        }
    }

    // --- activation stack ---

    /// Install or clear the interpreter's activation stack
    ///
    /// Borrowed, not owned; the heap reads and overwrites each activation's
    /// root only during a collection.
    pub fn set_activation_stack(&mut self, stack: Option<Rc<RefCell<dyn ActivationStack>>>) {
        self.activation_stack = stack;
    }

    #[cfg(debug_assertions)]
    pub(crate) fn verify_invariants(&self) {
        for space in &self.spaces {
            space.verify_invariants();
        }
    }
}

impl<M: ObjectModel> Drop for Heap<M> {
    /// Teardown runs every remaining finalizer, youngest space first
    /// (reverse of creation order)
    fn drop(&mut self) {
        for index in (0..SPACE_COUNT).rev() {
            let pending = self.spaces[index].drain_finalizable();
            if pending.is_empty() {
                continue;
            }
            if self.config.verbose {
                log_event(GcEvent::FinalizersRun {
                    space: self.spaces[index].name(),
                    count: pending.len(),
                });
            }
            self.stats.finalizers_run += pending.len() as u64;
            for address in pending {
                self.model.finalize(address);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::MicaObjectModel;

    fn heap() -> Heap<MicaObjectModel> {
        Heap::new(HeapConfig::small_for_tests(), MicaObjectModel::new()).unwrap()
    }

    #[test]
    fn test_construction_wires_targets() {
        let h = heap();
        assert_eq!(h.space(SpaceId::Eden).scavenge_target(), None);
        assert_eq!(h.space(SpaceId::Eden).tenure_target(), Some(SpaceId::From));
        assert_eq!(h.space(SpaceId::From).scavenge_target(), Some(SpaceId::To));
        assert_eq!(h.space(SpaceId::From).tenure_target(), Some(SpaceId::Old));
        assert_eq!(h.space(SpaceId::To).scavenge_target(), None);
        assert_eq!(h.space(SpaceId::To).tenure_target(), None);
        assert_eq!(h.space(SpaceId::Old).scavenge_target(), None);
        assert_eq!(h.space(SpaceId::Old).tenure_target(), None);
    }

    #[test]
    fn test_target_graph_is_acyclic() {
        let h = heap();
        for start in SpaceId::SEARCH_ORDER {
            let mut id = start;
            let mut hops = 0;
            while let Some(next) = h
                .space(id)
                .scavenge_target()
                .or_else(|| h.space(id).tenure_target())
            {
                id = next;
                hops += 1;
                assert!(hops <= SPACE_COUNT, "target graph does not terminate");
            }
        }
    }

    #[test]
    fn test_allocate_object_reduces_free() {
        let mut h = heap();
        let f0 = h.free_in_eden();
        h.allocate_object(16).unwrap();
        assert_eq!(h.free_in_eden(), f0 - 16);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let mut h = heap();
        assert!(matches!(
            h.allocate_object(0),
            Err(HeapError::InvalidSize(0))
        ));
        assert!(matches!(
            h.allocate_object(12),
            Err(HeapError::InvalidSize(12))
        ));
        assert!(matches!(
            h.allocate_bytes(7),
            Err(HeapError::InvalidSize(7))
        ));
    }

    #[test]
    fn test_space_containing_searches_all_spaces() {
        let mut h = heap();
        let obj = h.allocate_object(16).unwrap();
        let bytes = h.allocate_bytes(16).unwrap();

        assert_eq!(h.space_containing(obj), Some(SpaceId::Eden));
        assert_eq!(h.space_containing(bytes), Some(SpaceId::Eden));
        assert_eq!(h.space_containing(0x10), None);
    }

    #[test]
    fn test_mark_needs_finalization_precondition() {
        let mut h = heap();
        let obj = h.allocate_object(16).unwrap();
        assert!(h.mark_needs_finalization(obj).is_ok());

        let bytes = h.allocate_bytes(16).unwrap();
        assert!(matches!(
            h.mark_needs_finalization(bytes),
            Err(HeapError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_track_literal_roundtrip() {
        let mut h = heap();
        let literal = crate::object::header::encode_small_int(42);
        let tracked = h.track(literal).unwrap();
        assert!(!tracked.is_reference());
        assert_eq!(h.read_tracked(&tracked), literal);
        h.untrack(&tracked).unwrap();
    }

    #[test]
    fn test_track_reference_roundtrip() {
        let mut h = heap();
        let obj = h.allocate_object(16).unwrap();
        let word = h.model().reference_word(obj);

        let tracked = h.track(word).unwrap();
        assert!(tracked.is_reference());
        assert_eq!(h.read_tracked(&tracked), word);

        h.untrack(&tracked).unwrap();
        assert!(h.untrack(&tracked).is_err());
    }

    #[test]
    fn test_track_foreign_address_rejected() {
        let mut h = heap();
        let word = h.model().reference_word(0x10_0000);
        assert!(matches!(
            h.track(word),
            Err(HeapError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_ensure_space_without_pressure_is_noop() {
        let mut h = heap();
        let f0 = h.free_in_eden();
        h.ensure_space_in_eden(64).unwrap();
        assert_eq!(h.free_in_eden(), f0);
    }
}
