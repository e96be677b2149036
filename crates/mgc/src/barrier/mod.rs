//! Write Barrier - Inter-Generational Reference Tracking
//!
//! The barrier maintains this invariant: for every heap reference from an
//! older generation into a younger one, the younger space's remembered set
//! holds `(referrer_address, referrer_size)`. The evacuator reads those
//! entries to fix up cross-space pointers when the younger space is
//! collected.
//!
//! No record is needed for references within one generation (the space's
//! own collection visits them) or from a younger generation into an older
//! one (the younger space's collection visits all its references).
//! Old-to-old references are never remembered; old space is not collected.

use crate::heap::{Heap, SpaceId};
use crate::object::ObjectModel;

/// Generational rank: eden is youngest, old is oldest
///
/// To-space has no rank; it is empty between collections and never appears
/// in a barrier resolution.
pub(crate) fn generation_rank(id: SpaceId) -> Option<u8> {
    match id {
        SpaceId::Eden => Some(0),
        SpaceId::From => Some(1),
        SpaceId::Old => Some(2),
        SpaceId::To => None,
    }
}

/// The spaces a mutator-held object can live in between collections
const BARRIER_SEARCH: [SpaceId; 3] = [SpaceId::Eden, SpaceId::From, SpaceId::Old];

impl<M: ObjectModel> Heap<M> {
    /// Record that the object at `referrer` now holds `target`
    ///
    /// Both arguments are value words. Non-reference targets need no
    /// barrier. The referrer must be a heap reference to a live object;
    /// anything else is a precondition violation and panics, since a missed
    /// barrier record silently corrupts a later collection.
    ///
    /// The referrer's size is captured now because the evacuator uses it to
    /// bound its payload scan, and an object's size does not change across
    /// a collection.
    pub fn remember_object_reference(&mut self, referrer: u64, target: u64) {
        if !self.model().is_reference(target) {
            return;
        }
        assert!(
            self.model().is_reference(referrer),
            "write barrier: referrer {referrer:#x} is not a heap reference"
        );

        let referrer_address = self.model().reference_address(referrer);
        let target_address = self.model().reference_address(target);

        let referrer_space = self
            .barrier_space_of_object(referrer_address)
            .unwrap_or_else(|| {
                panic!("write barrier: referrer {referrer_address:#x} is in no known space")
            });
        let target_space = self.barrier_space_of_value(target_address).unwrap_or_else(|| {
            panic!("write barrier: target {target_address:#x} is in no known space")
        });

        let referrer_rank = generation_rank(referrer_space)
            .expect("write barrier: referrer resolved to to-space");
        let target_rank =
            generation_rank(target_space).expect("write barrier: target resolved to to-space");

        // Only an older referrer pointing into a younger space needs a
        // record; the younger space's own collection covers the rest.
        if referrer_rank <= target_rank {
            return;
        }

        let size = self.model().object_size(referrer_address);
        self.space_mut(target_space).remember(referrer_address, size);
    }

    /// Owning space of a referrer object, by object-segment containment
    fn barrier_space_of_object(&self, address: usize) -> Option<SpaceId> {
        BARRIER_SEARCH
            .into_iter()
            .find(|&id| self.space(id).object_segment_contains(address))
    }

    /// Owning space of a target value, which may be an object or a byte
    /// array
    fn barrier_space_of_value(&self, address: usize) -> Option<SpaceId> {
        BARRIER_SEARCH
            .into_iter()
            .find(|&id| self.space(id).contains(address))
    }
}
