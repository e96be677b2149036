//! Evacuator - Cheney Copying with Generational Extensions
//!
//! Copies the live set of a source space into a target space, installs
//! forwarding references in the vacated headers, and keeps roots, handle
//! cells, remembered sets, and finalization sets mutually consistent.
//!
//! A collection proceeds in phases:
//! 1. activation-stack roots
//! 2. tracked handle cells (re-registered with the target)
//! 3. remembered referrers, scanned payload word by word
//! 4. full object-segment scans of every newer-generation link
//! 5. the Cheney scan loop over everything copied so far
//! 6. finalizers for objects that did not survive
//! 7. remembered-set fixup in the newer generations
//! 8. source reset
//!
//! The scan cursor for phase 5 is captured before phase 1 so that objects
//! copied by the earlier phases are themselves scanned for children.
//!
//! A collection of one space may require collecting its target first. The
//! newer-generation link chain is a stack-allocated cons list threaded
//! through that recursion; the inner collection scans each linked space so
//! references from it stay consistent, and fixes its remembered set
//! afterwards. Recursion depth is bounded by the number of spaces.

use std::time::Instant;

use crate::error::{HeapError, Result};
use crate::heap::{Heap, SpaceId};
use crate::logging::{log_event, GcEvent};
use crate::memory;
use crate::object::ObjectModel;
use crate::util::alignment::WORD;

/// One link in the chain of younger spaces threaded through a recursive
/// collection
pub(crate) struct NewerGeneration<'a> {
    pub space: SpaceId,
    pub parent: Option<&'a NewerGeneration<'a>>,
}

impl<M: ObjectModel> Heap<M> {
    /// Run one explicit collection cycle on a space
    ///
    /// Scavenges when the space has a scavenge target, otherwise tenures.
    /// Embedders use this to collect eagerly; allocation triggers the same
    /// machinery on demand.
    pub fn collect(&mut self, id: SpaceId) -> Result<()> {
        if let Some(target) = self.space(id).scavenge_target() {
            self.scavenge(id, target, None)
        } else if let Some(target) = self.space(id).tenure_target() {
            self.tenure(id, target, None)
        } else {
            Err(HeapError::Configuration(format!(
                "space '{}' has no collection target",
                self.space(id).name()
            )))
        }
    }

    /// Make at least `required` bytes free in a space, collecting as needed
    ///
    /// Policy per the generation shape: scavenge and swap first; if free
    /// memory is still insufficient, tenure into the older generation; a
    /// space with no remaining option fails with `CollectionOverflow`,
    /// which is fatal to the runtime.
    pub(crate) fn collect_garbage(
        &mut self,
        id: SpaceId,
        required: usize,
        newer: Option<&NewerGeneration<'_>>,
    ) -> Result<()> {
        if self.space(id).free() >= required {
            return Ok(());
        }

        let name = self.space(id).name();
        let verbose = self.config().verbose;
        if verbose {
            log_event(GcEvent::CollectionStart {
                space: name,
                required,
            });
        }
        let started = Instant::now();
        let objects_before = self.stats().objects_evacuated;
        let bytes_before = self.stats().bytes_evacuated;

        if let Some(target) = self.space(id).scavenge_target() {
            self.scavenge(id, target, newer)?;
        }

        if self.space(id).free() < required {
            if let Some(target) = self.space(id).tenure_target() {
                self.tenure(id, target, newer)?;
            }
        }

        if verbose {
            log_event(GcEvent::CollectionEnd {
                space: name,
                duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                objects_evacuated: self.stats().objects_evacuated - objects_before,
                bytes_evacuated: self.stats().bytes_evacuated - bytes_before,
            });
        }

        #[cfg(debug_assertions)]
        self.verify_invariants();

        if self.space(id).free() >= required {
            Ok(())
        } else {
            Err(HeapError::CollectionOverflow {
                space: name,
                live: required,
                free: self.space(id).free(),
            })
        }
    }

    /// Evacuate to the scavenge sibling, then swap memory with it
    fn scavenge(
        &mut self,
        source: SpaceId,
        target: SpaceId,
        newer: Option<&NewerGeneration<'_>>,
    ) -> Result<()> {
        if self.config().verbose {
            log_event(GcEvent::Scavenge {
                source: self.space(source).name(),
                target: self.space(target).name(),
            });
        }
        self.evacuate(source, target, newer)?;
        let (s, t) = self.two_spaces_mut(source, target);
        s.swap_contents_with(t);
        self.stats_mut().scavenges += 1;
        self.stats_mut().collections += 1;
        Ok(())
    }

    /// Evacuate into the older generation; the target keeps its identity
    fn tenure(
        &mut self,
        source: SpaceId,
        target: SpaceId,
        newer: Option<&NewerGeneration<'_>>,
    ) -> Result<()> {
        if self.config().verbose {
            log_event(GcEvent::Tenure {
                source: self.space(source).name(),
                target: self.space(target).name(),
            });
        }
        self.evacuate(source, target, newer)?;
        self.stats_mut().tenures += 1;
        self.stats_mut().collections += 1;
        Ok(())
    }

    /// Copy the live set of `source` into `target` and reset `source`
    fn evacuate(
        &mut self,
        source: SpaceId,
        target: SpaceId,
        newer: Option<&NewerGeneration<'_>>,
    ) -> Result<()> {
        let source_name = self.space(source).name();

        // The target must be able to hold everything that might survive.
        // Collect it first if not, with this source linked as a newer
        // generation so its references stay consistent.
        let live = self.space(source).used();
        if live > self.space(target).free() {
            let link = NewerGeneration {
                space: source,
                parent: newer,
            };
            self.collect_garbage(target, live, Some(&link))?;
            if live > self.space(target).free() {
                return Err(HeapError::CollectionOverflow {
                    space: source_name,
                    live,
                    free: self.space(target).free(),
                });
            }
        }

        // Captured before any root is copied; phase 5 scans from here.
        let scan_start = self.space(target).object_cursor();

        // Phase 1: activation-stack roots.
        if let Some(stack) = self.activation_stack() {
            stack
                .borrow_mut()
                .visit_roots(&mut |word| self.evacuate_word(source, target, word));
        }

        // Phase 2: tracked handle cells.
        for cell in self.space_mut(source).drain_tracked() {
            let address = self.handles_mut().get(cell);
            let new_address = if self.space(source).object_segment_contains(address) {
                self.evacuate_object(source, target, address)
            } else if self.space(source).byte_array_segment_contains(address) {
                self.evacuate_bytes(source, target, address)
            } else {
                panic!("tracked cell {cell} holds {address:#x}, outside space '{source_name}'");
            };
            self.handles_mut().set(cell, new_address);
            self.space_mut(target).register_tracked(cell);
        }

        // Phase 3: remembered referrers. Each entry names an object in
        // another space whose payload holds at least one reference into the
        // source. Referrers that live in the source itself migrated here
        // with a previous collection; they are re-keyed through their
        // forwarding pointer once this collection has decided their fate.
        let mut migrated_referrers = Vec::new();
        for (referrer, size) in self.space_mut(source).drain_remembered() {
            if self.space(source).object_segment_contains(referrer) {
                migrated_referrers.push((referrer, size));
                continue;
            }

            let mut found = false;
            let mut slot = referrer;
            let end = referrer + size;
            while slot < end {
                let word = unsafe { memory::read_word(slot) };
                let rewritten = self.evacuate_word(source, target, word);
                if rewritten != word {
                    unsafe { memory::write_word(slot, rewritten) };
                    found = true;
                }
                slot += WORD;
            }
            assert!(
                found,
                "stale remembered-set entry: {referrer:#x} holds no reference into '{source_name}'"
            );
            self.space_mut(target).remember(referrer, size);
        }

        // Phase 4: newer-generation links. Scanning the whole object
        // segment preserves old-to-new references when an older generation
        // is collected transitively; header words are tagged and never
        // decode as references.
        let mut link = newer;
        while let Some(n) = link {
            let mut slot = self.space(n.space).base();
            let end = self.space(n.space).object_cursor();
            while slot < end {
                let word = unsafe { memory::read_word(slot) };
                let rewritten = self.evacuate_word(source, target, word);
                if rewritten != word {
                    unsafe { memory::write_word(slot, rewritten) };
                }
                slot += WORD;
            }
            link = n.parent;
        }

        // Phase 5: Cheney scan loop. Every word copied into the target
        // since scan_start is interpreted once; evacuation is bounded and
        // nothing else writes to the target, so the loop terminates.
        let mut scan = scan_start;
        while scan < self.space(target).object_cursor() {
            let word = unsafe { memory::read_word(scan) };
            let rewritten = self.evacuate_word(source, target, word);
            if rewritten != word {
                unsafe { memory::write_word(scan, rewritten) };
            }
            scan += WORD;
        }

        // Phase 6: finalizers for objects that were not evacuated.
        // Survivors already moved their entries to the target.
        let dead = self.space_mut(source).drain_finalizable();
        if !dead.is_empty() {
            if self.config().verbose {
                log_event(GcEvent::FinalizersRun {
                    space: source_name,
                    count: dead.len(),
                });
            }
            self.stats_mut().finalizers_run += dead.len() as u64;
            for address in dead {
                self.model().finalize(address);
            }
        }

        // Phase 7: remembered-set fixup in the newer generations. Entries
        // keyed by a source address follow the forwarding pointer if the
        // referrer survived and are dropped if it died.
        let mut link = newer;
        while let Some(n) = link {
            for (address, size) in self.space(n.space).remembered_snapshot() {
                if !self.space(source).object_segment_contains(address) {
                    continue;
                }
                self.space_mut(n.space)
                    .forget(address)
                    .expect("remembered-set entry vanished during fixup");
                if self.model().is_forwarded(address) {
                    let forwarded = self.model().forwarding_address(address);
                    self.space_mut(n.space).remember(forwarded, size);
                }
            }
            link = n.parent;
        }
        for (referrer, size) in migrated_referrers {
            if self.model().is_forwarded(referrer) {
                let forwarded = self.model().forwarding_address(referrer);
                self.space_mut(target).remember(forwarded, size);
            }
        }

        // Phase 8: the source is now empty.
        self.space_mut(source).reset();
        Ok(())
    }

    /// Evacuate one word: references into the source are copied out and the
    /// word rebuilt; everything else passes through unchanged
    fn evacuate_word(&mut self, source: SpaceId, target: SpaceId, word: u64) -> u64 {
        if !self.model().is_reference(word) {
            return word;
        }
        let address = self.model().reference_address(word);
        if self.space(source).object_segment_contains(address) {
            let new_address = self.evacuate_object(source, target, address);
            self.model().reference_word(new_address)
        } else if self.space(source).byte_array_segment_contains(address) {
            let new_address = self.evacuate_bytes(source, target, address);
            self.model().reference_word(new_address)
        } else {
            word
        }
    }

    /// Copy one object out of the source, installing a forwarding reference
    ///
    /// Idempotent within a collection: a header that already forwards just
    /// yields the recorded address.
    fn evacuate_object(&mut self, source: SpaceId, target: SpaceId, address: usize) -> usize {
        debug_assert!(self.space(source).object_segment_contains(address));

        if self.model().is_forwarded(address) {
            return self.model().forwarding_address(address);
        }

        let size = self.model().object_size(address);
        let new_address = self
            .space_mut(target)
            .try_allocate_object(size)
            .unwrap_or_else(|| {
                panic!("evacuation target exhausted copying {size} bytes from {address:#x}")
            });
        unsafe { memory::copy_memory(address, new_address, size) };
        self.model().forward_to(address, new_address);

        // A survivor keeps its finalization demand, at its new address.
        if self.space_mut(source).clear_finalizable(address) {
            self.space_mut(target).mark_finalizable(new_address);
        }

        self.stats_mut().objects_evacuated += 1;
        self.stats_mut().bytes_evacuated += size as u64;
        new_address
    }

    /// Copy one byte array out of the source
    ///
    /// Byte arrays have no forwarding header and no finalization; the Mica
    /// object model keeps them uniquely referenced, so a duplicate copy
    /// cannot arise.
    fn evacuate_bytes(&mut self, source: SpaceId, target: SpaceId, address: usize) -> usize {
        debug_assert!(self.space(source).byte_array_segment_contains(address));

        let size = self.model().object_size(address);
        let new_address = self
            .space_mut(target)
            .try_allocate_bytes(size)
            .unwrap_or_else(|| {
                panic!("evacuation target exhausted copying {size} byte-array bytes from {address:#x}")
            });
        unsafe { memory::copy_memory(address, new_address, size) };

        self.stats_mut().byte_arrays_evacuated += 1;
        self.stats_mut().bytes_evacuated += size as u64;
        new_address
    }
}
