//! Test Utilities for the MGC Suite
//!
//! Provides a fixture with a recording finalizer, a shadow activation
//! stack, and helpers for building tagged objects directly in heap memory.
//! Assertions are strict: any drift in an address, payload, or set count is
//! a collector bug.

#![allow(dead_code)]

use mgc::object::header::write_object_header;
use mgc::{Heap, HeapConfig, MicaObjectModel, ObjectModel, ShadowStack, SpaceId};
use std::cell::RefCell;
use std::rc::Rc;

/// Machine word size in bytes
pub const WORD: usize = 8;

/// Test fixture for heap operations
///
/// Owns a small heap wired to a shadow activation stack, and records every
/// finalizer invocation.
pub struct HeapFixture {
    pub heap: Heap<MicaObjectModel>,
    pub stack: Rc<RefCell<ShadowStack>>,
    pub finalized: Rc<RefCell<Vec<usize>>>,
}

impl HeapFixture {
    /// Fixture with a few KB per space
    pub fn new() -> Self {
        Self::with_config(HeapConfig::small_for_tests())
    }

    /// Fixture with the default production sizes (1MB eden, 4MB semi-spaces)
    pub fn with_default_sizes() -> Self {
        Self::with_config(HeapConfig::default())
    }

    pub fn with_config(config: HeapConfig) -> Self {
        let finalized = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&finalized);
        let model = MicaObjectModel::with_finalizer(move |address| {
            recorder.borrow_mut().push(address);
        });

        let mut heap = Heap::new(config, model).expect("heap construction should succeed");
        let stack = Rc::new(RefCell::new(ShadowStack::new()));
        heap.set_activation_stack(Some(stack.clone()));

        Self {
            heap,
            stack,
            finalized,
        }
    }

    // --- object construction ---

    /// Allocate an object with a tagged header and the given slot words,
    /// returning its reference word
    pub fn new_object(&mut self, slots: &[u64]) -> u64 {
        let size = WORD * (1 + slots.len());
        let address = self
            .heap
            .allocate_object(size)
            .expect("object allocation should succeed");
        unsafe {
            write_object_header(address, 0, size);
            for (index, &slot) in slots.iter().enumerate() {
                mgc::memory::write_word(address + WORD * (1 + index), slot);
            }
        }
        self.heap.model().reference_word(address)
    }

    /// Allocate a byte array with a tagged header and the given payload
    /// words, returning its reference word
    pub fn new_byte_array(&mut self, payload: &[u64]) -> u64 {
        let size = WORD * (1 + payload.len());
        let address = self
            .heap
            .allocate_bytes(size)
            .expect("byte-array allocation should succeed");
        unsafe {
            write_object_header(address, 1, size);
            for (index, &word) in payload.iter().enumerate() {
                mgc::memory::write_word(address + WORD * (1 + index), word);
            }
        }
        self.heap.model().reference_word(address)
    }

    /// Address encoded by a reference word
    pub fn addr(&self, reference: u64) -> usize {
        self.heap.model().reference_address(reference)
    }

    /// Read slot `index` of the object behind `reference`
    pub fn read_slot(&self, reference: u64, index: usize) -> u64 {
        unsafe { mgc::memory::read_word(self.addr(reference) + WORD * (1 + index)) }
    }

    /// Overwrite slot `index` of the object behind `reference`
    ///
    /// Raw store; callers follow up with the write barrier when the store
    /// crosses generations.
    pub fn write_slot(&mut self, reference: u64, index: usize, value: u64) {
        unsafe { mgc::memory::write_word(self.addr(reference) + WORD * (1 + index), value) };
    }

    // --- roots ---

    /// Push an activation root, returning its index
    pub fn push_root(&mut self, reference: u64) -> usize {
        self.stack.borrow_mut().push(reference)
    }

    /// Read the activation root at `index`
    pub fn root(&self, index: usize) -> u64 {
        self.stack.borrow().get(index)
    }

    /// Pop the most recent activation root
    pub fn pop_root(&mut self) -> Option<u64> {
        self.stack.borrow_mut().pop()
    }

    // --- collection driving ---

    /// Collect eden, tenuring survivors into from-space
    pub fn collect_eden(&mut self) {
        self.heap
            .collect(SpaceId::Eden)
            .expect("eden collection should succeed");
    }

    /// Scavenge from-space into to-space (and swap)
    pub fn collect_from(&mut self) {
        self.heap
            .collect(SpaceId::From)
            .expect("from-space collection should succeed");
    }

    /// Fill eden completely with well-formed garbage objects
    pub fn fill_eden_with_garbage(&mut self) {
        while self.heap.free_in_eden() >= 2 * WORD {
            self.new_object(&[mgc::object::header::encode_small_int(0)]);
        }
        if self.heap.free_in_eden() == WORD {
            self.new_object(&[]);
        }
        assert_eq!(self.heap.free_in_eden(), 0, "eden should be exactly full");
    }

    /// Number of finalizer invocations recorded so far
    pub fn finalized_count(&self) -> usize {
        self.finalized.borrow().len()
    }
}

/// Assert that an address is word-aligned
///
/// **Bug this finds:** alignment bugs in the bump allocators
#[track_caller]
pub fn assert_word_aligned(address: usize, context: &str) {
    assert_eq!(
        address % WORD,
        0,
        "{context}: address {address:#x} is not word-aligned"
    );
}

/// Assert that a reference currently resolves into the expected space
///
/// **Bug this finds:** evacuations landing in the wrong space, missed
/// reference fixups
#[track_caller]
pub fn assert_in_space(fixture: &HeapFixture, reference: u64, expected: SpaceId, context: &str) {
    let address = fixture.addr(reference);
    assert_eq!(
        fixture.heap.space_containing(address),
        Some(expected),
        "{context}: {address:#x} is not in {expected:?}"
    );
}
