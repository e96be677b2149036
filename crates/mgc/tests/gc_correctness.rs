//! GC Correctness Tests - Evacuation and Reference Fixup
//!
//! These tests verify that:
//! - Rooted objects survive collection and their references stay coherent
//! - Shared referents stay shared through forwarding
//! - Recursive collections keep every space mutually consistent

mod common;

use common::{assert_in_space, HeapFixture, WORD};
use mgc::object::header::encode_small_int;
use mgc::SpaceId;

/// Tenure with a cross-object reference: both objects relocate and the
/// slot still resolves
///
/// **Bug this finds:** children not scanned after root evacuation, slot
/// words left pointing at the dead space
#[test]
fn test_tenure_with_cross_object_reference() {
    let mut fixture = HeapFixture::new();

    let a = fixture.new_object(&[encode_small_int(7)]);
    let b = fixture.new_object(&[a]);
    let b_root = fixture.push_root(b);

    fixture.collect_eden();

    let b_moved = fixture.root(b_root);
    assert_ne!(b_moved, b, "B should have been relocated");
    assert_in_space(&fixture, b_moved, SpaceId::From, "B after tenure");

    let a_moved = fixture.read_slot(b_moved, 0);
    assert_ne!(a_moved, a, "B's slot should point at the relocated A");
    assert_in_space(&fixture, a_moved, SpaceId::From, "A after tenure");
    assert_eq!(
        fixture.read_slot(a_moved, 0),
        encode_small_int(7),
        "A's payload should survive the copy"
    );

    assert!(
        fixture.heap.space_usage(SpaceId::Eden).used == 0,
        "eden should be empty after its collection"
    );
}

/// Two objects pointing at one referent still share it after collection
///
/// **Bug this finds:** forwarding not installed or not consulted, referent
/// duplicated
#[test]
fn test_shared_referent_stays_shared() {
    let mut fixture = HeapFixture::new();

    let name = fixture.new_object(&[encode_small_int(1234)]);
    let b = fixture.new_object(&[name]);
    let c = fixture.new_object(&[name]);
    let b_root = fixture.push_root(b);
    let c_root = fixture.push_root(c);

    let evacuated_before = fixture.heap.stats().objects_evacuated;
    fixture.collect_eden();

    let b_name = fixture.read_slot(fixture.root(b_root), 0);
    let c_name = fixture.read_slot(fixture.root(c_root), 0);
    assert_eq!(
        b_name, c_name,
        "both holders should resolve to the same relocated referent"
    );
    assert_eq!(
        fixture.heap.stats().objects_evacuated - evacuated_before,
        3,
        "exactly B, C, and the shared referent should have been copied"
    );
}

/// A scavenge moves survivors to the sibling semi-space and swaps, so the
/// survivor is still "in from-space"
///
/// **Bug this finds:** swap exchanging identity instead of contents,
/// handle cells left pointing into the vacated memory
#[test]
fn test_scavenge_swaps_semi_spaces() {
    let mut fixture = HeapFixture::new();

    let obj = fixture.new_object(&[encode_small_int(5)]);
    let root = fixture.push_root(obj);
    fixture.collect_eden();

    let in_from = fixture.root(root);
    assert_in_space(&fixture, in_from, SpaceId::From, "before scavenge");

    fixture.collect_from();

    let after = fixture.root(root);
    assert_ne!(after, in_from, "the scavenge should have moved the object");
    assert_in_space(&fixture, after, SpaceId::From, "after scavenge and swap");
    assert_eq!(fixture.read_slot(after, 0), encode_small_int(5));
}

/// Deep list survives repeated collections intact
///
/// **Bug this finds:** transitive reachability broken, payload corruption
/// across multiple copies
#[test]
fn test_deep_structure_survives_repeated_collections() {
    let mut fixture = HeapFixture::new();

    // A chain of 32 cells, each holding (value, next).
    let mut next = 0u64;
    for i in (0..32).rev() {
        next = fixture.new_object(&[encode_small_int(i), next]);
    }
    let root = fixture.push_root(next);

    fixture.collect_eden();
    fixture.collect_from();
    fixture.collect_from();

    let mut cell = fixture.root(root);
    for expected in 0..32 {
        assert_eq!(
            fixture.read_slot(cell, 0),
            encode_small_int(expected),
            "cell {expected} lost its value"
        );
        cell = fixture.read_slot(cell, 1);
    }
    assert_eq!(cell, 0, "the chain should end in nil");
}

/// Recursive collection: eden's collection forces from-space to scavenge
/// first, and every reference across the three spaces stays consistent
///
/// **Bug this finds:** newer-generation links not scanned, remembered-set
/// keys left pointing at the swapped-out semi-space, dangling roots
#[test]
fn test_recursive_collection() {
    let mut fixture = HeapFixture::new();
    let from_capacity = fixture.heap.space_usage(SpaceId::From).capacity;

    // Plant a live object X in from-space.
    let x = fixture.new_object(&[encode_small_int(0)]);
    let x_root = fixture.push_root(x);
    fixture.collect_eden();
    let x = fixture.root(x_root);
    assert_in_space(&fixture, x, SpaceId::From, "X planted");

    // Fill from-space with dead weight: tenure rooted batches out of eden,
    // then drop the roots so the batches become garbage in from-space.
    let eden_capacity = fixture.heap.space_usage(SpaceId::Eden).capacity;
    while fixture.heap.used_in(SpaceId::From) + eden_capacity <= from_capacity {
        let base = fixture.stack.borrow().len();
        while fixture.heap.free_in_eden() >= 2 * WORD {
            let filler = fixture.new_object(&[encode_small_int(9)]);
            fixture.push_root(filler);
        }
        fixture.collect_eden();
        while fixture.stack.borrow().len() > base {
            fixture.pop_root();
        }
    }
    assert!(
        fixture.heap.free_in(SpaceId::From) < eden_capacity,
        "from-space must be too full to absorb a whole eden"
    );

    // A rooted eden object E referencing X, and X referencing E back
    // through the write barrier.
    let x = fixture.root(x_root);
    let e = fixture.new_object(&[x]);
    let e_root = fixture.push_root(e);
    fixture.write_slot(x, 0, e);
    fixture.heap.remember_object_reference(x, e);
    assert!(
        fixture.heap.is_remembered_in(SpaceId::Eden, fixture.addr(x)),
        "the barrier should have recorded X in eden's remembered set"
    );

    // Exhaust eden, then allocate. Eden's collection cannot fit its live
    // set into from-space, so from-space must scavenge first.
    fixture.fill_eden_with_garbage();
    let scavenges_before = fixture.heap.stats().scavenges;
    let addr = fixture.heap.allocate_object(16).unwrap();
    assert!(addr != 0);
    assert!(
        fixture.heap.stats().scavenges > scavenges_before,
        "the eden collection should have forced a from-space scavenge"
    );

    // X moved with the scavenge, E tenured into from-space, and the two
    // still point at each other.
    let x = fixture.root(x_root);
    let e = fixture.root(e_root);
    assert_in_space(&fixture, x, SpaceId::From, "X after the cascade");
    assert_in_space(&fixture, e, SpaceId::From, "E after the cascade");
    assert_eq!(
        fixture.read_slot(x, 0),
        e,
        "X's slot should follow E through the cascade"
    );
    assert_eq!(
        fixture.read_slot(e, 0),
        x,
        "E's slot should follow X through the scavenge"
    );

    // The write-barrier record migrated with X.
    assert!(
        fixture
            .heap
            .is_remembered_in(SpaceId::From, fixture.addr(x)),
        "the remembered-set entry should be keyed by X's new address"
    );

    // From-space holds exactly X, E, and the fresh allocation's tenure
    // sources: the garbage died.
    assert_eq!(
        fixture.heap.used_in(SpaceId::From),
        2 * 2 * WORD,
        "only X and E should have survived into from-space"
    );
}
