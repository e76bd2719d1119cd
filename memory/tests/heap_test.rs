use memory::{Address, Heap, HeapConfig, MemoryError, SlotKind, StackEntry};

fn small_heap() -> Heap {
    Heap::with_config(HeapConfig {
        size_bytes: 128,
        cell_size: 8,
    })
}

#[test]
fn test_alloc_rounds_up_to_cells() {
    let mut heap = small_heap();
    assert_eq!(heap.cells().len(), 16);

    let a = heap.alloc(9).unwrap();
    assert_eq!(a, Address::heap(0));
    assert_eq!(heap.block_len(a), Some(2));
    assert_eq!(heap.used_cells(), 2);

    let b = heap.alloc(1).unwrap();
    assert_eq!(b, Address::heap(16));
    assert_eq!(heap.used_cells(), 3);
}

#[test]
fn test_alloc_zero_takes_one_cell() {
    let mut heap = small_heap();
    let a = heap.alloc(0).unwrap();
    let b = heap.alloc(0).unwrap();
    assert_ne!(a, b);
    assert_eq!(heap.used_cells(), 2);
}

#[test]
fn test_first_fit_reuses_hole() {
    let mut heap = small_heap();
    let a = heap.alloc(16).unwrap();
    let _b = heap.alloc(16).unwrap();
    heap.free(a).unwrap();

    // an 8-byte request fits in the freed hole at the front
    let c = heap.alloc(8).unwrap();
    assert_eq!(c, a);

    // a 24-byte request doesn't fit in the remaining one-cell hole
    let d = heap.alloc(24).unwrap();
    assert_eq!(d, Address::heap(32));
}

#[test]
fn test_alloc_free_restores_bitmap() {
    let mut heap = small_heap();
    let _keep = heap.alloc(20).unwrap();
    let before = heap.cells().clone();

    let tmp = heap.alloc(40).unwrap();
    assert_ne!(heap.cells(), &before);
    heap.free(tmp).unwrap();
    assert_eq!(heap.cells(), &before);
}

#[test]
fn test_out_of_memory() {
    let mut heap = small_heap();
    heap.alloc(120).unwrap();
    assert_eq!(
        heap.alloc(16),
        Err(MemoryError::OutOfMemory { requested: 16 })
    );
    // the last cell is still usable
    assert!(heap.alloc(8).is_ok());
}

#[test]
fn test_invalid_free_leaves_bitmap_untouched() {
    let mut heap = small_heap();
    let a = heap.alloc(16).unwrap();
    let before = heap.cells().clone();

    // interior pointer
    let inner = a.offset_by(8).unwrap();
    assert_eq!(heap.free(inner), Err(MemoryError::InvalidFree(inner)));
    // never allocated
    assert_eq!(
        heap.free(Address::heap(64)),
        Err(MemoryError::InvalidFree(Address::heap(64)))
    );
    // unaligned
    assert!(heap.free(Address::heap(3)).is_err());
    // stack address
    assert!(heap.free(Address::stack(0)).is_err());
    assert_eq!(heap.cells(), &before);

    heap.free(a).unwrap();
    // double free
    assert_eq!(heap.free(a), Err(MemoryError::InvalidFree(a)));
    assert_eq!(heap.used_cells(), 0);
}

#[test]
fn test_typed_read_write() {
    let mut heap = small_heap();
    let a = heap.alloc(16).unwrap();
    heap.write(a, StackEntry::Int(-7)).unwrap();
    heap.write(a.offset_by(4).unwrap(), StackEntry::Byte(0xAB)).unwrap();
    heap.write(a.offset_by(8).unwrap(), StackEntry::Ref(a)).unwrap();

    assert_eq!(heap.read(a, SlotKind::Int).unwrap(), StackEntry::Int(-7));
    assert_eq!(
        heap.read(a.offset_by(4).unwrap(), SlotKind::Byte).unwrap(),
        StackEntry::Byte(0xAB)
    );
    assert_eq!(
        heap.read(a.offset_by(8).unwrap(), SlotKind::Ref).unwrap(),
        StackEntry::Ref(a)
    );
    assert_eq!(heap.read_bytes(a, 4).unwrap(), &(-7i32).to_le_bytes());
}

#[test]
fn test_alloc_zero_fills_reused_cells() {
    let mut heap = small_heap();
    let a = heap.alloc(8).unwrap();
    heap.write(a, StackEntry::Int(0x5555)).unwrap();
    heap.free(a).unwrap();
    let b = heap.alloc(8).unwrap();
    assert_eq!(a, b);
    assert_eq!(heap.read(b, SlotKind::Int).unwrap(), StackEntry::Int(0));
}

#[test]
fn test_read_past_arena_is_out_of_bounds() {
    let heap = small_heap();
    let last = Address::heap(126);
    assert_eq!(
        heap.read(last, SlotKind::Int),
        Err(MemoryError::OutOfBounds {
            address: last,
            len: 4
        })
    );
    assert!(heap.read(last, SlotKind::Byte).is_ok());
    assert_eq!(
        heap.read(Address::stack(0), SlotKind::Byte),
        Err(MemoryError::RegionMismatch(Address::stack(0)))
    );
}

#[test]
fn test_copy_between_blocks() {
    let mut heap = small_heap();
    let src = heap.alloc(8).unwrap();
    let dst = heap.alloc(8).unwrap();
    heap.write_bytes(src, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    heap.copy(src, dst, 8).unwrap();
    assert_eq!(heap.read_bytes(dst, 8).unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_copy_overlapping_is_memmove() {
    let mut heap = small_heap();
    let a = heap.alloc(16).unwrap();
    heap.write_bytes(a, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    // shift right by two, overlapping
    heap.copy(a, a.offset_by(2).unwrap(), 6).unwrap();
    assert_eq!(heap.read_bytes(a, 8).unwrap(), &[1, 2, 1, 2, 3, 4, 5, 6]);

    // and back left
    heap.copy(a.offset_by(2).unwrap(), a, 6).unwrap();
    assert_eq!(heap.read_bytes(a, 6).unwrap(), &[1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_copy_out_of_arena_fails() {
    let mut heap = small_heap();
    let a = heap.alloc(8).unwrap();
    let err = heap.copy(a, Address::heap(124), 8).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfBounds { .. }));
    assert!(heap.copy(Address::stack(0), a, 1).is_err());
}
