//! End-to-end scenarios for the `block_pool` package.
//!
//! These tests drive a realistically sized pool through the full allocate /
//! release / re-allocate lifecycle and verify the externally observable
//! accounting at each step.

use block_pool::{BlockPool, Error, HEADER_SIZE};

const POOL_SIZE: usize = 1024 * 1024;

#[test]
fn one_megabyte_walkthrough() {
    let mut buffer = vec![0_u8; POOL_SIZE];
    let mut pool = BlockPool::new(&mut buffer).unwrap();

    assert_eq!(pool.capacity(), POOL_SIZE);

    // Five allocations of increasing size, all expected to succeed.
    let sizes = [128_usize, 256, 512, 1024, 2048];
    let handles: Vec<_> = sizes
        .iter()
        .map(|&size| pool.allocate(size).unwrap().unwrap())
        .collect();

    // All five handles are distinct.
    for (index, &handle) in handles.iter().enumerate() {
        for &other in handles.iter().skip(index + 1) {
            assert_ne!(handle, other);
        }
    }

    // Stamping each payload and re-reading proves the regions are disjoint.
    for (index, &handle) in handles.iter().enumerate() {
        pool.payload_mut(handle).fill(u8::try_from(index).unwrap());
    }
    for (index, &handle) in handles.iter().enumerate() {
        let expected = u8::try_from(index).unwrap();
        assert!(pool.payload(handle).iter().all(|&byte| byte == expected));
    }

    let before = pool.report();
    assert_eq!(before.used_block_count, 5);
    assert_eq!(before.used_bytes, sizes.iter().sum::<usize>());

    // Release the 256-byte and 1024-byte allocations. Their neighbors are
    // still live, so the freed regions cannot merge with each other.
    pool.deallocate(Some(handles[1])).unwrap();
    pool.deallocate(Some(handles[3])).unwrap();

    let after = pool.report();
    assert_eq!(after.free_bytes, before.free_bytes + 256 + 1024);
    assert_eq!(after.used_block_count, 3);
    assert_eq!(after.free_block_count, 3);

    // A 1500-byte request is served from the remaining capacity.
    let midsize = pool.allocate(1500).unwrap().unwrap();
    assert!(pool.payload(midsize).len() >= 1500);

    // More payload than the buffer can ever hold next to a header.
    assert!(matches!(
        pool.allocate(POOL_SIZE - HEADER_SIZE + 1),
        Err(Error::OutOfMemory { .. })
    ));

    // Release everything; the pool must collapse back to one spanning block.
    pool.deallocate(Some(midsize)).unwrap();
    pool.deallocate(Some(handles[0])).unwrap();
    pool.deallocate(Some(handles[2])).unwrap();
    pool.deallocate(Some(handles[4])).unwrap();

    assert!(pool.is_empty());
    assert_eq!(pool.block_count(), 1);

    // The fully freed pool satisfies the maximal single allocation.
    let maximal = pool.allocate(POOL_SIZE - HEADER_SIZE).unwrap().unwrap();
    assert_eq!(pool.payload(maximal).len(), POOL_SIZE - HEADER_SIZE);
    pool.deallocate(Some(maximal)).unwrap();
}

#[test]
fn fragmentation_is_visible_and_recovers() {
    let mut buffer = vec![0_u8; POOL_SIZE];
    let mut pool = BlockPool::new(&mut buffer).unwrap();

    // A fresh pool has a single free block: zero fragmentation.
    let fresh = pool.report();
    assert!(fresh.fragmentation_pct.abs() < f64::EPSILON);
    assert_eq!(fresh.largest_free_bytes, fresh.free_bytes);

    // Interleave allocations, then free every other one to pepper the pool
    // with free holes the survivors keep apart.
    let handles: Vec<_> = (0..16)
        .map(|_| pool.allocate(1024).unwrap().unwrap())
        .collect();
    for &handle in handles.iter().step_by(2) {
        pool.deallocate(Some(handle)).unwrap();
    }

    let fragmented = pool.report();
    assert!(fragmented.free_block_count > 1);
    assert!(fragmented.fragmentation_pct > 0.0);
    assert!(fragmented.largest_free_bytes < fragmented.free_bytes);

    // Freeing the survivors lets coalescing restore a single free block.
    for &handle in handles.iter().skip(1).step_by(2) {
        pool.deallocate(Some(handle)).unwrap();
    }

    let recovered = pool.report();
    assert_eq!(recovered.free_block_count, 1);
    assert!(recovered.fragmentation_pct.abs() < f64::EPSILON);
}

#[test]
fn report_totals_tile_the_capacity() {
    let mut buffer = vec![0_u8; POOL_SIZE];
    let mut pool = BlockPool::new(&mut buffer).unwrap();

    let mut live = Vec::new();
    for size in [40, 333, 8, 4096, 1, 2000] {
        live.push(pool.allocate(size).unwrap().unwrap());

        let report = pool.report();
        assert_eq!(
            report.used_bytes + report.free_bytes + report.overhead_bytes,
            POOL_SIZE
        );
    }

    for handle in live {
        pool.deallocate(Some(handle)).unwrap();

        let report = pool.report();
        assert_eq!(
            report.used_bytes + report.free_bytes + report.overhead_bytes,
            POOL_SIZE
        );
    }
}

#[test]
fn rendered_report_matches_the_value() {
    let mut buffer = vec![0_u8; POOL_SIZE];
    let mut pool = BlockPool::new(&mut buffer).unwrap();
    let _handle = pool.allocate(500).unwrap().unwrap();

    let report = pool.report();
    let rendered = report.to_string();

    assert!(rendered.contains(&format!("Total pool size: {POOL_SIZE} bytes")));
    assert!(rendered.contains(&format!(
        "Used by allocations: {} bytes ({} blocks)",
        report.used_bytes, report.used_block_count
    )));
    assert!(rendered.contains(&format!(
        "Largest free block: {} bytes",
        report.largest_free_bytes
    )));
}
