//! Walks a 1 MiB pool through a mixed allocate/release workload and prints
//! the diagnostics report after each phase, showing how fragmentation
//! appears and how coalescing recovers from it.

use block_pool::{BlockPool, Error};

const POOL_SIZE: usize = 1024 * 1024;

fn main() {
    let mut buffer = vec![0_u8; POOL_SIZE];
    let mut pool = BlockPool::new(&mut buffer).expect("1 MiB holds a block header many times over");

    println!("Memory pool created (1 MiB)");
    println!("{}\n", pool.report());

    println!("Allocating memory blocks...");
    let mut handles: Vec<Option<block_pool::AllocHandle>> = Vec::new();
    for size in [128, 256, 512, 1024, 2048] {
        handles.push(Some(
            pool.allocate(size)
                .expect("a fresh 1 MiB pool fits all of these")
                .expect("non-zero request yields a handle"),
        ));
    }
    println!("{}\n", pool.report());

    println!("Releasing some allocations...");
    for index in [1, 3] {
        pool.deallocate(handles[index].take())
            .expect("handles are live");
    }
    println!("{}\n", pool.report());

    println!("Allocating more blocks...");
    for size in [1500, 800, 3000] {
        handles.push(Some(
            pool.allocate(size)
                .expect("plenty of capacity remains")
                .expect("non-zero request yields a handle"),
        ));
    }
    println!("{}\n", pool.report());

    println!("Releasing all allocations...");
    for handle in handles.drain(..) {
        pool.deallocate(handle).expect("live or already-None handles");
    }
    println!("{}\n", pool.report());

    println!("Testing oversized allocation (should fail)...");
    match pool.allocate(POOL_SIZE) {
        Err(Error::OutOfMemory { requested }) => {
            println!("Expected failure: no block fits {requested} bytes");
        }
        other => panic!("oversized allocation did not fail: {other:?}"),
    }

    println!("\nTesting maximum possible allocation...");
    let maximal = pool
        .allocate(POOL_SIZE - block_pool::HEADER_SIZE)
        .expect("the fully freed pool serves its maximal allocation")
        .expect("non-zero request yields a handle");
    println!("Maximal allocation succeeded as expected");
    pool.deallocate(Some(maximal)).expect("handle is live");

    println!("{}", pool.report());
}
