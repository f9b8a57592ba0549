//! Basic usage of the `block_pool` crate:
//!
//! * Creating a pool over a borrowed buffer.
//! * Allocating regions.
//! * Reading and writing payload bytes.
//! * Releasing regions.

use block_pool::BlockPool;

fn main() {
    let mut buffer = [0_u8; 4096];
    let mut pool = BlockPool::new(&mut buffer).expect("4 KiB comfortably holds a block header");

    // Allocating gives you a handle that you can later use to reach the
    // payload bytes or release the region again.
    let name = pool
        .allocate(16)
        .expect("pool has room")
        .expect("non-zero request yields a handle");

    pool.payload_mut(name)[..5].copy_from_slice(b"Alice");
    println!(
        "Stored {:?} in a {}-byte region",
        &pool.payload(name)[..5],
        pool.payload(name).len()
    );

    println!(
        "The pool is divided into {} blocks at this point",
        pool.block_count()
    );

    // Releasing merges adjacent free blocks, so a fully released pool is one
    // spanning free block again.
    pool.deallocate(Some(name)).expect("handle is live");
    println!(
        "After release the pool is back to {} block",
        pool.block_count()
    );
}
