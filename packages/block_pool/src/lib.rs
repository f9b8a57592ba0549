//! A fixed-capacity byte pool with best-fit allocation and free-block
//! coalescing over a caller-supplied buffer.
//!
//! This crate provides [`BlockPool`], which borrows a contiguous byte buffer
//! and carves it on demand into variable-size blocks in physical order. The
//! pool never grows: every allocation is served from the one buffer supplied
//! at construction, and capacity exhaustion is reported as a recoverable
//! error rather than a panic.
//!
//! # Key features
//!
//! - **Borrowed storage**: the pool organizes the caller's buffer but never
//!   owns, allocates, or frees it
//! - **Best-fit allocation**: among the free blocks large enough for a
//!   request, the smallest wins, keeping large blocks available
//! - **Splitting and coalescing**: oversized free blocks are split on
//!   allocation; adjacent free blocks are merged back on release
//! - **Opaque handles**: allocations are addressed through [`AllocHandle`],
//!   an index-like token, never through raw pointers
//! - **Loud failure on misuse**: double frees and foreign handles are
//!   detected best-effort and reported as [`Error::InvalidRelease`] instead
//!   of corrupting the block list
//! - **Diagnostics as data**: [`BlockPool::report()`] computes a
//!   [`PoolReport`] with usage, overhead, and fragmentation figures, with a
//!   [`Display`][std::fmt::Display] rendering for operator consumption
//!
//! # Example
//!
//! ```rust
//! use block_pool::BlockPool;
//!
//! let mut buffer = [0_u8; 65536];
//! let mut pool = BlockPool::new(&mut buffer)?;
//!
//! // Allocate a few regions; each handle addresses its own payload slice.
//! let greeting = pool.allocate(16)?.expect("non-zero request yields a handle");
//! let scratch = pool.allocate(1024)?.expect("non-zero request yields a handle");
//!
//! pool.payload_mut(greeting)[..5].copy_from_slice(b"hello");
//! assert_eq!(&pool.payload(greeting)[..5], b"hello");
//!
//! // Releasing merges adjacent free blocks back together.
//! pool.deallocate(Some(scratch))?;
//! pool.deallocate(Some(greeting))?;
//! assert_eq!(pool.block_count(), 1);
//!
//! println!("{}", pool.report());
//! # Ok::<(), block_pool::Error>(())
//! ```
//!
//! # Sizing
//!
//! Payload sizes are rounded up to [`ALIGNMENT`]-byte multiples and every
//! block reserves [`HEADER_SIZE`] bytes of bookkeeping space, so a buffer of
//! `n` bytes can hand out at most `n - HEADER_SIZE` payload bytes in a single
//! allocation, and less in aggregate once it is divided into many blocks.
//!
//! # Thread safety
//!
//! [`BlockPool`] is single-threaded. To share one across threads, wrap it in
//! a `Mutex` and hold the lock for the full duration of each operation;
//! internal list mutation is not atomic across steps.

mod block;
mod error;
mod pool;
mod report;

pub use block::{ALIGNMENT, HEADER_SIZE};
pub use error::Error;
pub use pool::{AllocHandle, BlockPool};
pub use report::PoolReport;
