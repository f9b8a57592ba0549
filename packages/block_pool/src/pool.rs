use std::fmt;

use crate::block::{ALIGNMENT, BlockList, HEADER_SIZE, MIN_SPLIT_REMAINDER};
use crate::error::{Error, Result};
use crate::report::PoolReport;

const ALIGN_MASK: usize = ALIGNMENT - 1;

/// A fixed-capacity pool that carves a borrowed byte buffer into
/// variable-size blocks.
///
/// The pool borrows the buffer for its entire lifetime and never allocates or
/// frees the buffer itself. At construction the whole buffer forms a single
/// free block; [`allocate()`][1] splits blocks off it on demand and
/// [`deallocate()`][2] returns them, merging physically adjacent free blocks
/// back together to fight external fragmentation.
///
/// Allocation is best-fit: among all free blocks large enough for the
/// request, the smallest one wins, with ties going to the lowest offset. If
/// no block qualifies, the pool coalesces adjacent free blocks once and
/// retries before reporting [`Error::OutOfMemory`].
///
/// Payload sizes are rounded up to a multiple of [`ALIGNMENT`] bytes, and
/// every block additionally reserves [`HEADER_SIZE`] bytes of bookkeeping
/// space, so the largest single allocation a fresh pool can satisfy is
/// `capacity - HEADER_SIZE` bytes.
///
/// The pool is single-threaded; wrap it in a `Mutex` if you need to share it,
/// holding the lock for the full duration of every operation.
///
/// # Example
///
/// ```rust
/// use block_pool::BlockPool;
///
/// let mut buffer = [0_u8; 4096];
/// let mut pool = BlockPool::new(&mut buffer)?;
///
/// let handle = pool
///     .allocate(128)?
///     .expect("non-zero allocations always yield a handle");
///
/// pool.payload_mut(handle)[0] = 42;
/// assert_eq!(pool.payload(handle)[0], 42);
///
/// pool.deallocate(Some(handle))?;
/// # Ok::<(), block_pool::Error>(())
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::deallocate
pub struct BlockPool<'b> {
    /// The caller's buffer. Only payload regions are ever touched; the
    /// reserved header region of each block is left as-is.
    buffer: &'b mut [u8],

    blocks: BlockList,
}

impl fmt::Debug for BlockPool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The buffer contents are caller data; render only the pool shape.
        f.debug_struct("BlockPool")
            .field("capacity", &self.buffer.len())
            .field("blocks", &self.blocks)
            .finish()
    }
}

/// An opaque reference to a live allocation in a [`BlockPool`].
///
/// Handles are issued by [`BlockPool::allocate()`] and redeemed through
/// [`BlockPool::payload()`], [`BlockPool::payload_mut()`] and
/// [`BlockPool::deallocate()`]. They play the role a raw payload pointer
/// would play in an in-band allocator, without being dereferenceable.
///
/// # Handle reuse
///
/// Deallocating invalidates the handle. The pool rejects a stale handle as
/// long as no later allocation starts at the same position, but once the
/// region is handed out again an old copy of the handle aliases the new
/// allocation. Do not keep copies of a handle past its deallocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AllocHandle {
    payload_offset: usize,
}

impl<'b> BlockPool<'b> {
    /// Creates a pool over the caller's buffer.
    ///
    /// The buffer is borrowed, not copied; its full length becomes the pool
    /// capacity, fixed for the pool's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityTooSmall`] if the buffer cannot hold even a
    /// single block header.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::{BlockPool, Error};
    ///
    /// let mut buffer = [0_u8; 1024];
    /// let pool = BlockPool::new(&mut buffer)?;
    /// assert_eq!(pool.capacity(), 1024);
    ///
    /// let mut tiny = [0_u8; 8];
    /// assert!(matches!(
    ///     BlockPool::new(&mut tiny),
    ///     Err(Error::CapacityTooSmall { .. })
    /// ));
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    pub fn new(buffer: &'b mut [u8]) -> Result<Self> {
        let capacity = buffer.len();

        if capacity < HEADER_SIZE {
            return Err(Error::CapacityTooSmall {
                capacity,
                minimum: HEADER_SIZE,
            });
        }

        Ok(Self {
            buffer,
            blocks: BlockList::new(capacity),
        })
    }

    /// Total bytes governed by the pool, headers included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The number of blocks the buffer is currently divided into.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the pool holds no live allocations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|(_, block)| block.is_free)
    }

    /// Allocates `size` payload bytes and returns a handle to the new
    /// allocation.
    ///
    /// A zero-size request is not an error; it returns `Ok(None)` without
    /// touching the pool, mirroring a null result.
    ///
    /// The request is rounded up to a multiple of [`ALIGNMENT`] bytes. When
    /// the chosen block is large enough to leave a viable remainder (a header
    /// plus one alignment unit), it is split and the remainder stays free;
    /// otherwise the caller's allocation occupies the whole block and the
    /// rounding overhead is visible in the diagnostics report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] when no free block can satisfy the
    /// request even after coalescing. The pool stays fully usable.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::BlockPool;
    ///
    /// let mut buffer = [0_u8; 1024];
    /// let mut pool = BlockPool::new(&mut buffer)?;
    ///
    /// assert!(pool.allocate(0)?.is_none());
    ///
    /// let handle = pool.allocate(100)?.expect("fits comfortably");
    /// // Payload sizes are rounded up to the alignment unit.
    /// assert_eq!(pool.payload(handle).len(), 104);
    ///
    /// assert!(pool.allocate(100_000).is_err());
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    pub fn allocate(&mut self, size: usize) -> Result<Option<AllocHandle>> {
        if size == 0 {
            return Ok(None);
        }

        // A request too large to even express cannot be satisfied by any pool.
        let needed = Self::needed_block_size(size).ok_or(Error::OutOfMemory { requested: size })?;

        let slot = match self.best_fit(needed) {
            Some(slot) => slot,
            None => {
                // Merging adjacent free blocks may produce a large enough one.
                // One retry only; coalescing again would not change anything.
                self.blocks.coalesce();
                self.best_fit(needed)
                    .ok_or(Error::OutOfMemory { requested: size })?
            }
        };

        let surplus = self
            .blocks
            .block(slot)
            .size
            .checked_sub(needed)
            .expect("best-fit only returns blocks of at least the needed size");

        if surplus >= MIN_SPLIT_REMAINDER {
            self.blocks.split(slot, needed);
        }

        let block = self.blocks.block_mut(slot);
        block.is_free = false;
        let payload_offset = block.payload_offset();

        #[cfg(debug_assertions)]
        self.blocks.integrity_check();

        Ok(Some(AllocHandle { payload_offset }))
    }

    /// Releases the allocation behind `handle` and merges adjacent free
    /// blocks.
    ///
    /// Passing `None` is a no-op, mirroring a null free.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRelease`] if the handle does not refer to a
    /// live allocation: it was never issued by this pool, or it was already
    /// released. The pool is left unchanged in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::{BlockPool, Error};
    ///
    /// let mut buffer = [0_u8; 1024];
    /// let mut pool = BlockPool::new(&mut buffer)?;
    ///
    /// pool.deallocate(None)?; // no-op
    ///
    /// let handle = pool.allocate(64)?;
    /// pool.deallocate(handle)?;
    ///
    /// // Releasing the same handle twice is detected.
    /// assert!(matches!(
    ///     pool.deallocate(handle),
    ///     Err(Error::InvalidRelease)
    /// ));
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    pub fn deallocate(&mut self, handle: Option<AllocHandle>) -> Result<()> {
        let Some(handle) = handle else {
            return Ok(());
        };

        let slot = self.slot_of(handle).ok_or(Error::InvalidRelease)?;

        self.blocks.block_mut(slot).is_free = true;
        self.blocks.coalesce();

        #[cfg(debug_assertions)]
        self.blocks.integrity_check();

        Ok(())
    }

    /// Merges every run of physically adjacent free blocks into one block.
    ///
    /// This runs automatically after every [`deallocate()`][1] and once
    /// inside a failing [`allocate()`][2] before it gives up, so calling it
    /// by hand is rarely needed. It is cheap: a single forward pass over the
    /// block list.
    ///
    /// [1]: Self::deallocate
    /// [2]: Self::allocate
    pub fn coalesce(&mut self) {
        self.blocks.coalesce();

        #[cfg(debug_assertions)]
        self.blocks.integrity_check();
    }

    /// Shared access to the payload bytes of a live allocation.
    ///
    /// The slice is exactly the allocation's rounded-up payload size, which
    /// may exceed the requested size (by alignment rounding, or by the whole
    /// surplus of a block that was too small to split).
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to a live allocation.
    #[must_use]
    pub fn payload(&self, handle: AllocHandle) -> &[u8] {
        let slot = self
            .slot_of(handle)
            .expect("handle was not associated with a live allocation in the pool");
        let block = self.blocks.block(slot);

        self.buffer
            .get(block.payload_offset()..block.end_offset())
            .expect("block bounds are kept inside the buffer by the list invariants")
    }

    /// Exclusive access to the payload bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to a live allocation.
    #[must_use]
    pub fn payload_mut(&mut self, handle: AllocHandle) -> &mut [u8] {
        let slot = self
            .slot_of(handle)
            .expect("handle was not associated with a live allocation in the pool");
        let block = self.blocks.block(slot);
        let range = block.payload_offset()..block.end_offset();

        self.buffer
            .get_mut(range)
            .expect("block bounds are kept inside the buffer by the list invariants")
    }

    /// Computes a point-in-time diagnostics report.
    ///
    /// Read-only; a single pass over the block list.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::BlockPool;
    ///
    /// let mut buffer = [0_u8; 1024];
    /// let mut pool = BlockPool::new(&mut buffer)?;
    /// let _handle = pool.allocate(100)?;
    ///
    /// let report = pool.report();
    /// assert_eq!(report.used_bytes, 104);
    /// assert_eq!(report.used_block_count, 1);
    /// println!("{report}");
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    #[must_use]
    pub fn report(&self) -> PoolReport {
        let mut used_bytes = 0_usize;
        let mut free_bytes = 0_usize;
        let mut overhead_bytes = 0_usize;
        let mut largest_free_bytes = 0_usize;
        let mut used_block_count = 0_usize;
        let mut free_block_count = 0_usize;

        for (_, block) in self.blocks.iter() {
            let payload = block.payload_size();

            overhead_bytes = overhead_bytes
                .checked_add(HEADER_SIZE)
                .expect("total overhead is bounded by the pool capacity");

            if block.is_free {
                free_bytes = free_bytes
                    .checked_add(payload)
                    .expect("total free payload is bounded by the pool capacity");
                free_block_count = free_block_count
                    .checked_add(1)
                    .expect("block count is bounded by the pool capacity");
                largest_free_bytes = largest_free_bytes.max(payload);
            } else {
                used_bytes = used_bytes
                    .checked_add(payload)
                    .expect("total used payload is bounded by the pool capacity");
                used_block_count = used_block_count
                    .checked_add(1)
                    .expect("block count is bounded by the pool capacity");
            }
        }

        let fragmentation_pct = if free_bytes > 0 {
            #[expect(
                clippy::cast_precision_loss,
                reason = "diagnostic percentage does not need integer-exact inputs"
            )]
            let largest_share = largest_free_bytes as f64 / free_bytes as f64;
            (1.0 - largest_share) * 100.0
        } else {
            0.0
        };

        PoolReport {
            capacity: self.capacity(),
            used_bytes,
            free_bytes,
            overhead_bytes,
            largest_free_bytes,
            fragmentation_pct,
            used_block_count,
            free_block_count,
        }
    }

    /// The total block size needed to serve a `size`-byte request: the size
    /// rounded up to the alignment unit, plus the header region.
    ///
    /// `None` when the arithmetic overflows, meaning no pool could ever
    /// satisfy the request.
    fn needed_block_size(size: usize) -> Option<usize> {
        let aligned = size.checked_add(ALIGN_MASK)? & !ALIGN_MASK;
        aligned.checked_add(HEADER_SIZE)
    }

    /// The free block best suited for a `needed`-byte block: the smallest
    /// one of sufficient size. The strict comparison keeps the earliest
    /// (lowest-offset) block on ties.
    #[must_use]
    fn best_fit(&self, needed: usize) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;

        for (slot, block) in self.blocks.iter() {
            if block.is_free
                && block.size >= needed
                && best.is_none_or(|(_, best_size)| block.size < best_size)
            {
                best = Some((slot, block.size));
            }
        }

        best.map(|(slot, _)| slot)
    }

    /// The slot whose block is a live allocation with this handle's payload
    /// offset, if any. Stale and foreign handles resolve to `None`.
    #[must_use]
    fn slot_of(&self, handle: AllocHandle) -> Option<usize> {
        self.blocks
            .iter()
            .find(|(_, block)| !block.is_free && block.payload_offset() == handle.payload_offset)
            .map(|(slot, _)| slot)
    }
}
