//! Side-arena storage for block descriptors.
//!
//! The descriptors of a [`BlockPool`][crate::BlockPool] do not live inside the
//! pooled buffer. They are kept here, in a slot arena with an intrusive
//! vacant-slot freelist, and reference each other by slot index. This keeps
//! every list mutation (split, merge) in safe code while preserving O(1)
//! neighbor access in physical order.

use std::iter;

/// Bytes reserved at the start of every block for bookkeeping.
///
/// The descriptors live outside the buffer, but each block still sets aside
/// this much space so that capacity accounting and the minimum viable block
/// size match what an in-band header would consume. Payloads start this many
/// bytes past the block start.
pub const HEADER_SIZE: usize = 40;

/// Payload sizes are rounded up to a multiple of this many bytes.
pub const ALIGNMENT: usize = 8;

/// The smallest remainder worth carving off as its own block during a split:
/// a header plus one alignment unit of payload.
pub(crate) const MIN_SPLIT_REMAINDER: usize = HEADER_SIZE + ALIGNMENT;

/// Descriptor of one contiguous sub-region of the pooled buffer.
///
/// `prev` and `next` are slot indices into the owning [`BlockList`], ordered
/// by ascending offset. A block always spans `[offset, offset + size)` in the
/// buffer, with the payload starting `HEADER_SIZE` bytes in.
#[derive(Debug)]
pub(crate) struct Block {
    /// Offset of the block from the start of the buffer.
    pub(crate) offset: usize,

    /// Bytes spanned by this block, including the reserved header region.
    pub(crate) size: usize,

    /// Whether the block is available for allocation.
    pub(crate) is_free: bool,

    /// Slot of the physically preceding block, if any.
    pub(crate) prev: Option<usize>,

    /// Slot of the physically following block, if any.
    pub(crate) next: Option<usize>,
}

impl Block {
    /// Offset of the first payload byte.
    #[must_use]
    pub(crate) fn payload_offset(&self) -> usize {
        self.offset
            .checked_add(HEADER_SIZE)
            .expect("block offset + header cannot overflow because the block fits in the buffer")
    }

    /// Bytes available to the caller in this block.
    #[must_use]
    pub(crate) fn payload_size(&self) -> usize {
        self.size
            .checked_sub(HEADER_SIZE)
            .expect("every block is at least one header in size")
    }

    /// Offset of the first byte past the block.
    #[must_use]
    pub(crate) fn end_offset(&self) -> usize {
        self.offset
            .checked_add(self.size)
            .expect("block end cannot overflow because the block fits in the buffer")
    }
}

#[derive(Debug)]
enum Entry {
    Occupied(Block),

    Vacant { next_free_slot: Option<usize> },
}

/// The physical-order block list, stored as a slot arena.
///
/// Slots vacated by merges form an intrusive freelist (the same scheme the
/// occupancy arena uses entry-by-entry), so splits reuse them before the
/// arena grows.
#[derive(Debug)]
pub(crate) struct BlockList {
    entries: Vec<Entry>,

    /// Slot of the first (lowest-offset) block. Always occupied.
    head: usize,

    /// Top of the vacant-slot freelist.
    first_free_slot: Option<usize>,

    /// Total bytes governed by the list. The sizes of all blocks sum to
    /// exactly this at all times.
    capacity: usize,
}

impl BlockList {
    /// Creates a list with a single free block spanning `capacity` bytes.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(
            capacity >= HEADER_SIZE,
            "block list capacity must hold at least one header"
        );

        Self {
            entries: vec![Entry::Occupied(Block {
                offset: 0,
                size: capacity,
                is_free: true,
                prev: None,
                next: None,
            })],
            head: 0,
            first_free_slot: None,
            capacity,
        }
    }

    #[must_use]
    pub(crate) fn head(&self) -> usize {
        self.head
    }

    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    #[must_use]
    pub(crate) fn block(&self, slot: usize) -> &Block {
        match self.entries.get(slot) {
            Some(Entry::Occupied(block)) => block,
            _ => panic!("slot {slot} does not hold a block"),
        }
    }

    /// # Panics
    ///
    /// Panics if the slot is out of bounds or vacant.
    #[must_use]
    pub(crate) fn block_mut(&mut self, slot: usize) -> &mut Block {
        match self.entries.get_mut(slot) {
            Some(Entry::Occupied(block)) => block,
            _ => panic!("slot {slot} does not hold a block"),
        }
    }

    /// Visits every block in physical order, lowest offset first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &Block)> {
        let mut cursor = Some(self.head);

        iter::from_fn(move || {
            let slot = cursor?;
            let block = self.block(slot);
            cursor = block.next;
            Some((slot, block))
        })
    }

    /// The number of blocks currently in the list.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }

    /// Shrinks the block at `slot` to `needed` bytes and inserts a new free
    /// block covering the remainder immediately after it.
    ///
    /// The caller must have verified that the remainder is at least
    /// [`MIN_SPLIT_REMAINDER`] bytes.
    pub(crate) fn split(&mut self, slot: usize, needed: usize) {
        let block = self.block(slot);

        let remainder = block
            .size
            .checked_sub(needed)
            .expect("split target was selected to be at least `needed` bytes");
        debug_assert!(remainder >= MIN_SPLIT_REMAINDER);

        let remainder_offset = block
            .offset
            .checked_add(needed)
            .expect("remainder starts within the buffer, so this cannot overflow");
        let old_next = block.next;

        let new_slot = self.claim_slot(Block {
            offset: remainder_offset,
            size: remainder,
            is_free: true,
            prev: Some(slot),
            next: old_next,
        });

        {
            let block = self.block_mut(slot);
            block.size = needed;
            block.next = Some(new_slot);
        }

        if let Some(next_slot) = old_next {
            self.block_mut(next_slot).prev = Some(new_slot);
        }
    }

    /// Merges the physical successor of `slot` into the block at `slot`,
    /// releasing the successor's slot back to the freelist.
    ///
    /// # Panics
    ///
    /// Panics if the block at `slot` has no successor.
    fn merge_with_next(&mut self, slot: usize) {
        let next_slot = self
            .block(slot)
            .next
            .expect("merge requires a physical successor");

        let (absorbed_size, new_next) = {
            let next = self.block(next_slot);
            (next.size, next.next)
        };

        {
            let block = self.block_mut(slot);
            block.size = block
                .size
                .checked_add(absorbed_size)
                .expect("merged block still fits in the buffer, so this cannot overflow");
            block.next = new_next;
        }

        if let Some(new_next_slot) = new_next {
            self.block_mut(new_next_slot).prev = Some(slot);
        }

        self.release_slot(next_slot);
    }

    /// Merges every run of physically adjacent free blocks into one block.
    ///
    /// A single forward pass: after each merge the same (now larger) block is
    /// re-examined against its new successor, so runs of three or more free
    /// blocks collapse in one pass.
    pub(crate) fn coalesce(&mut self) {
        let mut cursor = Some(self.head);

        while let Some(slot) = cursor {
            let next = self.block(slot).next;

            let next_is_free = self.block(slot).is_free
                && next.is_some_and(|next_slot| self.block(next_slot).is_free);

            if next_is_free {
                // Stay on this slot; it may have gained another free successor.
                self.merge_with_next(slot);
            } else {
                cursor = next;
            }
        }
    }

    /// Stores a block in a vacant slot, growing the arena only when the
    /// freelist is empty.
    fn claim_slot(&mut self, block: Block) -> usize {
        if let Some(slot) = self.first_free_slot {
            let entry = self
                .entries
                .get_mut(slot)
                .expect("freelist only ever holds in-bounds slots");

            let Entry::Vacant { next_free_slot } = entry else {
                panic!("freelist pointed at an occupied slot {slot}");
            };

            self.first_free_slot = *next_free_slot;
            *entry = Entry::Occupied(block);
            slot
        } else {
            self.entries.push(Entry::Occupied(block));
            self.entries
                .len()
                .checked_sub(1)
                .expect("we just pushed an entry, so len >= 1")
        }
    }

    fn release_slot(&mut self, slot: usize) {
        let entry = self
            .entries
            .get_mut(slot)
            .expect("released slots were claimed earlier, so they are in bounds");

        assert!(
            matches!(entry, Entry::Occupied(_)),
            "slot {slot} released twice"
        );

        *entry = Entry::Vacant {
            next_free_slot: self.first_free_slot,
        };
        self.first_free_slot = Some(slot);
    }

    /// Verifies the structural invariants of the list, panicking on the first
    /// violation. Called from mutating operations in debug builds.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let mut expected_offset = 0_usize;
        let mut previous: Option<usize> = None;
        let mut visited = 0_usize;

        for (slot, block) in self.iter() {
            assert_eq!(
                block.offset, expected_offset,
                "block in slot {slot} does not start where its predecessor ends"
            );
            assert_eq!(
                block.prev, previous,
                "block in slot {slot} disagrees about its predecessor"
            );
            assert!(
                block.size >= HEADER_SIZE,
                "block in slot {slot} is smaller than a header"
            );

            expected_offset = block.end_offset();
            previous = Some(slot);
            visited = visited
                .checked_add(1)
                .expect("cannot visit more blocks than the arena holds");
            assert!(
                visited <= self.entries.len(),
                "physical list contains a cycle"
            );
        }

        assert_eq!(
            expected_offset, self.capacity,
            "block sizes do not sum to the pool capacity"
        );
    }
}
