use std::fmt;

/// A point-in-time diagnostics snapshot of a [`BlockPool`][crate::BlockPool].
///
/// Produced by [`BlockPool::report()`][crate::BlockPool::report]. All values
/// describe the same instant; the report is plain data and holds no reference
/// to the pool.
///
/// The [`Display`][fmt::Display] implementation renders the report as a
/// multi-line text block for operator or CLI consumption.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct PoolReport {
    /// Total bytes governed by the pool, headers included.
    pub capacity: usize,

    /// Payload bytes held by live allocations.
    pub used_bytes: usize,

    /// Payload bytes available in free blocks.
    pub free_bytes: usize,

    /// Bytes consumed by per-block bookkeeping: block count times the header
    /// size.
    pub overhead_bytes: usize,

    /// Payload size of the largest single free block. This bounds the largest
    /// request the pool can satisfy without coalescing.
    pub largest_free_bytes: usize,

    /// External fragmentation as a percentage: how much of the free payload
    /// is *not* in the largest free block. `0.0` when nothing is free.
    pub fragmentation_pct: f64,

    /// Number of blocks holding live allocations.
    pub used_block_count: usize,

    /// Number of free blocks.
    pub free_block_count: usize,
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== Memory Pool Diagnostics ====")?;
        writeln!(f, "Total pool size: {} bytes", self.capacity)?;
        writeln!(
            f,
            "Used by allocations: {} bytes ({} blocks)",
            self.used_bytes, self.used_block_count
        )?;
        writeln!(
            f,
            "Available free memory: {} bytes ({} blocks)",
            self.free_bytes, self.free_block_count
        )?;
        writeln!(f, "Management overhead: {} bytes", self.overhead_bytes)?;
        writeln!(f, "Fragmentation: {:.2}%", self.fragmentation_pct)?;
        writeln!(f, "Largest free block: {} bytes", self.largest_free_bytes)?;
        write!(f, "================================")
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolReport: Send, Sync, Debug, Copy);

    #[test]
    fn display_names_every_figure() {
        let report = PoolReport {
            capacity: 1024,
            used_bytes: 104,
            free_bytes: 840,
            overhead_bytes: 80,
            largest_free_bytes: 840,
            fragmentation_pct: 0.0,
            used_block_count: 1,
            free_block_count: 1,
        };

        let rendered = report.to_string();
        assert!(rendered.contains("Total pool size: 1024 bytes"));
        assert!(rendered.contains("Used by allocations: 104 bytes (1 blocks)"));
        assert!(rendered.contains("Available free memory: 840 bytes (1 blocks)"));
        assert!(rendered.contains("Management overhead: 80 bytes"));
        assert!(rendered.contains("Fragmentation: 0.00%"));
        assert!(rendered.contains("Largest free block: 840 bytes"));
    }

    #[test]
    fn display_formats_fragmentation_with_two_decimals() {
        let report = PoolReport {
            capacity: 1024,
            used_bytes: 0,
            free_bytes: 300,
            overhead_bytes: 120,
            largest_free_bytes: 200,
            fragmentation_pct: 100.0 / 3.0,
            used_block_count: 0,
            free_block_count: 3,
        };

        assert!(report.to_string().contains("Fragmentation: 33.33%"));
    }
}
