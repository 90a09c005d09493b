/// Pre-reserved native heap with bump placement
///
/// A heap is created once with a fixed size. Placements advance a bump
/// offset aligned to the resource's alignment. With `BestFitReuse` released
/// ranges are kept in an offset-sorted free list and reused before the bump
/// offset grows.

use crate::error::{Error, Result};
use crate::graphics_device::{align_up, AllocationInfo, GraphicsDevice, HeapDesc, HeapId};
use crate::gpu::PlacementPolicy;

/// A free byte range inside a heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRange {
    pub offset: u64,
    pub size: u64,
}

impl HeapRange {
    fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Bump allocator over one native heap
pub struct GpuHeap {
    id: HeapId,
    name: String,
    desc: HeapDesc,
    policy: PlacementPolicy,
    /// Next free byte at the tail
    offset: u64,
    /// Released ranges below `offset`, sorted and coalesced (BestFitReuse only)
    free_ranges: Vec<HeapRange>,
    /// Bytes currently held by live placements
    used: u64,
}

impl GpuHeap {
    /// Reserve the native heap
    pub fn create(
        device: &mut dyn GraphicsDevice,
        name: &str,
        desc: HeapDesc,
        policy: PlacementPolicy,
    ) -> Result<Self> {
        let id = device.create_heap(&desc, name).map_err(|error| {
            crate::engine_error!(
                "nova3d::gpu::memory",
                "Failed to create heap '{}' ({} bytes): {}",
                name, desc.size, error
            );
            error
        })?;
        crate::engine_debug!(
            "nova3d::gpu::memory",
            "Created heap '{}': {} bytes, {:?} {:?}",
            name, desc.size, desc.usage, desc.contents
        );
        Ok(Self {
            id,
            name: name.to_string(),
            desc,
            policy,
            offset: 0,
            free_ranges: Vec::new(),
            used: 0,
        })
    }

    /// Native heap id
    pub fn id(&self) -> HeapId {
        self.id
    }

    /// Heap name used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Heap size in bytes
    pub fn capacity(&self) -> u64 {
        self.desc.size
    }

    /// Current bump offset
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes held by live placements
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Released ranges waiting for reuse
    pub fn free_ranges(&self) -> &[HeapRange] {
        &self.free_ranges
    }

    /// Largest placement that still fits without alignment padding
    pub fn available(&self) -> u64 {
        let tail = self.desc.size.saturating_sub(self.offset);
        self.free_ranges
            .iter()
            .map(|range| range.size)
            .fold(tail, u64::max)
    }

    fn best_fit(&self, info: AllocationInfo) -> Option<usize> {
        if self.policy != PlacementPolicy::BestFitReuse {
            return None;
        }
        self.free_ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| align_up(range.offset, info.alignment) + info.size <= range.end())
            .min_by_key(|(_, range)| range.size)
            .map(|(index, _)| index)
    }

    /// Whether `info` can be placed right now
    pub fn can_allocate(&self, info: AllocationInfo) -> bool {
        self.best_fit(info).is_some()
            || align_up(self.offset, info.alignment) + info.size <= self.desc.size
    }

    /// The error reported when `info` does not fit
    pub fn exhausted(&self, info: AllocationInfo) -> Error {
        Error::HeapExhausted {
            heap: self.name.clone(),
            requested: info.size,
            available: self.available(),
        }
    }

    /// Place `info` and return its offset
    pub fn allocate(&mut self, info: AllocationInfo) -> Result<u64> {
        if let Some(index) = self.best_fit(info) {
            let range = self.free_ranges.remove(index);
            let offset = align_up(range.offset, info.alignment);
            let head = HeapRange { offset: range.offset, size: offset - range.offset };
            let tail = HeapRange { offset: offset + info.size, size: range.end() - offset - info.size };
            for piece in [tail, head] {
                if piece.size > 0 {
                    self.free_ranges.insert(index, piece);
                }
            }
            self.used += info.size;
            return Ok(offset);
        }

        let offset = align_up(self.offset, info.alignment);
        if offset + info.size > self.desc.size {
            return Err(self.exhausted(info));
        }
        if self.policy == PlacementPolicy::BestFitReuse && offset > self.offset {
            self.insert_free(HeapRange { offset: self.offset, size: offset - self.offset });
        }
        self.offset = offset + info.size;
        self.used += info.size;
        Ok(offset)
    }

    /// Give a placement back
    ///
    /// With `BumpOnly` the bytes only come back on `reset`.
    pub fn free(&mut self, offset: u64, size: u64) {
        self.used = self.used.saturating_sub(size);
        if self.policy != PlacementPolicy::BestFitReuse {
            return;
        }
        self.insert_free(HeapRange { offset, size });
        self.reclaim_tail();
    }

    /// Undo a placement whose native resource could not be created
    ///
    /// A placement at the tail rewinds the bump offset under either policy.
    pub fn rollback(&mut self, offset: u64, size: u64) {
        if offset + size == self.offset {
            self.offset = offset;
            self.used = self.used.saturating_sub(size);
            // Alignment padding left in front of the placement goes back too
            self.reclaim_tail();
        } else {
            self.free(offset, size);
        }
    }

    /// Give a free range touching the tail back to the bump offset
    fn reclaim_tail(&mut self) {
        while let Some(last) = self.free_ranges.last().copied() {
            if last.end() != self.offset {
                break;
            }
            self.free_ranges.pop();
            self.offset = last.offset;
        }
    }

    fn insert_free(&mut self, range: HeapRange) {
        let index = self.free_ranges.partition_point(|r| r.offset < range.offset);
        self.free_ranges.insert(index, range);

        // Coalesce with the next range, then with the previous one
        if index + 1 < self.free_ranges.len() && self.free_ranges[index].end() == self.free_ranges[index + 1].offset {
            let next = self.free_ranges.remove(index + 1);
            self.free_ranges[index].size += next.size;
        }
        if index > 0 && self.free_ranges[index - 1].end() == self.free_ranges[index].offset {
            let current = self.free_ranges.remove(index);
            self.free_ranges[index - 1].size += current.size;
        }
    }

    /// Forget every placement (all resources in the heap must be released)
    pub fn reset(&mut self) {
        self.offset = 0;
        self.used = 0;
        self.free_ranges.clear();
    }

    /// Release the native heap
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        crate::engine_debug!("nova3d::gpu::memory", "Destroying heap '{}'", self.name);
        device.destroy_heap(self.id);
    }
}

#[cfg(test)]
#[path = "heap_tests.rs"]
mod tests;
