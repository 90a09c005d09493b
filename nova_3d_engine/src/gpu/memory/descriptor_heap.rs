/// Descriptor heap records
///
/// Constant buffers and textures are paired with exactly one slot of the
/// shared shader-visible CBV/SRV heap. Records released by their resource
/// stay in the arena in the `InFreeList` state and are handed out again
/// (with their slot) before a new slot is taken.

use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::graphics_device::{
    DescriptorHandle, DescriptorHeapId, DescriptorHeapKind, GraphicsDevice,
};
use crate::gpu::memory::{AllocationState, GpuResourceHandle};
use crate::utils::SlotAllocator;

new_key_type! {
    /// Stable handle to a descriptor heap record
    pub struct DescriptorHeapKey;
}

/// One slot of the shader-visible heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapRecord {
    pub slot: u32,
    /// Owning resource while allocated
    pub resource: Option<GpuResourceHandle>,
    pub state: AllocationState,
}

/// Arena of descriptor records over one native heap
pub struct DescriptorTable {
    heap: DescriptorHeapId,
    capacity: u32,
    slots: SlotAllocator,
    records: SlotMap<DescriptorHeapKey, DescriptorHeapRecord>,
    free_records: Vec<DescriptorHeapKey>,
}

impl DescriptorTable {
    /// Create the shader-visible heap
    pub fn create(device: &mut dyn GraphicsDevice, capacity: u32) -> Result<Self> {
        let heap = device.create_descriptor_heap(DescriptorHeapKind::CbvSrvUav, capacity, true)?;
        crate::engine_debug!(
            "nova3d::gpu::memory",
            "Created shader-visible descriptor heap with {} slots",
            capacity
        );
        Ok(Self {
            heap,
            capacity,
            slots: SlotAllocator::new(),
            records: SlotMap::with_key(),
            free_records: Vec::new(),
        })
    }

    /// Native heap bound at frame start
    pub fn heap(&self) -> DescriptorHeapId {
        self.heap
    }

    /// Pair `resource` with a record, reusing a released one first
    pub fn acquire(&mut self, resource: GpuResourceHandle) -> Result<DescriptorHeapKey> {
        if let Some(key) = self.free_records.pop() {
            if let Some(record) = self.records.get_mut(key) {
                record.resource = Some(resource);
                record.state = AllocationState::Allocated;
                return Ok(key);
            }
        }
        if self.slots.len() >= self.capacity {
            return Err(Error::HeapExhausted {
                heap: "descriptor".to_string(),
                requested: 1,
                available: 0,
            });
        }
        let slot = self.slots.alloc();
        Ok(self.records.insert(DescriptorHeapRecord {
            slot,
            resource: Some(resource),
            state: AllocationState::Allocated,
        }))
    }

    /// Put a record on the free list
    pub fn release(&mut self, key: DescriptorHeapKey) {
        if let Some(record) = self.records.get_mut(key) {
            if record.state == AllocationState::Allocated {
                record.resource = None;
                record.state = AllocationState::InFreeList;
                self.free_records.push(key);
            }
        }
    }

    /// Record for `key`
    pub fn record(&self, key: DescriptorHeapKey) -> Option<&DescriptorHeapRecord> {
        self.records.get(key)
    }

    /// Native descriptor handle of a record
    pub fn handle(&self, key: DescriptorHeapKey) -> Result<DescriptorHandle> {
        self.records
            .get(key)
            .map(|record| DescriptorHandle { heap: self.heap, index: record.slot })
            .ok_or_else(|| Error::InvalidResource("unknown descriptor record".to_string()))
    }

    /// Records paired with a resource
    pub fn allocated_count(&self) -> usize {
        self.records.len() - self.free_records.len()
    }

    /// Records waiting for reuse
    pub fn free_count(&self) -> usize {
        self.free_records.len()
    }

    /// Drop every record and give all slots back
    pub fn clear(&mut self) {
        self.records.clear();
        self.free_records.clear();
        self.slots.reset();
    }

    /// Replace the native heap after device recreation, keeping records and slots
    pub fn recreate(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.heap = device.create_descriptor_heap(DescriptorHeapKind::CbvSrvUav, self.capacity, true)?;
        Ok(())
    }

    /// Release the native heap
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.destroy_descriptor_heap(self.heap);
    }
}

#[cfg(test)]
#[path = "descriptor_heap_tests.rs"]
mod tests;
