/// Native object registry - maps the engine's opaque ids to D3D12 objects
///
/// Shared between the device and its command lists (the lists resolve
/// resource ids and descriptor handles while recording).

use nova_3d_engine::nova3d::{Error, Result};
use nova_3d_engine::nova3d::device::{
    DescriptorHandle, DescriptorHeapId, DescriptorHeapKind, HeapDesc, HeapId, ResourceDesc, ResourceId,
};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use windows::Win32::Graphics::Direct3D12::*;

pub(crate) struct NativeResource {
    pub resource: ID3D12Resource,
    pub desc: ResourceDesc,
    /// Persistent CPU mapping, upload heap resources only
    pub mapped: Option<*mut u8>,
    /// Bytes addressable through `mapped`
    pub mapped_len: u64,
}

pub(crate) struct NativeHeap {
    pub heap: ID3D12Heap,
    pub desc: HeapDesc,
}

pub(crate) struct NativeDescriptorHeap {
    pub heap: ID3D12DescriptorHeap,
    pub kind: DescriptorHeapKind,
    pub capacity: u32,
    pub stride: u32,
    pub cpu_start: D3D12_CPU_DESCRIPTOR_HANDLE,
}

#[derive(Default)]
pub(crate) struct Registry {
    resources: FxHashMap<u64, NativeResource>,
    heaps: FxHashMap<u64, NativeHeap>,
    descriptor_heaps: FxHashMap<u32, NativeDescriptorHeap>,
    next_id: u64,
    next_descriptor_heap: u32,
}

// Raw mapped pointers and COM objects are only touched by the thread driving the device.
unsafe impl Send for Registry {}

pub(crate) type SharedRegistry = Arc<Mutex<Registry>>;

pub(crate) fn lock(registry: &SharedRegistry) -> Result<MutexGuard<'_, Registry>> {
    registry
        .lock()
        .map_err(|_| nova_3d_engine::engine_err!("nova3d::d3d12", "Native registry lock poisoned"))
}

impl Registry {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ===== RESOURCES =====

    pub fn insert_resource(&mut self, resource: NativeResource) -> ResourceId {
        let id = self.alloc_id();
        self.resources.insert(id, resource);
        ResourceId(id)
    }

    pub fn resource(&self, id: ResourceId) -> Result<&NativeResource> {
        self.resources
            .get(&id.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown native resource {:?}", id)))
    }

    pub fn remove_resource(&mut self, id: ResourceId) -> Option<NativeResource> {
        self.resources.remove(&id.0)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    // ===== HEAPS =====

    pub fn insert_heap(&mut self, heap: NativeHeap) -> HeapId {
        let id = self.alloc_id();
        self.heaps.insert(id, heap);
        HeapId(id)
    }

    pub fn heap(&self, id: HeapId) -> Result<&NativeHeap> {
        self.heaps
            .get(&id.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown native heap {:?}", id)))
    }

    pub fn remove_heap(&mut self, id: HeapId) -> Option<NativeHeap> {
        self.heaps.remove(&id.0)
    }

    // ===== DESCRIPTOR HEAPS =====

    pub fn insert_descriptor_heap(&mut self, heap: NativeDescriptorHeap) -> DescriptorHeapId {
        let id = self.next_descriptor_heap;
        self.next_descriptor_heap += 1;
        self.descriptor_heaps.insert(id, heap);
        DescriptorHeapId(id)
    }

    pub fn descriptor_heap(&self, id: DescriptorHeapId) -> Result<&NativeDescriptorHeap> {
        self.descriptor_heaps
            .get(&id.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown descriptor heap {:?}", id)))
    }

    pub fn remove_descriptor_heap(&mut self, id: DescriptorHeapId) -> Option<NativeDescriptorHeap> {
        self.descriptor_heaps.remove(&id.0)
    }

    /// CPU handle of one slot, bounds-checked against the heap capacity
    pub fn cpu_handle(&self, handle: DescriptorHandle) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        let heap = self.descriptor_heap(handle.heap)?;
        if handle.index >= heap.capacity {
            return Err(Error::InvalidResource(format!(
                "descriptor {} out of range for {:?} heap of {}",
                handle.index, heap.kind, heap.capacity
            )));
        }
        Ok(D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: heap.cpu_start.ptr + heap.stride as usize * handle.index as usize,
        })
    }
}
