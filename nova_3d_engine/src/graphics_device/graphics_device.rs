/// Graphics device traits - the seam between the core and a native API backend

use crate::error::Result;
use crate::graphics_device::{
    AdapterDesc, AllocationInfo, ClearValue, CommandList, CopyableFootprint,
    DescriptorHandle, DescriptorHeapId, DescriptorHeapKind, DeviceFeatures,
    FeatureLevel, FenceId, HeapDesc, HeapId, PresentFlags, PresentStatus,
    ResourceDesc, ResourceId, ResourceState, SwapChainDesc, ViewDesc,
};

/// Enumerates adapters and creates devices
///
/// Implemented once per backend. The bootstrap policy (which adapter, which
/// feature level) lives in the core, the provider only answers questions.
pub trait AdapterProvider {
    /// List every adapter the driver reports, software ones included
    fn enumerate_adapters(&self) -> Result<Vec<AdapterDesc>>;

    /// Whether a device can be created on `adapter` at `level`
    ///
    /// Must not keep the probe device alive.
    fn supports_feature_level(&self, adapter: &AdapterDesc, level: FeatureLevel) -> bool;

    /// Create the device (and its direct queue) on `adapter` at `level`
    fn create_device(
        &self,
        adapter: &AdapterDesc,
        level: FeatureLevel,
    ) -> Result<Box<dyn GraphicsDevice>>;
}

/// Main graphics device trait
///
/// One device owns one direct command queue. All ids returned by the device
/// are opaque and only meaningful to the device that created them.
pub trait GraphicsDevice: Send {
    // ===== DEVICE INFO =====

    /// Adapter the device was created on
    fn adapter(&self) -> &AdapterDesc;

    /// Feature level the device was created at
    fn feature_level(&self) -> FeatureLevel;

    /// Query the capability blocks cached by the core
    fn query_features(&self) -> Result<DeviceFeatures>;

    // ===== FENCES =====

    /// Create a fence starting at `initial_value`
    fn create_fence(&mut self, initial_value: u64) -> Result<FenceId>;

    /// Enqueue a signal of `fence` to `value` on the direct queue
    fn signal_fence(&mut self, fence: FenceId, value: u64) -> Result<()>;

    /// Last value the GPU has reached on `fence`
    fn fence_completed_value(&self, fence: FenceId) -> Result<u64>;

    /// Block the calling thread until `fence` reaches `value` (infinite timeout)
    fn wait_fence(&mut self, fence: FenceId, value: u64) -> Result<()>;

    /// Destroy a fence and its OS event
    fn destroy_fence(&mut self, fence: FenceId);

    // ===== COMMAND RECORDING =====

    /// Create a command allocator + list pair, closed
    fn create_command_list(&mut self, name: &str) -> Result<Box<dyn CommandList>>;

    /// Submit a closed command list to the direct queue
    fn execute_command_list(&mut self, list: &dyn CommandList) -> Result<()>;

    // ===== SWAP CHAIN =====

    /// Create the window's flip-model swap chain
    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<()>;

    /// Back buffer resource at `index`
    fn swap_chain_buffer(&mut self, index: u32) -> Result<ResourceId>;

    /// Resize the swap chain buffers in place
    ///
    /// Every resource returned by `swap_chain_buffer` must have been released.
    fn resize_swap_chain(&mut self, width: u32, height: u32) -> Result<()>;

    /// Index of the back buffer the next frame renders into
    fn current_back_buffer_index(&self) -> u32;

    /// Present the current back buffer
    fn present(&mut self, sync_interval: u32, flags: PresentFlags) -> Result<PresentStatus>;

    // ===== HEAPS AND RESOURCES =====

    /// Size and alignment `desc` needs inside a heap
    fn resource_allocation_info(&self, desc: &ResourceDesc) -> AllocationInfo;

    /// Layout of a texture's first subresource in a linear upload buffer
    fn copyable_footprint(&self, desc: &ResourceDesc) -> CopyableFootprint;

    /// Reserve a native heap
    fn create_heap(&mut self, desc: &HeapDesc, name: &str) -> Result<HeapId>;

    /// Release a native heap (all resources placed in it must be gone)
    fn destroy_heap(&mut self, heap: HeapId);

    /// Place a resource at `offset` inside `heap`
    fn create_placed_resource(
        &mut self,
        heap: HeapId,
        offset: u64,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<ResourceId>;

    /// Create a resource with its own implicit heap (depth buffer)
    fn create_committed_resource(
        &mut self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        clear_value: Option<ClearValue>,
        name: &str,
    ) -> Result<ResourceId>;

    /// Release a resource
    fn release_resource(&mut self, resource: ResourceId);

    /// GPU virtual address of a buffer resource
    fn gpu_virtual_address(&self, resource: ResourceId) -> u64;

    /// Write bytes into a CPU-visible (upload heap) resource
    fn write_mapped(&mut self, resource: ResourceId, offset: u64, data: &[u8]) -> Result<()>;

    /// Read bytes back from a CPU-visible resource
    fn read_mapped(&self, resource: ResourceId, offset: u64, len: usize) -> Result<Vec<u8>>;

    // ===== DESCRIPTORS =====

    /// Create a descriptor heap
    fn create_descriptor_heap(
        &mut self,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<DescriptorHeapId>;

    /// Destroy a descriptor heap
    fn destroy_descriptor_heap(&mut self, heap: DescriptorHeapId);

    /// Write a view of `resource` into `handle`
    fn create_view(
        &mut self,
        handle: DescriptorHandle,
        resource: ResourceId,
        view: &ViewDesc,
    ) -> Result<()>;
}
