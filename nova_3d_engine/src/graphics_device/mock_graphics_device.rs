/// Mock graphics device for unit tests (no GPU required)
///
/// Every device and command list call is appended to a call log shared by the
/// provider, the device and its command lists, so tests can assert on the
/// exact order of GPU work. The direct queue is simulated: fence signals
/// either complete at once (idle GPU) or stay pending until a blocking wait
/// retires them in submission order.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    align_up, AdapterDesc, AdapterProvider, AllocationInfo, ClearValue, CommandList,
    CopyableFootprint, DescriptorHandle, DescriptorHeapId, DescriptorHeapKind,
    DeviceFeatures, FeatureLevel, FenceId, GraphicsDevice, HeapContents, HeapDesc,
    HeapId, HeapUsage, IndexBufferView, PresentFlags, PresentStatus, PrimitiveTopology,
    ResourceBarrier, ResourceDesc, ResourceId, ResourceState, SwapChainDesc,
    TextureFormat, VertexBufferView, ViewDesc, DEFAULT_PLACEMENT_ALIGNMENT,
    TEXTURE_PITCH_ALIGNMENT,
};

// ============================================================================
// Call log
// ============================================================================

/// One recorded device or command list call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    // Provider / device
    CreateDevice { adapter: u32, level: FeatureLevel },
    CreateFence { fence: FenceId, initial_value: u64 },
    Signal { fence: FenceId, value: u64 },
    WaitFence { fence: FenceId, value: u64 },
    DestroyFence { fence: FenceId },
    CreateCommandList { list: u32 },
    Execute { list: u32 },
    CreateSwapChain { width: u32, height: u32, buffer_count: u32, allow_tearing: bool },
    ResizeSwapChain { width: u32, height: u32 },
    Present { sync_interval: u32, flags: PresentFlags },
    CreateHeap { heap: HeapId, size: u64, usage: HeapUsage, contents: HeapContents },
    DestroyHeap { heap: HeapId },
    CreatePlacedResource { resource: ResourceId, heap: HeapId, offset: u64, size: u64 },
    CreateCommittedResource { resource: ResourceId, desc: ResourceDesc },
    ReleaseResource { resource: ResourceId },
    WriteMapped { resource: ResourceId, offset: u64, len: usize },
    CreateDescriptorHeap { heap: DescriptorHeapId, kind: DescriptorHeapKind, capacity: u32 },
    DestroyDescriptorHeap { heap: DescriptorHeapId },
    CreateView { handle: DescriptorHandle, resource: ResourceId },

    // Command list
    Reset { list: u32 },
    Barrier(ResourceBarrier),
    SetRenderTargets { rtv: DescriptorHandle, dsv: Option<DescriptorHandle> },
    ClearRenderTarget { rtv: DescriptorHandle },
    ClearDepth { dsv: DescriptorHandle, depth: f32 },
    SetViewport { width: u32, height: u32 },
    SetDescriptorHeap { heap: DescriptorHeapId },
    CopyBufferRegion { dst: ResourceId, dst_offset: u64, src: ResourceId, src_offset: u64, size: u64 },
    CopyTextureFromBuffer { dst: ResourceId, src: ResourceId, width: u32, height: u32 },
    SetVertexBuffer { slot: u32, view: VertexBufferView },
    SetIndexBuffer { view: IndexBufferView },
    SetConstantBuffer { root_index: u32, gpu_address: u64 },
    SetPrimitiveTopology { topology: PrimitiveTopology },
    Draw { vertex_count: u32, instance_count: u32 },
    DrawIndexed { index_count: u32, instance_count: u32 },
    Close { list: u32 },
}

/// Calls that can be told to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailPoint {
    CreateDevice,
    CreateHeap,
    CreatePlacedResource,
    CreateCommittedResource,
    CreateSwapChain,
    ResizeSwapChain,
    Execute,
    Present,
}

/// A native resource known to the mock
#[derive(Debug, Clone)]
pub struct MockResource {
    pub desc: ResourceDesc,
    pub heap: Option<HeapId>,
    pub offset: u64,
    pub state: ResourceState,
    pub name: String,
    /// Backing bytes for CPU-visible resources
    pub data: Vec<u8>,
}

/// The mock swap chain
#[derive(Debug, Clone)]
pub struct MockSwapChain {
    pub desc: SwapChainDesc,
    /// Outstanding buffer references handed out by `swap_chain_buffer`
    pub buffers: Vec<Option<ResourceId>>,
    pub current: u32,
}

/// State shared by the mock provider, devices and command lists
pub struct MockGpuState {
    /// Ordered call log
    pub calls: Vec<MockCall>,
    /// When true, signals complete as soon as they are enqueued
    pub auto_complete: bool,
    /// Capabilities reported by `query_features`
    pub features: DeviceFeatures,
    /// What `present` reports when it does not fail
    pub present_status: PresentStatus,
    completed: Vec<u64>,
    pending: VecDeque<(FenceId, u64)>,
    heaps: FxHashMap<u64, HeapDesc>,
    resources: FxHashMap<u64, MockResource>,
    swap_chain: Option<MockSwapChain>,
    failures: FxHashMap<MockFailPoint, (u32, Error)>,
    next_id: u64,
    next_list: u32,
    next_descriptor_heap: u32,
}

impl MockGpuState {
    /// Idle GPU: every signal completes immediately
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            auto_complete: true,
            features: DeviceFeatures::default(),
            present_status: PresentStatus::Presented,
            completed: Vec::new(),
            pending: VecDeque::new(),
            heaps: FxHashMap::default(),
            resources: FxHashMap::default(),
            swap_chain: None,
            failures: FxHashMap::default(),
            next_id: 1,
            next_list: 0,
            next_descriptor_heap: 0,
        }
    }

    /// Make the next call at `point` fail with `error`
    pub fn inject_failure(&mut self, point: MockFailPoint, error: Error) {
        self.failures.insert(point, (0, error));
    }

    /// Let `skip` calls at `point` succeed, then fail the next one with `error`
    pub fn inject_failure_after(&mut self, point: MockFailPoint, skip: u32, error: Error) {
        self.failures.insert(point, (skip, error));
    }

    /// Retire every pending signal (the GPU catches up)
    pub fn complete_all(&mut self) {
        while let Some((fence, value)) = self.pending.pop_front() {
            self.completed[fence.0 as usize] = value;
        }
    }

    /// Signals enqueued but not yet reached by the GPU
    pub fn pending_signal_count(&self) -> usize {
        self.pending.len()
    }

    /// Completed value of a fence
    pub fn completed_value(&self, fence: FenceId) -> u64 {
        self.completed[fence.0 as usize]
    }

    /// Forget the recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Position of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&MockCall) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    /// Number of calls matching `pred`
    pub fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    /// A live resource
    pub fn resource(&self, resource: ResourceId) -> Option<&MockResource> {
        self.resources.get(&resource.0)
    }

    /// Number of resources not yet released
    pub fn live_resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of heaps not yet destroyed
    pub fn live_heap_count(&self) -> usize {
        self.heaps.len()
    }

    /// Current swap chain
    pub fn swap_chain(&self) -> Option<&MockSwapChain> {
        self.swap_chain.as_ref()
    }

    fn take_failure(&mut self, point: MockFailPoint) -> Result<()> {
        if let Some((skip, _)) = self.failures.get_mut(&point) {
            if *skip > 0 {
                *skip -= 1;
                return Ok(());
            }
        }
        match self.failures.remove(&point) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for MockGpuState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the mock GPU state
pub type SharedMockState = Arc<Mutex<MockGpuState>>;

/// Hardware adapter description used by tests
pub fn mock_adapter(index: u32, description: &str, vram_mib: u64, is_software: bool) -> AdapterDesc {
    AdapterDesc {
        index,
        description: description.to_string(),
        vendor_id: if is_software { 0x1414 } else { 0x10DE },
        device_id: 0x2000 + index,
        dedicated_video_memory: vram_mib * 1024 * 1024,
        shared_system_memory: 8 * 1024 * 1024 * 1024,
        is_software,
    }
}

// ============================================================================
// MockAdapterProvider
// ============================================================================

/// Mock adapter provider
///
/// Each adapter carries the highest feature level it supports, `None` for an
/// adapter on which device creation always fails.
pub struct MockAdapterProvider {
    pub adapters: Vec<(AdapterDesc, Option<FeatureLevel>)>,
    state: SharedMockState,
}

impl MockAdapterProvider {
    /// One discrete adapter supporting 12_1
    pub fn new() -> Self {
        Self::with_adapters(vec![(
            mock_adapter(0, "Mock Discrete GPU", 8192, false),
            Some(FeatureLevel::Level12_1),
        )])
    }

    /// Custom adapter list
    pub fn with_adapters(adapters: Vec<(AdapterDesc, Option<FeatureLevel>)>) -> Self {
        Self {
            adapters,
            state: Arc::new(Mutex::new(MockGpuState::new())),
        }
    }

    /// State shared with every device this provider creates
    pub fn state(&self) -> SharedMockState {
        Arc::clone(&self.state)
    }

    fn max_level(&self, adapter: &AdapterDesc) -> Option<FeatureLevel> {
        self.adapters
            .iter()
            .find(|(desc, _)| desc.index == adapter.index)
            .and_then(|(_, level)| *level)
    }
}

impl Default for MockAdapterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterProvider for MockAdapterProvider {
    fn enumerate_adapters(&self) -> Result<Vec<AdapterDesc>> {
        Ok(self.adapters.iter().map(|(desc, _)| desc.clone()).collect())
    }

    fn supports_feature_level(&self, adapter: &AdapterDesc, level: FeatureLevel) -> bool {
        self.max_level(adapter).is_some_and(|max| level <= max)
    }

    fn create_device(
        &self,
        adapter: &AdapterDesc,
        level: FeatureLevel,
    ) -> Result<Box<dyn GraphicsDevice>> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::CreateDevice)?;
        if !self.supports_feature_level(adapter, level) {
            return Err(Error::InitializationFailed(format!(
                "adapter {} does not support {}",
                adapter.description, level
            )));
        }
        state.calls.push(MockCall::CreateDevice { adapter: adapter.index, level });
        Ok(Box::new(MockGraphicsDevice {
            state: Arc::clone(&self.state),
            adapter: adapter.clone(),
            level,
        }))
    }
}

// ============================================================================
// MockGraphicsDevice
// ============================================================================

/// Mock graphics device
pub struct MockGraphicsDevice {
    state: SharedMockState,
    adapter: AdapterDesc,
    level: FeatureLevel,
}

impl MockGraphicsDevice {
    /// Standalone device with its own state
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockGpuState::new())),
            adapter: mock_adapter(0, "Mock Discrete GPU", 8192, false),
            level: FeatureLevel::Level12_1,
        }
    }

    /// Shared state handle
    pub fn state(&self) -> SharedMockState {
        Arc::clone(&self.state)
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn texture_bytes(width: u32, height: u32, mip_levels: u16, format: TextureFormat) -> u64 {
    let mut total = 0u64;
    let (mut w, mut h) = (width.max(1), height.max(1));
    for _ in 0..mip_levels.max(1) {
        total += w as u64 * h as u64 * format.bytes_per_pixel() as u64;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    total
}

fn resource_size(desc: &ResourceDesc) -> u64 {
    match *desc {
        ResourceDesc::Buffer { size } => size,
        ResourceDesc::Texture2D { width, height, mip_levels, format, .. } => {
            texture_bytes(width, height, mip_levels, format)
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn adapter(&self) -> &AdapterDesc {
        &self.adapter
    }

    fn feature_level(&self) -> FeatureLevel {
        self.level
    }

    fn query_features(&self) -> Result<DeviceFeatures> {
        Ok(self.state.lock().unwrap().features)
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<FenceId> {
        let mut state = self.state.lock().unwrap();
        let fence = FenceId(state.completed.len() as u32);
        state.completed.push(initial_value);
        state.calls.push(MockCall::CreateFence { fence, initial_value });
        Ok(fence)
    }

    fn signal_fence(&mut self, fence: FenceId, value: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Signal { fence, value });
        if state.auto_complete {
            state.completed[fence.0 as usize] = value;
        } else {
            state.pending.push_back((fence, value));
        }
        Ok(())
    }

    fn fence_completed_value(&self, fence: FenceId) -> Result<u64> {
        Ok(self.state.lock().unwrap().completed_value(fence))
    }

    fn wait_fence(&mut self, fence: FenceId, value: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::WaitFence { fence, value });
        while state.completed[fence.0 as usize] < value {
            match state.pending.pop_front() {
                Some((pending_fence, pending_value)) => {
                    state.completed[pending_fence.0 as usize] = pending_value;
                }
                None => {
                    return Err(Error::BackendError(format!(
                        "wait on fence {} for {} never completes",
                        fence.0, value
                    )));
                }
            }
        }
        Ok(())
    }

    fn destroy_fence(&mut self, fence: FenceId) {
        self.state.lock().unwrap().calls.push(MockCall::DestroyFence { fence });
    }

    fn create_command_list(&mut self, _name: &str) -> Result<Box<dyn CommandList>> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_list;
        state.next_list += 1;
        state.calls.push(MockCall::CreateCommandList { list: id });
        Ok(Box::new(MockCommandList {
            id,
            open: false,
            state: Arc::clone(&self.state),
        }))
    }

    fn execute_command_list(&mut self, list: &dyn CommandList) -> Result<()> {
        let mock = list
            .as_any()
            .downcast_ref::<MockCommandList>()
            .ok_or_else(|| Error::BackendError("not a mock command list".to_string()))?;
        if mock.open {
            return Err(Error::InvalidState("executing an open command list".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::Execute)?;
        state.calls.push(MockCall::Execute { list: mock.id });
        Ok(())
    }

    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::CreateSwapChain)?;
        state.calls.push(MockCall::CreateSwapChain {
            width: desc.width,
            height: desc.height,
            buffer_count: desc.buffer_count,
            allow_tearing: desc.allow_tearing,
        });
        state.swap_chain = Some(MockSwapChain {
            desc: *desc,
            buffers: vec![None; desc.buffer_count as usize],
            current: 0,
        });
        Ok(())
    }

    fn swap_chain_buffer(&mut self, index: u32) -> Result<ResourceId> {
        let mut state = self.state.lock().unwrap();
        let id = state.alloc_id();
        let desc = match state.swap_chain.as_mut() {
            Some(chain) if (index as usize) < chain.buffers.len() => {
                chain.buffers[index as usize] = Some(ResourceId(id));
                chain.desc
            }
            _ => return Err(Error::InvalidResource(format!("no swap chain buffer {}", index))),
        };
        state.resources.insert(id, MockResource {
            desc: ResourceDesc::Texture2D {
                width: desc.width,
                height: desc.height,
                mip_levels: 1,
                format: desc.format,
                usage: crate::graphics_device::TextureUsage::RenderTarget,
            },
            heap: None,
            offset: 0,
            state: ResourceState::Present,
            name: format!("back-buffer[{}]", index),
            data: Vec::new(),
        });
        Ok(ResourceId(id))
    }

    fn resize_swap_chain(&mut self, width: u32, height: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::ResizeSwapChain)?;
        state.calls.push(MockCall::ResizeSwapChain { width, height });
        let chain = state
            .swap_chain
            .as_mut()
            .ok_or_else(|| Error::InvalidState("no swap chain".to_string()))?;
        if chain.buffers.iter().any(Option::is_some) {
            return Err(Error::BackendError(
                "ResizeBuffers with outstanding back buffer references".to_string(),
            ));
        }
        chain.desc.width = width;
        chain.desc.height = height;
        chain.current = 0;
        Ok(())
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.state
            .lock()
            .unwrap()
            .swap_chain
            .as_ref()
            .map(|chain| chain.current)
            .unwrap_or(0)
    }

    fn present(&mut self, sync_interval: u32, flags: PresentFlags) -> Result<PresentStatus> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::Present)?;
        state.calls.push(MockCall::Present { sync_interval, flags });
        let status = state.present_status;
        if status == PresentStatus::Presented {
            if let Some(chain) = state.swap_chain.as_mut() {
                chain.current = (chain.current + 1) % chain.desc.buffer_count;
            }
        }
        Ok(status)
    }

    fn resource_allocation_info(&self, desc: &ResourceDesc) -> AllocationInfo {
        AllocationInfo {
            size: align_up(resource_size(desc).max(1), DEFAULT_PLACEMENT_ALIGNMENT),
            alignment: DEFAULT_PLACEMENT_ALIGNMENT,
        }
    }

    fn copyable_footprint(&self, desc: &ResourceDesc) -> CopyableFootprint {
        match *desc {
            ResourceDesc::Buffer { size } => CopyableFootprint {
                row_pitch: size,
                row_size: size,
                rows: 1,
                total_bytes: size,
            },
            ResourceDesc::Texture2D { width, height, format, .. } => {
                let row_size = width as u64 * format.bytes_per_pixel() as u64;
                let row_pitch = align_up(row_size, TEXTURE_PITCH_ALIGNMENT);
                CopyableFootprint {
                    row_pitch,
                    row_size,
                    rows: height,
                    total_bytes: row_pitch * (height.max(1) as u64 - 1) + row_size,
                }
            }
        }
    }

    fn create_heap(&mut self, desc: &HeapDesc, _name: &str) -> Result<HeapId> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::CreateHeap)?;
        let heap = HeapId(state.alloc_id());
        state.heaps.insert(heap.0, *desc);
        state.calls.push(MockCall::CreateHeap {
            heap,
            size: desc.size,
            usage: desc.usage,
            contents: desc.contents,
        });
        Ok(heap)
    }

    fn destroy_heap(&mut self, heap: HeapId) {
        let mut state = self.state.lock().unwrap();
        state.heaps.remove(&heap.0);
        state.calls.push(MockCall::DestroyHeap { heap });
    }

    fn create_placed_resource(
        &mut self,
        heap: HeapId,
        offset: u64,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<ResourceId> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::CreatePlacedResource)?;
        let heap_desc = *state
            .heaps
            .get(&heap.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown heap {}", heap.0)))?;
        let size = align_up(resource_size(desc).max(1), DEFAULT_PLACEMENT_ALIGNMENT);
        if offset % heap_desc.alignment != 0 || offset + size > heap_desc.size {
            return Err(Error::InvalidResource(format!(
                "placement {}+{} outside heap of {} bytes",
                offset, size, heap_desc.size
            )));
        }
        let cpu_visible = heap_desc.usage == HeapUsage::Upload;
        let resource = ResourceId(state.alloc_id());
        state.resources.insert(resource.0, MockResource {
            desc: *desc,
            heap: Some(heap),
            offset,
            state: initial_state,
            name: name.to_string(),
            data: if cpu_visible { vec![0; resource_size(desc) as usize] } else { Vec::new() },
        });
        state.calls.push(MockCall::CreatePlacedResource { resource, heap, offset, size });
        Ok(resource)
    }

    fn create_committed_resource(
        &mut self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        _clear_value: Option<ClearValue>,
        name: &str,
    ) -> Result<ResourceId> {
        let mut state = self.state.lock().unwrap();
        state.take_failure(MockFailPoint::CreateCommittedResource)?;
        let resource = ResourceId(state.alloc_id());
        state.resources.insert(resource.0, MockResource {
            desc: *desc,
            heap: None,
            offset: 0,
            state: initial_state,
            name: name.to_string(),
            data: Vec::new(),
        });
        state.calls.push(MockCall::CreateCommittedResource { resource, desc: *desc });
        Ok(resource)
    }

    fn release_resource(&mut self, resource: ResourceId) {
        let mut state = self.state.lock().unwrap();
        state.resources.remove(&resource.0);
        if let Some(chain) = state.swap_chain.as_mut() {
            for buffer in chain.buffers.iter_mut() {
                if *buffer == Some(resource) {
                    *buffer = None;
                }
            }
        }
        state.calls.push(MockCall::ReleaseResource { resource });
    }

    fn gpu_virtual_address(&self, resource: ResourceId) -> u64 {
        let state = self.state.lock().unwrap();
        match state.resources.get(&resource.0) {
            Some(MockResource { heap: Some(heap), offset, .. }) => (heap.0 << 32) + offset,
            _ => resource.0 << 40,
        }
    }

    fn write_mapped(&mut self, resource: ResourceId, offset: u64, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .resources
            .get_mut(&resource.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown resource {}", resource.0)))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > entry.data.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} outside mapped range of {}",
                data.len(),
                offset,
                entry.data.len()
            )));
        }
        entry.data[start..end].copy_from_slice(data);
        state.calls.push(MockCall::WriteMapped { resource, offset, len: data.len() });
        Ok(())
    }

    fn read_mapped(&self, resource: ResourceId, offset: u64, len: usize) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let entry = state
            .resources
            .get(&resource.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown resource {}", resource.0)))?;
        let start = offset as usize;
        entry
            .data
            .get(start..start + len)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| Error::InvalidResource("read outside mapped range".to_string()))
    }

    fn create_descriptor_heap(
        &mut self,
        kind: DescriptorHeapKind,
        capacity: u32,
        _shader_visible: bool,
    ) -> Result<DescriptorHeapId> {
        let mut state = self.state.lock().unwrap();
        let heap = DescriptorHeapId(state.next_descriptor_heap);
        state.next_descriptor_heap += 1;
        state.calls.push(MockCall::CreateDescriptorHeap { heap, kind, capacity });
        Ok(heap)
    }

    fn destroy_descriptor_heap(&mut self, heap: DescriptorHeapId) {
        self.state.lock().unwrap().calls.push(MockCall::DestroyDescriptorHeap { heap });
    }

    fn create_view(
        &mut self,
        handle: DescriptorHandle,
        resource: ResourceId,
        _view: &ViewDesc,
    ) -> Result<()> {
        self.state.lock().unwrap().calls.push(MockCall::CreateView { handle, resource });
        Ok(())
    }
}

// ============================================================================
// MockCommandList
// ============================================================================

/// Mock command list
pub struct MockCommandList {
    pub id: u32,
    pub open: bool,
    state: SharedMockState,
}

impl MockCommandList {
    fn record(&mut self, call: MockCall) -> Result<()> {
        if !self.open {
            return Err(Error::InvalidState(format!(
                "recording {:?} into closed command list {}",
                call, self.id
            )));
        }
        self.state.lock().unwrap().calls.push(call);
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn reset(&mut self) -> Result<()> {
        if self.open {
            return Err(Error::InvalidState("reset of an open command list".to_string()));
        }
        self.open = true;
        self.state.lock().unwrap().calls.push(MockCall::Reset { list: self.id });
        Ok(())
    }

    fn resource_barriers(&mut self, barriers: &[ResourceBarrier]) -> Result<()> {
        for barrier in barriers {
            self.record(MockCall::Barrier(*barrier))?;
        }
        Ok(())
    }

    fn set_render_targets(
        &mut self,
        rtv: DescriptorHandle,
        dsv: Option<DescriptorHandle>,
    ) -> Result<()> {
        self.record(MockCall::SetRenderTargets { rtv, dsv })
    }

    fn clear_render_target(&mut self, rtv: DescriptorHandle, _color: [f32; 4]) -> Result<()> {
        self.record(MockCall::ClearRenderTarget { rtv })
    }

    fn clear_depth(&mut self, dsv: DescriptorHandle, depth: f32) -> Result<()> {
        self.record(MockCall::ClearDepth { dsv, depth })
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.record(MockCall::SetViewport { width, height })
    }

    fn set_descriptor_heap(&mut self, heap: DescriptorHeapId) -> Result<()> {
        self.record(MockCall::SetDescriptorHeap { heap })
    }

    fn copy_buffer_region(
        &mut self,
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        size: u64,
    ) -> Result<()> {
        self.record(MockCall::CopyBufferRegion { dst, dst_offset, src, src_offset, size })
    }

    fn copy_texture_from_buffer(
        &mut self,
        dst: ResourceId,
        src: ResourceId,
        _footprint: &CopyableFootprint,
        _format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.record(MockCall::CopyTextureFromBuffer { dst, src, width, height })
    }

    fn set_vertex_buffer(&mut self, slot: u32, view: VertexBufferView) -> Result<()> {
        self.record(MockCall::SetVertexBuffer { slot, view })
    }

    fn set_index_buffer(&mut self, view: IndexBufferView) -> Result<()> {
        self.record(MockCall::SetIndexBuffer { view })
    }

    fn set_constant_buffer(&mut self, root_index: u32, gpu_address: u64) -> Result<()> {
        self.record(MockCall::SetConstantBuffer { root_index, gpu_address })
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) -> Result<()> {
        self.record(MockCall::SetPrimitiveTopology { topology })
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record(MockCall::Draw { vertex_count, instance_count })
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _base_vertex: i32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record(MockCall::DrawIndexed { index_count, instance_count })
    }

    fn close(&mut self) -> Result<()> {
        self.record(MockCall::Close { list: self.id })?;
        self.open = false;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
