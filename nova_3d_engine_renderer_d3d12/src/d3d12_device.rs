/// D3D12 graphics device - device, direct queue, fences, swap chain, heaps and views

use std::ffi::c_void;
use std::num::NonZeroIsize;
use nova_3d_engine::nova3d::{CommandList, Error, GraphicsDevice, Result};
use nova_3d_engine::nova3d::device::{
    AdapterDesc, AllocationInfo, ClearValue, CopyableFootprint, DescriptorHandle,
    DescriptorHeapId, DescriptorHeapKind, DeviceFeatures, FeatureLevel, FenceId, HeapDesc,
    HeapId, HeapUsage, PresentFlags, PresentStatus, ResourceDesc, ResourceHeapTier, ResourceId,
    ResourceState, RootSignatureVersion, SwapChainDesc, TextureFormat, TextureUsage, ViewDesc,
    DEFAULT_PLACEMENT_ALIGNMENT,
};
use rustc_hash::FxHashMap;
use windows::core::{Interface, HSTRING};
use windows::Win32::Foundation::{CloseHandle, BOOL, HANDLE, HWND};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};
use crate::d3d12_command_list::D3D12CommandList;
use crate::d3d12_convert::{
    clear_value, descriptor_heap_type, dxgi_format, heap_desc, heap_properties, native_error,
    present_status, resource_desc, resource_state, shader_model,
};
use crate::d3d12_registry::{
    lock, NativeDescriptorHeap, NativeHeap, NativeResource, Registry, SharedRegistry,
};

struct NativeFence {
    fence: ID3D12Fence,
    event: HANDLE,
}

struct NativeSwapChain {
    swap_chain: IDXGISwapChain3,
    desc: SwapChainDesc,
}

/// Direct3D 12 implementation of `GraphicsDevice`
pub struct D3D12Device {
    adapter: AdapterDesc,
    feature_level: FeatureLevel,
    factory: IDXGIFactory4,
    device: ID3D12Device,
    queue: ID3D12CommandQueue,
    window: Option<NonZeroIsize>,
    swap_chain: Option<NativeSwapChain>,
    fences: FxHashMap<u32, NativeFence>,
    next_fence: u32,
    registry: SharedRegistry,
    message_cookie: Option<u32>,
}

// COM objects and the fence events are only used by the thread driving the engine.
unsafe impl Send for D3D12Device {}

impl D3D12Device {
    pub(crate) fn new(
        adapter: AdapterDesc,
        feature_level: FeatureLevel,
        factory: IDXGIFactory4,
        device: ID3D12Device,
        window: Option<NonZeroIsize>,
        message_cookie: Option<u32>,
    ) -> Result<Self> {
        let queue_desc = D3D12_COMMAND_QUEUE_DESC {
            Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
            Priority: 0,
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            NodeMask: 0,
        };
        let queue: ID3D12CommandQueue = unsafe { device.CreateCommandQueue(&queue_desc) }
            .map_err(|e| native_error("CreateCommandQueue", &e))?;
        unsafe {
            let _ = queue.SetName(&HSTRING::from("direct-queue"));
        }

        nova_3d_engine::engine_debug!("nova3d::d3d12", "Created direct command queue");

        Ok(Self {
            adapter,
            feature_level,
            factory,
            device,
            queue,
            window,
            swap_chain: None,
            fences: FxHashMap::default(),
            next_fence: 0,
            registry: SharedRegistry::new(std::sync::Mutex::new(Registry::default())),
            message_cookie,
        })
    }

    /// Native device, for interop
    pub fn native_device(&self) -> &ID3D12Device {
        &self.device
    }

    /// Number of live native resources (placed, committed and swap chain buffers)
    pub fn live_resource_count(&self) -> usize {
        lock(&self.registry).map(|r| r.resource_count()).unwrap_or(0)
    }

    fn fence(&self, fence: FenceId) -> Result<&NativeFence> {
        self.fences
            .get(&fence.0)
            .ok_or_else(|| Error::InvalidResource(format!("unknown fence {:?}", fence)))
    }

    fn swap_chain(&self) -> Result<&NativeSwapChain> {
        self.swap_chain
            .as_ref()
            .ok_or_else(|| Error::InvalidState("swap chain not created".to_string()))
    }

    fn tearing_supported(&self) -> bool {
        let Ok(factory5) = self.factory.cast::<IDXGIFactory5>() else {
            return false;
        };
        let mut allow = BOOL(0);
        let checked = unsafe {
            factory5.CheckFeatureSupport(
                DXGI_FEATURE_PRESENT_ALLOW_TEARING,
                &mut allow as *mut BOOL as *mut c_void,
                std::mem::size_of::<BOOL>() as u32,
            )
        };
        checked.is_ok() && allow.as_bool()
    }

    fn check_feature<T>(&self, feature: D3D12_FEATURE, mut data: T) -> Option<T> {
        let checked = unsafe {
            self.device.CheckFeatureSupport(
                feature,
                &mut data as *mut T as *mut c_void,
                std::mem::size_of::<T>() as u32,
            )
        };
        checked.ok().map(|_| data)
    }

    fn swap_chain_flags(desc: &SwapChainDesc) -> DXGI_SWAP_CHAIN_FLAG {
        if desc.allow_tearing {
            DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING
        } else {
            DXGI_SWAP_CHAIN_FLAG(0)
        }
    }
}

impl GraphicsDevice for D3D12Device {
    // ===== DEVICE INFO =====

    fn adapter(&self) -> &AdapterDesc {
        &self.adapter
    }

    fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    fn query_features(&self) -> Result<DeviceFeatures> {
        let options = self
            .check_feature(D3D12_FEATURE_D3D12_OPTIONS, D3D12_FEATURE_DATA_D3D12_OPTIONS::default())
            .ok_or_else(|| nova_3d_engine::engine_err!("nova3d::d3d12", "D3D12_OPTIONS query failed"))?;
        let resource_heap_tier = if options.ResourceHeapTier == D3D12_RESOURCE_HEAP_TIER_1 {
            ResourceHeapTier::Tier1
        } else {
            ResourceHeapTier::Tier2
        };

        // Ask for the highest model this crate knows, the runtime lowers it
        let highest_shader_model = self
            .check_feature(
                D3D12_FEATURE_SHADER_MODEL,
                D3D12_FEATURE_DATA_SHADER_MODEL { HighestShaderModel: D3D_SHADER_MODEL_6_6 },
            )
            .map(|data| shader_model(data.HighestShaderModel.0))
            .unwrap_or(DeviceFeatures::default().highest_shader_model);

        let root_signature_version = match self.check_feature(
            D3D12_FEATURE_ROOT_SIGNATURE,
            D3D12_FEATURE_DATA_ROOT_SIGNATURE { HighestVersion: D3D_ROOT_SIGNATURE_VERSION_1_1 },
        ) {
            Some(data) if data.HighestVersion == D3D_ROOT_SIGNATURE_VERSION_1_1 => RootSignatureVersion::V1_1,
            _ => RootSignatureVersion::V1_0,
        };

        Ok(DeviceFeatures {
            resource_heap_tier,
            highest_shader_model,
            root_signature_version,
            tearing_supported: self.tearing_supported(),
            placement_alignment: DEFAULT_PLACEMENT_ALIGNMENT,
        })
    }

    // ===== FENCES =====

    fn create_fence(&mut self, initial_value: u64) -> Result<FenceId> {
        let fence: ID3D12Fence = unsafe { self.device.CreateFence(initial_value, D3D12_FENCE_FLAG_NONE) }
            .map_err(|e| native_error("CreateFence", &e))?;
        let event = unsafe { CreateEventW(None, false, false, None) }
            .map_err(|e| native_error("CreateEventW", &e))?;

        let id = self.next_fence;
        self.next_fence += 1;
        self.fences.insert(id, NativeFence { fence, event });
        Ok(FenceId(id))
    }

    fn signal_fence(&mut self, fence: FenceId, value: u64) -> Result<()> {
        let native = self.fence(fence)?;
        unsafe { self.queue.Signal(&native.fence, value) }
            .map_err(|e| native_error("ID3D12CommandQueue::Signal", &e))
    }

    fn fence_completed_value(&self, fence: FenceId) -> Result<u64> {
        let value = unsafe { self.fence(fence)?.fence.GetCompletedValue() };
        // A removed device reports every fence as u64::MAX
        if value == u64::MAX {
            let reason = unsafe { self.device.GetDeviceRemovedReason() };
            if let Err(e) = reason {
                return Err(native_error("GetCompletedValue", &e));
            }
        }
        Ok(value)
    }

    fn wait_fence(&mut self, fence: FenceId, value: u64) -> Result<()> {
        let native = self.fence(fence)?;
        if unsafe { native.fence.GetCompletedValue() } >= value {
            return Ok(());
        }
        unsafe {
            native
                .fence
                .SetEventOnCompletion(value, native.event)
                .map_err(|e| native_error("SetEventOnCompletion", &e))?;
            WaitForSingleObject(native.event, INFINITE);
        }
        Ok(())
    }

    fn destroy_fence(&mut self, fence: FenceId) {
        if let Some(native) = self.fences.remove(&fence.0) {
            unsafe {
                let _ = CloseHandle(native.event);
            }
        }
    }

    // ===== COMMAND RECORDING =====

    fn create_command_list(&mut self, name: &str) -> Result<Box<dyn CommandList>> {
        let list = D3D12CommandList::new(&self.device, name, SharedRegistry::clone(&self.registry))?;
        Ok(Box::new(list))
    }

    fn execute_command_list(&mut self, list: &dyn CommandList) -> Result<()> {
        let Some(list) = list.as_any().downcast_ref::<D3D12CommandList>() else {
            nova_3d_engine::engine_bail!("nova3d::d3d12", "Command list was not created by this backend");
        };
        let native: ID3D12CommandList = list
            .native()
            .cast()
            .map_err(|e| native_error("ID3D12CommandList cast", &e))?;
        unsafe { self.queue.ExecuteCommandLists(&[Some(native)]) };
        Ok(())
    }

    // ===== SWAP CHAIN =====

    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<()> {
        if self.swap_chain.is_some() {
            return Err(Error::InvalidState("swap chain already created".to_string()));
        }
        let Some(window) = self.window else {
            return Err(Error::InitializationFailed("no window to present to".to_string()));
        };

        let native_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.width,
            Height: desc.height,
            Format: dxgi_format(desc.format),
            Stereo: BOOL(0),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.buffer_count,
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            AlphaMode: DXGI_ALPHA_MODE_UNSPECIFIED,
            Flags: Self::swap_chain_flags(desc).0 as u32,
        };
        let hwnd = HWND(window.get() as *mut c_void);
        let swap_chain: IDXGISwapChain1 = unsafe {
            self.factory
                .CreateSwapChainForHwnd(&self.queue, hwnd, &native_desc, None, None::<&IDXGIOutput>)
        }
        .map_err(|e| Error::InitializationFailed(format!("CreateSwapChainForHwnd: {}", e)))?;
        let swap_chain: IDXGISwapChain3 = swap_chain
            .cast()
            .map_err(|e| Error::InitializationFailed(format!("IDXGISwapChain3: {}", e)))?;

        nova_3d_engine::engine_debug!(
            "nova3d::d3d12",
            "Created flip-model swap chain {}x{} with {} buffers (tearing: {})",
            desc.width, desc.height, desc.buffer_count, desc.allow_tearing
        );
        self.swap_chain = Some(NativeSwapChain { swap_chain, desc: *desc });
        Ok(())
    }

    fn swap_chain_buffer(&mut self, index: u32) -> Result<ResourceId> {
        let chain = self.swap_chain()?;
        let desc = chain.desc;
        let buffer: ID3D12Resource = unsafe { chain.swap_chain.GetBuffer(index) }
            .map_err(|e| native_error("IDXGISwapChain::GetBuffer", &e))?;
        unsafe {
            let _ = buffer.SetName(&HSTRING::from(format!("back-buffer[{}]", index)));
        }

        let id = lock(&self.registry)?.insert_resource(NativeResource {
            resource: buffer,
            desc: ResourceDesc::Texture2D {
                width: desc.width,
                height: desc.height,
                mip_levels: 1,
                format: desc.format,
                usage: TextureUsage::RenderTarget,
            },
            mapped: None,
            mapped_len: 0,
        });
        Ok(id)
    }

    fn resize_swap_chain(&mut self, width: u32, height: u32) -> Result<()> {
        let chain = self
            .swap_chain
            .as_mut()
            .ok_or_else(|| Error::InvalidState("swap chain not created".to_string()))?;
        let flags = Self::swap_chain_flags(&chain.desc);
        unsafe {
            chain
                .swap_chain
                .ResizeBuffers(chain.desc.buffer_count, width, height, dxgi_format(chain.desc.format), flags)
        }
        .map_err(|e| native_error("IDXGISwapChain::ResizeBuffers", &e))?;
        chain.desc.width = width;
        chain.desc.height = height;
        Ok(())
    }

    fn current_back_buffer_index(&self) -> u32 {
        self.swap_chain
            .as_ref()
            .map(|chain| unsafe { chain.swap_chain.GetCurrentBackBufferIndex() })
            .unwrap_or(0)
    }

    fn present(&mut self, sync_interval: u32, flags: PresentFlags) -> Result<PresentStatus> {
        let chain = self.swap_chain()?;
        let code = unsafe { chain.swap_chain.Present(sync_interval, DXGI_PRESENT(flags.bits())) };
        present_status(code)
    }

    // ===== HEAPS AND RESOURCES =====

    fn resource_allocation_info(&self, desc: &ResourceDesc) -> AllocationInfo {
        let info = unsafe { self.device.GetResourceAllocationInfo(0, &[resource_desc(desc)]) };
        AllocationInfo { size: info.SizeInBytes, alignment: info.Alignment }
    }

    fn copyable_footprint(&self, desc: &ResourceDesc) -> CopyableFootprint {
        let native = resource_desc(desc);
        let mut layout = D3D12_PLACED_SUBRESOURCE_FOOTPRINT::default();
        let mut rows = 0u32;
        let mut row_size = 0u64;
        let mut total_bytes = 0u64;
        unsafe {
            self.device.GetCopyableFootprints(
                &native,
                0,
                1,
                0,
                Some(&mut layout),
                Some(&mut rows),
                Some(&mut row_size),
                Some(&mut total_bytes),
            )
        };
        CopyableFootprint {
            row_pitch: u64::from(layout.Footprint.RowPitch),
            row_size,
            rows,
            total_bytes,
        }
    }

    fn create_heap(&mut self, desc: &HeapDesc, name: &str) -> Result<HeapId> {
        let native = heap_desc(desc);
        let mut heap: Option<ID3D12Heap> = None;
        unsafe { self.device.CreateHeap(&native, &mut heap) }
            .map_err(|e| native_error("CreateHeap", &e))?;
        let heap = heap.ok_or_else(|| nova_3d_engine::engine_err!("nova3d::d3d12", "CreateHeap returned no heap"))?;
        unsafe {
            let _ = heap.SetName(&HSTRING::from(name));
        }

        let id = lock(&self.registry)?.insert_heap(NativeHeap { heap, desc: *desc });
        nova_3d_engine::engine_trace!("nova3d::d3d12", "Reserved heap '{}' ({} bytes)", name, desc.size);
        Ok(id)
    }

    fn destroy_heap(&mut self, heap: HeapId) {
        if let Ok(mut registry) = lock(&self.registry) {
            registry.remove_heap(heap);
        }
    }

    fn create_placed_resource(
        &mut self,
        heap: HeapId,
        offset: u64,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        name: &str,
    ) -> Result<ResourceId> {
        let mut registry = lock(&self.registry)?;
        let (native_heap, usage) = {
            let heap = registry.heap(heap)?;
            (heap.heap.clone(), heap.desc.usage)
        };

        let native_desc = resource_desc(desc);
        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            self.device.CreatePlacedResource(
                &native_heap,
                offset,
                &native_desc,
                resource_state(initial_state),
                None,
                &mut resource,
            )
        }
        .map_err(|e| native_error("CreatePlacedResource", &e))?;
        let resource = resource
            .ok_or_else(|| nova_3d_engine::engine_err!("nova3d::d3d12", "CreatePlacedResource returned no resource"))?;
        unsafe {
            let _ = resource.SetName(&HSTRING::from(name));
        }

        // Upload resources stay mapped for their whole life
        let (mapped, mapped_len) = match (usage, desc) {
            (HeapUsage::Upload, ResourceDesc::Buffer { size }) => {
                let mut ptr: *mut c_void = std::ptr::null_mut();
                let no_read = D3D12_RANGE { Begin: 0, End: 0 };
                unsafe { resource.Map(0, Some(&no_read), Some(&mut ptr)) }
                    .map_err(|e| native_error("ID3D12Resource::Map", &e))?;
                (Some(ptr as *mut u8), *size)
            }
            _ => (None, 0),
        };

        Ok(registry.insert_resource(NativeResource { resource, desc: *desc, mapped, mapped_len }))
    }

    fn create_committed_resource(
        &mut self,
        desc: &ResourceDesc,
        initial_state: ResourceState,
        clear: Option<ClearValue>,
        name: &str,
    ) -> Result<ResourceId> {
        let format = match desc {
            ResourceDesc::Texture2D { format, .. } => *format,
            ResourceDesc::Buffer { .. } => TextureFormat::R8G8B8A8_UNORM,
        };
        let native_clear = clear.map(|value| clear_value(&value, format));
        let native_desc = resource_desc(desc);
        let properties = heap_properties(HeapUsage::Default);

        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            self.device.CreateCommittedResource(
                &properties,
                D3D12_HEAP_FLAG_NONE,
                &native_desc,
                resource_state(initial_state),
                native_clear.as_ref().map(|value| value as *const _),
                &mut resource,
            )
        }
        .map_err(|e| native_error("CreateCommittedResource", &e))?;
        let resource = resource
            .ok_or_else(|| nova_3d_engine::engine_err!("nova3d::d3d12", "CreateCommittedResource returned no resource"))?;
        unsafe {
            let _ = resource.SetName(&HSTRING::from(name));
        }

        let id = lock(&self.registry)?.insert_resource(NativeResource {
            resource,
            desc: *desc,
            mapped: None,
            mapped_len: 0,
        });
        Ok(id)
    }

    fn release_resource(&mut self, resource: ResourceId) {
        let Ok(mut registry) = lock(&self.registry) else {
            return;
        };
        if let Some(native) = registry.remove_resource(resource) {
            if native.mapped.is_some() {
                unsafe { native.resource.Unmap(0, None) };
            }
        }
    }

    fn gpu_virtual_address(&self, resource: ResourceId) -> u64 {
        match lock(&self.registry).and_then(|r| r.resource(resource).map(|n| n.resource.clone())) {
            Ok(native) => unsafe { native.GetGPUVirtualAddress() },
            Err(e) => {
                nova_3d_engine::engine_warn!("nova3d::d3d12", "No GPU address for {:?}: {}", resource, e);
                0
            }
        }
    }

    fn write_mapped(&mut self, resource: ResourceId, offset: u64, data: &[u8]) -> Result<()> {
        let registry = lock(&self.registry)?;
        let native = registry.resource(resource)?;
        let Some(ptr) = native.mapped else {
            return Err(Error::InvalidResource(format!("{:?} is not CPU visible", resource)));
        };
        let end = offset + data.len() as u64;
        if end > native.mapped_len {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows {:?} ({} bytes)",
                data.len(), offset, resource, native.mapped_len
            )));
        }
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len()) };
        Ok(())
    }

    fn read_mapped(&self, resource: ResourceId, offset: u64, len: usize) -> Result<Vec<u8>> {
        let registry = lock(&self.registry)?;
        let native = registry.resource(resource)?;
        let Some(ptr) = native.mapped else {
            return Err(Error::InvalidResource(format!("{:?} is not CPU visible", resource)));
        };
        if offset + len as u64 > native.mapped_len {
            return Err(Error::InvalidResource(format!(
                "read of {} bytes at {} overflows {:?} ({} bytes)",
                len, offset, resource, native.mapped_len
            )));
        }
        let mut out = vec![0u8; len];
        unsafe { std::ptr::copy_nonoverlapping(ptr.add(offset as usize), out.as_mut_ptr(), len) };
        Ok(out)
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_heap(
        &mut self,
        kind: DescriptorHeapKind,
        capacity: u32,
        shader_visible: bool,
    ) -> Result<DescriptorHeapId> {
        let heap_type = descriptor_heap_type(kind);
        let flags = if shader_visible {
            D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
        } else {
            D3D12_DESCRIPTOR_HEAP_FLAG_NONE
        };
        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: heap_type,
            NumDescriptors: capacity,
            Flags: flags,
            NodeMask: 0,
        };
        let heap: ID3D12DescriptorHeap = unsafe { self.device.CreateDescriptorHeap(&desc) }
            .map_err(|e| native_error("CreateDescriptorHeap", &e))?;
        let stride = unsafe { self.device.GetDescriptorHandleIncrementSize(heap_type) };
        let cpu_start = unsafe { heap.GetCPUDescriptorHandleForHeapStart() };

        let id = lock(&self.registry)?.insert_descriptor_heap(NativeDescriptorHeap {
            heap,
            kind,
            capacity,
            stride,
            cpu_start,
        });
        Ok(id)
    }

    fn destroy_descriptor_heap(&mut self, heap: DescriptorHeapId) {
        if let Ok(mut registry) = lock(&self.registry) {
            registry.remove_descriptor_heap(heap);
        }
    }

    fn create_view(
        &mut self,
        handle: DescriptorHandle,
        resource: ResourceId,
        view: &ViewDesc,
    ) -> Result<()> {
        let registry = lock(&self.registry)?;
        let cpu = registry.cpu_handle(handle)?;
        let native = &registry.resource(resource)?.resource;

        unsafe {
            match *view {
                ViewDesc::RenderTarget { format } => {
                    let desc = D3D12_RENDER_TARGET_VIEW_DESC {
                        Format: dxgi_format(format),
                        ViewDimension: D3D12_RTV_DIMENSION_TEXTURE2D,
                        Anonymous: D3D12_RENDER_TARGET_VIEW_DESC_0 {
                            Texture2D: D3D12_TEX2D_RTV { MipSlice: 0, PlaneSlice: 0 },
                        },
                    };
                    self.device.CreateRenderTargetView(native, Some(&desc), cpu);
                }
                ViewDesc::DepthStencil { format } => {
                    let desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
                        Format: dxgi_format(format),
                        ViewDimension: D3D12_DSV_DIMENSION_TEXTURE2D,
                        Flags: D3D12_DSV_FLAG_NONE,
                        Anonymous: D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                            Texture2D: D3D12_TEX2D_DSV { MipSlice: 0 },
                        },
                    };
                    self.device.CreateDepthStencilView(native, Some(&desc), cpu);
                }
                ViewDesc::ConstantBuffer { size } => {
                    let desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
                        BufferLocation: native.GetGPUVirtualAddress(),
                        SizeInBytes: size,
                    };
                    self.device.CreateConstantBufferView(Some(&desc), cpu);
                }
                ViewDesc::ShaderResource { format, mip_levels } => {
                    let desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
                        Format: dxgi_format(format),
                        ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
                        Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
                        Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
                            Texture2D: D3D12_TEX2D_SRV {
                                MostDetailedMip: 0,
                                MipLevels: u32::from(mip_levels),
                                PlaneSlice: 0,
                                ResourceMinLODClamp: 0.0,
                            },
                        },
                    };
                    self.device.CreateShaderResourceView(native, Some(&desc), cpu);
                }
            }
        }
        Ok(())
    }
}

impl Drop for D3D12Device {
    fn drop(&mut self) {
        for (_, native) in self.fences.drain() {
            unsafe {
                let _ = CloseHandle(native.event);
            }
        }
        if let Some(cookie) = self.message_cookie.take() {
            if let Ok(queue) = self.device.cast::<ID3D12InfoQueue1>() {
                unsafe {
                    let _ = queue.UnregisterMessageCallback(cookie);
                }
            }
            crate::debug::log_validation_stats();
        }
        nova_3d_engine::engine_debug!("nova3d::d3d12", "D3D12 device released ({})", self.adapter.description);
    }
}
