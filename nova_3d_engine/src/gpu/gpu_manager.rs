/// GPU manager
///
/// Owns the device and every GPU lifecycle component: fences, swap chain
/// buffers, command units, heaps and resource records. All public
/// operations go through the configured `FailurePolicy`.

use bytemuck::Pod;
use crate::error::{Error, Result};
use crate::graphics_device::{
    align_up, AdapterProvider, GraphicsDevice, IndexFormat, PrimitiveTopology, TextureFormat,
    CONSTANT_BUFFER_ALIGNMENT,
};
use crate::gpu::{
    adapter, AdapterInfo, Config, FenceSet, FrameController, FrameStats, GpuMemory,
    GpuResource, GpuResourceHandle, GpuResourceKind, MemoryStats, SwapChainBuffers,
};

const SOURCE: &str = "nova3d::gpu";

/// Components that die with the device
struct FrameParts {
    fences: FenceSet,
    swap_chain: SwapChainBuffers,
    frames: FrameController,
}

fn live_parts(parts: &mut Option<FrameParts>) -> Result<&mut FrameParts> {
    parts
        .as_mut()
        .ok_or_else(|| Error::InvalidState("the GPU has been shut down".to_string()))
}

fn live_memory(memory: &mut Option<GpuMemory>) -> Result<&mut GpuMemory> {
    memory
        .as_mut()
        .ok_or_else(|| Error::InvalidState("GPU memory has been released".to_string()))
}

/// Index buffer bound for `draw_indices`
#[derive(Debug, Clone, Copy)]
struct BoundIndices {
    count: u32,
}

/// The GPU context
pub struct GpuManager {
    device: Box<dyn GraphicsDevice>,
    info: AdapterInfo,
    config: Config,
    parts: Option<FrameParts>,
    memory: Option<GpuMemory>,
    bound_indices: Option<BoundIndices>,
    unnamed_resources: u64,
}

impl GpuManager {
    /// Bootstrap the device and create every lifecycle component
    ///
    /// # Arguments
    ///
    /// * `provider` - Backend adapter provider (bound to the target window)
    /// * `width`, `height` - Client area size of the window
    /// * `config` - Lifecycle configuration
    pub fn new(provider: &dyn AdapterProvider, width: u32, height: u32, config: Config) -> Result<Self> {
        let policy = config.failure_policy;
        let result = Self::create(provider, width, height, config);
        policy.apply(SOURCE, "GPU initialization", result)
    }

    fn create(provider: &dyn AdapterProvider, width: u32, height: u32, config: Config) -> Result<Self> {
        config.validate()?;
        let (mut device, info) = adapter::create_device(provider, &config)?;
        let tearing = info.features.tearing_supported;

        let fences = FenceSet::new(device.as_mut(), config.buffer_count)?;
        let swap_chain = SwapChainBuffers::create(device.as_mut(), width, height, &config, tearing)?;
        let frames = FrameController::new(device.as_mut(), &config, tearing)?;
        let memory = GpuMemory::new(device.as_mut(), &config, &info.features)?;

        crate::engine_info!(
            SOURCE,
            "GPU ready: {} buffers, vsync {}, {} MiB budget",
            config.buffer_count,
            if config.vsync { "on" } else { "off" },
            config.gpu_memory_budget / (1024 * 1024)
        );
        Ok(Self {
            device,
            info,
            config,
            parts: Some(FrameParts { fences, swap_chain, frames }),
            memory: Some(memory),
            bound_indices: None,
            unnamed_resources: 0,
        })
    }

    fn check<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        self.config.failure_policy.apply(SOURCE, operation, result)
    }

    // ===== QUERIES =====

    /// Adapter, feature level and capabilities of the device in use
    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.info
    }

    /// Configuration the manager was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a frame is being recorded
    pub fn is_recording(&self) -> bool {
        self.parts.as_ref().map_or(false, |parts| parts.frames.is_recording())
    }

    /// Buffer index the next (or current) frame uses
    pub fn current_buffer_index(&self) -> Option<u32> {
        self.parts.as_ref().map(|parts| parts.swap_chain.current_index())
    }

    /// Current back buffer size
    pub fn size(&self) -> Option<(u32, u32)> {
        self.parts.as_ref().map(|parts| parts.swap_chain.size())
    }

    /// Counters of the current (or last) frame
    pub fn stats(&self) -> FrameStats {
        self.parts.as_ref().map(|parts| parts.frames.stats()).unwrap_or_default()
    }

    /// Heap usage snapshot
    pub fn memory_stats(&self) -> MemoryStats {
        self.memory.as_ref().map(GpuMemory::stats).unwrap_or_default()
    }

    /// Resource record of a handle
    pub fn resource(&self, handle: GpuResourceHandle) -> Option<&GpuResource> {
        self.memory.as_ref().and_then(|memory| memory.resource(handle))
    }

    /// Handle of the live resource registered under `name`
    pub fn resource_by_name(&self, name: &str) -> Option<GpuResourceHandle> {
        self.memory.as_ref().and_then(|memory| memory.handle_by_name(name))
    }

    // ===== FRAME =====

    /// StartFrame: wait until the current buffer index is free and open its command list
    pub fn start_frame(&mut self) -> Result<()> {
        let result = self.start_frame_inner();
        self.check("start_frame", result)
    }

    fn start_frame_inner(&mut self) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        parts.frames.begin(device, &parts.fences, &mut parts.swap_chain)?;
        self.bound_indices = None;

        if let Some(memory) = self.memory.as_mut() {
            // The wait above retired every frame that could use these
            let collected = memory.collect_releases(device, parts.frames.frames_started());
            if collected > 0 {
                crate::engine_debug!(SOURCE, "Released {} deferred resources", collected);
            }
            let (_, list) = parts.frames.recording_list()?;
            list.set_descriptor_heap(memory.descriptor_heap())?;
        }
        let (_, list) = parts.frames.recording_list()?;
        list.set_primitive_topology(PrimitiveTopology::TriangleList)
    }

    /// EndFrame: submit the recorded commands, signal the fence and present
    pub fn end_frame(&mut self) -> Result<()> {
        let result = self.end_frame_inner();
        self.check("end_frame", result)
    }

    fn end_frame_inner(&mut self) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        self.bound_indices = None;
        let executed = parts.frames.frames_executed();
        let result = parts.frames.end(device, &mut parts.fences, &mut parts.swap_chain);
        if let Some(memory) = self.memory.as_mut() {
            if parts.frames.frames_executed() > executed {
                memory.commit_recorded_states();
            } else {
                memory.discard_recorded_states();
            }
        }
        result?;
        Ok(())
    }

    /// WaitForGPU: signal the fence of `index` and block until the GPU reaches it
    pub fn wait_for_gpu(&mut self, index: u32) -> Result<()> {
        let device = self.device.as_mut();
        let result = live_parts(&mut self.parts).and_then(|parts| parts.fences.wait_for_gpu(device, index));
        self.check("wait_for_gpu", result)
    }

    /// FlushGPU: `wait_for_gpu` on every buffer index
    pub fn flush_gpu(&mut self) -> Result<()> {
        let device = self.device.as_mut();
        let result = live_parts(&mut self.parts).and_then(|parts| parts.fences.flush_gpu(device));
        self.check("flush_gpu", result)
    }

    /// Window resize notification
    ///
    /// Zero-area sizes (minimized window) and the current size are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let result = self.resize_inner(width, height);
        self.check("resize", result)
    }

    fn resize_inner(&mut self, width: u32, height: u32) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        if parts.frames.is_recording() {
            return Err(Error::InvalidState("cannot resize inside a frame".to_string()));
        }
        parts.swap_chain.resize(device, &mut parts.fences, width, height)?;
        Ok(())
    }

    // ===== RESOURCE CREATION =====

    fn resource_name(&mut self, kind: &GpuResourceKind, name: Option<&str>) -> String {
        match name {
            Some(name) => name.to_string(),
            None => {
                self.unnamed_resources += 1;
                format!("{}#{}", kind.label(), self.unnamed_resources)
            }
        }
    }

    fn push(&mut self, operation: &str, kind: GpuResourceKind, name: Option<&str>) -> Result<GpuResourceHandle> {
        let name = self.resource_name(&kind, name);
        let device = self.device.as_mut();
        let result = live_memory(&mut self.memory).and_then(|memory| memory.create_resource(device, &name, kind));
        self.check(operation, result)
    }

    /// PushVertexBuffer: place a vertex buffer of `vertex_count` vertices of `stride` bytes
    pub fn push_vertex_buffer(
        &mut self,
        vertex_count: u32,
        stride: u32,
        name: Option<&str>,
    ) -> Result<GpuResourceHandle> {
        self.push("push_vertex_buffer", GpuResourceKind::VertexBuffer { vertex_count, stride }, name)
    }

    /// PushIndexBuffer: place an index buffer of `index_count` indices
    pub fn push_index_buffer(
        &mut self,
        index_count: u32,
        format: IndexFormat,
        name: Option<&str>,
    ) -> Result<GpuResourceHandle> {
        self.push("push_index_buffer", GpuResourceKind::IndexBuffer { index_count, format }, name)
    }

    /// PushConstantBuffer: place a constant buffer, its size rounded up to 256 bytes
    pub fn push_constant_buffer(&mut self, size: u64, name: Option<&str>) -> Result<GpuResourceHandle> {
        let size = align_up(size, CONSTANT_BUFFER_ALIGNMENT);
        self.push("push_constant_buffer", GpuResourceKind::ConstantBuffer { size }, name)
    }

    /// Place a sampled 2D texture (single mip)
    pub fn push_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        name: Option<&str>,
    ) -> Result<GpuResourceHandle> {
        if format.is_depth() {
            let result = Err(Error::InvalidResource(format!("{:?} cannot be sampled", format)));
            return self.check("push_texture", result);
        }
        self.push("push_texture", GpuResourceKind::Texture { width, height, format }, name)
    }

    // ===== UPLOAD =====

    /// SetGPUResourceData: stage `data` in the current buffer index's upload
    /// placement and record the copy into the GPU-resident resource
    ///
    /// Only valid between `start_frame` and `end_frame`.
    pub fn set_gpu_resource_data<T: Pod>(&mut self, handle: GpuResourceHandle, data: &[T]) -> Result<()> {
        let result = self.upload(handle, bytemuck::cast_slice(data));
        self.check("set_gpu_resource_data", result)
    }

    /// SetGPUResourceDataByName: `set_gpu_resource_data` on the resource named `name`
    pub fn set_gpu_resource_data_by_name<T: Pod>(&mut self, name: &str, data: &[T]) -> Result<()> {
        let result = self
            .resource_by_name(name)
            .ok_or_else(|| Error::InvalidResource(format!("no resource named '{}'", name)))
            .and_then(|handle| self.upload(handle, bytemuck::cast_slice(data)));
        self.check("set_gpu_resource_data_by_name", result)
    }

    fn upload(&mut self, handle: GpuResourceHandle, bytes: &[u8]) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        let memory = live_memory(&mut self.memory)?;
        let (index, list) = parts.frames.recording_list()?;
        let uploaded = memory.upload(device, list, handle, index, bytes)?;
        parts.frames.record_upload(uploaded);
        Ok(())
    }

    // ===== DRAW =====

    /// BindVertexBuffer: bind a vertex buffer to input slot 0
    pub fn bind_vertex_buffer(&mut self, handle: GpuResourceHandle) -> Result<()> {
        let result = self.bind_vertex_buffer_inner(handle);
        self.check("bind_vertex_buffer", result)
    }

    fn bind_vertex_buffer_inner(&mut self, handle: GpuResourceHandle) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        let memory = live_memory(&mut self.memory)?;
        let view = memory.vertex_buffer_view(device, handle)?;
        let (_, list) = parts.frames.recording_list()?;
        list.set_vertex_buffer(0, view)
    }

    /// BindIndexBuffer: bind an index buffer for `draw_indices`
    pub fn bind_index_buffer(&mut self, handle: GpuResourceHandle) -> Result<()> {
        let result = self.bind_index_buffer_inner(handle);
        self.check("bind_index_buffer", result)
    }

    fn bind_index_buffer_inner(&mut self, handle: GpuResourceHandle) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        let memory = live_memory(&mut self.memory)?;
        let (view, count) = memory.index_buffer_view(device, handle)?;
        let (_, list) = parts.frames.recording_list()?;
        list.set_index_buffer(view)?;
        self.bound_indices = Some(BoundIndices { count });
        Ok(())
    }

    /// Bind a constant buffer to root parameter `root_index`
    pub fn bind_constant_buffer(&mut self, root_index: u32, handle: GpuResourceHandle) -> Result<()> {
        let device = self.device.as_mut();
        let result = live_parts(&mut self.parts).and_then(|parts| {
            let memory = live_memory(&mut self.memory)?;
            let address = memory.constant_buffer_address(device, handle)?;
            let (_, list) = parts.frames.recording_list()?;
            list.set_constant_buffer(root_index, address)
        });
        self.check("bind_constant_buffer", result)
    }

    /// Primitive topology of the following draws (triangle list at frame start)
    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) -> Result<()> {
        let result = live_parts(&mut self.parts)
            .and_then(|parts| parts.frames.recording_list())
            .and_then(|(_, list)| list.set_primitive_topology(topology));
        self.check("set_primitive_topology", result)
    }

    /// DrawVertices: non-indexed draw from the bound vertex buffer
    pub fn draw_vertices(&mut self, vertex_count: u32, instance_count: u32) -> Result<()> {
        let result = live_parts(&mut self.parts).and_then(|parts| {
            let (_, list) = parts.frames.recording_list()?;
            list.draw(vertex_count, instance_count, 0, 0)?;
            parts.frames.record_draw();
            Ok(())
        });
        self.check("draw_vertices", result)
    }

    /// DrawIndices: indexed draw of every index of the bound index buffer
    pub fn draw_indices(&mut self, instance_count: u32) -> Result<()> {
        let bound = self.bound_indices;
        let result = live_parts(&mut self.parts).and_then(|parts| {
            let bound = bound.ok_or_else(|| {
                Error::InvalidState("draw_indices without a bound index buffer".to_string())
            })?;
            let (_, list) = parts.frames.recording_list()?;
            list.draw_indexed(bound.count, instance_count, 0, 0, 0)?;
            parts.frames.record_draw();
            Ok(())
        });
        self.check("draw_indices", result)
    }

    // ===== RELEASE =====

    /// Release one resource
    ///
    /// Its name can be reused at once. Its heap ranges come back once every
    /// frame that could still read it has completed.
    pub fn release_resource(&mut self, handle: GpuResourceHandle) -> Result<()> {
        let frame = self.parts.as_ref().map_or(0, |parts| parts.frames.frames_started());
        let result = live_memory(&mut self.memory).and_then(|memory| memory.release(handle, frame));
        self.check("release_resource", result)
    }

    /// Scene reset: flush the GPU, destroy every resource and rewind every heap
    pub fn reset_heaps(&mut self) -> Result<()> {
        let result = self.reset_heaps_inner();
        self.check("reset_heaps", result)
    }

    fn reset_heaps_inner(&mut self) -> Result<()> {
        let device = self.device.as_mut();
        let parts = live_parts(&mut self.parts)?;
        if parts.frames.is_recording() {
            return Err(Error::InvalidState("cannot reset heaps inside a frame".to_string()));
        }
        parts.fences.flush_gpu(device)?;
        live_memory(&mut self.memory)?.reset(device);
        Ok(())
    }

    /// ReleaseGPUMemory: flush the GPU, then release every resource, every heap
    /// and the shader-visible descriptor heap
    pub fn release_gpu_memory(&mut self) -> Result<()> {
        let result = self.release_gpu_memory_inner();
        self.check("release_gpu_memory", result)
    }

    fn release_gpu_memory_inner(&mut self) -> Result<()> {
        let device = self.device.as_mut();
        if let Some(parts) = self.parts.as_mut() {
            if parts.frames.is_recording() {
                return Err(Error::InvalidState("cannot release GPU memory inside a frame".to_string()));
            }
            parts.fences.flush_gpu(device)?;
        }
        if let Some(memory) = self.memory.take() {
            memory.destroy(device);
        }
        Ok(())
    }

    // ===== DEVICE LIFECYCLE =====

    /// Recover from `DeviceLost`: create a new device, swap chain, fences,
    /// command units and heaps, and re-place every live resource under its
    /// existing handle
    ///
    /// Resource contents must be uploaded again.
    pub fn recreate_device(&mut self, provider: &dyn AdapterProvider) -> Result<()> {
        let result = self.recreate_device_inner(provider);
        self.check("recreate_device", result)
    }

    fn recreate_device_inner(&mut self, provider: &dyn AdapterProvider) -> Result<()> {
        let (width, height) = live_parts(&mut self.parts)?.swap_chain.size();
        crate::engine_warn!(SOURCE, "Recreating the GPU device");

        // The old device (and its swap chain) goes before the new swap chain is made
        let (device, info) = adapter::create_device(provider, &self.config)?;
        self.device = device;
        self.bound_indices = None;
        let tearing = info.features.tearing_supported;
        let device = self.device.as_mut();

        let fences = FenceSet::new(device, self.config.buffer_count)?;
        let swap_chain = SwapChainBuffers::create(device, width, height, &self.config, tearing)?;
        let parts = live_parts(&mut self.parts)?;
        parts.frames.recreate(device, tearing)?;
        parts.fences = fences;
        parts.swap_chain = swap_chain;
        if let Some(memory) = self.memory.as_mut() {
            memory.rebuild(device, &self.config, &info.features)?;
        }
        self.info = info;

        crate::engine_info!(SOURCE, "GPU device recreated on '{}'", self.info.adapter.description);
        Ok(())
    }

    /// Flush the GPU and release everything the manager created
    ///
    /// Further calls fail with `InvalidState`. Called on drop if needed.
    pub fn shutdown(&mut self) -> Result<()> {
        let result = self.shutdown_inner();
        self.check("shutdown", result)
    }

    fn shutdown_inner(&mut self) -> Result<()> {
        let Some(parts) = self.parts.take() else {
            return Ok(());
        };
        let device = self.device.as_mut();
        if parts.frames.is_recording() {
            crate::engine_warn!(SOURCE, "Shutting down inside an open frame, its commands are dropped");
        }
        let FrameParts { mut fences, swap_chain, frames } = parts;
        // The command lists may still be open; dropping them discards the recording
        drop(frames);
        let flushed = fences.flush_gpu(device);
        if let Some(memory) = self.memory.take() {
            memory.destroy(device);
        }
        swap_chain.destroy(device);
        fences.destroy(device);
        self.bound_indices = None;

        crate::engine_info!(SOURCE, "GPU shut down");
        flushed
    }
}

impl Drop for GpuManager {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown_inner() {
            crate::engine_warn!(SOURCE, "Shutdown on drop: {}", error);
        }
    }
}

#[cfg(test)]
#[path = "gpu_manager_tests.rs"]
mod tests;
