/// GPU memory manager
///
/// Owns the pre-reserved heaps (default buffer, default texture and one
/// upload buffer/texture pair per swap chain buffer index), the resource
/// record arena and the descriptor table.
///
/// Every resource has one default-heap placement and one upload placement
/// per buffer index. An upload only ever writes the placement of the buffer
/// index being recorded, so the CPU never overwrites staging memory a frame
/// still in flight reads from.

use std::collections::VecDeque;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    align_up, AllocationInfo, CommandList, DescriptorHeapId, DeviceFeatures, GraphicsDevice,
    HeapContents, HeapDesc, HeapUsage, IndexBufferView, ResourceBarrier, ResourceDesc,
    ResourceState, TextureUsage, VertexBufferView, ViewDesc,
};
use crate::gpu::Config;
use crate::gpu::memory::{
    AllocationState, DescriptorTable, GpuHeap, GpuResource, GpuResourceHandle,
    GpuResourceKind, HeapClass, Placement,
};

const SOURCE: &str = "nova3d::gpu::memory";

/// Memory usage snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub default_buffer_used: u64,
    pub default_texture_used: u64,
    /// Summed over every buffer index
    pub upload_buffer_used: u64,
    /// Summed over every buffer index
    pub upload_texture_used: u64,
    pub live_resources: usize,
    pub pending_releases: usize,
    pub descriptors: usize,
}

/// The heap set of one device
struct HeapSet {
    default_buffers: GpuHeap,
    default_textures: GpuHeap,
    upload_buffers: Vec<GpuHeap>,
    upload_textures: Vec<GpuHeap>,
}

impl HeapSet {
    fn create(device: &mut dyn GraphicsDevice, config: &Config, alignment: u64) -> Result<Self> {
        let buffer_size = align_up(config.buffer_heap_bytes(), alignment);
        let texture_size = align_up(config.texture_heap_bytes(), alignment);
        let policy = config.placement_policy;
        let desc = |size, usage, contents| HeapDesc { size, alignment, usage, contents };

        let default_buffers = GpuHeap::create(
            device,
            "default-buffer",
            desc(buffer_size, HeapUsage::Default, HeapContents::Buffers),
            policy,
        )?;
        let default_textures = GpuHeap::create(
            device,
            "default-texture",
            desc(texture_size, HeapUsage::Default, HeapContents::Textures),
            policy,
        )?;

        let mut upload_buffers = Vec::with_capacity(config.buffer_count as usize);
        let mut upload_textures = Vec::with_capacity(config.buffer_count as usize);
        for index in 0..config.buffer_count {
            upload_buffers.push(GpuHeap::create(
                device,
                &format!("upload-buffer[{}]", index),
                desc(buffer_size, HeapUsage::Upload, HeapContents::Buffers),
                policy,
            )?);
            // Texture uploads go through linear buffers laid out by footprint
            upload_textures.push(GpuHeap::create(
                device,
                &format!("upload-texture[{}]", index),
                desc(texture_size, HeapUsage::Upload, HeapContents::Buffers),
                policy,
            )?);
        }

        crate::engine_info!(
            SOURCE,
            "Reserved GPU heaps: {} bytes buffers, {} bytes textures, {} upload sets",
            buffer_size, texture_size, config.buffer_count
        );
        Ok(Self { default_buffers, default_textures, upload_buffers, upload_textures })
    }

    fn get(&self, class: HeapClass) -> Option<&GpuHeap> {
        match class {
            HeapClass::DefaultBuffer => Some(&self.default_buffers),
            HeapClass::DefaultTexture => Some(&self.default_textures),
            HeapClass::UploadBuffer(index) => self.upload_buffers.get(index as usize),
            HeapClass::UploadTexture(index) => self.upload_textures.get(index as usize),
        }
    }

    fn get_mut(&mut self, class: HeapClass) -> Option<&mut GpuHeap> {
        match class {
            HeapClass::DefaultBuffer => Some(&mut self.default_buffers),
            HeapClass::DefaultTexture => Some(&mut self.default_textures),
            HeapClass::UploadBuffer(index) => self.upload_buffers.get_mut(index as usize),
            HeapClass::UploadTexture(index) => self.upload_textures.get_mut(index as usize),
        }
    }

    fn all_mut(&mut self) -> impl Iterator<Item = &mut GpuHeap> {
        [&mut self.default_buffers, &mut self.default_textures]
            .into_iter()
            .chain(self.upload_buffers.iter_mut())
            .chain(self.upload_textures.iter_mut())
    }

    fn destroy(self, device: &mut dyn GraphicsDevice) {
        self.default_buffers.destroy(device);
        self.default_textures.destroy(device);
        for heap in self.upload_buffers.into_iter().chain(self.upload_textures) {
            heap.destroy(device);
        }
    }
}

/// GPU heap allocator and resource registry
pub struct GpuMemory {
    heaps: HeapSet,
    resources: SlotMap<GpuResourceHandle, GpuResource>,
    names: FxHashMap<String, GpuResourceHandle>,
    descriptors: DescriptorTable,
    pending_releases: VecDeque<GpuResourceHandle>,
    /// States left by barriers of the open command list, not yet executed
    recorded_states: FxHashMap<GpuResourceHandle, ResourceState>,
    buffer_count: u32,
}

impl GpuMemory {
    /// Reserve every heap and the descriptor heap
    pub fn new(device: &mut dyn GraphicsDevice, config: &Config, features: &DeviceFeatures) -> Result<Self> {
        let heaps = HeapSet::create(device, config, features.placement_alignment)?;
        let descriptors = DescriptorTable::create(device, config.descriptor_capacity)?;
        Ok(Self {
            heaps,
            resources: SlotMap::with_key(),
            names: FxHashMap::default(),
            descriptors,
            pending_releases: VecDeque::new(),
            recorded_states: FxHashMap::default(),
            buffer_count: config.buffer_count,
        })
    }

    // ===== QUERIES =====

    /// Heap of a class
    pub fn heap(&self, class: HeapClass) -> Option<&GpuHeap> {
        self.heaps.get(class)
    }

    /// Shader-visible descriptor heap
    pub fn descriptor_heap(&self) -> DescriptorHeapId {
        self.descriptors.heap()
    }

    /// Descriptor table (records and slots)
    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    /// Record of a handle, whatever its state
    pub fn resource(&self, handle: GpuResourceHandle) -> Option<&GpuResource> {
        self.resources.get(handle)
    }

    /// Handle registered under `name`
    pub fn handle_by_name(&self, name: &str) -> Option<GpuResourceHandle> {
        self.names.get(name).copied()
    }

    /// Usage snapshot
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            default_buffer_used: self.heaps.default_buffers.used(),
            default_texture_used: self.heaps.default_textures.used(),
            upload_buffer_used: self.heaps.upload_buffers.iter().map(GpuHeap::used).sum(),
            upload_texture_used: self.heaps.upload_textures.iter().map(GpuHeap::used).sum(),
            live_resources: self.resources.len() - self.pending_releases.len(),
            pending_releases: self.pending_releases.len(),
            descriptors: self.descriptors.allocated_count(),
        }
    }

    fn live(&self, handle: GpuResourceHandle) -> Result<&GpuResource> {
        match self.resources.get(handle) {
            Some(record) if record.state == AllocationState::Allocated => Ok(record),
            Some(record) => Err(Error::InvalidResource(format!(
                "'{}' has been released",
                record.name
            ))),
            None => Err(Error::InvalidResource("unknown resource handle".to_string())),
        }
    }

    // ===== CREATION =====

    /// Create a resource and place it in the default heap and every upload heap
    ///
    /// Either every placement succeeds or none is kept.
    pub fn create_resource(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        kind: GpuResourceKind,
    ) -> Result<GpuResourceHandle> {
        if self.names.contains_key(name) {
            return Err(Error::InvalidResource(format!("a resource named '{}' already exists", name)));
        }
        if kind.byte_size() == 0 {
            return Err(Error::InvalidResource(format!("'{}' has zero size", name)));
        }
        // Vertex, index and constant buffer views carry a 32-bit size
        let buffer = !matches!(kind, GpuResourceKind::Texture { .. });
        if buffer && kind.byte_size() > u32::MAX as u64 {
            return Err(Error::InvalidResource(format!(
                "{} '{}' is {} bytes, buffer views stop at {}",
                kind.label(),
                name,
                kind.byte_size(),
                u32::MAX
            )));
        }

        let desc = match kind {
            GpuResourceKind::Texture { width, height, format } => ResourceDesc::Texture2D {
                width,
                height,
                mip_levels: 1,
                format,
                usage: TextureUsage::Sampled,
            },
            _ => ResourceDesc::buffer(kind.byte_size()),
        };
        let upload_desc = match desc {
            ResourceDesc::Texture2D { .. } => ResourceDesc::buffer(device.copyable_footprint(&desc).total_bytes),
            buffer => buffer,
        };

        let handle = self
            .resources
            .insert(GpuResource::new(name, kind, desc, upload_desc, self.buffer_count));
        if let Err(error) = self.place(device, handle) {
            self.resources.remove(handle);
            crate::engine_warn!(SOURCE, "Failed to place {} '{}': {}", kind.label(), name, error);
            return Err(error);
        }
        self.names.insert(name.to_string(), handle);

        crate::engine_debug!(
            SOURCE,
            "Placed {} '{}' ({} bytes) at offset {}",
            kind.label(),
            name,
            kind.byte_size(),
            self.resources[handle].default.map(|p| p.offset).unwrap_or(0)
        );
        Ok(handle)
    }

    fn place_one(
        &mut self,
        device: &mut dyn GraphicsDevice,
        class: HeapClass,
        info: AllocationInfo,
        desc: &ResourceDesc,
        state: ResourceState,
        name: &str,
    ) -> Result<Placement> {
        let heap = self
            .heaps
            .get_mut(class)
            .ok_or_else(|| Error::InvalidState(format!("no heap {:?}", class)))?;
        let offset = heap.allocate(info)?;
        let heap_id = heap.id();
        match device.create_placed_resource(heap_id, offset, desc, state, name) {
            Ok(resource) => Ok(Placement { heap: class, offset, size: info.size, resource }),
            Err(error) => {
                if let Some(heap) = self.heaps.get_mut(class) {
                    heap.rollback(offset, info.size);
                }
                Err(error)
            }
        }
    }

    fn unplace(&mut self, device: &mut dyn GraphicsDevice, placement: Placement) {
        device.release_resource(placement.resource);
        if let Some(heap) = self.heaps.get_mut(placement.heap) {
            heap.free(placement.offset, placement.size);
        }
    }

    /// Place an unplaced record (new, or surviving a device recreation)
    fn place(&mut self, device: &mut dyn GraphicsDevice, handle: GpuResourceHandle) -> Result<()> {
        let (name, kind, desc, upload_desc, descriptor) = {
            let record = self
                .resources
                .get(handle)
                .ok_or_else(|| Error::InvalidResource("unknown resource handle".to_string()))?;
            (record.name.clone(), record.kind, record.desc, record.upload_desc, record.descriptor)
        };
        let texture = matches!(kind, GpuResourceKind::Texture { .. });
        let default_class = if texture { HeapClass::DefaultTexture } else { HeapClass::DefaultBuffer };
        let upload_class = |index| {
            if texture { HeapClass::UploadTexture(index) } else { HeapClass::UploadBuffer(index) }
        };
        let default_info = device.resource_allocation_info(&desc);
        let upload_info = device.resource_allocation_info(&upload_desc);

        // Every heap of the set must have room before anything is placed
        let classes = std::iter::once((default_class, default_info))
            .chain((0..self.buffer_count).map(|index| (upload_class(index), upload_info)));
        for (class, info) in classes {
            if let Some(heap) = self.heaps.get(class) {
                if !heap.can_allocate(info) {
                    return Err(heap.exhausted(info));
                }
            }
        }

        // Buffers always start in COMMON; textures start as copy targets
        let initial_state = if texture { ResourceState::CopyDest } else { ResourceState::Common };
        let mut placed: Vec<Placement> = Vec::with_capacity(1 + self.buffer_count as usize);
        let mut acquired = None;
        let result = (|| -> Result<()> {
            placed.push(self.place_one(device, default_class, default_info, &desc, initial_state, &name)?);
            for index in 0..self.buffer_count {
                let upload_name = format!("{} [upload {}]", name, index);
                placed.push(self.place_one(
                    device,
                    upload_class(index),
                    upload_info,
                    &upload_desc,
                    ResourceState::GenericRead,
                    &upload_name,
                )?);
            }
            if kind.needs_descriptor() {
                let key = match descriptor {
                    Some(key) => key,
                    None => {
                        let key = self.descriptors.acquire(handle)?;
                        acquired = Some(key);
                        key
                    }
                };
                let view = match kind {
                    GpuResourceKind::Texture { format, .. } => ViewDesc::ShaderResource { format, mip_levels: 1 },
                    _ => ViewDesc::ConstantBuffer { size: placed[0].size.min(u32::MAX as u64) as u32 },
                };
                device.create_view(self.descriptors.handle(key)?, placed[0].resource, &view)?;
            }
            Ok(())
        })();

        if let Err(error) = result {
            if let Some(key) = acquired {
                self.descriptors.release(key);
            }
            for placement in placed.into_iter().rev() {
                device.release_resource(placement.resource);
                if let Some(heap) = self.heaps.get_mut(placement.heap) {
                    heap.rollback(placement.offset, placement.size);
                }
            }
            return Err(error);
        }

        if let Some(record) = self.resources.get_mut(handle) {
            let mut placements = placed.into_iter();
            record.default = placements.next();
            record.uploads = placements.map(Some).collect();
            if acquired.is_some() {
                record.descriptor = acquired;
            }
            record.gpu_state = initial_state;
            record.needs_upload = true;
            record.state = AllocationState::Allocated;
        }
        Ok(())
    }

    // ===== UPLOAD =====

    /// Write `bytes` into the upload placement of `index` and record the copy
    /// into the default placement, bracketed by barriers
    ///
    /// Returns the number of bytes uploaded.
    pub fn upload(
        &mut self,
        device: &mut dyn GraphicsDevice,
        list: &mut dyn CommandList,
        handle: GpuResourceHandle,
        index: u32,
        bytes: &[u8],
    ) -> Result<u64> {
        let record = self.live(handle)?;
        let capacity = record.kind.byte_size();
        let len = bytes.len() as u64;
        if bytes.is_empty() || len > capacity {
            return Err(Error::InvalidResource(format!(
                "'{}' holds {} bytes, got {}",
                record.name, capacity, len
            )));
        }
        if matches!(record.kind, GpuResourceKind::Texture { .. }) && len != capacity {
            return Err(Error::InvalidResource(format!(
                "texture '{}' needs exactly {} bytes, got {}",
                record.name, capacity, len
            )));
        }
        let upload = record.upload_resource(index).ok_or_else(|| {
            Error::InvalidState(format!("'{}' has no upload placement for index {}", record.name, index))
        })?;
        let default = record
            .default_resource()
            .ok_or_else(|| Error::InvalidState(format!("'{}' is not placed", record.name)))?;
        // A second upload in the same list starts where the first one left it
        let before = self.recorded_states.get(&handle).copied().unwrap_or(record.gpu_state);
        let after = record.kind.read_state();

        if before != ResourceState::CopyDest {
            list.resource_barriers(&[ResourceBarrier::transition(default, before, ResourceState::CopyDest)])?;
        }
        match record.kind {
            GpuResourceKind::Texture { width, height, format } => {
                let footprint = device.copyable_footprint(&record.desc);
                for (row, texels) in bytes.chunks_exact(footprint.row_size as usize).enumerate() {
                    device.write_mapped(upload, row as u64 * footprint.row_pitch, texels)?;
                }
                list.copy_texture_from_buffer(default, upload, &footprint, format, width, height)?;
            }
            _ => {
                device.write_mapped(upload, 0, bytes)?;
                list.copy_buffer_region(default, 0, upload, 0, len)?;
            }
        }
        list.resource_barriers(&[ResourceBarrier::transition(default, ResourceState::CopyDest, after)])?;

        self.recorded_states.insert(handle, after);
        if let Some(record) = self.resources.get_mut(handle) {
            record.needs_upload = false;
            record.uploaded_bytes[index as usize] = len;
        }
        crate::engine_trace!(SOURCE, "Uploaded {} bytes through upload set {}", len, index);
        Ok(len)
    }

    /// State `handle` is in at the end of the commands recorded so far
    pub fn recorded_state(&self, handle: GpuResourceHandle) -> Option<ResourceState> {
        self.recorded_states
            .get(&handle)
            .copied()
            .or_else(|| self.resources.get(handle).map(|record| record.gpu_state))
    }

    /// The list holding the recorded barriers was executed: make its states current
    pub fn commit_recorded_states(&mut self) {
        for (handle, state) in self.recorded_states.drain() {
            if let Some(record) = self.resources.get_mut(handle) {
                record.gpu_state = state;
            }
        }
    }

    /// The list holding the recorded barriers never reached the queue
    pub fn discard_recorded_states(&mut self) {
        if !self.recorded_states.is_empty() {
            crate::engine_debug!(
                SOURCE,
                "Dropped {} state transitions of an unsubmitted frame",
                self.recorded_states.len()
            );
            self.recorded_states.clear();
        }
    }

    // ===== DRAW BINDINGS =====

    /// Vertex buffer view of a vertex buffer resource
    pub fn vertex_buffer_view(
        &self,
        device: &dyn GraphicsDevice,
        handle: GpuResourceHandle,
    ) -> Result<VertexBufferView> {
        let record = self.live(handle)?;
        match record.kind {
            GpuResourceKind::VertexBuffer { stride, .. } => Ok(VertexBufferView {
                gpu_address: device.gpu_virtual_address(record.default_resource().ok_or_else(|| {
                    Error::InvalidState(format!("'{}' is not placed", record.name))
                })?),
                size_in_bytes: view_size(record)?,
                stride,
            }),
            other => Err(Error::InvalidResource(format!(
                "'{}' is a {}, not a vertex buffer",
                record.name,
                other.label()
            ))),
        }
    }

    /// Index buffer view and index count of an index buffer resource
    pub fn index_buffer_view(
        &self,
        device: &dyn GraphicsDevice,
        handle: GpuResourceHandle,
    ) -> Result<(IndexBufferView, u32)> {
        let record = self.live(handle)?;
        match record.kind {
            GpuResourceKind::IndexBuffer { index_count, format } => Ok((
                IndexBufferView {
                    gpu_address: device.gpu_virtual_address(record.default_resource().ok_or_else(|| {
                        Error::InvalidState(format!("'{}' is not placed", record.name))
                    })?),
                    size_in_bytes: view_size(record)?,
                    format,
                },
                index_count,
            )),
            other => Err(Error::InvalidResource(format!(
                "'{}' is a {}, not an index buffer",
                record.name,
                other.label()
            ))),
        }
    }

    /// GPU address of a constant buffer resource
    pub fn constant_buffer_address(
        &self,
        device: &dyn GraphicsDevice,
        handle: GpuResourceHandle,
    ) -> Result<u64> {
        let record = self.live(handle)?;
        match record.kind {
            GpuResourceKind::ConstantBuffer { .. } => Ok(device.gpu_virtual_address(
                record
                    .default_resource()
                    .ok_or_else(|| Error::InvalidState(format!("'{}' is not placed", record.name)))?,
            )),
            other => Err(Error::InvalidResource(format!(
                "'{}' is a {}, not a constant buffer",
                record.name,
                other.label()
            ))),
        }
    }

    // ===== RELEASE =====

    /// Queue a resource for release
    ///
    /// The name is freed at once; the placements come back once the GPU can
    /// no longer reference them (see `collect_releases`).
    pub fn release(&mut self, handle: GpuResourceHandle, frame: u64) -> Result<()> {
        self.live(handle)?;
        if let Some(record) = self.resources.get_mut(handle) {
            record.state = AllocationState::InFreeList;
            record.release_frame = Some(frame);
            self.names.remove(&record.name);
            crate::engine_debug!(SOURCE, "Queued '{}' for release (frame {})", record.name, frame);
        }
        self.pending_releases.push_back(handle);
        Ok(())
    }

    /// Destroy queued resources released at least `buffer_count` frames ago
    ///
    /// Called right after the frame-start fence wait, when every frame that
    /// could still reference them has completed. Returns how many went.
    pub fn collect_releases(&mut self, device: &mut dyn GraphicsDevice, frames_started: u64) -> usize {
        let mut collected = 0;
        while let Some(&handle) = self.pending_releases.front() {
            let due = self
                .resources
                .get(handle)
                .and_then(|record| record.release_frame)
                .map_or(true, |frame| frames_started >= frame + self.buffer_count as u64);
            if !due {
                break;
            }
            self.pending_releases.pop_front();
            self.destroy_record(device, handle);
            collected += 1;
        }
        collected
    }

    fn destroy_record(&mut self, device: &mut dyn GraphicsDevice, handle: GpuResourceHandle) {
        if let Some(record) = self.resources.remove(handle) {
            for placement in record.placements() {
                self.unplace(device, placement);
            }
            if let Some(key) = record.descriptor {
                self.descriptors.release(key);
            }
            if self.names.get(&record.name) == Some(&handle) {
                self.names.remove(&record.name);
            }
        }
    }

    /// Destroy every resource at once (the GPU must be idle)
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let handles: Vec<GpuResourceHandle> = self.resources.keys().collect();
        for handle in &handles {
            self.destroy_record(device, *handle);
        }
        self.pending_releases.clear();
        self.recorded_states.clear();
        self.names.clear();
        handles.len()
    }

    /// Scene reset: destroy every resource and rewind every heap (the GPU must be idle)
    pub fn reset(&mut self, device: &mut dyn GraphicsDevice) {
        let count = self.release_all(device);
        for heap in self.heaps.all_mut() {
            heap.reset();
        }
        self.descriptors.clear();
        crate::engine_info!(SOURCE, "Heaps reset, {} resources released", count);
    }

    /// Release resources, heaps and the descriptor heap (the GPU must be idle)
    pub fn destroy(mut self, device: &mut dyn GraphicsDevice) {
        let count = self.release_all(device);
        self.heaps.destroy(device);
        self.descriptors.destroy(device);
        crate::engine_info!(SOURCE, "GPU memory released ({} resources)", count);
    }

    /// Recreate heaps on a new device and re-place every live resource under
    /// its existing handle
    ///
    /// Native objects of the lost device are gone with it and are not
    /// released. Contents must be uploaded again (`needs_upload` is set).
    pub fn rebuild(
        &mut self,
        device: &mut dyn GraphicsDevice,
        config: &Config,
        features: &DeviceFeatures,
    ) -> Result<()> {
        self.heaps = HeapSet::create(device, config, features.placement_alignment)?;
        self.descriptors.recreate(device)?;
        self.recorded_states.clear();

        for handle in self.pending_releases.drain(..) {
            if let Some(record) = self.resources.remove(handle) {
                if let Some(key) = record.descriptor {
                    self.descriptors.release(key);
                }
            }
        }

        let handles: Vec<GpuResourceHandle> = self.resources.keys().collect();
        for handle in &handles {
            if let Some(record) = self.resources.get_mut(*handle) {
                record.default = None;
                record.uploads = vec![None; self.buffer_count as usize];
                record.state = AllocationState::None;
            }
            self.place(device, *handle)?;
        }
        crate::engine_info!(SOURCE, "Re-placed {} resources on the new device", handles.len());
        Ok(())
    }
}

fn view_size(record: &GpuResource) -> Result<u32> {
    u32::try_from(record.kind.byte_size()).map_err(|_| {
        Error::InvalidResource(format!(
            "'{}' is {} bytes, too large for a buffer view",
            record.name,
            record.kind.byte_size()
        ))
    })
}

#[cfg(test)]
#[path = "gpu_memory_tests.rs"]
mod tests;
