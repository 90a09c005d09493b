/// GPU resource records
///
/// A record ties one logical resource (vertex, index or constant buffer,
/// texture) to its default-heap placement and to one upload placement per
/// swap chain buffer index.

use slotmap::new_key_type;
use crate::graphics_device::{IndexFormat, ResourceDesc, ResourceId, ResourceState, TextureFormat};
use crate::gpu::memory::DescriptorHeapKey;

new_key_type! {
    /// Stable handle to a GPU resource record
    pub struct GpuResourceHandle;
}

/// What a resource is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuResourceKind {
    VertexBuffer { vertex_count: u32, stride: u32 },
    IndexBuffer { index_count: u32, format: IndexFormat },
    ConstantBuffer { size: u64 },
    Texture { width: u32, height: u32, format: TextureFormat },
}

impl GpuResourceKind {
    /// Bytes of meaningful data the resource holds
    pub fn byte_size(&self) -> u64 {
        match *self {
            GpuResourceKind::VertexBuffer { vertex_count, stride } => vertex_count as u64 * stride as u64,
            GpuResourceKind::IndexBuffer { index_count, format } => {
                index_count as u64 * format.size_bytes() as u64
            }
            GpuResourceKind::ConstantBuffer { size } => size,
            GpuResourceKind::Texture { width, height, format } => {
                width as u64 * height as u64 * format.bytes_per_pixel() as u64
            }
        }
    }

    /// State the default resource sits in between uploads
    pub fn read_state(&self) -> ResourceState {
        match self {
            GpuResourceKind::VertexBuffer { .. } | GpuResourceKind::ConstantBuffer { .. } => {
                ResourceState::VertexAndConstantBuffer
            }
            GpuResourceKind::IndexBuffer { .. } => ResourceState::IndexBuffer,
            GpuResourceKind::Texture { .. } => ResourceState::PixelShaderResource,
        }
    }

    /// Whether the resource is paired with a descriptor record
    pub fn needs_descriptor(&self) -> bool {
        matches!(self, GpuResourceKind::ConstantBuffer { .. } | GpuResourceKind::Texture { .. })
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            GpuResourceKind::VertexBuffer { .. } => "vertex buffer",
            GpuResourceKind::IndexBuffer { .. } => "index buffer",
            GpuResourceKind::ConstantBuffer { .. } => "constant buffer",
            GpuResourceKind::Texture { .. } => "texture",
        }
    }
}

/// Which heap a placement lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapClass {
    DefaultBuffer,
    DefaultTexture,
    UploadBuffer(u32),
    UploadTexture(u32),
}

/// A native resource placed inside one of the heaps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub heap: HeapClass,
    pub offset: u64,
    /// Aligned size taken from the heap
    pub size: u64,
    pub resource: ResourceId,
}

/// Lifecycle of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    /// Described but not placed yet
    None,
    /// Placed and usable
    Allocated,
    /// Released, waiting until the GPU can no longer reference it
    InFreeList,
}

/// One logical GPU resource
#[derive(Debug, Clone)]
pub struct GpuResource {
    pub name: String,
    pub kind: GpuResourceKind,
    /// Description of the default-heap resource
    pub desc: ResourceDesc,
    /// Description of each upload-heap resource
    pub upload_desc: ResourceDesc,
    pub default: Option<Placement>,
    /// One staging placement per swap chain buffer index
    pub uploads: Vec<Option<Placement>>,
    /// Bytes written by the last upload, per buffer index
    pub uploaded_bytes: Vec<u64>,
    pub state: AllocationState,
    pub descriptor: Option<DescriptorHeapKey>,
    /// Current state of the default resource
    pub gpu_state: ResourceState,
    /// Contents were never uploaded (or were lost with the device)
    pub needs_upload: bool,
    /// Frame number at which the release was requested
    pub release_frame: Option<u64>,
}

impl GpuResource {
    /// Unplaced record
    pub fn new(name: &str, kind: GpuResourceKind, desc: ResourceDesc, upload_desc: ResourceDesc, buffer_count: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            desc,
            upload_desc,
            default: None,
            uploads: vec![None; buffer_count as usize],
            uploaded_bytes: vec![0; buffer_count as usize],
            state: AllocationState::None,
            descriptor: None,
            gpu_state: ResourceState::Common,
            needs_upload: true,
            release_frame: None,
        }
    }

    /// Every placement the record holds
    pub fn placements(&self) -> impl Iterator<Item = Placement> + '_ {
        self.default.iter().chain(self.uploads.iter().flatten()).copied()
    }

    /// Native default-heap resource
    pub fn default_resource(&self) -> Option<ResourceId> {
        self.default.map(|placement| placement.resource)
    }

    /// Native upload resource for `index`
    pub fn upload_resource(&self, index: u32) -> Option<ResourceId> {
        self.uploads
            .get(index as usize)
            .copied()
            .flatten()
            .map(|placement| placement.resource)
    }
}
