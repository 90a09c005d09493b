/// Plain data types shared by the device traits, the core and the backends

use bitflags::bitflags;
use std::fmt;

// ============================================================================
// Adapter and device capabilities
// ============================================================================

/// Hardware feature level a device is created at
///
/// Ordered from lowest to highest so `a < b` means "a is less capable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureLevel {
    Level11_0,
    Level11_1,
    Level12_0,
    Level12_1,
    Level12_2,
}

impl FeatureLevel {
    /// All levels, highest first
    pub const DESCENDING: [FeatureLevel; 5] = [
        FeatureLevel::Level12_2,
        FeatureLevel::Level12_1,
        FeatureLevel::Level12_0,
        FeatureLevel::Level11_1,
        FeatureLevel::Level11_0,
    ];

    /// Levels to try during bootstrap, from `preferred` down to `minimum`
    ///
    /// Empty when `minimum` is above `preferred`.
    pub fn fallback_chain(preferred: FeatureLevel, minimum: FeatureLevel) -> Vec<FeatureLevel> {
        Self::DESCENDING
            .iter()
            .copied()
            .filter(|level| *level <= preferred && *level >= minimum)
            .collect()
    }

    /// Short name such as "12_1"
    pub fn name(self) -> &'static str {
        match self {
            FeatureLevel::Level11_0 => "11_0",
            FeatureLevel::Level11_1 => "11_1",
            FeatureLevel::Level12_0 => "12_0",
            FeatureLevel::Level12_1 => "12_1",
            FeatureLevel::Level12_2 => "12_2",
        }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D3D_FEATURE_LEVEL_{}", self.name())
    }
}

/// Description of a physical adapter as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDesc {
    /// Enumeration index
    pub index: u32,
    /// Human readable name
    pub description: String,
    /// PCI vendor id
    pub vendor_id: u32,
    /// PCI device id
    pub device_id: u32,
    /// Dedicated VRAM in bytes
    pub dedicated_video_memory: u64,
    /// Shared system memory in bytes
    pub shared_system_memory: u64,
    /// Software rasterizer (WARP / basic render driver)
    pub is_software: bool,
}

/// Resource heap tier reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceHeapTier {
    /// Buffers, textures and render targets need separate heaps
    Tier1,
    /// All resource kinds may share a heap
    Tier2,
}

/// Highest shader model supported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for ShaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Highest root signature version supported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RootSignatureVersion {
    V1_0,
    V1_1,
}

/// Feature-support blocks cached right after device creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFeatures {
    pub resource_heap_tier: ResourceHeapTier,
    pub highest_shader_model: ShaderModel,
    pub root_signature_version: RootSignatureVersion,
    /// `DXGI_FEATURE_PRESENT_ALLOW_TEARING`
    pub tearing_supported: bool,
    /// Default placement alignment for placed resources (64 KiB on D3D12)
    pub placement_alignment: u64,
}

impl Default for DeviceFeatures {
    fn default() -> Self {
        Self {
            resource_heap_tier: ResourceHeapTier::Tier1,
            highest_shader_model: ShaderModel { major: 5, minor: 1 },
            root_signature_version: RootSignatureVersion::V1_0,
            tearing_supported: false,
            placement_alignment: DEFAULT_PLACEMENT_ALIGNMENT,
        }
    }
}

/// `D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT`
pub const DEFAULT_PLACEMENT_ALIGNMENT: u64 = 64 * 1024;

/// `D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT`
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// `D3D12_TEXTURE_DATA_PITCH_ALIGNMENT`
pub const TEXTURE_PITCH_ALIGNMENT: u64 = 256;

/// Round `value` up to a multiple of `alignment` (power of two)
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two(), "alignment {} is not a power of two", alignment);
    (value + alignment - 1) & !(alignment - 1)
}

// ============================================================================
// Opaque backend handles
// ============================================================================

/// Backend-assigned id of a native resource (placed, committed or swap chain buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

/// Backend-assigned id of a native heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(pub u64);

/// Backend-assigned id of a native fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub u32);

/// Backend-assigned id of a native descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHeapId(pub u32);

/// One descriptor inside a native descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHandle {
    pub heap: DescriptorHeapId,
    pub index: u32,
}

// ============================================================================
// Heaps and resources
// ============================================================================

/// Memory class of a heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapUsage {
    /// GPU-resident, not CPU visible
    Default,
    /// CPU-writable, GPU-readable staging memory
    Upload,
}

/// Resource class a heap accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapContents {
    /// `D3D12_HEAP_FLAG_ALLOW_ONLY_BUFFERS`
    Buffers,
    /// `D3D12_HEAP_FLAG_ALLOW_ONLY_NON_RT_DS_TEXTURES`
    Textures,
}

/// Descriptor for creating a native heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapDesc {
    pub size: u64,
    pub alignment: u64,
    pub usage: HeapUsage,
    pub contents: HeapContents,
}

/// Pixel formats used by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R16G16B16A16_FLOAT,
    R32_FLOAT,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_UNORM | TextureFormat::B8G8R8A8_UNORM => 4,
            TextureFormat::R16G16B16A16_FLOAT => 8,
            TextureFormat::R32_FLOAT | TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT => 4,
        }
    }

    /// Whether the format is a depth/stencil format
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT)
    }
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// Size of one index in bytes
    pub fn size_bytes(self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// How a texture resource is going to be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUsage {
    /// Shader resource filled through uploads
    Sampled,
    /// Swap chain style color target
    RenderTarget,
    /// Depth/stencil target
    DepthStencil,
}

/// Description of a native resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDesc {
    Buffer {
        size: u64,
    },
    Texture2D {
        width: u32,
        height: u32,
        mip_levels: u16,
        format: TextureFormat,
        usage: TextureUsage,
    },
}

impl ResourceDesc {
    /// Buffer description
    pub fn buffer(size: u64) -> Self {
        ResourceDesc::Buffer { size }
    }

    /// Whether this is a buffer
    pub fn is_buffer(&self) -> bool {
        matches!(self, ResourceDesc::Buffer { .. })
    }

    /// Width and height of a texture, `None` for buffers
    pub fn extent(&self) -> Option<(u32, u32)> {
        match self {
            ResourceDesc::Buffer { .. } => None,
            ResourceDesc::Texture2D { width, height, .. } => Some((*width, *height)),
        }
    }
}

/// Size and alignment a resource occupies inside a heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationInfo {
    pub size: u64,
    pub alignment: u64,
}

/// Linear layout of a texture's first subresource inside an upload buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyableFootprint {
    /// Bytes between row starts (aligned to 256)
    pub row_pitch: u64,
    /// Meaningful bytes per row
    pub row_size: u64,
    /// Number of rows
    pub rows: u32,
    /// Bytes the upload buffer must hold
    pub total_bytes: u64,
}

/// Optimized clear value for render/depth targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

/// Usage state of a resource, used by barriers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// `D3D12_RESOURCE_STATE_COMMON`
    Common,
    /// `D3D12_RESOURCE_STATE_PRESENT`
    Present,
    /// `D3D12_RESOURCE_STATE_RENDER_TARGET`
    RenderTarget,
    /// `D3D12_RESOURCE_STATE_DEPTH_WRITE`
    DepthWrite,
    /// `D3D12_RESOURCE_STATE_DEPTH_READ`
    DepthRead,
    /// `D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER`
    VertexAndConstantBuffer,
    /// `D3D12_RESOURCE_STATE_INDEX_BUFFER`
    IndexBuffer,
    /// `D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE`
    PixelShaderResource,
    /// `D3D12_RESOURCE_STATE_COPY_DEST`
    CopyDest,
    /// `D3D12_RESOURCE_STATE_COPY_SOURCE`
    CopySource,
    /// `D3D12_RESOURCE_STATE_GENERIC_READ` (required for upload heaps)
    GenericRead,
}

/// Transition barrier for a whole resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBarrier {
    pub resource: ResourceId,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl ResourceBarrier {
    /// Shorthand constructor
    pub fn transition(resource: ResourceId, before: ResourceState, after: ResourceState) -> Self {
        Self { resource, before, after }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Kind of native descriptor heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapKind {
    RenderTarget,
    DepthStencil,
    CbvSrvUav,
}

/// View written into a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDesc {
    RenderTarget { format: TextureFormat },
    DepthStencil { format: TextureFormat },
    ConstantBuffer { size: u32 },
    ShaderResource { format: TextureFormat, mip_levels: u16 },
}

// ============================================================================
// Swap chain and presentation
// ============================================================================

/// Descriptor for creating a flip-model swap chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
    pub format: TextureFormat,
    /// Create with `DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING`
    pub allow_tearing: bool,
}

bitflags! {
    /// `DXGI_PRESENT_*` flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PresentFlags: u32 {
        const DO_NOT_SEQUENCE = 0x0000_0002;
        const DO_NOT_WAIT = 0x0000_0008;
        const ALLOW_TEARING = 0x0000_0200;
    }
}

/// Outcome of a present call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// Frame queued for display
    Presented,
    /// `DXGI_ERROR_WAS_STILL_DRAWING` with `DO_NOT_WAIT`: frame skipped
    StillDrawing,
    /// Window is occluded, nothing displayed
    Occluded,
}

// ============================================================================
// Draw state
// ============================================================================

/// Vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferView {
    pub gpu_address: u64,
    pub size_in_bytes: u32,
    pub stride: u32,
}

/// Index buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferView {
    pub gpu_address: u64,
    pub size_in_bytes: u32,
    pub format: IndexFormat,
}

/// Primitive topology for draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
