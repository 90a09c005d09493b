/// Conversions from the engine's plain device types to D3D12 / DXGI structures

use nova_3d_engine::nova3d::Error;
use nova_3d_engine::nova3d::device::{
    ClearValue, DescriptorHeapKind, FeatureLevel, HeapContents, HeapDesc, HeapUsage,
    IndexFormat, PresentStatus, PrimitiveTopology, ResourceDesc, ResourceState,
    ShaderModel, TextureFormat, TextureUsage,
};
use windows::core::HRESULT;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

pub(crate) fn dxgi_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::R8G8B8A8_UNORM => DXGI_FORMAT_R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_UNORM => DXGI_FORMAT_B8G8R8A8_UNORM,
        TextureFormat::R16G16B16A16_FLOAT => DXGI_FORMAT_R16G16B16A16_FLOAT,
        TextureFormat::R32_FLOAT => DXGI_FORMAT_R32_FLOAT,
        TextureFormat::D32_FLOAT => DXGI_FORMAT_D32_FLOAT,
        TextureFormat::D24_UNORM_S8_UINT => DXGI_FORMAT_D24_UNORM_S8_UINT,
    }
}

pub(crate) fn index_format(format: IndexFormat) -> DXGI_FORMAT {
    match format {
        IndexFormat::U16 => DXGI_FORMAT_R16_UINT,
        IndexFormat::U32 => DXGI_FORMAT_R32_UINT,
    }
}

pub(crate) fn feature_level(level: FeatureLevel) -> D3D_FEATURE_LEVEL {
    match level {
        FeatureLevel::Level11_0 => D3D_FEATURE_LEVEL_11_0,
        FeatureLevel::Level11_1 => D3D_FEATURE_LEVEL_11_1,
        FeatureLevel::Level12_0 => D3D_FEATURE_LEVEL_12_0,
        FeatureLevel::Level12_1 => D3D_FEATURE_LEVEL_12_1,
        FeatureLevel::Level12_2 => D3D_FEATURE_LEVEL_12_2,
    }
}

pub(crate) fn resource_state(state: ResourceState) -> D3D12_RESOURCE_STATES {
    match state {
        ResourceState::Common => D3D12_RESOURCE_STATE_COMMON,
        ResourceState::Present => D3D12_RESOURCE_STATE_PRESENT,
        ResourceState::RenderTarget => D3D12_RESOURCE_STATE_RENDER_TARGET,
        ResourceState::DepthWrite => D3D12_RESOURCE_STATE_DEPTH_WRITE,
        ResourceState::DepthRead => D3D12_RESOURCE_STATE_DEPTH_READ,
        ResourceState::VertexAndConstantBuffer => D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER,
        ResourceState::IndexBuffer => D3D12_RESOURCE_STATE_INDEX_BUFFER,
        ResourceState::PixelShaderResource => D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
        ResourceState::CopyDest => D3D12_RESOURCE_STATE_COPY_DEST,
        ResourceState::CopySource => D3D12_RESOURCE_STATE_COPY_SOURCE,
        ResourceState::GenericRead => D3D12_RESOURCE_STATE_GENERIC_READ,
    }
}

pub(crate) fn primitive_topology(topology: PrimitiveTopology) -> D3D_PRIMITIVE_TOPOLOGY {
    match topology {
        PrimitiveTopology::PointList => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        PrimitiveTopology::LineList => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        PrimitiveTopology::LineStrip => D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        PrimitiveTopology::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        PrimitiveTopology::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

pub(crate) fn descriptor_heap_type(kind: DescriptorHeapKind) -> D3D12_DESCRIPTOR_HEAP_TYPE {
    match kind {
        DescriptorHeapKind::RenderTarget => D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
        DescriptorHeapKind::DepthStencil => D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
        DescriptorHeapKind::CbvSrvUav => D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
    }
}

pub(crate) fn heap_type(usage: HeapUsage) -> D3D12_HEAP_TYPE {
    match usage {
        HeapUsage::Default => D3D12_HEAP_TYPE_DEFAULT,
        HeapUsage::Upload => D3D12_HEAP_TYPE_UPLOAD,
    }
}

pub(crate) fn heap_properties(usage: HeapUsage) -> D3D12_HEAP_PROPERTIES {
    D3D12_HEAP_PROPERTIES {
        Type: heap_type(usage),
        CPUPageProperty: D3D12_CPU_PAGE_PROPERTY_UNKNOWN,
        MemoryPoolPreference: D3D12_MEMORY_POOL_UNKNOWN,
        CreationNodeMask: 1,
        VisibleNodeMask: 1,
    }
}

pub(crate) fn heap_desc(desc: &HeapDesc) -> D3D12_HEAP_DESC {
    let flags = match desc.contents {
        HeapContents::Buffers => D3D12_HEAP_FLAG_ALLOW_ONLY_BUFFERS,
        HeapContents::Textures => D3D12_HEAP_FLAG_ALLOW_ONLY_NON_RT_DS_TEXTURES,
    };
    D3D12_HEAP_DESC {
        SizeInBytes: desc.size,
        Properties: heap_properties(desc.usage),
        Alignment: desc.alignment,
        Flags: flags,
    }
}

pub(crate) fn resource_desc(desc: &ResourceDesc) -> D3D12_RESOURCE_DESC {
    match *desc {
        ResourceDesc::Buffer { size } => D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Alignment: 0,
            Width: size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_UNKNOWN,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            Flags: D3D12_RESOURCE_FLAG_NONE,
        },
        ResourceDesc::Texture2D { width, height, mip_levels, format, usage } => {
            let flags = match usage {
                TextureUsage::Sampled => D3D12_RESOURCE_FLAG_NONE,
                TextureUsage::RenderTarget => D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET,
                TextureUsage::DepthStencil => D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
            };
            D3D12_RESOURCE_DESC {
                Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
                Alignment: 0,
                Width: u64::from(width),
                Height: height,
                DepthOrArraySize: 1,
                MipLevels: mip_levels,
                Format: dxgi_format(format),
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
                Flags: flags,
            }
        }
    }
}

/// Optimized clear value; the format comes from the resource being cleared
pub(crate) fn clear_value(value: &ClearValue, format: TextureFormat) -> D3D12_CLEAR_VALUE {
    let anonymous = match *value {
        ClearValue::Color(color) => D3D12_CLEAR_VALUE_0 { Color: color },
        ClearValue::DepthStencil { depth, stencil } => D3D12_CLEAR_VALUE_0 {
            DepthStencil: D3D12_DEPTH_STENCIL_VALUE { Depth: depth, Stencil: stencil },
        },
    };
    D3D12_CLEAR_VALUE { Format: dxgi_format(format), Anonymous: anonymous }
}

/// `D3D_SHADER_MODEL` packs major and minor as nibbles (0x65 is 6.5)
pub(crate) fn shader_model(raw: i32) -> ShaderModel {
    ShaderModel {
        major: ((raw >> 4) & 0xF) as u8,
        minor: (raw & 0xF) as u8,
    }
}

pub(crate) fn is_device_lost(code: HRESULT) -> bool {
    code == DXGI_ERROR_DEVICE_REMOVED
        || code == DXGI_ERROR_DEVICE_RESET
        || code == DXGI_ERROR_DEVICE_HUNG
        || code == DXGI_ERROR_DRIVER_INTERNAL_ERROR
}

/// Map a failed native call onto the engine error taxonomy
///
/// Device removal becomes `DeviceLost`, allocation failure `OutOfMemory`,
/// everything else a logged `BackendError`.
pub(crate) fn native_error(what: &str, err: &windows::core::Error) -> Error {
    let code = err.code();
    if is_device_lost(code) {
        nova_3d_engine::engine_error!("nova3d::d3d12", "{} failed, device lost: {}", what, err);
        Error::DeviceLost(format!("{}: {}", what, err))
    } else if code == windows::Win32::Foundation::E_OUTOFMEMORY {
        nova_3d_engine::engine_error!("nova3d::d3d12", "{} failed: out of memory", what);
        Error::OutOfMemory
    } else {
        nova_3d_engine::engine_err!("nova3d::d3d12", "{} failed: {}", what, err)
    }
}

/// Classify the HRESULT of `IDXGISwapChain::Present`
pub(crate) fn present_status(code: HRESULT) -> Result<PresentStatus, Error> {
    if code == DXGI_STATUS_OCCLUDED {
        Ok(PresentStatus::Occluded)
    } else if code == DXGI_ERROR_WAS_STILL_DRAWING {
        Ok(PresentStatus::StillDrawing)
    } else if code.is_ok() {
        Ok(PresentStatus::Presented)
    } else {
        Err(native_error("Present", &windows::core::Error::from(code)))
    }
}

/// Turn a UTF-16 fixed buffer (adapter description) into a `String`
pub(crate) fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

#[cfg(test)]
#[path = "d3d12_convert_tests.rs"]
mod tests;
