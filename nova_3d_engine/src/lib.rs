/*!
# Nova 3D Engine

Platform-agnostic core of the Nova3D GPU frame and resource lifecycle.

The core owns the policy: adapter selection, the fence protocol between CPU
and GPU, the swap chain buffer rotation, frame recording and the heap
allocator that places buffers and textures into pre-reserved default and
upload heaps. A backend (Direct3D 12 in `nova_3d_engine_renderer_d3d12`)
implements the `AdapterProvider`, `GraphicsDevice` and `CommandList` traits.

## Architecture

- **Engine**: application context owning the `GpuManager`, plus the log sink
- **GpuManager**: StartFrame / EndFrame, resource push/upload/bind/draw
- **FenceSet**: one fence and counter per swap chain buffer index
- **SwapChainBuffers**: render targets, their views and the depth buffer
- **FrameController**: command recording unit per buffer index
- **GpuMemory**: heaps, resource records and descriptor records
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod gpu;
pub mod utils;

// Main nova3d namespace module
pub mod nova3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Application context
    pub use crate::engine::Engine;

    // GPU lifecycle
    pub use crate::gpu::{
        AdapterInfo, Config, FailurePolicy, FrameStats, GpuManager, GpuResource,
        GpuResourceHandle, GpuResourceKind, MemoryStats, PlacementPolicy,
    };

    // Backend seam
    pub use crate::graphics_device::{AdapterProvider, CommandList, GraphicsDevice};

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogFacadeLogger, LogSeverity, Logger};
    }

    // Graphics device types used by backends
    pub mod device {
        pub use crate::graphics_device::*;
    }
}

// Re-export math library at crate root
pub use glam;
