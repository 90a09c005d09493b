/*!
# Nova 3D Engine - Direct3D 12 Backend

Direct3D 12 implementation of the Nova3D device seam.

This crate implements the `AdapterProvider`, `GraphicsDevice` and
`CommandList` traits of `nova_3d_engine` with the `windows` crate: DXGI
factory and adapters, one `ID3D12Device` with a direct queue, fences backed by
OS events, a flip-model swap chain, placed resources inside explicit heaps and
persistently mapped upload buffers.

The native modules only exist on Windows; the debug message counters are
available everywhere.
*/

#[cfg(windows)]
mod d3d12_adapter;
#[cfg(windows)]
mod d3d12_command_list;
#[cfg(windows)]
mod d3d12_convert;
#[cfg(windows)]
mod d3d12_device;
#[cfg(windows)]
mod d3d12_registry;
mod debug;

#[cfg(windows)]
pub use d3d12_adapter::D3D12AdapterProvider;
#[cfg(windows)]
pub use d3d12_command_list::D3D12CommandList;
#[cfg(windows)]
pub use d3d12_device::D3D12Device;

// Debug layer statistics
pub use debug::{log_validation_stats, reset_validation_stats, validation_stats, ValidationStats};
