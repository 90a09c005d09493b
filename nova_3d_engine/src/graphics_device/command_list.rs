/// Command list trait - one command allocator + graphics command list pair

use std::any::Any;
use crate::error::Result;
use crate::graphics_device::{
    DescriptorHandle, DescriptorHeapId, CopyableFootprint, IndexBufferView,
    PrimitiveTopology, ResourceBarrier, ResourceId, TextureFormat, VertexBufferView,
};

/// Command list for recording GPU commands
///
/// Each buffer index owns one command list. The backend keeps the command
/// allocator and the list together, so `reset` rewinds both.
pub trait CommandList: Send {
    /// Reset the allocator and reopen the list for recording
    ///
    /// Only valid once the GPU is done with everything previously recorded.
    fn reset(&mut self) -> Result<()>;

    /// Record transition barriers
    fn resource_barriers(&mut self, barriers: &[ResourceBarrier]) -> Result<()>;

    /// Bind the color target and the optional depth target
    fn set_render_targets(
        &mut self,
        rtv: DescriptorHandle,
        dsv: Option<DescriptorHandle>,
    ) -> Result<()>;

    /// Clear a render target view
    fn clear_render_target(&mut self, rtv: DescriptorHandle, color: [f32; 4]) -> Result<()>;

    /// Clear the depth of a depth-stencil view
    fn clear_depth(&mut self, dsv: DescriptorHandle, depth: f32) -> Result<()>;

    /// Set a full-window viewport and scissor rectangle
    fn set_viewport(&mut self, width: u32, height: u32) -> Result<()>;

    /// Bind the shader-visible descriptor heap
    fn set_descriptor_heap(&mut self, heap: DescriptorHeapId) -> Result<()>;

    /// Copy a byte range between two buffers
    fn copy_buffer_region(
        &mut self,
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        size: u64,
    ) -> Result<()>;

    /// Copy the first subresource of a texture from a linear upload buffer
    fn copy_texture_from_buffer(
        &mut self,
        dst: ResourceId,
        src: ResourceId,
        footprint: &CopyableFootprint,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<()>;

    /// Bind a vertex buffer to an input slot
    fn set_vertex_buffer(&mut self, slot: u32, view: VertexBufferView) -> Result<()>;

    /// Bind the index buffer
    fn set_index_buffer(&mut self, view: IndexBufferView) -> Result<()>;

    /// Bind a constant buffer by GPU address to a root parameter
    fn set_constant_buffer(&mut self, root_index: u32, gpu_address: u64) -> Result<()>;

    /// Set the primitive topology used by following draws
    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) -> Result<()>;

    /// Non-indexed draw
    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()>;

    /// Indexed draw
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<()>;

    /// Close the list so it can be executed
    fn close(&mut self) -> Result<()>;

    /// Backend downcasting for `GraphicsDevice::execute_command_list`
    fn as_any(&self) -> &dyn Any;
}
