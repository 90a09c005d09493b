/// D3D12 command list - one command allocator + graphics command list pair

use std::any::Any;
use std::mem::ManuallyDrop;
use nova_3d_engine::nova3d::{CommandList, Result};
use nova_3d_engine::nova3d::device::{
    CopyableFootprint, DescriptorHandle, DescriptorHeapId, IndexBufferView, PrimitiveTopology,
    ResourceBarrier, ResourceId, TextureFormat, VertexBufferView,
};
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D12::*;
use crate::d3d12_convert::{dxgi_format, index_format, native_error, primitive_topology, resource_state};
use crate::d3d12_registry::{lock, SharedRegistry};

pub struct D3D12CommandList {
    name: String,
    allocator: ID3D12CommandAllocator,
    list: ID3D12GraphicsCommandList,
    registry: SharedRegistry,
}

// Recorded and submitted from the thread that owns the device.
unsafe impl Send for D3D12CommandList {}

impl D3D12CommandList {
    pub(crate) fn new(
        device: &ID3D12Device,
        name: &str,
        registry: SharedRegistry,
    ) -> Result<Self> {
        let allocator: ID3D12CommandAllocator =
            unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }
                .map_err(|e| native_error("CreateCommandAllocator", &e))?;
        let list: ID3D12GraphicsCommandList = unsafe {
            device.CreateCommandList(
                0,
                D3D12_COMMAND_LIST_TYPE_DIRECT,
                &allocator,
                None::<&ID3D12PipelineState>,
            )
        }
        .map_err(|e| native_error("CreateCommandList", &e))?;

        // Lists are created open; the engine expects them closed until reset
        unsafe { list.Close() }.map_err(|e| native_error("ID3D12GraphicsCommandList::Close", &e))?;

        let wide = windows::core::HSTRING::from(name);
        unsafe {
            let _ = list.SetName(&wide);
            let _ = allocator.SetName(&wide);
        }

        nova_3d_engine::engine_trace!("nova3d::d3d12", "Created command list '{}'", name);
        Ok(Self { name: name.to_string(), allocator, list, registry })
    }

    /// Native list, for submission
    pub(crate) fn native(&self) -> &ID3D12GraphicsCommandList {
        &self.list
    }

    /// Debug name given at creation
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Transition barrier borrowing `resource` without an extra reference count
fn transition(resource: &ID3D12Resource, barrier: &ResourceBarrier) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { std::mem::transmute_copy(resource) },
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                StateBefore: resource_state(barrier.before),
                StateAfter: resource_state(barrier.after),
            }),
        },
    }
}

impl CommandList for D3D12CommandList {
    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.allocator
                .Reset()
                .map_err(|e| native_error("ID3D12CommandAllocator::Reset", &e))?;
            self.list
                .Reset(&self.allocator, None::<&ID3D12PipelineState>)
                .map_err(|e| native_error("ID3D12GraphicsCommandList::Reset", &e))
        }
    }

    fn resource_barriers(&mut self, barriers: &[ResourceBarrier]) -> Result<()> {
        if barriers.is_empty() {
            return Ok(());
        }
        let registry = lock(&self.registry)?;
        let mut native = Vec::with_capacity(barriers.len());
        for barrier in barriers {
            let resource = &registry.resource(barrier.resource)?.resource;
            native.push(transition(resource, barrier));
        }
        unsafe { self.list.ResourceBarrier(&native) };
        Ok(())
    }

    fn set_render_targets(
        &mut self,
        rtv: DescriptorHandle,
        dsv: Option<DescriptorHandle>,
    ) -> Result<()> {
        let registry = lock(&self.registry)?;
        let rtv = registry.cpu_handle(rtv)?;
        let dsv = dsv.map(|handle| registry.cpu_handle(handle)).transpose()?;
        unsafe {
            self.list.OMSetRenderTargets(
                1,
                Some(&rtv),
                false,
                dsv.as_ref().map(|handle| handle as *const _),
            )
        };
        Ok(())
    }

    fn clear_render_target(&mut self, rtv: DescriptorHandle, color: [f32; 4]) -> Result<()> {
        let rtv = lock(&self.registry)?.cpu_handle(rtv)?;
        unsafe { self.list.ClearRenderTargetView(rtv, &color, None) };
        Ok(())
    }

    fn clear_depth(&mut self, dsv: DescriptorHandle, depth: f32) -> Result<()> {
        let dsv = lock(&self.registry)?.cpu_handle(dsv)?;
        unsafe { self.list.ClearDepthStencilView(dsv, D3D12_CLEAR_FLAG_DEPTH, depth, 0, &[]) };
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        let viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: D3D12_MIN_DEPTH,
            MaxDepth: D3D12_MAX_DEPTH,
        };
        let scissor = RECT { left: 0, top: 0, right: width as i32, bottom: height as i32 };
        unsafe {
            self.list.RSSetViewports(&[viewport]);
            self.list.RSSetScissorRects(&[scissor]);
        }
        Ok(())
    }

    fn set_descriptor_heap(&mut self, heap: DescriptorHeapId) -> Result<()> {
        let registry = lock(&self.registry)?;
        let heap = registry.descriptor_heap(heap)?.heap.clone();
        unsafe { self.list.SetDescriptorHeaps(&[Some(heap)]) };
        Ok(())
    }

    fn copy_buffer_region(
        &mut self,
        dst: ResourceId,
        dst_offset: u64,
        src: ResourceId,
        src_offset: u64,
        size: u64,
    ) -> Result<()> {
        let registry = lock(&self.registry)?;
        let dst = &registry.resource(dst)?.resource;
        let src = &registry.resource(src)?.resource;
        unsafe { self.list.CopyBufferRegion(dst, dst_offset, src, src_offset, size) };
        Ok(())
    }

    fn copy_texture_from_buffer(
        &mut self,
        dst: ResourceId,
        src: ResourceId,
        footprint: &CopyableFootprint,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let registry = lock(&self.registry)?;
        let dst = &registry.resource(dst)?.resource;
        let src = &registry.resource(src)?.resource;

        let dst_location = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { std::mem::transmute_copy(dst) },
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 { SubresourceIndex: 0 },
        };
        let src_location = D3D12_TEXTURE_COPY_LOCATION {
            pResource: unsafe { std::mem::transmute_copy(src) },
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                PlacedFootprint: D3D12_PLACED_SUBRESOURCE_FOOTPRINT {
                    Offset: 0,
                    Footprint: D3D12_SUBRESOURCE_FOOTPRINT {
                        Format: dxgi_format(format),
                        Width: width,
                        Height: height,
                        Depth: 1,
                        RowPitch: footprint.row_pitch as u32,
                    },
                },
            },
        };
        unsafe { self.list.CopyTextureRegion(&dst_location, 0, 0, 0, &src_location, None) };
        Ok(())
    }

    fn set_vertex_buffer(&mut self, slot: u32, view: VertexBufferView) -> Result<()> {
        let native = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: view.gpu_address,
            SizeInBytes: view.size_in_bytes,
            StrideInBytes: view.stride,
        };
        unsafe { self.list.IASetVertexBuffers(slot, Some(&[native])) };
        Ok(())
    }

    fn set_index_buffer(&mut self, view: IndexBufferView) -> Result<()> {
        let native = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: view.gpu_address,
            SizeInBytes: view.size_in_bytes,
            Format: index_format(view.format),
        };
        unsafe { self.list.IASetIndexBuffer(Some(&native)) };
        Ok(())
    }

    fn set_constant_buffer(&mut self, root_index: u32, gpu_address: u64) -> Result<()> {
        unsafe { self.list.SetGraphicsRootConstantBufferView(root_index, gpu_address) };
        Ok(())
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) -> Result<()> {
        unsafe { self.list.IASetPrimitiveTopology(primitive_topology(topology)) };
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        unsafe { self.list.DrawInstanced(vertex_count, instance_count, first_vertex, first_instance) };
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<()> {
        unsafe {
            self.list.DrawIndexedInstanced(index_count, instance_count, first_index, base_vertex, first_instance)
        };
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        unsafe { self.list.Close() }.map_err(|e| native_error("ID3D12GraphicsCommandList::Close", &e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
