/// Swap chain render targets and the depth buffer

use crate::error::{Error, Result};
use crate::graphics_device::{
    ClearValue, DescriptorHandle, DescriptorHeapId, DescriptorHeapKind, GraphicsDevice,
    ResourceBarrier, ResourceDesc, ResourceId, ResourceState, SwapChainDesc, TextureFormat,
    TextureUsage, ViewDesc,
};
use crate::gpu::{Config, FenceSet};

const SOURCE: &str = "nova3d::gpu::swapchain";

/// State of the depth buffer after the last executed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthState {
    /// Just created in the write state, no frame has been executed with it
    Fresh,
    /// Back in the read state at the end of an executed frame
    Read,
}

/// The back buffers, their render target views and the depth buffer
pub struct SwapChainBuffers {
    rtv_heap: DescriptorHeapId,
    dsv_heap: DescriptorHeapId,
    render_targets: Vec<ResourceId>,
    depth: ResourceId,
    depth_state: DepthState,
    depth_size: (u32, u32),
    width: u32,
    height: u32,
    buffer_count: u32,
    format: TextureFormat,
    depth_format: TextureFormat,
    clear_depth: f32,
    current_index: u32,
}

impl SwapChainBuffers {
    /// Create the swap chain, one RTV per buffer and a depth buffer of the window size
    pub fn create(
        device: &mut dyn GraphicsDevice,
        width: u32,
        height: u32,
        config: &Config,
        allow_tearing: bool,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InitializationFailed(format!(
                "cannot create a {}x{} swap chain",
                width, height
            )));
        }

        device
            .create_swap_chain(&SwapChainDesc {
                width,
                height,
                buffer_count: config.buffer_count,
                format: config.back_buffer_format,
                allow_tearing,
            })
            .map_err(|error| {
                crate::engine_error!(SOURCE, "Failed to create swap chain: {}", error);
                error
            })?;
        let rtv_heap = device.create_descriptor_heap(
            DescriptorHeapKind::RenderTarget,
            config.buffer_count,
            false,
        )?;
        let dsv_heap = device.create_descriptor_heap(DescriptorHeapKind::DepthStencil, 1, false)?;

        let mut buffers = Self {
            rtv_heap,
            dsv_heap,
            render_targets: Vec::with_capacity(config.buffer_count as usize),
            depth: ResourceId(0),
            depth_state: DepthState::Fresh,
            depth_size: (0, 0),
            width,
            height,
            buffer_count: config.buffer_count,
            format: config.back_buffer_format,
            depth_format: config.depth_format,
            clear_depth: config.clear_depth,
            current_index: 0,
        };
        buffers.create_targets(device)?;
        buffers.current_index = device.current_back_buffer_index();

        crate::engine_info!(
            SOURCE,
            "Swap chain created: {}x{}, {} buffers, {:?}{}",
            width,
            height,
            config.buffer_count,
            config.back_buffer_format,
            if allow_tearing { ", tearing allowed" } else { "" }
        );
        Ok(buffers)
    }

    fn create_targets(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.render_targets.clear();
        for index in 0..self.buffer_count {
            let buffer = device.swap_chain_buffer(index)?;
            device.create_view(
                DescriptorHandle { heap: self.rtv_heap, index },
                buffer,
                &ViewDesc::RenderTarget { format: self.format },
            )?;
            self.render_targets.push(buffer);
        }

        let desc = ResourceDesc::Texture2D {
            width: self.width,
            height: self.height,
            mip_levels: 1,
            format: self.depth_format,
            usage: TextureUsage::DepthStencil,
        };
        self.depth = device
            .create_committed_resource(
                &desc,
                ResourceState::DepthWrite,
                Some(ClearValue::DepthStencil { depth: self.clear_depth, stencil: 0 }),
                "depth-buffer",
            )
            .map_err(|error| {
                crate::engine_error!(
                    SOURCE,
                    "Failed to create {}x{} depth buffer: {}",
                    self.width,
                    self.height,
                    error
                );
                error
            })?;
        device.create_view(self.dsv(), self.depth, &ViewDesc::DepthStencil { format: self.depth_format })?;
        self.depth_state = DepthState::Fresh;
        self.depth_size = (self.width, self.height);
        Ok(())
    }

    fn release_targets(&mut self, device: &mut dyn GraphicsDevice) {
        for buffer in self.render_targets.drain(..) {
            device.release_resource(buffer);
        }
        device.release_resource(self.depth);
    }

    /// Resize the buffers to the new window size
    ///
    /// Zero-area sizes (minimized window) and the current size are ignored.
    /// Every buffer index is drained before anything is released. Returns
    /// whether the buffers were recreated.
    pub fn resize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        fences: &mut FenceSet,
        width: u32,
        height: u32,
    ) -> Result<bool> {
        if width == 0 || height == 0 {
            crate::engine_debug!(SOURCE, "Ignoring resize to {}x{}", width, height);
            return Ok(false);
        }
        if (width, height) == (self.width, self.height) {
            return Ok(false);
        }

        fences.flush_gpu(device)?;
        self.release_targets(device);
        device.resize_swap_chain(width, height).map_err(|error| {
            crate::engine_error!(SOURCE, "Swap chain resize to {}x{} failed: {}", width, height, error);
            error
        })?;
        self.width = width;
        self.height = height;
        self.create_targets(device)?;
        self.current_index = device.current_back_buffer_index();

        crate::engine_info!(SOURCE, "Swap chain resized to {}x{}", width, height);
        Ok(true)
    }

    /// Buffer index the next frame renders into
    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    /// Re-read the current index from the swap chain
    pub fn refresh_index(&mut self, device: &dyn GraphicsDevice) {
        self.current_index = device.current_back_buffer_index();
    }

    /// Number of buffers
    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    /// Render target view of buffer `index`
    pub fn rtv(&self, index: u32) -> DescriptorHandle {
        DescriptorHandle { heap: self.rtv_heap, index }
    }

    /// Depth-stencil view
    pub fn dsv(&self) -> DescriptorHandle {
        DescriptorHandle { heap: self.dsv_heap, index: 0 }
    }

    /// Back buffer resource `index`
    pub fn render_target(&self, index: u32) -> Option<ResourceId> {
        self.render_targets.get(index as usize).copied()
    }

    /// Depth buffer resource
    pub fn depth_buffer(&self) -> ResourceId {
        self.depth
    }

    /// Size of the back buffers
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Size the depth buffer was created with
    pub fn depth_size(&self) -> (u32, u32) {
        self.depth_size
    }

    /// Depth buffer state
    pub fn depth_state(&self) -> DepthState {
        self.depth_state
    }

    /// Barrier moving the depth buffer to the write state for a new frame,
    /// none when the buffer is fresh
    pub fn begin_depth_write(&self) -> Option<ResourceBarrier> {
        match self.depth_state {
            DepthState::Read => Some(ResourceBarrier::transition(
                self.depth,
                ResourceState::DepthRead,
                ResourceState::DepthWrite,
            )),
            DepthState::Fresh => None,
        }
    }

    /// Barrier moving the depth buffer back to the read state at frame end
    pub fn end_depth_write(&self) -> ResourceBarrier {
        ResourceBarrier::transition(self.depth, ResourceState::DepthWrite, ResourceState::DepthRead)
    }

    /// Record that a frame holding both depth barriers has been executed
    ///
    /// Until then the tracked state is left alone, so a frame that never
    /// reached the queue does not move it.
    pub fn commit_depth_cycle(&mut self) {
        self.depth_state = DepthState::Read;
    }

    /// Release the buffers and their descriptor heaps
    pub fn destroy(mut self, device: &mut dyn GraphicsDevice) {
        self.release_targets(device);
        device.destroy_descriptor_heap(self.rtv_heap);
        device.destroy_descriptor_heap(self.dsv_heap);
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
