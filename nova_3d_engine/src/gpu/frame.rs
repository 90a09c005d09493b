/// Command recording units and the frame controller
///
/// One command list (allocator + list pair) per swap chain buffer index.
/// A frame goes through:
///
/// ```text
/// Idle -> wait fence[i] -> reset -> present->RT (+ depth read->write)
///      -> clear -> uploads and draws -> RT->present, depth write->read
///      -> close -> execute -> signal fence[i] -> present -> next index -> Idle
/// ```

use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandList, GraphicsDevice, PresentFlags, PresentStatus, ResourceBarrier, ResourceState,
};
use crate::gpu::{Config, FenceSet, SwapChainBuffers};

const SOURCE: &str = "nova3d::gpu";

/// Command list of one buffer index
pub struct CommandUnit {
    list: Box<dyn CommandList>,
}

impl CommandUnit {
    /// Create the unit of buffer index `index`
    pub fn create(device: &mut dyn GraphicsDevice, index: u32) -> Result<Self> {
        let list = device.create_command_list(&format!("frame-commands[{}]", index))?;
        Ok(Self { list })
    }

    /// The command list
    pub fn list(&mut self) -> &mut dyn CommandList {
        self.list.as_mut()
    }
}

/// Whether a frame is being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recording { index: u32 },
}

/// Counters of the current (or last) frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// 1 for the first frame ever started
    pub frame_number: u64,
    pub draw_calls: u32,
    pub uploaded_bytes: u64,
    /// Presents skipped because the GPU was still drawing (total)
    pub dropped_frames: u64,
}

/// StartFrame / EndFrame state machine
pub struct FrameController {
    units: Vec<CommandUnit>,
    state: FrameState,
    vsync: bool,
    tearing_supported: bool,
    clear_color: [f32; 4],
    clear_depth: f32,
    frames_started: u64,
    frames_executed: u64,
    frames_presented: u64,
    stats: FrameStats,
}

impl FrameController {
    /// Create one command unit per buffer index
    pub fn new(device: &mut dyn GraphicsDevice, config: &Config, tearing_supported: bool) -> Result<Self> {
        Ok(Self {
            units: Self::create_units(device, config.buffer_count)?,
            state: FrameState::Idle,
            vsync: config.vsync,
            tearing_supported,
            clear_color: config.clear_color.to_array(),
            clear_depth: config.clear_depth,
            frames_started: 0,
            frames_executed: 0,
            frames_presented: 0,
            stats: FrameStats::default(),
        })
    }

    fn create_units(device: &mut dyn GraphicsDevice, count: u32) -> Result<Vec<CommandUnit>> {
        (0..count).map(|index| CommandUnit::create(device, index)).collect()
    }

    /// Replace the command units after device recreation
    pub fn recreate(&mut self, device: &mut dyn GraphicsDevice, tearing_supported: bool) -> Result<()> {
        self.units = Self::create_units(device, self.units.len() as u32)?;
        self.state = FrameState::Idle;
        self.tearing_supported = tearing_supported;
        self.frames_presented = 0;
        Ok(())
    }

    /// Current state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Whether a frame is open
    pub fn is_recording(&self) -> bool {
        matches!(self.state, FrameState::Recording { .. })
    }

    /// Frames started since creation
    pub fn frames_started(&self) -> u64 {
        self.frames_started
    }

    /// Frames whose command list reached the queue
    pub fn frames_executed(&self) -> u64 {
        self.frames_executed
    }

    /// Counters of the current (or last) frame
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Sync interval and flags used by `end`
    pub fn present_parameters(&self) -> (u32, PresentFlags) {
        if self.vsync {
            return (1, PresentFlags::empty());
        }
        let mut flags = PresentFlags::DO_NOT_WAIT;
        if self.tearing_supported {
            flags |= PresentFlags::ALLOW_TEARING;
        }
        if self.frames_presented > 0 {
            flags |= PresentFlags::DO_NOT_SEQUENCE;
        }
        (0, flags)
    }

    /// Buffer index and command list of the open frame
    pub fn recording_list(&mut self) -> Result<(u32, &mut dyn CommandList)> {
        match self.state {
            FrameState::Recording { index } => Ok((index, self.units[index as usize].list())),
            FrameState::Idle => Err(Error::InvalidState(
                "GPU commands can only be recorded between start_frame and end_frame".to_string(),
            )),
        }
    }

    /// Count a draw call
    pub fn record_draw(&mut self) {
        self.stats.draw_calls += 1;
    }

    /// Count uploaded bytes
    pub fn record_upload(&mut self, bytes: u64) {
        self.stats.uploaded_bytes += bytes;
    }

    /// StartFrame: wait for the current index, reset its list and begin recording
    ///
    /// Returns the buffer index being recorded.
    pub fn begin(
        &mut self,
        device: &mut dyn GraphicsDevice,
        fences: &FenceSet,
        swap_chain: &mut SwapChainBuffers,
    ) -> Result<u32> {
        if self.is_recording() {
            return Err(Error::InvalidState(
                "start_frame called twice without end_frame".to_string(),
            ));
        }
        let index = swap_chain.current_index();
        let clear_color = self.clear_color;
        let clear_depth = self.clear_depth;
        let unit = self
            .units
            .get_mut(index as usize)
            .ok_or_else(|| Error::InvalidState(format!("no command unit for buffer index {}", index)))?;

        fences.wait(device, index, fences.last_signaled(index))?;
        unit.list.reset()?;
        let recorded = Self::record_frame_start(unit.list(), swap_chain, index, clear_color, clear_depth);
        if let Err(error) = recorded {
            let _ = unit.list.close();
            return Err(error);
        }

        self.frames_started += 1;
        self.stats = FrameStats {
            frame_number: self.frames_started,
            draw_calls: 0,
            uploaded_bytes: 0,
            dropped_frames: self.stats.dropped_frames,
        };
        self.state = FrameState::Recording { index };
        crate::engine_trace!(SOURCE, "Frame {} started on buffer {}", self.frames_started, index);
        Ok(index)
    }

    fn record_frame_start(
        list: &mut dyn CommandList,
        swap_chain: &SwapChainBuffers,
        index: u32,
        clear_color: [f32; 4],
        clear_depth: f32,
    ) -> Result<()> {
        let target = swap_chain
            .render_target(index)
            .ok_or_else(|| Error::InvalidState(format!("no back buffer {}", index)))?;
        let mut barriers = vec![ResourceBarrier::transition(
            target,
            ResourceState::Present,
            ResourceState::RenderTarget,
        )];
        barriers.extend(swap_chain.begin_depth_write());
        list.resource_barriers(&barriers)?;

        let (width, height) = swap_chain.size();
        list.set_render_targets(swap_chain.rtv(index), Some(swap_chain.dsv()))?;
        list.set_viewport(width, height)?;
        list.clear_render_target(swap_chain.rtv(index), clear_color)?;
        list.clear_depth(swap_chain.dsv(), clear_depth)
    }

    /// EndFrame: close and submit the list, signal the fence and present
    ///
    /// The controller is idle afterwards whatever the outcome.
    pub fn end(
        &mut self,
        device: &mut dyn GraphicsDevice,
        fences: &mut FenceSet,
        swap_chain: &mut SwapChainBuffers,
    ) -> Result<PresentStatus> {
        let index = match self.state {
            FrameState::Recording { index } => index,
            FrameState::Idle => {
                return Err(Error::InvalidState("end_frame called without start_frame".to_string()))
            }
        };
        self.state = FrameState::Idle;

        let (sync_interval, flags) = self.present_parameters();
        let unit = &mut self.units[index as usize];
        let submitted = Self::submit(unit, &mut self.frames_executed, device, fences, swap_chain, index);
        let status = submitted.and_then(|()| device.present(sync_interval, flags));
        swap_chain.refresh_index(device);

        let status = status?;
        match status {
            PresentStatus::Presented => self.frames_presented += 1,
            PresentStatus::StillDrawing => {
                self.stats.dropped_frames += 1;
                crate::engine_warn!(
                    SOURCE,
                    "Frame {} not presented, GPU still drawing",
                    self.stats.frame_number
                );
            }
            PresentStatus::Occluded => {
                crate::engine_debug!(SOURCE, "Frame {} presented to an occluded window", self.stats.frame_number);
            }
        }
        Ok(status)
    }

    fn submit(
        unit: &mut CommandUnit,
        frames_executed: &mut u64,
        device: &mut dyn GraphicsDevice,
        fences: &mut FenceSet,
        swap_chain: &mut SwapChainBuffers,
        index: u32,
    ) -> Result<()> {
        let target = swap_chain
            .render_target(index)
            .ok_or_else(|| Error::InvalidState(format!("no back buffer {}", index)));
        let barriers = target.map(|target| {
            [
                ResourceBarrier::transition(target, ResourceState::RenderTarget, ResourceState::Present),
                swap_chain.end_depth_write(),
            ]
        });
        let recorded = barriers.and_then(|barriers| unit.list.resource_barriers(&barriers));
        // The list is closed even when recording failed so it can be reset later
        let closed = unit.list.close();
        recorded?;
        closed?;

        device.execute_command_list(&*unit.list)?;
        *frames_executed += 1;
        swap_chain.commit_depth_cycle();
        fences.signal(device, index)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
