/// Fence synchronizer
///
/// One fence and one strictly increasing counter per swap chain buffer
/// index. The frame path signals fence[i] when buffer index i is submitted
/// and waits for that value before index i is recorded again.

use crate::error::{Error, Result};
use crate::graphics_device::{FenceId, GraphicsDevice};

const SOURCE: &str = "nova3d::gpu::fence";

/// Per-buffer-index fences
pub struct FenceSet {
    fences: Vec<FenceId>,
    /// Last value enqueued per index
    values: Vec<u64>,
}

impl FenceSet {
    /// Create `count` fences starting at 0
    pub fn new(device: &mut dyn GraphicsDevice, count: u32) -> Result<Self> {
        let mut fences = Vec::with_capacity(count as usize);
        for index in 0..count {
            let fence = device.create_fence(0).map_err(|error| {
                crate::engine_error!(SOURCE, "Failed to create fence {}: {}", index, error);
                error
            })?;
            fences.push(fence);
        }
        Ok(Self { values: vec![0; fences.len()], fences })
    }

    /// Number of fences
    pub fn len(&self) -> usize {
        self.fences.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    /// Last value signaled for `index`
    pub fn last_signaled(&self, index: u32) -> u64 {
        self.values.get(index as usize).copied().unwrap_or(0)
    }

    fn fence(&self, index: u32) -> Result<FenceId> {
        self.fences
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::InvalidState(format!("no fence for buffer index {}", index)))
    }

    /// Enqueue a signal of the next value for `index` and return that value
    pub fn signal(&mut self, device: &mut dyn GraphicsDevice, index: u32) -> Result<u64> {
        let fence = self.fence(index)?;
        let value = self.values[index as usize] + 1;
        device.signal_fence(fence, value).map_err(|error| {
            crate::engine_error!(SOURCE, "Signal of fence {} to {} failed: {}", index, value, error);
            error
        })?;
        self.values[index as usize] = value;
        crate::engine_trace!(SOURCE, "Signaled fence {} with {}", index, value);
        Ok(value)
    }

    /// Block until fence `index` reaches `value`
    ///
    /// Returns without touching the OS wait when the GPU is already there.
    pub fn wait(&self, device: &mut dyn GraphicsDevice, index: u32, value: u64) -> Result<()> {
        let fence = self.fence(index)?;
        if device.fence_completed_value(fence)? >= value {
            return Ok(());
        }
        crate::engine_trace!(SOURCE, "Waiting on fence {} for {}", index, value);
        device.wait_fence(fence, value).map_err(|error| {
            crate::engine_error!(SOURCE, "Wait on fence {} for {} failed: {}", index, value, error);
            error
        })
    }

    /// Whether the GPU has reached the last value signaled for `index`
    pub fn is_idle(&self, device: &dyn GraphicsDevice, index: u32) -> Result<bool> {
        Ok(device.fence_completed_value(self.fence(index)?)? >= self.last_signaled(index))
    }

    /// Signal `index`, then wait for that value
    pub fn wait_for_gpu(&mut self, device: &mut dyn GraphicsDevice, index: u32) -> Result<()> {
        let value = self.signal(device, index)?;
        self.wait(device, index, value)
    }

    /// `wait_for_gpu` on every index in sequence
    pub fn flush_gpu(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        for index in 0..self.fences.len() as u32 {
            self.wait_for_gpu(device, index)?;
        }
        crate::engine_debug!(SOURCE, "GPU flushed ({} fences)", self.fences.len());
        Ok(())
    }

    /// Destroy the fences
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for fence in self.fences {
            device.destroy_fence(fence);
        }
    }
}

#[cfg(test)]
#[path = "fence_tests.rs"]
mod tests;
