/// GPU lifecycle configuration

use glam::Vec4;
use crate::error::{Error, Result};
use crate::graphics_device::{FeatureLevel, TextureFormat};

/// What to do when a GPU call fails at the public API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log at error severity, then panic with the diagnostic
    Abort,
    /// Hand the typed error back to the caller
    Propagate,
}

/// How the heap allocator places new resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPolicy {
    /// Bump allocation only, released space comes back on `reset_heaps`
    BumpOnly,
    /// Bump allocation, but released ranges are reused first (best fit)
    BestFitReuse,
}

/// Configuration for `GpuManager`
#[derive(Debug, Clone)]
pub struct Config {
    /// Swap chain buffer count (frames in flight), 2..=4
    pub buffer_count: u32,
    /// Present with sync interval 1 when true
    pub vsync: bool,
    /// Bytes reserved for each heap set (default + one upload set per buffer index)
    pub gpu_memory_budget: u64,
    /// Share of the budget given to buffer heaps, textures get the rest
    pub buffer_heap_percent: u32,
    /// First feature level tried during bootstrap
    pub preferred_feature_level: FeatureLevel,
    /// Lowest acceptable feature level
    pub minimum_feature_level: FeatureLevel,
    /// Placement strategy of the heap allocator
    pub placement_policy: PlacementPolicy,
    /// Failure handling at the public API boundary
    pub failure_policy: FailurePolicy,
    /// Enable the D3D12 debug layer and DXGI debug factory
    pub enable_debug_layer: bool,
    /// Back buffer format
    pub back_buffer_format: TextureFormat,
    /// Depth buffer format
    pub depth_format: TextureFormat,
    /// Color the back buffer is cleared to at frame start
    pub clear_color: Vec4,
    /// Depth the depth buffer is cleared to at frame start
    pub clear_depth: f32,
    /// Slots in the shader-visible CBV/SRV descriptor heap
    pub descriptor_capacity: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_count: 2,
            vsync: true,
            gpu_memory_budget: 256 * 1024 * 1024,
            buffer_heap_percent: 40,
            preferred_feature_level: FeatureLevel::Level12_1,
            minimum_feature_level: FeatureLevel::Level11_0,
            placement_policy: PlacementPolicy::BumpOnly,
            failure_policy: FailurePolicy::Abort,
            enable_debug_layer: cfg!(debug_assertions),
            back_buffer_format: TextureFormat::R8G8B8A8_UNORM,
            depth_format: TextureFormat::D32_FLOAT,
            clear_color: Vec4::new(0.0, 0.2, 0.4, 1.0),
            clear_depth: 1.0,
            descriptor_capacity: 4096,
        }
    }
}

impl Config {
    /// Reject configurations the lifecycle cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(2..=4).contains(&self.buffer_count) {
            return Err(Error::InitializationFailed(format!(
                "buffer_count must be 2..=4, got {}",
                self.buffer_count
            )));
        }
        if !(1..=99).contains(&self.buffer_heap_percent) {
            return Err(Error::InitializationFailed(format!(
                "buffer_heap_percent must be 1..=99, got {}",
                self.buffer_heap_percent
            )));
        }
        if self.gpu_memory_budget == 0 {
            return Err(Error::InitializationFailed("gpu_memory_budget is zero".to_string()));
        }
        if self.minimum_feature_level > self.preferred_feature_level {
            return Err(Error::InitializationFailed(format!(
                "minimum feature level {} above preferred {}",
                self.minimum_feature_level, self.preferred_feature_level
            )));
        }
        if !self.depth_format.is_depth() {
            return Err(Error::InitializationFailed(format!(
                "{:?} is not a depth format",
                self.depth_format
            )));
        }
        if self.descriptor_capacity == 0 {
            return Err(Error::InitializationFailed("descriptor_capacity is zero".to_string()));
        }
        Ok(())
    }

    /// Bytes of the budget given to buffer heaps
    pub fn buffer_heap_bytes(&self) -> u64 {
        self.gpu_memory_budget / 100 * self.buffer_heap_percent as u64
            + self.gpu_memory_budget % 100 * self.buffer_heap_percent as u64 / 100
    }

    /// Bytes of the budget given to texture heaps
    pub fn texture_heap_bytes(&self) -> u64 {
        self.gpu_memory_budget - self.buffer_heap_bytes()
    }
}

impl FailurePolicy {
    /// Apply the policy to the outcome of a public operation
    pub fn apply<T>(self, source: &str, operation: &str, result: Result<T>) -> Result<T> {
        match (self, result) {
            (_, Ok(value)) => Ok(value),
            (FailurePolicy::Propagate, Err(error)) => Err(error),
            (FailurePolicy::Abort, Err(error)) => {
                crate::engine_error!(source, "{} failed: {}", operation, error);
                panic!("{} failed: {}", operation, error);
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
