/// Adapter selection and device bootstrap

use crate::error::{Error, Result};
use crate::graphics_device::{
    AdapterDesc, AdapterProvider, DeviceFeatures, FeatureLevel, GraphicsDevice,
};
use crate::gpu::Config;

const SOURCE: &str = "nova3d::gpu";

/// Adapter chosen by `select_adapter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAdapter {
    pub adapter: AdapterDesc,
    pub feature_level: FeatureLevel,
}

/// Immutable description of the device in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub adapter: AdapterDesc,
    pub feature_level: FeatureLevel,
    pub features: DeviceFeatures,
}

/// Pick the hardware adapter to create the device on
///
/// Feature levels are tried from `preferred_feature_level` down to
/// `minimum_feature_level`. At each level, among the non-software adapters
/// that can create a device at that level, the one with the most dedicated
/// VRAM wins (first enumerated on ties). The first level with a candidate
/// stops the search.
pub fn select_adapter(provider: &dyn AdapterProvider, config: &Config) -> Result<SelectedAdapter> {
    let adapters = provider.enumerate_adapters()?;
    for adapter in &adapters {
        crate::engine_debug!(
            SOURCE,
            "Adapter {}: {} ({} MiB VRAM{})",
            adapter.index,
            adapter.description,
            adapter.dedicated_video_memory / (1024 * 1024),
            if adapter.is_software { ", software" } else { "" }
        );
    }

    let levels = FeatureLevel::fallback_chain(config.preferred_feature_level, config.minimum_feature_level);
    for level in levels {
        let best = adapters
            .iter()
            .filter(|adapter| !adapter.is_software)
            .filter(|adapter| provider.supports_feature_level(adapter, level))
            .fold(None::<&AdapterDesc>, |best, adapter| match best {
                Some(current) if current.dedicated_video_memory >= adapter.dedicated_video_memory => Some(current),
                _ => Some(adapter),
            });

        if let Some(adapter) = best {
            if level < config.preferred_feature_level {
                crate::engine_warn!(
                    SOURCE,
                    "No adapter supports {}, falling back to {}",
                    config.preferred_feature_level,
                    level
                );
            }
            crate::engine_info!(
                SOURCE,
                "Selected adapter '{}' with {} MiB VRAM at {}",
                adapter.description,
                adapter.dedicated_video_memory / (1024 * 1024),
                level
            );
            return Ok(SelectedAdapter { adapter: adapter.clone(), feature_level: level });
        }
    }

    Err(Error::InitializationFailed(format!(
        "no hardware adapter supports {} or above ({} adapters enumerated)",
        config.minimum_feature_level,
        adapters.len()
    )))
}

/// Select an adapter, create the device and cache its capabilities
pub fn create_device(
    provider: &dyn AdapterProvider,
    config: &Config,
) -> Result<(Box<dyn GraphicsDevice>, AdapterInfo)> {
    let selected = select_adapter(provider, config)?;
    let device = provider
        .create_device(&selected.adapter, selected.feature_level)
        .map_err(|error| {
            crate::engine_error!(
                SOURCE,
                "Failed to create device on '{}': {}",
                selected.adapter.description,
                error
            );
            error
        })?;
    let features = device.query_features()?;
    crate::engine_info!(
        SOURCE,
        "Device created: heap {:?}, shader model {}, root signature {:?}, tearing {}",
        features.resource_heap_tier,
        features.highest_shader_model,
        features.root_signature_version,
        if features.tearing_supported { "supported" } else { "unsupported" }
    );
    Ok((
        device,
        AdapterInfo {
            adapter: selected.adapter,
            feature_level: selected.feature_level,
            features,
        },
    ))
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
