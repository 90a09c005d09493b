/// D3D12 adapter provider - DXGI factory, adapter enumeration and device creation

use std::num::NonZeroIsize;
use nova_3d_engine::nova3d::{AdapterProvider, Error, GraphicsDevice, Result};
use nova_3d_engine::nova3d::device::{AdapterDesc, FeatureLevel};
use raw_window_handle::RawWindowHandle;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;
use crate::d3d12_convert::{feature_level, native_error, wide_to_string};
use crate::d3d12_device::D3D12Device;

/// Direct3D 12 implementation of `AdapterProvider`
///
/// Owns the DXGI factory and the window the swap chain will present to.
///
/// # Example
///
/// ```no_run
/// use nova_3d_engine::nova3d::{Config, Engine};
/// use nova_3d_engine_renderer_d3d12::D3D12AdapterProvider;
/// # fn window_handle() -> raw_window_handle::RawWindowHandle { unimplemented!() }
///
/// let config = Config::default();
/// let provider = D3D12AdapterProvider::new(window_handle(), config.enable_debug_layer)?;
/// let engine = Engine::new(&provider, 1280, 720, config)?;
/// # Ok::<(), nova_3d_engine::nova3d::Error>(())
/// ```
pub struct D3D12AdapterProvider {
    factory: IDXGIFactory4,
    window: Option<NonZeroIsize>,
    debug_layer: bool,
}

impl D3D12AdapterProvider {
    /// Provider presenting to a Win32 window
    pub fn new(window: RawWindowHandle, debug_layer: bool) -> Result<Self> {
        let RawWindowHandle::Win32(handle) = window else {
            return Err(Error::InitializationFailed(format!(
                "Direct3D 12 needs a Win32 window handle, got {:?}",
                window
            )));
        };
        Self::create(Some(handle.hwnd), debug_layer)
    }

    /// Provider without a window (adapter queries, off-screen devices)
    pub fn headless(debug_layer: bool) -> Result<Self> {
        Self::create(None, debug_layer)
    }

    fn create(window: Option<NonZeroIsize>, debug_layer: bool) -> Result<Self> {
        // The layer must be on before the factory and any device exist
        let debug_layer = debug_layer && crate::debug::enable_debug_layer().is_ok();

        let flags = if debug_layer {
            DXGI_CREATE_FACTORY_DEBUG
        } else {
            DXGI_CREATE_FACTORY_FLAGS(0)
        };
        let factory: IDXGIFactory4 = unsafe { CreateDXGIFactory2(flags) }
            .map_err(|e| Error::InitializationFailed(format!("CreateDXGIFactory2: {}", e)))?;

        nova_3d_engine::engine_debug!("nova3d::d3d12", "Created DXGI factory (debug layer: {})", debug_layer);
        Ok(Self { factory, window, debug_layer })
    }

    fn native_adapter(&self, index: u32) -> Result<IDXGIAdapter1> {
        unsafe { self.factory.EnumAdapters1(index) }
            .map_err(|e| native_error("IDXGIFactory::EnumAdapters1", &e))
    }
}

impl AdapterProvider for D3D12AdapterProvider {
    fn enumerate_adapters(&self) -> Result<Vec<AdapterDesc>> {
        let mut adapters = Vec::new();
        let mut index = 0;
        // EnumAdapters1 fails with DXGI_ERROR_NOT_FOUND past the last adapter
        while let Ok(adapter) = unsafe { self.factory.EnumAdapters1(index) } {
            let desc = unsafe { adapter.GetDesc1() }
                .map_err(|e| native_error("IDXGIAdapter1::GetDesc1", &e))?;
            adapters.push(AdapterDesc {
                index,
                description: wide_to_string(&desc.Description),
                vendor_id: desc.VendorId,
                device_id: desc.DeviceId,
                dedicated_video_memory: desc.DedicatedVideoMemory as u64,
                shared_system_memory: desc.SharedSystemMemory as u64,
                is_software: (desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32) != 0,
            });
            index += 1;
        }
        Ok(adapters)
    }

    fn supports_feature_level(&self, adapter: &AdapterDesc, level: FeatureLevel) -> bool {
        let Ok(native) = self.native_adapter(adapter.index) else {
            return false;
        };
        // A null output pointer only tests whether creation would succeed
        unsafe {
            D3D12CreateDevice(
                &native,
                feature_level(level),
                std::ptr::null_mut::<Option<ID3D12Device>>(),
            )
        }
        .is_ok()
    }

    fn create_device(
        &self,
        adapter: &AdapterDesc,
        level: FeatureLevel,
    ) -> Result<Box<dyn GraphicsDevice>> {
        let native = self.native_adapter(adapter.index)?;
        let mut device: Option<ID3D12Device> = None;
        unsafe { D3D12CreateDevice(&native, feature_level(level), &mut device) }
            .map_err(|e| Error::InitializationFailed(format!("D3D12CreateDevice({}): {}", level, e)))?;
        let device = device
            .ok_or_else(|| Error::InitializationFailed("D3D12CreateDevice returned no device".to_string()))?;

        let message_cookie = if self.debug_layer {
            crate::debug::install_message_callback(&device)
        } else {
            None
        };

        let device = D3D12Device::new(
            adapter.clone(),
            level,
            self.factory.clone(),
            device,
            self.window,
            message_cookie,
        )?;
        nova_3d_engine::engine_info!(
            "nova3d::d3d12",
            "Created D3D12 device on '{}' at {}",
            adapter.description,
            level
        );
        Ok(Box::new(device))
    }
}
