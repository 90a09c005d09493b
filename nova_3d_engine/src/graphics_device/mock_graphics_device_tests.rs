/// Unit tests for MockGraphicsDevice and associated mock types.
///
/// The frame and memory tests rely on the mock's queue simulation, so its
/// fence, swap chain and placement rules are pinned down here.

use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    AdapterProvider, FeatureLevel, GraphicsDevice, HeapContents, HeapDesc,
    HeapUsage, PresentFlags, ResourceDesc, ResourceState, SwapChainDesc, TextureFormat,
    TextureUsage, DEFAULT_PLACEMENT_ALIGNMENT,
};
use crate::error::Error;

fn upload_heap(device: &mut MockGraphicsDevice, size: u64) -> crate::graphics_device::HeapId {
    device
        .create_heap(
            &HeapDesc {
                size,
                alignment: DEFAULT_PLACEMENT_ALIGNMENT,
                usage: HeapUsage::Upload,
                contents: HeapContents::Buffers,
            },
            "upload",
        )
        .unwrap()
}

// ============================================================================
// Fence simulation
// ============================================================================

#[test]
fn test_signal_completes_immediately_when_auto_complete() {
    let mut device = MockGraphicsDevice::new();
    let fence = device.create_fence(0).unwrap();

    device.signal_fence(fence, 1).unwrap();

    assert_eq!(device.fence_completed_value(fence).unwrap(), 1);
    assert_eq!(device.state().lock().unwrap().pending_signal_count(), 0);
}

#[test]
fn test_deferred_signal_retired_by_wait_in_queue_order() {
    let mut device = MockGraphicsDevice::new();
    let state = device.state();
    state.lock().unwrap().auto_complete = false;
    let fence_a = device.create_fence(0).unwrap();
    let fence_b = device.create_fence(0).unwrap();

    device.signal_fence(fence_a, 1).unwrap();
    device.signal_fence(fence_b, 1).unwrap();
    assert_eq!(device.fence_completed_value(fence_a).unwrap(), 0);

    // Waiting on b retires a first
    device.wait_fence(fence_b, 1).unwrap();
    assert_eq!(device.fence_completed_value(fence_a).unwrap(), 1);
    assert_eq!(device.fence_completed_value(fence_b).unwrap(), 1);
    assert_eq!(
        state.lock().unwrap().calls.last(),
        Some(&MockCall::WaitFence { fence: fence_b, value: 1 })
    );
}

#[test]
fn test_wait_for_unsignaled_value_errors() {
    let mut device = MockGraphicsDevice::new();
    let fence = device.create_fence(0).unwrap();
    assert!(device.wait_fence(fence, 5).is_err());
}

#[test]
fn test_complete_all_drains_pending() {
    let mut device = MockGraphicsDevice::new();
    let state = device.state();
    state.lock().unwrap().auto_complete = false;
    let fence = device.create_fence(0).unwrap();
    device.signal_fence(fence, 3).unwrap();

    state.lock().unwrap().complete_all();

    assert_eq!(device.fence_completed_value(fence).unwrap(), 3);
}

// ============================================================================
// Command list
// ============================================================================

#[test]
fn test_command_list_created_closed() {
    let mut device = MockGraphicsDevice::new();
    let mut list = device.create_command_list("frame").unwrap();

    assert!(matches!(list.draw(3, 1, 0, 0), Err(Error::InvalidState(_))));
}

#[test]
fn test_command_list_records_while_open() {
    let mut device = MockGraphicsDevice::new();
    let state = device.state();
    let mut list = device.create_command_list("frame").unwrap();

    list.reset().unwrap();
    list.draw(3, 1, 0, 0).unwrap();
    list.close().unwrap();
    device.execute_command_list(list.as_ref()).unwrap();

    let state = state.lock().unwrap();
    let tail: Vec<MockCall> = state.calls[1..].to_vec();
    assert_eq!(
        tail,
        vec![
            MockCall::Reset { list: 0 },
            MockCall::Draw { vertex_count: 3, instance_count: 1 },
            MockCall::Close { list: 0 },
            MockCall::Execute { list: 0 },
        ]
    );
}

#[test]
fn test_execute_open_list_fails() {
    let mut device = MockGraphicsDevice::new();
    let mut list = device.create_command_list("frame").unwrap();
    list.reset().unwrap();

    assert!(device.execute_command_list(list.as_ref()).is_err());
}

// ============================================================================
// Swap chain
// ============================================================================

#[test]
fn test_resize_requires_released_back_buffers() {
    let mut device = MockGraphicsDevice::new();
    device
        .create_swap_chain(&SwapChainDesc {
            width: 800,
            height: 600,
            buffer_count: 2,
            format: TextureFormat::R8G8B8A8_UNORM,
            allow_tearing: false,
        })
        .unwrap();
    let buffer = device.swap_chain_buffer(0).unwrap();

    assert!(device.resize_swap_chain(1024, 768).is_err());

    device.release_resource(buffer);
    device.resize_swap_chain(1024, 768).unwrap();
    let state = device.state();
    let state = state.lock().unwrap();
    assert_eq!(state.swap_chain().unwrap().desc.width, 1024);
}

#[test]
fn test_present_advances_back_buffer_index() {
    let mut device = MockGraphicsDevice::new();
    device
        .create_swap_chain(&SwapChainDesc {
            width: 800,
            height: 600,
            buffer_count: 3,
            format: TextureFormat::R8G8B8A8_UNORM,
            allow_tearing: false,
        })
        .unwrap();

    assert_eq!(device.current_back_buffer_index(), 0);
    device.present(1, PresentFlags::empty()).unwrap();
    device.present(1, PresentFlags::empty()).unwrap();
    assert_eq!(device.current_back_buffer_index(), 2);
    device.present(1, PresentFlags::empty()).unwrap();
    assert_eq!(device.current_back_buffer_index(), 0);
}

// ============================================================================
// Heaps and placed resources
// ============================================================================

#[test]
fn test_placed_resource_outside_heap_rejected() {
    let mut device = MockGraphicsDevice::new();
    let heap = upload_heap(&mut device, 128 * 1024);

    let result = device.create_placed_resource(
        heap,
        64 * 1024,
        &ResourceDesc::buffer(100 * 1024),
        ResourceState::GenericRead,
        "too-big",
    );
    assert!(result.is_err());
}

#[test]
fn test_write_and_read_mapped_upload_buffer() {
    let mut device = MockGraphicsDevice::new();
    let heap = upload_heap(&mut device, 64 * 1024);
    let buffer = device
        .create_placed_resource(heap, 0, &ResourceDesc::buffer(16), ResourceState::GenericRead, "staging")
        .unwrap();

    device.write_mapped(buffer, 4, &[1, 2, 3, 4]).unwrap();

    assert_eq!(device.read_mapped(buffer, 0, 8).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    assert!(device.write_mapped(buffer, 14, &[0; 4]).is_err());
}

#[test]
fn test_default_heap_resource_not_cpu_visible() {
    let mut device = MockGraphicsDevice::new();
    let heap = device
        .create_heap(
            &HeapDesc {
                size: 64 * 1024,
                alignment: DEFAULT_PLACEMENT_ALIGNMENT,
                usage: HeapUsage::Default,
                contents: HeapContents::Buffers,
            },
            "default",
        )
        .unwrap();
    let buffer = device
        .create_placed_resource(heap, 0, &ResourceDesc::buffer(16), ResourceState::Common, "vb")
        .unwrap();

    assert!(device.write_mapped(buffer, 0, &[1]).is_err());
}

#[test]
fn test_texture_footprint_pitch_is_aligned() {
    let device = MockGraphicsDevice::new();
    let footprint = device.copyable_footprint(&ResourceDesc::Texture2D {
        width: 10,
        height: 4,
        mip_levels: 1,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::Sampled,
    });

    assert_eq!(footprint.row_size, 40);
    assert_eq!(footprint.row_pitch, 256);
    assert_eq!(footprint.total_bytes, 256 * 3 + 40);
}

#[test]
fn test_injected_failure_fires_once() {
    let mut device = MockGraphicsDevice::new();
    device
        .state()
        .lock()
        .unwrap()
        .inject_failure(MockFailPoint::Present, Error::DeviceLost("removed".to_string()));

    assert!(matches!(device.present(1, PresentFlags::empty()), Err(Error::DeviceLost(_))));
    assert!(device.present(1, PresentFlags::empty()).is_ok());
}

// ============================================================================
// MockAdapterProvider
// ============================================================================

#[test]
fn test_provider_feature_level_support() {
    let provider = MockAdapterProvider::with_adapters(vec![
        (mock_adapter(0, "Old GPU", 2048, false), Some(FeatureLevel::Level11_1)),
        (mock_adapter(1, "Broken GPU", 4096, false), None),
    ]);
    let adapters = provider.enumerate_adapters().unwrap();

    assert!(provider.supports_feature_level(&adapters[0], FeatureLevel::Level11_0));
    assert!(!provider.supports_feature_level(&adapters[0], FeatureLevel::Level12_0));
    assert!(!provider.supports_feature_level(&adapters[1], FeatureLevel::Level11_0));
    assert!(provider.create_device(&adapters[1], FeatureLevel::Level11_0).is_err());
}

#[test]
fn test_provider_devices_share_state() {
    let provider = MockAdapterProvider::new();
    let adapters = provider.enumerate_adapters().unwrap();
    let mut device = provider.create_device(&adapters[0], FeatureLevel::Level12_0).unwrap();

    device.create_fence(0).unwrap();

    let state = provider.state();
    let state = state.lock().unwrap();
    assert_eq!(
        state.calls[0],
        MockCall::CreateDevice { adapter: 0, level: FeatureLevel::Level12_0 }
    );
    assert_eq!(state.count(|call| matches!(call, MockCall::CreateFence { .. })), 1);
}
