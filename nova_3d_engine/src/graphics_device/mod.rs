/// Graphics device module - native API seam (traits and plain data types)

pub mod graphics_device;
pub mod command_list;
pub mod types;

pub use graphics_device::*;
pub use command_list::*;
pub use types::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
