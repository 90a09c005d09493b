/// GPU module - frame and resource lifecycle on top of the graphics device traits

pub mod config;
pub mod adapter;
pub mod fence;
pub mod swapchain;
pub mod frame;
pub mod memory;
pub mod gpu_manager;

pub use config::*;
pub use adapter::*;
pub use fence::*;
pub use swapchain::*;
pub use frame::*;
pub use memory::*;
pub use gpu_manager::*;
