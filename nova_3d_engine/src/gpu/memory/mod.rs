/// GPU memory module - heaps, resource records and descriptor records

pub mod heap;
pub mod resource;
pub mod descriptor_heap;
pub mod gpu_memory;

pub use heap::*;
pub use resource::*;
pub use descriptor_heap::*;
pub use gpu_memory::*;
