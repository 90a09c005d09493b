/// Small data structures shared by the GPU modules

pub mod slot_allocator;

pub use slot_allocator::SlotAllocator;
