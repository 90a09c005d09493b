use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hands out descriptor slot indices and recycles released ones.
///
/// Released slots are reused lowest first, so a heap that shrinks and grows
/// again keeps its live descriptors packed at the start of the table.
///
/// # Example
///
/// ```ignore
/// let mut slots = SlotAllocator::new();
/// let a = slots.alloc();  // 0
/// let b = slots.alloc();  // 1
/// slots.free(a);
/// let c = slots.alloc();  // 0 again
/// ```
pub struct SlotAllocator {
    released: BinaryHeap<Reverse<u32>>,
    next_slot: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create an allocator with no slots taken
    pub fn new() -> Self {
        Self {
            released: BinaryHeap::new(),
            next_slot: 0,
            len: 0,
        }
    }

    /// Take the lowest free slot
    pub fn alloc(&mut self) -> u32 {
        self.len += 1;
        match self.released.pop() {
            Some(Reverse(slot)) => slot,
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                slot
            }
        }
    }

    /// Give `slot` back
    pub fn free(&mut self, slot: u32) {
        debug_assert!(slot < self.next_slot, "freeing a slot never handed out: {}", slot);
        self.len -= 1;
        self.released.push(Reverse(slot));
    }

    /// Forget every slot, the next `alloc` returns 0
    pub fn reset(&mut self) {
        self.released.clear();
        self.next_slot = 0;
        self.len = 0;
    }

    /// One past the highest slot ever handed out
    pub fn high_water_mark(&self) -> u32 {
        self.next_slot
    }

    /// Slots currently taken
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slot is taken
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
