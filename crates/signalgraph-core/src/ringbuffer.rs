//! Fixed-capacity scalar ring buffer shared by the baker's per-input-CP
//! delay lines and the tick scheduler's per-wire delay lines.
//!
//! A single write head advances modulo capacity on every write; reads are
//! taken at a caller-chosen offset behind that head rather than always at a
//! fixed lag, since the baker reads at varying `buffer_offset`s into the
//! same physical buffer.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::signal::Signal;

/// A ring buffer of [`Signal`] values with a single write head.
///
/// Invariant: `0 <= head < capacity` always.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Signal>,
    head: usize,
}

impl RingBuffer {
    /// Creates a zero-filled ring buffer. `capacity` is floored at 1 so a
    /// zero-sized buffer request (an unconnected or trivial wire) still
    /// behaves like a single-slot passthrough rather than panicking.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RingBuffer {
            slots: vec![Signal::ZERO; capacity],
            head: 0,
        }
    }

    /// Buffer capacity (ring size).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Writes `value` at the current head and advances the head modulo
    /// capacity.
    pub fn write_advance(&mut self, value: Signal) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.slots.len();
    }

    /// Reads the value `offset` ticks behind the write head (0 = the most
    /// recently written slot about to be overwritten next, i.e. the oldest
    /// value currently held).
    pub fn read_offset(&self, offset: u32) -> Signal {
        let capacity = self.slots.len();
        let offset = (offset as usize) % capacity;
        // `head` points at the next slot to be written, which is also the
        // oldest value currently held (the slot about to be overwritten).
        // Offset 0 is that oldest slot; offset increases toward the most
        // recently written value.
        let index = (self.head + offset) % capacity;
        self.slots[index]
    }

    /// Clears every slot to zero and resets the head to 0.
    pub fn clear(&mut self) {
        self.slots.fill(Signal::ZERO);
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_floored_at_one() {
        let rb = RingBuffer::new(0);
        assert_eq!(rb.capacity(), 1);
    }

    #[test]
    fn head_stays_in_bounds_after_many_writes() {
        let mut rb = RingBuffer::new(3);
        for i in 0..10 {
            rb.write_advance(Signal::new(i as f64));
        }
        assert!(rb.head < rb.capacity());
    }

    #[test]
    fn offset_zero_after_single_write_returns_written_value() {
        let mut rb = RingBuffer::new(1);
        rb.write_advance(Signal::new(75.0));
        assert_eq!(rb.read_offset(0).value(), 75.0);
    }

    #[test]
    fn offset_tracks_history_depth() {
        let mut rb = RingBuffer::new(3);
        rb.write_advance(Signal::new(1.0));
        rb.write_advance(Signal::new(2.0));
        rb.write_advance(Signal::new(3.0));
        // After 3 writes into a capacity-3 buffer, offset 0 is the oldest
        // (value 1.0, about to be overwritten next), offset 2 is the
        // most recent (3.0).
        assert_eq!(rb.read_offset(0).value(), 1.0);
        assert_eq!(rb.read_offset(2).value(), 3.0);
    }
}
