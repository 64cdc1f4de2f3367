use std::ops::Index;

/// A vector that can be reset to its default value in O(1), by bumping a generation counter
/// instead of rewriting the data.
#[derive(Debug, Clone)]
pub struct TimestampedVector<T: Copy> {
    data: Vec<T>,
    current: u32,
    timestamps: Vec<u32>,
    default: T,
}

impl<T: Copy> TimestampedVector<T> {
    pub fn new(size: usize, default: T) -> TimestampedVector<T> {
        TimestampedVector {
            data: vec![default; size],
            // start above zero, so that the initial timestamps are all stale
            current: 1,
            timestamps: vec![0; size],
            default,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn reset(&mut self) {
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            // wrapped around, so old timestamps could look current again
            for ts in self.timestamps.iter_mut() {
                *ts = 0;
            }
            self.current = 1;
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
        self.timestamps[index] = self.current;
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.timestamps[index] == self.current
    }
}

impl<T: Copy> Index<usize> for TimestampedVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        if self.timestamps[index] == self.current {
            &self.data[index]
        } else {
            &self.default
        }
    }
}
