//! `PriorityQueue`: array-backed binary min-heap keyed by cost.
//!
//! There is no decrease-key: relaxing a node pushes a fresh entry and the old
//! one stays behind as a stale duplicate.  Searches skip stale entries with a
//! visited check after `extract_min`.  Keys are `f64` and compared with `<`,
//! so NaN keys must never be inserted.

use evac_core::NodeIndex;

/// One `(key, value)` pair in the heap.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HeapEntry {
    pub key: f64,
    pub value: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct PriorityQueue {
    heap: Vec<HeapEntry>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { heap: Vec::with_capacity(capacity) }
    }

    /// Add an entry.  O(log n).
    pub fn insert(&mut self, key: f64, value: NodeIndex) {
        debug_assert!(!key.is_nan(), "NaN key for {value}");
        self.heap.push(HeapEntry { key, value });
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the entry with the smallest key.  O(log n).
    pub fn extract_min(&mut self) -> Option<HeapEntry> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let min = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        min
    }

    #[inline]
    pub fn peek(&self) -> Option<&HeapEntry> {
        self.heap.first()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of entries, stale duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[parent].key <= self.heap[index].key {
                break;
            }
            self.heap.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smaller = if right < len && self.heap[right].key < self.heap[left].key {
                right
            } else {
                left
            };
            if self.heap[index].key <= self.heap[smaller].key {
                break;
            }
            self.heap.swap(index, smaller);
            index = smaller;
        }
    }
}
