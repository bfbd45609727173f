// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{FmmError, Result};

const ABSENT: usize = usize::MAX;

/// A cell and its key in the heap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapEntry {
    /// Index in the 1st dimension.
    pub i1: usize,
    /// Index in the 2nd dimension.
    pub i2: usize,
    /// Tentative arrival time.
    pub time: f32,
    flat: usize,
}

impl HeapEntry {
    /// Heap order: smaller time first, ties broken by row-major index.
    #[inline]
    fn precedes(&self, other: &HeapEntry) -> bool {
        self.time < other.time || (self.time == other.time && self.flat < other.flat)
    }
}

/// A binary min-heap of grid cells keyed by tentative time.
///
/// Besides the heap array, a cell-to-slot map records where each cell lives
/// so that [`reduce`](TimeHeap::reduce) can find an arbitrary entry without
/// searching. A cell appears at most once.
#[derive(Debug, Clone)]
pub struct TimeHeap {
    n1: usize,
    n2: usize,
    entries: Vec<HeapEntry>,
    slots: Box<[usize]>,
}

impl TimeHeap {
    /// Create an empty heap for a grid of `n1 * n2` cells.
    pub fn new(n1: usize, n2: usize) -> Self {
        TimeHeap {
            n1,
            n2,
            entries: Vec::new(),
            slots: vec![ABSENT; n1 * n2].into_boxed_slice(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the cell has an entry.
    pub fn contains(&self, i1: usize, i2: usize) -> bool {
        self.flat(i1, i2)
            .map(|flat| self.slots[flat] != ABSENT)
            .unwrap_or(false)
    }

    /// Current key of the cell, if present.
    pub fn key(&self, i1: usize, i2: usize) -> Option<f32> {
        let flat = self.flat(i1, i2)?;
        match self.slots[flat] {
            ABSENT => None,
            slot => Some(self.entries[slot].time),
        }
    }

    /// The entry with the smallest key, without removing it.
    pub fn peek(&self) -> Option<&HeapEntry> {
        self.entries.first()
    }

    /// Iterate over entries in heap (not sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = &HeapEntry> {
        self.entries.iter()
    }

    /// Add a cell that is not yet present.
    ///
    /// # Errors
    /// Returns [`FmmError::HeapContract`] if the cell is already present or
    /// outside the grid.
    pub fn insert(&mut self, i1: usize, i2: usize, time: f32) -> Result<()> {
        let flat = self.flat(i1, i2).ok_or(FmmError::HeapContract {
            i1,
            i2,
            reason: "cell outside grid",
        })?;
        if self.slots[flat] != ABSENT {
            return Err(FmmError::HeapContract {
                i1,
                i2,
                reason: "cell already present",
            });
        }
        let slot = self.entries.len();
        self.entries.push(HeapEntry { i1, i2, time, flat });
        self.slots[flat] = slot;
        self.sift_up(slot);
        Ok(())
    }

    /// Lower the key of a cell already present.
    ///
    /// # Errors
    /// Returns [`FmmError::HeapContract`] if the cell is absent or if `time`
    /// is larger than its current key.
    pub fn reduce(&mut self, i1: usize, i2: usize, time: f32) -> Result<()> {
        let slot = self
            .flat(i1, i2)
            .map(|flat| self.slots[flat])
            .filter(|&slot| slot != ABSENT)
            .ok_or(FmmError::HeapContract {
                i1,
                i2,
                reason: "cell not present",
            })?;
        if time > self.entries[slot].time {
            return Err(FmmError::HeapContract {
                i1,
                i2,
                reason: "key increase",
            });
        }
        self.entries[slot].time = time;
        self.sift_up(slot);
        Ok(())
    }

    /// Remove and return the entry with the smallest key.
    pub fn extract_min(&mut self) -> Option<HeapEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.swap(0, last);
        let min = self.entries.pop()?;
        self.slots[min.flat] = ABSENT;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    /// Remove all entries. O(len), not O(cells).
    pub fn clear(&mut self) {
        for e in self.entries.drain(..) {
            self.slots[e.flat] = ABSENT;
        }
    }

    fn flat(&self, i1: usize, i2: usize) -> Option<usize> {
        if i1 < self.n1 && i2 < self.n2 {
            Some(i2 * self.n1 + i1)
        } else {
            None
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.slots[self.entries[a].flat] = a;
        self.slots[self.entries[b].flat] = b;
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.entries[slot].precedes(&self.entries[parent]) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * slot + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && self.entries[right].precedes(&self.entries[left]) {
                right
            } else {
                left
            };
            if !self.entries[child].precedes(&self.entries[slot]) {
                break;
            }
            self.swap(slot, child);
            slot = child;
        }
    }
}
