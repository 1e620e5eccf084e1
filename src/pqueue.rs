//! A min-heap priority queue with FIFO ordering among equal priorities.
//!
//! Huffman construction pops the two lightest nodes repeatedly. When
//! several nodes share a weight, the one pushed first comes out first,
//! which makes tree shapes reproducible across runs and platforms.

#[derive(Debug, Clone)]
struct HeapEntry<T> {
    priority: u64,
    seq: u64,
    data: T,
}

impl<T> HeapEntry<T> {
    fn key(&self) -> (u64, u64) {
        (self.priority, self.seq)
    }
}

/// Binary min-heap, 0-indexed: parent = (i-1)/2, children = 2i+1, 2i+2.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    nodes: Vec<HeapEntry<T>>,
    next_seq: u64,
}

impl<T> MinHeap<T> {
    pub fn new() -> Self {
        MinHeap {
            nodes: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MinHeap {
            nodes: Vec::with_capacity(capacity),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Push an element with the given priority.
    pub fn push(&mut self, priority: u64, data: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.nodes.push(HeapEntry {
            priority,
            seq,
            data,
        });
        self.sift_up(self.nodes.len() - 1);
    }

    /// Pop the lowest-priority element, oldest first among ties.
    pub fn pop(&mut self) -> Option<(u64, T)> {
        if self.nodes.is_empty() {
            return None;
        }
        let last = self.nodes.len() - 1;
        self.nodes.swap(0, last);
        let entry = self.nodes.pop()?;
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        Some((entry.priority, entry.data))
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.nodes[index].key() < self.nodes[parent].key() {
                self.nodes.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.nodes.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.nodes[left].key() < self.nodes[smallest].key() {
                smallest = left;
            }
            if right < len && self.nodes[right].key() < self.nodes[smallest].key() {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.nodes.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_heap() {
        let mut heap: MinHeap<u8> = MinHeap::new();
        assert!(heap.is_empty());
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_min_order() {
        let mut heap = MinHeap::new();
        heap.push(3, "three");
        heap.push(1, "one");
        heap.push(2, "two");
        assert_eq!(heap.pop(), Some((1, "one")));
        assert_eq!(heap.pop(), Some((2, "two")));
        assert_eq!(heap.pop(), Some((3, "three")));
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_equal_priorities_are_fifo() {
        let mut heap = MinHeap::new();
        for name in ["a", "b", "c", "d", "e"] {
            heap.push(7, name);
        }
        heap.push(1, "first");
        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|(_, v)| v)).collect();
        assert_eq!(order, vec!["first", "a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_fifo_survives_interleaving() {
        let mut heap = MinHeap::new();
        heap.push(5, 'x');
        heap.push(2, 'y');
        assert_eq!(heap.pop(), Some((2, 'y')));
        heap.push(5, 'z');
        heap.push(5, 'w');
        assert_eq!(heap.pop(), Some((5, 'x')));
        assert_eq!(heap.pop(), Some((5, 'z')));
        assert_eq!(heap.pop(), Some((5, 'w')));
    }

    #[test]
    fn test_large_heap() {
        let mut heap = MinHeap::with_capacity(1000);
        for i in 0u64..1000 {
            let p = (i * 997) % 1000;
            heap.push(p, p);
        }
        let mut prev = 0;
        while let Some((p, v)) = heap.pop() {
            assert_eq!(p, v);
            assert!(p >= prev, "heap order violated: {p} < {prev}");
            prev = p;
        }
    }
}
