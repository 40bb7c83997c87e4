//! Ring buffer for lines produced before a log root is known.

use std::collections::VecDeque;

/// Fixed-capacity buffer of formatted lines. The oldest line is dropped
/// once capacity is reached.
#[derive(Debug, Clone)]
pub struct PendingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    dropped: u64,
}

impl PendingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// All buffered lines concatenated in push order.
    pub fn joined(&self) -> String {
        self.lines.iter().map(String::as_str).collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_keeps_order() {
        let mut buffer = PendingBuffer::new(3);
        buffer.push("a\n".into());
        buffer.push("b\n".into());

        assert_eq!(buffer.joined(), "a\nb\n");
        assert_eq!(buffer.dropped(), 0);
    }

    #[test]
    fn test_push_beyond_capacity_drops_oldest() {
        let mut buffer = PendingBuffer::new(2);
        for line in ["a", "b", "c"] {
            buffer.push(line.into());
        }

        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(buffer.dropped(), 1);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut buffer = PendingBuffer::new(0);
        buffer.push("a".into());
        buffer.push("b".into());
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.joined(), "b");
    }

    proptest! {
        /// The buffer always holds the newest `capacity` lines in push order
        #[test]
        fn keeps_newest_lines_in_order(
            capacity in 1usize..20,
            lines in prop::collection::vec("[a-z]{1,8}", 0..60)
        ) {
            let mut buffer = PendingBuffer::new(capacity);
            for line in &lines {
                buffer.push(line.clone());
            }

            let start = lines.len().saturating_sub(capacity);
            let expected: Vec<&str> = lines[start..].iter().map(String::as_str).collect();
            prop_assert_eq!(buffer.iter().collect::<Vec<_>>(), expected);
            prop_assert_eq!(buffer.dropped() as usize, start);
        }
    }
}
