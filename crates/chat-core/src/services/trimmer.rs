//! Bounded message window policy

/// Keeps the newest `max` items of an ordered sequence, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trimmer {
    max: usize,
}

impl Trimmer {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Suffix of length `min(len, max)`, relative order preserved.
    pub fn trim<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if items.len() > self.max {
            items.drain(..items.len() - self.max);
        }
        items
    }

    pub fn append<T>(&self, mut items: Vec<T>, item: T) -> Vec<T> {
        items.push(item);
        self.trim(items)
    }
}

/// Last `n` items of a slice.
pub fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sequence_untouched() {
        let trimmer = Trimmer::new(100);
        assert_eq!(trimmer.trim(vec![1, 2, 3]), vec![1, 2, 3]);
        assert!(trimmer.trim(Vec::<i32>::new()).is_empty());
    }

    #[test]
    fn test_drops_oldest_first() {
        let trimmer = Trimmer::new(3);
        assert_eq!(trimmer.trim(vec![1, 2, 3, 4, 5]), vec![3, 4, 5]);
    }

    #[test]
    fn test_idempotent() {
        let trimmer = Trimmer::new(3);
        let once = trimmer.trim((0..10).collect::<Vec<_>>());
        assert_eq!(trimmer.trim(once.clone()), once);
    }

    #[test]
    fn test_repeated_appends_keep_newest_window() {
        let trimmer = Trimmer::new(100);
        let mut window = Vec::new();
        for i in 1..=105 {
            window = trimmer.append(window, i);
            assert!(window.len() <= 100);
        }
        assert_eq!(window, (6..=105).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_bound_keeps_nothing() {
        assert!(Trimmer::new(0).append(vec![1], 2).is_empty());
    }

    #[test]
    fn test_tail() {
        let items = [1, 2, 3, 4];
        assert_eq!(tail(&items, 2), &[3, 4]);
        assert_eq!(tail(&items, 10), &[1, 2, 3, 4]);
        assert!(tail(&items, 0).is_empty());
    }
}
