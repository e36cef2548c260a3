/// Indexes to preload around `current`: `i+1, i-1, i+2, i-2, ... i+D, i-D`,
/// skipping anything outside `0..count`.
pub fn preload_order(current: usize, count: usize, distance: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(distance * 2);

    for step in 1..=distance {
        if let Some(next) = current.checked_add(step).filter(|i| *i < count) {
            order.push(next);
        }
        if let Some(prev) = current.checked_sub(step).filter(|i| *i < count) {
            order.push(prev);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_in_the_middle() {
        assert_eq!(preload_order(5, 10, 2), vec![6, 4, 7, 3]);
    }

    #[test]
    fn test_order_at_first_item() {
        assert_eq!(preload_order(0, 10, 1), vec![1]);
        assert_eq!(preload_order(0, 10, 2), vec![1, 2]);
    }

    #[test]
    fn test_order_at_last_item() {
        assert_eq!(preload_order(9, 10, 2), vec![8, 7]);
    }

    #[test]
    fn test_order_edge_cases() {
        assert!(preload_order(0, 1, 3).is_empty());
        assert!(preload_order(4, 10, 0).is_empty());
        assert_eq!(preload_order(1, 3, 5), vec![2, 0]);
    }
}
