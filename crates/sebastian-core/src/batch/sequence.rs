use super::BatchName;

/// REGULAR first, then EXTRA batches by ascending number. Repeats are dropped.
pub fn sort_batches(names: &[BatchName]) -> Vec<BatchName> {
    let mut sorted = names.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Load order for a merge: the base batch, then REGULAR (unless it is the base),
/// then EXTRA batches by ascending number, never repeating a batch.
pub fn sort_batches_with_base(names: &[BatchName], base: BatchName) -> Vec<BatchName> {
    let others: Vec<BatchName> = names.iter().copied().filter(|b| *b != base).collect();
    let mut order = Vec::with_capacity(others.len() + 1);
    order.push(base);
    order.extend(sort_batches(&others));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_first_then_regular_then_extras() {
        let names = [BatchName::Extra(1), BatchName::Regular, BatchName::Extra(0)];
        assert_eq!(
            sort_batches_with_base(&names, BatchName::Extra(1)),
            vec![BatchName::Extra(1), BatchName::Regular, BatchName::Extra(0)]
        );
    }

    #[test]
    fn test_regular_base() {
        let names = [BatchName::Extra(10), BatchName::Extra(2), BatchName::Regular];
        assert_eq!(
            sort_batches_with_base(&names, BatchName::Regular),
            vec![BatchName::Regular, BatchName::Extra(2), BatchName::Extra(10)]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let names = [
            BatchName::Extra(3),
            BatchName::Extra(3),
            BatchName::Regular,
            BatchName::Extra(5),
        ];
        assert_eq!(
            sort_batches_with_base(&names, BatchName::Extra(3)),
            vec![BatchName::Extra(3), BatchName::Regular, BatchName::Extra(5)]
        );
        assert_eq!(
            sort_batches(&names),
            vec![BatchName::Regular, BatchName::Extra(3), BatchName::Extra(5)]
        );
    }

    #[test]
    fn test_base_not_in_list_still_leads() {
        let names = [BatchName::Extra(0)];
        assert_eq!(
            sort_batches_with_base(&names, BatchName::Regular),
            vec![BatchName::Regular, BatchName::Extra(0)]
        );
    }
}
