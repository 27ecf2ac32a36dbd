//! Fan-out/fan-in helper shared by the stage tasks.
//!
//! `map_tasks` runs one closure per work item and returns when every item has
//! finished; the returned vector is in input order regardless of completion
//! order, so callers can fold results deterministically.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "parallel")]
pub fn map_tasks<T, R, F>(items: &[T], parallel: bool, task: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync + Send,
{
    if parallel {
        items
            .par_iter()
            .enumerate()
            .map(|(index, item)| task(index, item))
            .collect()
    } else {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| task(index, item))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
pub fn map_tasks<T, R, F>(items: &[T], _parallel: bool, task: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync + Send,
{
    items
        .iter()
        .enumerate()
        .map(|(index, item)| task(index, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_keep_input_order() {
        let items: Vec<u64> = (0..64).collect();
        let parallel = map_tasks(&items, true, |index, value| (index, value * 2));
        let sequential = map_tasks(&items, false, |index, value| (index, value * 2));

        assert_eq!(parallel, sequential);
        assert_eq!(parallel[10], (10, 20));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let items: Vec<u8> = Vec::new();
        assert!(map_tasks(&items, true, |_, v| *v).is_empty());
    }
}
