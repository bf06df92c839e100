//! First-seen-wins merge of ranked candidate lists.

use std::{collections::HashSet, hash::Hash};

/// Flatten ranked lists in order, keeping only the first occurrence of each key.
///
/// Order is list order, then rank order within a list. Runs in a single pass
/// over all candidates.
pub fn merge_ranked<T, K, I, F>(lists: I, mut key: F) -> Vec<T>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for candidate in lists.into_iter().flatten() {
        if seen.insert(key(&candidate)) {
            merged.push(candidate);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_keywords_dedup_in_order() {
        let lists = vec![vec!["A", "B"], vec!["B", "C"]];
        let merged = merge_ranked(lists, |s| *s);
        assert_eq!(merged, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_first_match_fixes_position() {
        let lists = vec![vec!["C"], vec!["A", "B", "C"], vec!["B", "D"]];
        let merged = merge_ranked(lists, |s| *s);
        assert_eq!(merged, vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn test_empty_lists() {
        let lists: Vec<Vec<String>> = vec![vec![], vec![]];
        assert!(merge_ranked(lists, Clone::clone).is_empty());
    }

    #[test]
    fn test_duplicates_within_one_list() {
        let lists = vec![vec![1, 1, 2]];
        assert_eq!(merge_ranked(lists, |n| *n), vec![1, 2]);
    }
}
