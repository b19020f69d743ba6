use std::collections::HashMap;
use std::ops::Index;

/// Assignment of observations to mixture components.
///
/// `None` is the null class. Labels at or above the number of active components are
/// provisional new components until `reduce` compacts them.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    labels: Vec<Option<usize>>,
    n_clusters: usize,
}

impl Index<usize> for Clustering {
    type Output = Option<usize>;
    fn index(&self, item: usize) -> &Self::Output {
        &self.labels[item]
    }
}

impl Clustering {
    pub fn one_cluster(n_items: usize) -> Self {
        Self {
            labels: vec![Some(0); n_items],
            n_clusters: if n_items == 0 { 0 } else { 1 },
        }
    }

    pub fn all_null(n_items: usize) -> Self {
        Self {
            labels: vec![None; n_items],
            n_clusters: 0,
        }
    }

    /// Labels are taken as-is; the label space spans up to the largest label.
    pub fn from_vector(labels: Vec<Option<usize>>) -> Self {
        let n_clusters = span(&labels);
        Self { labels, n_clusters }
    }

    pub fn from_slice(labels: &[Option<usize>]) -> Self {
        Self::from_vector(labels.to_vec())
    }

    pub fn n_items(&self) -> usize {
        self.labels.len()
    }

    /// Size of the label space: one more than the largest label, or zero.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn labels(&self) -> &[Option<usize>] {
        &self.labels[..]
    }

    pub fn n_null(&self) -> usize {
        self.labels.iter().filter(|label| label.is_none()).count()
    }

    /// Number of items with each label in `0..n_clusters`.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for label in self.labels.iter().flatten() {
            sizes[*label] += 1;
        }
        sizes
    }

    pub fn items_of(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Some(label))
            .map(|(i, _)| i)
            .collect()
    }

    /// Compacts the labels to `0..k` by rank order and returns the old label of each
    /// new label. Null items are left untouched.
    pub fn reduce(&mut self) -> Vec<usize> {
        let mut active: Vec<usize> = self.labels.iter().flatten().copied().collect();
        active.sort_unstable();
        active.dedup();
        let map: HashMap<usize, usize> = active
            .iter()
            .enumerate()
            .map(|(new_label, &old_label)| (old_label, new_label))
            .collect();
        for label in self.labels.iter_mut().flatten() {
            *label = map[&*label];
        }
        self.n_clusters = active.len();
        active
    }

    /// The clustering restricted to `items`, in that order.
    pub fn subset(&self, items: &[usize]) -> Self {
        Self::from_vector(items.iter().map(|&i| self.labels[i]).collect())
    }

    /// Writes the labels of `other` back to `items`, the inverse of `subset`.
    pub fn scatter(&mut self, items: &[usize], other: &Clustering) {
        assert_eq!(
            items.len(),
            other.n_items(),
            "Number of items and labels are not the same."
        );
        for (&item, &label) in items.iter().zip(other.labels.iter()) {
            self.labels[item] = label;
        }
        self.n_clusters = span(&self.labels);
    }
}

fn span(labels: &[Option<usize>]) -> usize {
    labels.iter().flatten().max().map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::fmt::{Debug, Write};

    fn check_output<T: Debug>(clustering: &T, expected_output: &str) {
        let mut output = String::new();
        write!(&mut output, "{:?}", clustering).expect("Oops");
        assert_eq!(output, expected_output);
    }

    #[test]
    fn test_initialization() {
        let clustering = Clustering::one_cluster(3);
        check_output(
            &clustering,
            "Clustering { labels: [Some(0), Some(0), Some(0)], n_clusters: 1 }",
        );
        let clustering = Clustering::from_slice(&[Some(2), None, Some(4), Some(2)]);
        check_output(
            &clustering,
            "Clustering { labels: [Some(2), None, Some(4), Some(2)], n_clusters: 5 }",
        );
        assert_eq!(clustering.sizes(), vec![0, 0, 2, 0, 1]);
        assert_eq!(clustering.n_null(), 1);
        assert_eq!(Clustering::one_cluster(0).n_clusters(), 0);
    }

    #[test]
    fn test_reduce() {
        let mut clustering =
            Clustering::from_slice(&[Some(7), Some(2), None, Some(4), Some(7), Some(2)]);
        let map = clustering.reduce();
        check_output(
            &clustering,
            "Clustering { labels: [Some(2), Some(0), None, Some(1), Some(2), Some(0)], n_clusters: 3 }",
        );
        check_output(&map, "[2, 4, 7]");
        assert_eq!(clustering.sizes(), vec![2, 1, 2]);
    }

    #[test]
    fn test_reduce_all_null() {
        let mut clustering = Clustering::all_null(4);
        assert!(clustering.reduce().is_empty());
        assert_eq!(clustering.n_clusters(), 0);
        let mut empty = Clustering::from_vector(Vec::new());
        empty.reduce();
        assert_eq!(empty.n_clusters(), 0);
    }

    #[test]
    fn test_subset_and_scatter() {
        let mut clustering = Clustering::from_slice(&[Some(0), Some(1), Some(1), None, Some(0)]);
        let items = [1, 3, 4];
        let mut part = clustering.subset(&items);
        assert_eq!(part.labels(), &[Some(1), None, Some(0)]);
        assert_eq!(part.reduce(), vec![0, 1]);
        assert_eq!(part.n_clusters(), 2);
        let replacement = Clustering::from_slice(&[Some(5), Some(2), None]);
        clustering.scatter(&items, &replacement);
        assert_eq!(
            clustering.labels(),
            &[Some(0), Some(5), Some(1), Some(2), None]
        );
        assert_eq!(clustering.n_clusters(), 6);
    }

    #[test]
    fn test_items_of() {
        let clustering = Clustering::from_slice(&[Some(2), Some(2), Some(4), None, Some(4)]);
        check_output(&clustering.items_of(4), "[2, 4]");
    }

    #[test]
    #[should_panic]
    fn test_scatter_length_mismatch() {
        let mut clustering = Clustering::one_cluster(3);
        clustering.scatter(&[0, 1], &Clustering::one_cluster(1));
    }

    fn arbitrary_labels() -> impl Strategy<Value = Vec<Option<usize>>> {
        prop::collection::vec(prop::option::weighted(0.8, 0_usize..1000), 0..60)
    }

    proptest! {
        #[test]
        fn prop_reduce_is_contiguous(labels in arbitrary_labels()) {
            let distinct: BTreeSet<usize> = labels.iter().flatten().copied().collect();
            let mut clustering = Clustering::from_vector(labels.clone());
            clustering.reduce();
            let k = clustering.n_clusters();
            prop_assert_eq!(k, distinct.len());
            let after: BTreeSet<usize> = clustering.labels().iter().flatten().copied().collect();
            prop_assert_eq!(after, (0..k).collect::<BTreeSet<usize>>());
            prop_assert!(clustering.sizes().iter().all(|&size| size > 0));
        }

        #[test]
        fn prop_reduce_preserves_structure(labels in arbitrary_labels()) {
            let mut clustering = Clustering::from_vector(labels.clone());
            clustering.reduce();
            for i in 0..labels.len() {
                prop_assert_eq!(labels[i].is_none(), clustering[i].is_none());
                for j in 0..labels.len() {
                    if let (Some(a), Some(b)) = (labels[i], labels[j]) {
                        prop_assert_eq!(a == b, clustering[i] == clustering[j]);
                        prop_assert_eq!(a < b, clustering[i] < clustering[j]);
                    }
                }
            }
        }
    }
}
