//! Bounded, sorted neighbor lists.
//!
//! A [`NeighborList`] keeps at most `k` entries ordered by descending score,
//! with ties broken by ascending neighbor id so that every list has exactly
//! one valid order. That total order is what makes merging independent of
//! arrival order.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A neighbor id with its similarity to the owning node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// The neighbor's node id.
    pub id: NodeId,
    /// Similarity to the owning node (higher is better).
    pub score: f64,
}

impl Neighbor {
    /// Create a new Neighbor.
    #[inline]
    pub fn new(id: impl Into<NodeId>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }

    /// Ranking order: higher score first, then lower id.
    #[inline]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Convert to a raw `(neighbor id, score)` tuple.
    #[inline]
    pub fn to_tuple(self) -> (u64, f64) {
        (self.id.0, self.score)
    }
}

impl From<(u64, f64)> for Neighbor {
    fn from(tuple: (u64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// Fixed-capacity top-k list of neighbors for one node.
///
/// Invariants: `len() <= k`, entries sorted by [`Neighbor::rank_cmp`], no
/// duplicate ids. The owning node is never inserted; callers filter it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborList {
    k: usize,
    entries: Vec<Neighbor>,
}

impl NeighborList {
    /// Create an empty list holding at most `k` neighbors.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k),
        }
    }

    /// Build a list from arbitrary candidates: duplicates keep their highest
    /// score, the result is sorted and truncated to `k`.
    pub fn from_candidates<I>(k: usize, candidates: I) -> Self
    where
        I: IntoIterator<Item = Neighbor>,
    {
        let mut list = Self::new(k);
        for candidate in candidates {
            list.absorb(candidate);
        }
        list
    }

    /// Capacity of the list.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of neighbors currently kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the list holds no neighbor.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return true if the list holds `k` neighbors.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.k
    }

    /// Neighbors in rank order.
    pub fn as_slice(&self) -> &[Neighbor] {
        &self.entries
    }

    /// Iterate neighbors in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.entries.iter()
    }

    /// Neighbor ids in rank order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.entries.iter().map(|n| n.id).collect()
    }

    /// Return true if `id` is in the list.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    /// Lowest kept score, if any.
    pub fn min_score(&self) -> Option<f64> {
        self.entries.last().map(|n| n.score)
    }

    /// Insert a candidate under the capacity rule.
    ///
    /// Returns `true` if the list changed. A candidate already present is
    /// rejected, as is one that does not rank strictly above the current
    /// worst entry of a full list. Inserting never lowers the minimum kept
    /// score of a full list.
    pub fn add(&mut self, candidate: Neighbor) -> bool {
        if self.k == 0 || self.contains(candidate.id) {
            return false;
        }
        if self.is_full() {
            match self.entries.last() {
                Some(worst) if candidate.rank_cmp(worst) == Ordering::Less => {}
                _ => return false,
            }
        }

        let pos = self
            .entries
            .partition_point(|n| n.rank_cmp(&candidate) == Ordering::Less);
        self.entries.insert(pos, candidate);
        self.entries.truncate(self.k);
        true
    }

    /// Like [`add`](Self::add), but a candidate already present replaces the
    /// kept entry when its score is higher.
    pub fn absorb(&mut self, candidate: Neighbor) -> bool {
        match self.entries.iter().position(|n| n.id == candidate.id) {
            Some(pos) if self.entries[pos].score.total_cmp(&candidate.score) == Ordering::Less => {
                self.entries.remove(pos);
                self.add(candidate)
            }
            Some(_) => false,
            None => self.add(candidate),
        }
    }

    /// Absorb every entry of `other`.
    pub fn merge(&mut self, other: &NeighborList) {
        for &candidate in other.iter() {
            self.absorb(candidate);
        }
    }

    /// Consume the list, returning its entries in rank order.
    pub fn into_vec(self) -> Vec<Neighbor> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a NeighborList {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_order_and_capacity() {
        let mut list = NeighborList::new(3);
        assert!(list.add(Neighbor::new(1u64, 0.2)));
        assert!(list.add(Neighbor::new(2u64, 0.9)));
        assert!(list.add(Neighbor::new(3u64, 0.5)));
        assert!(list.add(Neighbor::new(4u64, 0.7)));

        assert_eq!(list.len(), 3);
        assert_eq!(list.ids(), vec![NodeId(2), NodeId(4), NodeId(3)]);
        assert_eq!(list.min_score(), Some(0.5));
    }

    #[test]
    fn test_add_rejects_duplicates_and_low_scores() {
        let mut list = NeighborList::new(2);
        list.add(Neighbor::new(1u64, 0.8));
        list.add(Neighbor::new(2u64, 0.6));

        assert!(!list.add(Neighbor::new(1u64, 0.95)));
        assert!(!list.add(Neighbor::new(3u64, 0.1)));
        assert_eq!(list.ids(), vec![NodeId(1), NodeId(2)]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let mut list = NeighborList::new(2);
        list.add(Neighbor::new(9u64, 0.5));
        list.add(Neighbor::new(4u64, 0.5));
        assert_eq!(list.ids(), vec![NodeId(4), NodeId(9)]);

        // Same score, lower id ranks above the current worst.
        assert!(list.add(Neighbor::new(1u64, 0.5)));
        assert_eq!(list.ids(), vec![NodeId(1), NodeId(4)]);
        // Same score, higher id does not.
        assert!(!list.add(Neighbor::new(7u64, 0.5)));
    }

    #[test]
    fn test_absorb_keeps_highest_score() {
        let mut list = NeighborList::new(3);
        list.absorb(Neighbor::new(1u64, 0.3));
        list.absorb(Neighbor::new(2u64, 0.4));
        assert!(list.absorb(Neighbor::new(1u64, 0.9)));
        assert!(!list.absorb(Neighbor::new(2u64, 0.1)));

        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0], Neighbor::new(1u64, 0.9));
        assert_eq!(list.as_slice()[1], Neighbor::new(2u64, 0.4));
    }

    #[test]
    fn test_zero_capacity() {
        let mut list = NeighborList::new(0);
        assert!(!list.add(Neighbor::new(1u64, 1.0)));
        assert!(list.is_empty());
    }

    #[test]
    fn test_from_candidates() {
        let list = NeighborList::from_candidates(
            2,
            vec![
                Neighbor::new(5u64, 0.1),
                Neighbor::new(6u64, 0.3),
                Neighbor::new(5u64, 0.8),
                Neighbor::new(7u64, 0.2),
            ],
        );
        assert_eq!(list.ids(), vec![NodeId(5), NodeId(6)]);
    }
}
