//! Mutation-site combination enumeration.
//!
//! Grounded in `SharedEditor.py`'s `generate_combinations` and `Main.py`'s
//! `generate_all_combinations`/`combinations_worker`: for a given subset
//! size `r`, enumerates every `r`-combination of the mutable node id pool
//! using `itertools::combinations`, the same crate the teacher already
//! depends on for its own grouping logic (`into_group_map` in `run.rs`).

use crate::ast::NodeId;
use itertools::Itertools;
use std::collections::BTreeSet;

pub type MutationSiteSet = BTreeSet<NodeId>;

/// Every `r`-combination of `mutable_ids`, canonicalized as a sorted
/// `BTreeSet` (the serialized "sorted list" shape `spec.md` requires).
pub fn combinations(mutable_ids: &[NodeId], r: usize) -> Vec<MutationSiteSet> {
    if r == 0 || r > mutable_ids.len() {
        return Vec::new();
    }
    mutable_ids
        .iter()
        .copied()
        .combinations(r)
        .map(|c| c.into_iter().collect::<MutationSiteSet>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_of_size_two_from_three_ids() {
        let ids = vec![NodeId(0), NodeId(1), NodeId(2)];
        let combos = combinations(&ids, 2);
        assert_eq!(combos.len(), 3);
        assert!(combos.contains(&BTreeSet::from([NodeId(0), NodeId(1)])));
    }

    #[test]
    fn r_larger_than_pool_yields_nothing() {
        let ids = vec![NodeId(0)];
        assert!(combinations(&ids, 2).is_empty());
    }
}
