//! Directed witness generator (Phase 3).
//!
//! Grounded in `CDirectedGenerator.py` (`directed_generator`/`get_target_ids`/
//! `flatten`). Partitions the mutable node id pool into the ids Learner B's
//! mutation ledger shows flip outcome when mutated alone ("witness" ids)
//! and everything else ("avoid" ids), then re-runs the Phase 1 machinery
//! restricted to each partition to build a passing witness pool and a
//! failing witness pool. The dead `generate_buggy_witnesses` loop and the
//! broken, always-`TODO` `node_mutator`/`tree_mutator` pair in the original
//! are not carried over -- nothing in the data flow ever calls them.

use crate::ast::{NodeId, WalkedAst};
use crate::combinatorics::MutationSiteSet;
use crate::error::Result;
use crate::language::LanguageInfo;
use crate::learn_b::MutationLedger;
use crate::oracle::Oracle;
use crate::phase1;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub struct Phase3Output {
    pub witness_ids: Vec<NodeId>,
    pub avoid_ids: Vec<NodeId>,
}

/// Builds the passing and failing witness pools under `asts_path/{passings,
/// failings}` and `code_path/{passings,failings}`.
pub fn run(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    ids_set_to_mutations: &MutationLedger,
    mutable_node_ids: &HashSet<NodeId>,
    asts_path: &Path,
    code_path: &Path,
    oracle: &dyn Oracle,
    seed: u64,
) -> Result<Phase3Output> {
    let target_ids_sets = get_target_ids(ids_set_to_mutations);
    let witness_ids_set = flatten(&target_ids_sets);

    let mut witness_ids: Vec<NodeId> = witness_ids_set.iter().copied().collect();
    witness_ids.sort_by_key(|id| id.0);

    let mut avoid_ids: Vec<NodeId> = mutable_node_ids
        .iter()
        .copied()
        .filter(|id| !witness_ids_set.contains(id))
        .collect();
    avoid_ids.sort_by_key(|id| id.0);

    let passing_asts = asts_path.join("passings");
    let passing_code = code_path.join("passings");
    fs::create_dir_all(&passing_asts).map_err(|e| crate::error::NccatError::io(&passing_asts, e))?;
    fs::create_dir_all(&passing_code).map_err(|e| crate::error::NccatError::io(&passing_code, e))?;
    log::info!("phase3: generating passing witness programs ({} target ids)", witness_ids.len());
    phase1::run(walked_0, language_info, &witness_ids, &passing_asts, &passing_code, oracle, seed)?;

    let failing_asts = asts_path.join("failings");
    let failing_code = code_path.join("failings");
    fs::create_dir_all(&failing_asts).map_err(|e| crate::error::NccatError::io(&failing_asts, e))?;
    fs::create_dir_all(&failing_code).map_err(|e| crate::error::NccatError::io(&failing_code, e))?;
    log::info!("phase3: generating failing witness programs ({} avoid ids)", avoid_ids.len());
    phase1::run(walked_0, language_info, &avoid_ids, &failing_asts, &failing_code, oracle, seed.wrapping_add(1))?;

    Ok(Phase3Output { witness_ids, avoid_ids })
}

/// Union of every target id set `get_target_ids` produced.
fn flatten(target_ids_sets: &[MutationSiteSet]) -> MutationSiteSet {
    target_ids_sets.iter().fold(MutationSiteSet::new(), |mut acc, s| {
        acc.extend(s.iter().copied());
        acc
    })
}

/// For each identified node set, the subset of its ids that the mutation
/// ledger recorded at least one passing observation for -- these are the
/// ids this node set's flip can actually be attributed to.
fn get_target_ids(ledger: &MutationLedger) -> Vec<MutationSiteSet> {
    let mut target_ids_sets = Vec::new();

    for (ids_set, mutation_info) in ledger {
        let ids_with_passings: MutationSiteSet = mutation_info
            .iter()
            .filter(|(_, record)| !record.passings.is_empty())
            .map(|(id, _)| *id)
            .collect();
        let intersection: MutationSiteSet = ids_set.intersection(&ids_with_passings).copied().collect();
        if !intersection.is_empty() {
            target_ids_sets.push(intersection);
        }
    }

    target_ids_sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn_b::NodeMutationRecord;

    fn set(ids: &[u32]) -> MutationSiteSet {
        ids.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn flatten_unions_all_target_sets() {
        let sets = vec![set(&[3]), set(&[4]), set(&[3, 5]), set(&[6])];
        assert_eq!(flatten(&sets), set(&[3, 4, 5, 6]));
    }

    #[test]
    fn get_target_ids_keeps_only_nodes_with_passings() {
        let mut ledger: MutationLedger = MutationLedger::new();

        let mut by_node = std::collections::HashMap::new();
        by_node.insert(
            NodeId(3),
            NodeMutationRecord { passings: ["1".to_string()].into(), failings: Default::default(), original: None },
        );
        by_node.insert(NodeId(7), NodeMutationRecord::default());
        ledger.insert(set(&[3, 7]), by_node);

        let target_ids = get_target_ids(&ledger);
        assert_eq!(target_ids, vec![set(&[3])]);
    }
}
