//! Relevant-node learner, phase A.
//!
//! Grounded in `CLearning_A.py`: starting from the passing/failing
//! combination pools Phase 1 produced, narrows down to the smallest set of
//! node-id combinations that plausibly explain the pass/fail split, then
//! re-generates a handful of singleton-node batches (`retry`) to resolve
//! the ones `identify_from_larger_r` couldn't attribute to a single node.
//!
//! `pc2ap`/`fc2ap` (passing/failing-combination-to-ast-path) key directly
//! on [`MutationSiteSet`] here, since a `BTreeSet<NodeId>` is both `Ord`
//! and `Hash` and needs no `str(sorted(combination))` stand-in the way the
//! Python dict keys do.

use crate::ast::{NodeId, WalkedAst};
use crate::combinatorics::MutationSiteSet;
use crate::error::{NccatError, Result};
use crate::language::LanguageInfo;
use crate::oracle::{self, GroupingRecord, Oracle};
use crate::phase1;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// How many times a for-retry node id is replicated into its own
/// singleton-combination batch before re-generation. Undocumented in the
/// original beyond a "boundary testing" comment; kept as the same bare
/// constant.
pub const RETRY_MULTIPLIER: usize = 12;

pub type PathIndex = HashMap<MutationSiteSet, Vec<PathBuf>>;

pub struct LearnAOutput {
    pub identified_node_ids: Vec<MutationSiteSet>,
    pub pc2ap: PathIndex,
    pub fc2ap: PathIndex,
}

/// Runs the full Learner A pipeline. `scan_asts_path`/`scan_code_path` are
/// the already-completed Phase 1 tree (each holding one numbered
/// subdirectory per subset size `r`) this function reads combinations
/// from; `retry_asts_path`/`retry_code_path` are a separate, fresh tree
/// (Phase 2a's) that the retry step writes its own single `r = 1` batch
/// into -- matching `retry`'s hardcoded `phase_2a/asts`/`phase_2a/code`
/// paths in the original, which are never the same directories Learner A
/// scanned its input from.
pub fn learn(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    scan_code_path: &Path,
    scan_asts_path: &Path,
    retry_code_path: &Path,
    retry_asts_path: &Path,
    mutable_node_ids: &HashSet<NodeId>,
    oracle: &dyn Oracle,
    seed: u64,
) -> Result<LearnAOutput> {
    let (passings, failings, mut pc2ap, mut fc2ap) = collect_combinations(scan_code_path, scan_asts_path)?;

    let r1_combinations = get_r1(&passings);
    let (passing_combinations, for_retries) = identify_from_larger_r(&passings, r1_combinations);
    let failing_nodes = get_always_existing_nodes(&failings, mutable_node_ids);
    let mut identified_nodes = join_lists_of_sets(passing_combinations, failing_nodes);

    let new_mutable_node_ids = refine_retries(&for_retries, &identified_nodes);

    if !new_mutable_node_ids.is_empty() {
        let (updated_nodes, re_pc2ap, re_fc2ap) = retry(
            walked_0,
            language_info,
            retry_code_path,
            retry_asts_path,
            &new_mutable_node_ids,
            identified_nodes,
            oracle,
            seed,
        )?;
        identified_nodes = updated_nodes;
        pc2ap = merge_dictionaries(pc2ap, re_pc2ap);
        fc2ap = merge_dictionaries(fc2ap, re_fc2ap);
    }

    log::info!("learner a: identified {} node id combination(s)", identified_nodes.len());

    Ok(LearnAOutput { identified_node_ids: identified_nodes, pc2ap, fc2ap })
}

fn read_grouping(path: &Path) -> Result<GroupingRecord> {
    let text = fs::read_to_string(path).map_err(|e| NccatError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| NccatError::json(path, e))
}

fn read_id_to_combination(path: &Path) -> Result<HashMap<String, Vec<u32>>> {
    let text = fs::read_to_string(path).map_err(|e| NccatError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| NccatError::json(path, e))
}

/// Scans every numbered subdirectory of `asts_path`, pairing each against
/// its `code_path` counterpart's `grouped_files.json`, and buckets every
/// combination that produced a distinct variant into the passing or
/// failing pool (an ast id absent from both, e.g. an invalid compile, is
/// dropped, matching the Python's `elif`-only handling).
fn collect_combinations(
    code_path: &Path,
    asts_path: &Path,
) -> Result<(Vec<MutationSiteSet>, Vec<MutationSiteSet>, PathIndex, PathIndex)> {
    let mut passings: Vec<MutationSiteSet> = Vec::new();
    let mut failings: Vec<MutationSiteSet> = Vec::new();
    let mut pc2ap = PathIndex::new();
    let mut fc2ap = PathIndex::new();

    let entries = fs::read_dir(asts_path).map_err(|e| NccatError::io(asts_path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| NccatError::io(asts_path, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let level = entry.file_name();
        let level_asts = asts_path.join(&level);
        let level_code = code_path.join(&level);

        let grouped = read_grouping(&level_code.join("grouped_files.json"))?;
        let id_to_combination = read_id_to_combination(&level_asts.join("id_to_combination.json"))?;

        for (ast_id_str, node_ids) in &id_to_combination {
            let Ok(ast_id) = ast_id_str.parse::<u32>() else { continue };
            let combo: MutationSiteSet = node_ids.iter().copied().map(NodeId).collect();
            let ast_path = level_asts.join(format!("ast__{}.json", ast_id_str));

            if grouped.passings.contains(&ast_id) && !passings.contains(&combo) {
                passings.push(combo.clone());
                pc2ap.entry(combo).or_default().push(ast_path);
            } else if grouped.failings.contains(&ast_id) && !failings.contains(&combo) {
                failings.push(combo.clone());
                fc2ap.entry(combo).or_default().push(ast_path);
            }
        }
    }

    Ok((passings, failings, pc2ap, fc2ap))
}

fn get_r1(all_combinations: &[MutationSiteSet]) -> Vec<MutationSiteSet> {
    all_combinations.iter().filter(|c| c.len() == 1).cloned().collect()
}

fn get_finite_union(sets: &[MutationSiteSet]) -> MutationSiteSet {
    sets.iter().fold(MutationSiteSet::new(), |mut acc, s| {
        acc.extend(s.iter().copied());
        acc
    })
}

/// Absorbs every size-1 combination unconditionally, then folds in larger
/// combinations whose ids are all still unclaimed -- anything that shares
/// a node with the running union instead goes to `for_retries` (the part
/// of the combination not yet attributable to a known node).
fn identify_from_larger_r(
    all_combinations: &[MutationSiteSet],
    r1_combinations: Vec<MutationSiteSet>,
) -> (Vec<MutationSiteSet>, Vec<MutationSiteSet>) {
    let mut finite_union = get_finite_union(&r1_combinations);
    let mut combinations = r1_combinations;
    let mut for_retries: Vec<MutationSiteSet> = Vec::new();

    for combination in all_combinations {
        if combination.is_disjoint(&finite_union) {
            if !combinations.contains(combination) {
                combinations.push(combination.clone());
                finite_union.extend(combination.iter().copied());
            }
        } else {
            let for_retry: MutationSiteSet = combination.difference(&finite_union).copied().collect();
            if !for_retry.is_empty() && !for_retries.contains(&for_retry) {
                for_retries.push(for_retry);
            }
        }
    }

    (combinations, for_retries)
}

/// Node ids that never appear in any failing (or passing) combination --
/// preserved exactly as the Python computes it, including its quirk of
/// resetting the running intersection to `mutable_node_ids.difference(..)`
/// whenever it empties out mid-scan rather than only on the first
/// iteration.
fn get_always_existing_nodes(
    all_combinations: &[MutationSiteSet],
    mutable_node_ids: &HashSet<NodeId>,
) -> Vec<MutationSiteSet> {
    let mutable: MutationSiteSet = mutable_node_ids.iter().copied().collect();
    let mut node_ids: MutationSiteSet = MutationSiteSet::new();

    for combination in all_combinations {
        node_ids = if node_ids.is_empty() {
            mutable.difference(combination).copied().collect()
        } else {
            node_ids.difference(combination).copied().collect()
        };
    }

    node_ids.into_iter().map(|id| MutationSiteSet::from([id])).collect()
}

fn join_lists_of_sets(mut l1: Vec<MutationSiteSet>, l2: Vec<MutationSiteSet>) -> Vec<MutationSiteSet> {
    for elem in l2 {
        if !l1.contains(&elem) {
            l1.push(elem);
        }
    }
    l1
}

/// Builds the retry batch: every for-retry node id not already covered by
/// `identified_nodes`, each replicated [`RETRY_MULTIPLIER`] times as its
/// own singleton combination.
fn refine_retries(for_retries: &[MutationSiteSet], identified_nodes: &[MutationSiteSet]) -> Vec<MutationSiteSet> {
    let finite_union_1 = get_finite_union(for_retries);
    let finite_union_2 = get_finite_union(identified_nodes);

    let mut unresolved: Vec<NodeId> = Vec::new();
    for node_id in &finite_union_1 {
        if !finite_union_2.contains(node_id) && !unresolved.contains(node_id) {
            unresolved.push(*node_id);
        }
    }

    let mut new_mutable_node_ids = Vec::with_capacity(unresolved.len() * RETRY_MULTIPLIER);
    for node_id in unresolved {
        for _ in 0..RETRY_MULTIPLIER {
            new_mutable_node_ids.push(MutationSiteSet::from([node_id]));
        }
    }

    new_mutable_node_ids
}

/// Re-generates the retry batch as a single `r = 1` level under
/// `asts_path`/`code_path` -- in the original, `retry` always calls
/// `test_generator` with `mutable_node_ids=[1]` purely to force its `r`
/// loop to run exactly once, so the batch lands in the same `.../1`
/// subdirectory a normal level-1 sweep would use. There is no collision
/// with Phase 1's own level-1 output here: `code_path`/`asts_path` are the
/// caller's retry-dedicated trees (`phase_2a/...` in the original),
/// entirely separate from the `phase_1/...` trees `learn` scanned its
/// input combinations from. Classifies the batch and folds any
/// newly-resolved singleton into `identified_nodes`.
fn retry(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    code_path: &Path,
    asts_path: &Path,
    new_mutable_node_ids: &[MutationSiteSet],
    identified_nodes: Vec<MutationSiteSet>,
    oracle: &dyn Oracle,
    seed: u64,
) -> Result<(Vec<MutationSiteSet>, PathIndex, PathIndex)> {
    let retry_asts = asts_path.join("1");
    let retry_code = code_path.join("1");

    phase1::run_with_combinations(walked_0, language_info, new_mutable_node_ids, &retry_asts, &retry_code, seed)?;
    oracle::group_all_programs(oracle, &retry_code)?;

    check_nodes(&retry_asts, &retry_code, new_mutable_node_ids, identified_nodes)
}

fn check_nodes(
    asts_dir: &Path,
    code_dir: &Path,
    mutable_node_ids: &[MutationSiteSet],
    mut identified_nodes: Vec<MutationSiteSet>,
) -> Result<(Vec<MutationSiteSet>, PathIndex, PathIndex)> {
    let union_ids = get_finite_union(mutable_node_ids);

    let grouped = read_grouping(&code_dir.join("grouped_files.json"))?;
    let id_to_combination = read_id_to_combination(&asts_dir.join("id_to_combination.json"))?;

    let mut pc2ap = PathIndex::new();
    let mut fc2ap = PathIndex::new();
    let mut passings: Vec<MutationSiteSet> = Vec::new();
    let mut failings: Vec<MutationSiteSet> = Vec::new();
    let mut passing_ids: MutationSiteSet = MutationSiteSet::new();

    for (ast_id_str, node_ids) in &id_to_combination {
        let Ok(ast_id) = ast_id_str.parse::<u32>() else { continue };
        let combo: MutationSiteSet = node_ids.iter().copied().map(NodeId).collect();
        let ast_path = asts_dir.join(format!("ast__{}.json", ast_id_str));

        if grouped.passings.contains(&ast_id) && !passings.contains(&combo) {
            passing_ids.extend(combo.iter().copied());
            passings.push(combo.clone());
            pc2ap.entry(combo).or_default().push(ast_path);
        } else if grouped.failings.contains(&ast_id) && !failings.contains(&combo) {
            failings.push(combo.clone());
            fc2ap.entry(combo).or_default().push(ast_path);
        }
    }

    for node_id in union_ids {
        let singleton = MutationSiteSet::from([node_id]);
        if passing_ids.contains(&node_id) && !identified_nodes.contains(&singleton) {
            identified_nodes.push(singleton);
        }
    }

    Ok((identified_nodes, pc2ap, fc2ap))
}

fn merge_dictionaries(mut base: PathIndex, extra: PathIndex) -> PathIndex {
    for (combination, paths) in extra {
        base.entry(combination).or_insert(paths);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u32]) -> MutationSiteSet {
        ids.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn get_r1_keeps_only_singletons() {
        let combos = vec![set(&[1]), set(&[2, 3]), set(&[4])];
        let r1 = get_r1(&combos);
        assert_eq!(r1, vec![set(&[1]), set(&[4])]);
    }

    #[test]
    fn identify_from_larger_r_splits_disjoint_from_overlapping() {
        let r1 = vec![set(&[2]), set(&[3]), set(&[4])];
        let all = vec![set(&[2]), set(&[3]), set(&[4]), set(&[3, 7]), set(&[5, 8])];
        let (combinations, for_retries) = identify_from_larger_r(&all, r1);
        assert!(combinations.contains(&set(&[5, 8])));
        assert!(!combinations.contains(&set(&[3, 7])));
        assert_eq!(for_retries, vec![set(&[7])]);
    }

    #[test]
    fn refine_retries_replicates_unresolved_nodes() {
        let for_retries = vec![set(&[7]), set(&[9])];
        let identified = vec![set(&[9])];
        let refined = refine_retries(&for_retries, &identified);
        assert_eq!(refined.len(), RETRY_MULTIPLIER);
        assert!(refined.iter().all(|c| *c == set(&[7])));
    }

    #[test]
    fn join_lists_of_sets_deduplicates() {
        let l1 = vec![set(&[1]), set(&[2])];
        let l2 = vec![set(&[2]), set(&[3])];
        let joined = join_lists_of_sets(l1, l2);
        assert_eq!(joined, vec![set(&[1]), set(&[2]), set(&[3])]);
    }

    #[test]
    fn get_always_existing_nodes_finds_untouched_ids() {
        let mutable: HashSet<NodeId> = [NodeId(1), NodeId(2), NodeId(3)].into_iter().collect();
        let combos = vec![set(&[1]), set(&[2])];
        let result = get_always_existing_nodes(&combos, &mutable);
        assert_eq!(result, vec![set(&[3])]);
    }
}
