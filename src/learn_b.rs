//! Relevant-node learner, phase B.
//!
//! Grounded in `CLearning_B.py` + `NodeAnalyzer.py`: re-mutates each node
//! id combination Learner A identified `n` more times, re-classifies
//! everything, and builds the mutation ledger recording, per node, which
//! textual values were observed on the passing side versus the failing
//! side. `select_analyzer`'s dispatch now lives in `analyzer::analyze`;
//! this module only drives the sampling and bookkeeping around it.
//!
//! The original's `generate_samples` return value is thrown away and
//! reloaded from `id_to_combination.json` immediately afterward ("DEBUG"
//! in the source) -- this port just uses the in-memory result.

use crate::analyzer;
use crate::ast::{self, CNode, NodeId, WalkedAst};
use crate::combinatorics::MutationSiteSet;
use crate::error::{NccatError, Result};
use crate::language::LanguageInfo;
use crate::learn_a::PathIndex;
use crate::mutation::{self, MutationCtx};
use crate::oracle::GroupingRecord;
use crate::{cprint, phase1};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Extra variants generated per identified node set, absent an override in
/// `NccatConfig::samples_per_set`. The original hardcodes this as a local
/// `n = 5` with a "Temporary default" comment.
pub const DEFAULT_SAMPLES_PER_SET: usize = 5;

/// Caps retries per requested sample so a node set that (almost) never
/// produces a distinct mutation can't spin forever; the original risks
/// exactly that by looping on Python's global RNG without a retry bound.
const MAX_ATTEMPTS_PER_SAMPLE: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMutationRecord {
    pub passings: HashSet<String>,
    pub failings: HashSet<String>,
    pub original: Option<String>,
}

pub type MutationLedger = HashMap<MutationSiteSet, HashMap<NodeId, NodeMutationRecord>>;

pub struct LearnBOutput {
    pub ids_set_to_nodes: HashMap<MutationSiteSet, NodeGroup>,
    pub ids_set_to_mutations: MutationLedger,
}

/// Runs the full Learner B pipeline: sample, classify, fold the new
/// observations into `pc2ap`/`fc2ap`, then build the mutation ledger.
pub fn learn(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    code_path: &Path,
    asts_path: &Path,
    identified_node_ids: &[MutationSiteSet],
    mut pc2ap: PathIndex,
    mut fc2ap: PathIndex,
    oracle: &dyn crate::oracle::Oracle,
    n: usize,
    seed: u64,
) -> Result<LearnBOutput> {
    fs::create_dir_all(asts_path).map_err(|e| NccatError::io(asts_path, e))?;
    fs::create_dir_all(code_path).map_err(|e| NccatError::io(code_path, e))?;

    let id_to_combination = generate_samples(walked_0, language_info, identified_node_ids, n, asts_path, code_path, seed)?;

    let grouped = crate::oracle::group_all_programs(oracle, code_path)?;

    update_xc2aps(&grouped, &id_to_combination, asts_path, &mut pc2ap, &mut fc2ap);

    let ids_set_to_nodes = get_mutated_nodes(identified_node_ids, &pc2ap, &fc2ap)?;
    let ids_set_to_mutations = analyze_mutated_nodes(walked_0, &ids_set_to_nodes);

    Ok(LearnBOutput { ids_set_to_nodes, ids_set_to_mutations })
}

/// One identified node set's sampled nodes, split by which side of the
/// oracle's verdict the program that produced them landed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroup {
    pub passing_nodes: Vec<CNode>,
    pub failing_nodes: Vec<CNode>,
}

/// Generates `n` additional mutated variants per node set in
/// `identified_node_ids`, numbering `ast__<id>.json`/`code__<id>.c`
/// continuously across all sets starting at 0 (matching the Python's
/// running `i` counter).
fn generate_samples(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    identified_node_ids: &[MutationSiteSet],
    n: usize,
    asts_dir: &Path,
    code_dir: &Path,
    seed: u64,
) -> Result<HashMap<u32, MutationSiteSet>> {
    assert!(n > 0, "n must be > 0");

    let mut id_to_combination: HashMap<u32, MutationSiteSet> = HashMap::new();
    let mut next_id: u32 = 0;

    for nodes in identified_node_ids {
        assert!(!nodes.is_empty(), "identified node set must not be empty");

        let mut written = 0usize;
        let mut attempt = 0usize;
        while written < n && attempt < n * MAX_ATTEMPTS_PER_SAMPLE {
            attempt += 1;
            let attempt_seed = seed.wrapping_add(((next_id as u64) << 20) + attempt as u64);
            if write_sample(walked_0, language_info, nodes, asts_dir, code_dir, next_id, attempt_seed)? {
                id_to_combination.insert(next_id, nodes.clone());
                next_id += 1;
                written += 1;
            }
        }

        if written < n {
            log::warn!("learner b: only generated {}/{} samples for node set {:?}", written, n, nodes);
        }
    }

    let summary: HashMap<String, Vec<u32>> = id_to_combination
        .iter()
        .map(|(id, combo)| (id.to_string(), combo.iter().map(|n| n.0).collect()))
        .collect();
    let summary_path = asts_dir.join("id_to_combination.json");
    let text = serde_json::to_string_pretty(&summary).map_err(|e| NccatError::json(&summary_path, e))?;
    fs::write(&summary_path, text).map_err(|e| NccatError::io(&summary_path, e))?;

    Ok(id_to_combination)
}

fn write_sample(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    nodes: &MutationSiteSet,
    asts_dir: &Path,
    code_dir: &Path,
    ast_id: u32,
    seed: u64,
) -> Result<bool> {
    let mut root = walked_0.root.clone();
    let mut marking = walked_0.marking.clone();
    let ctx = MutationCtx { language_info, goto_labels: &walked_0.goto_labels };
    let mut rng = Pcg64::new(seed, ast_id as u64);

    let outcomes = mutation::mutate_combination(&mut root, &mut marking, nodes, &ctx, &mut rng);
    if !mutation::any_mutated(&outcomes) {
        return Ok(false);
    }

    let mutated = WalkedAst {
        root,
        id_to_type: walked_0.id_to_type.clone(),
        goto_labels: walked_0.goto_labels.clone(),
        node_count: walked_0.node_count,
        processed: true,
        marking,
    };

    let ast_path = asts_dir.join(format!("ast__{}.json", ast_id));
    let ast_text = serde_json::to_string_pretty(&mutated).map_err(|e| NccatError::json(&ast_path, e))?;
    fs::write(&ast_path, ast_text).map_err(|e| NccatError::io(&ast_path, e))?;

    let code_path = code_dir.join(format!("code__{}.c", ast_id));
    let code_text = cprint::print(&mutated.root);
    fs::write(&code_path, code_text).map_err(|e| NccatError::io(&code_path, e))?;

    Ok(true)
}

/// Folds every newly-sampled ast id into `pc2ap`/`fc2ap`, keyed by its
/// node set rather than the Python's `str(sorted(combination))`.
fn update_xc2aps(
    grouped: &GroupingRecord,
    id_to_combination: &HashMap<u32, MutationSiteSet>,
    asts_path: &Path,
    pc2ap: &mut PathIndex,
    fc2ap: &mut PathIndex,
) {
    for &file_id in &grouped.passings {
        if let Some(combination) = id_to_combination.get(&file_id) {
            let path = asts_path.join(format!("ast__{}.json", file_id));
            pc2ap.entry(combination.clone()).or_default().push(path);
        }
    }
    for &file_id in &grouped.failings {
        if let Some(combination) = id_to_combination.get(&file_id) {
            let path = asts_path.join(format!("ast__{}.json", file_id));
            fc2ap.entry(combination.clone()).or_default().push(path);
        }
    }
}

fn load_walked(path: &Path) -> Result<WalkedAst> {
    let text = fs::read_to_string(path).map_err(|e| NccatError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| NccatError::json(path, e))
}

/// Retrieves the actual mutated node for every id in `ids_set`, from every
/// ast path on file for that node set.
fn get_nodes(xc2ap: &PathIndex, ids_set: &MutationSiteSet) -> Result<Vec<CNode>> {
    let mut nodes = Vec::new();
    let Some(paths) = xc2ap.get(ids_set) else {
        return Ok(nodes);
    };
    for path in paths {
        let walked = load_walked(path)?;
        for node_id in ids_set {
            if let Some(node) = ast::find_node(&walked.root, *node_id) {
                nodes.push(node.clone());
            }
        }
    }
    Ok(nodes)
}

fn get_mutated_nodes(
    identified_node_ids: &[MutationSiteSet],
    pc2ap: &PathIndex,
    fc2ap: &PathIndex,
) -> Result<HashMap<MutationSiteSet, NodeGroup>> {
    let mut ids_set_to_nodes = HashMap::new();

    for ids_set in identified_node_ids {
        let passing_nodes = get_nodes(pc2ap, ids_set)?;
        let failing_nodes = get_nodes(fc2ap, ids_set)?;
        ids_set_to_nodes.insert(ids_set.clone(), NodeGroup { passing_nodes, failing_nodes });
    }

    Ok(ids_set_to_nodes)
}

/// Builds the mutation ledger: for every identified node set, for every
/// node id in it, the distinct textual values observed on the passing
/// side and on the failing side, plus the node's original value.
fn analyze_mutated_nodes(walked_0: &WalkedAst, ids_set_to_nodes: &HashMap<MutationSiteSet, NodeGroup>) -> MutationLedger {
    let ast_0_id_to_node = ast::map_id_to_node(&walked_0.root);

    let mut ids_set_to_mutations: MutationLedger = HashMap::new();

    for (ids_set, group) in ids_set_to_nodes {
        let entry = ids_set_to_mutations.entry(ids_set.clone()).or_default();

        for node in &group.passing_nodes {
            let Some(original) = ast_0_id_to_node.get(&node.node_id()).copied() else { continue };
            let record = entry.entry(node.node_id()).or_default();
            if let Some(result) = analyzer::analyze(node, original) {
                if let Some(value) = &result.mutated {
                    record.passings.insert(value.clone());
                }
                if record.original.is_none() {
                    record.original = Some(result.original);
                }
            }
        }

        for node in &group.failing_nodes {
            let Some(original) = ast_0_id_to_node.get(&node.node_id()).copied() else { continue };
            let record = entry.entry(node.node_id()).or_default();
            if let Some(result) = analyzer::analyze(node, original) {
                if let Some(value) = &result.mutated {
                    record.failings.insert(value.clone());
                }
                if record.original.is_none() {
                    record.original = Some(result.original);
                }
            }
        }
    }

    ids_set_to_mutations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{walk, MarkingTable};
    use crate::classify;
    use crate::language::SharedDict;
    use crate::oracle::{Oracle, Verdict};

    fn walked_with_marking() -> WalkedAst {
        let ast = crate::cparse::parse("int main(){ int x = 1; int y = 2; return x + y; }").unwrap();
        let mut walked = walk(ast);
        let lang = LanguageInfo::load_default();
        let dict = SharedDict::load_default();
        let builtins = lang.builtins();
        let mutable = classify::mark(&walked, &lang, &dict, &builtins);
        walked.marking = MarkingTable::from_mutable_ids(&mutable);
        walked
    }

    struct AlwaysFail;
    impl Oracle for AlwaysFail {
        fn classify(&self, _source_path: &Path) -> Verdict {
            Verdict::Fail
        }
    }

    #[test]
    fn generate_samples_writes_n_variants_per_set() {
        let walked = walked_with_marking();
        let lang = LanguageInfo::load_default();
        let mutable_ids: Vec<NodeId> = walked
            .id_to_type
            .iter()
            .filter(|(id, _)| walked.marking.is_mutable(**id))
            .map(|(id, _)| *id)
            .collect();
        assert!(!mutable_ids.is_empty());

        let nodes = MutationSiteSet::from([mutable_ids[0]]);
        let dir = tempfile::tempdir().unwrap();
        let asts_dir = dir.path().join("asts");
        let code_dir = dir.path().join("code");
        fs::create_dir_all(&asts_dir).unwrap();
        fs::create_dir_all(&code_dir).unwrap();

        let written = generate_samples(&walked, &lang, &[nodes], 3, &asts_dir, &code_dir, 42).unwrap();
        assert_eq!(written.len(), 3);
        for id in written.keys() {
            assert!(asts_dir.join(format!("ast__{}.json", id)).exists());
            assert!(code_dir.join(format!("code__{}.c", id)).exists());
        }
    }

    #[test]
    fn full_learn_b_pass_builds_a_ledger_entry() {
        let walked = walked_with_marking();
        let lang = LanguageInfo::load_default();
        let mutable_ids: Vec<NodeId> = walked
            .id_to_type
            .iter()
            .filter(|(id, _)| walked.marking.is_mutable(**id))
            .map(|(id, _)| *id)
            .collect();
        let identified = vec![MutationSiteSet::from([mutable_ids[0]])];

        let dir = tempfile::tempdir().unwrap();
        let asts_path = dir.path().join("asts");
        let code_path = dir.path().join("code");

        let oracle = AlwaysFail;
        let output = learn(
            &walked,
            &lang,
            &code_path,
            &asts_path,
            &identified,
            PathIndex::new(),
            PathIndex::new(),
            &oracle,
            2,
            7,
        )
        .unwrap();

        assert!(output.ids_set_to_mutations.contains_key(&identified[0]));
    }
}
