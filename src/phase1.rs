//! Initial variant generator (Phase 1).
//!
//! Grounded in `CInitGenerator.py` (`test_generator`/
//! `test_generator_parallelized`/`worker`). For each subset size `r` of the
//! mutable node id pool, every `r`-combination is mutated, printed, and
//! written to disk by a `rayon` worker; after each level the oracle
//! classifies everything generated so far and the stopping rule in
//! `spec.md` §4.4 decides whether to continue to `r + 1`.

use crate::ast::{NodeId, WalkedAst};
use crate::combinatorics::{self, MutationSiteSet};
use crate::cprint;
use crate::error::{NccatError, Result};
use crate::language::LanguageInfo;
use crate::mutation::{self, MutationCtx};
use crate::oracle::{self, Oracle};
use rand_pcg::Pcg64;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Mutates `ast_0` once per combination in `combinations`, writing
/// `ast__<id>.json`/`code__<id>.c` for every combination that produced a
/// distinct variant, and `id_to_combination.json` once the whole batch
/// joins (never by an individual worker, per §5's "written exactly once
/// ... by the driver, not by workers" -- here the driver is this
/// function's own post-`par_iter` step, since `rayon`'s `collect` is
/// itself the join barrier).
pub fn generate_variants(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    combinations: &[MutationSiteSet],
    asts_dir: &Path,
    code_dir: &Path,
    seed: u64,
) -> Result<HashMap<u32, MutationSiteSet>> {
    let results: Vec<Option<(u32, MutationSiteSet)>> = combinations
        .par_iter()
        .enumerate()
        .map(|(idx, combo)| {
            let ast_id = (idx + 1) as u32;
            match mutate_and_write(walked_0, language_info, combo, asts_dir, code_dir, ast_id, seed) {
                Ok(true) => Some((ast_id, combo.clone())),
                Ok(false) => None,
                Err(e) => {
                    log::warn!("variant {} dropped: {}", ast_id, e);
                    None
                }
            }
        })
        .collect();

    let id_to_combination: HashMap<u32, MutationSiteSet> = results.into_iter().flatten().collect();

    let summary: HashMap<String, Vec<u32>> = id_to_combination
        .iter()
        .map(|(id, combo)| (id.to_string(), combo.iter().map(|n| n.0).collect()))
        .collect();
    let summary_path = asts_dir.join("id_to_combination.json");
    let text = serde_json::to_string_pretty(&summary).map_err(|e| NccatError::json(&summary_path, e))?;
    fs::write(&summary_path, text).map_err(|e| NccatError::io(&summary_path, e))?;

    log::info!(
        "phase1: {} ast/code files generated out of {} possible combinations",
        id_to_combination.len(),
        combinations.len()
    );

    Ok(id_to_combination)
}

fn mutate_and_write(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    combo: &MutationSiteSet,
    asts_dir: &Path,
    code_dir: &Path,
    ast_id: u32,
    seed: u64,
) -> Result<bool> {
    let mut root = walked_0.root.clone();
    let mut marking = walked_0.marking.clone();
    let ctx = MutationCtx { language_info, goto_labels: &walked_0.goto_labels };
    let mut rng = Pcg64::new(seed, ast_id as u64);

    let outcomes = mutation::mutate_combination(&mut root, &mut marking, combo, &ctx, &mut rng);
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

/// Runs a single, pre-populated batch of combinations into fresh
/// directories (Learner A's `retry` step: re-generate exactly the
/// singleton sets refined by `refine_retries`, rather than the full
/// per-level sweep).
pub fn run_with_combinations(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    combinations: &[MutationSiteSet],
    asts_dir: &Path,
    code_dir: &Path,
    seed: u64,
) -> Result<HashMap<u32, MutationSiteSet>> {
    fs::create_dir_all(asts_dir).map_err(|e| NccatError::io(asts_dir, e))?;
    fs::create_dir_all(code_dir).map_err(|e| NccatError::io(code_dir, e))?;
    generate_variants(walked_0, language_info, combinations, asts_dir, code_dir, seed)
}

/// Sweeps subset sizes `r = 1..=mutable_ids.len()`, generating every level
/// in turn and stopping early once a level produces only passing variants
/// (the `spec.md` §4.4 stopping rule, ported from `test_generator`'s
/// `grouped_files["failings"] == [] and grouped_files["passings"]`
/// check). Returns the last level actually generated.
pub fn run(
    walked_0: &WalkedAst,
    language_info: &LanguageInfo,
    mutable_ids: &[NodeId],
    asts_root: &Path,
    code_root: &Path,
    oracle: &dyn Oracle,
    seed: u64,
) -> Result<usize> {
    let mut last_level = 0usize;

    for r in 1..=mutable_ids.len() {
        let level_asts = asts_root.join(r.to_string());
        let level_code = code_root.join(r.to_string());

        if !level_asts.exists() && !level_code.exists() {
            if r > 1 {
                let prev_code = code_root.join((r - 1).to_string());
                let grouped = oracle::group_all_programs(oracle, &prev_code)?;
                if grouped.failings.is_empty() && !grouped.passings.is_empty() {
                    break;
                }
            }
            fs::create_dir_all(&level_asts).map_err(|e| NccatError::io(&level_asts, e))?;
            fs::create_dir_all(&level_code).map_err(|e| NccatError::io(&level_code, e))?;
        }

        let combos = combinatorics::combinations(mutable_ids, r);
        log::info!("phase1: level r={}, {} combinations", r, combos.len());
        generate_variants(walked_0, language_info, &combos, &level_asts, &level_code, seed.wrapping_add(r as u64))?;

        last_level = r;
    }

    if last_level > 0 {
        let last_code = code_root.join(last_level.to_string());
        if !last_code.join("grouped_files.json").exists() {
            oracle::group_all_programs(oracle, &last_code)?;
        }
    }

    Ok(last_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{walk, CNode, MarkingTable};
    use crate::classify;
    use crate::language::SharedDict;
    use crate::oracle::Verdict;

    fn poc_ast() -> CNode {
        crate::cparse::parse("int main(){ int x = 1; return x; }").unwrap()
    }

    fn walked_with_marking() -> WalkedAst {
        let mut walked = walk(poc_ast());
        let lang = LanguageInfo::load_default();
        let dict = SharedDict::load_default();
        let builtins = lang.builtins();
        let mutable = classify::mark(&walked, &lang, &dict, &builtins);
        walked.marking = MarkingTable::from_mutable_ids(&mutable);
        walked
    }

    #[test]
    fn generate_variants_writes_ast_and_code_files() {
        let walked = walked_with_marking();
        let lang = LanguageInfo::load_default();
        let mutable_ids: Vec<NodeId> = walked
            .id_to_type
            .iter()
            .filter(|(id, _)| walked.marking.is_mutable(**id))
            .map(|(id, _)| *id)
            .collect();
        assert!(!mutable_ids.is_empty());

        let combos = combinatorics::combinations(&mutable_ids, 1);
        let dir = tempfile::tempdir().unwrap();
        let asts_dir = dir.path().join("asts");
        let code_dir = dir.path().join("code");
        fs::create_dir_all(&asts_dir).unwrap();
        fs::create_dir_all(&code_dir).unwrap();

        let written = generate_variants(&walked, &lang, &combos, &asts_dir, &code_dir, 7).unwrap();
        assert!(!written.is_empty());
        assert!(asts_dir.join("id_to_combination.json").exists());
        for id in written.keys() {
            assert!(code_dir.join(format!("code__{}.c", id)).exists());
        }
    }

    struct AlwaysPass;
    impl Oracle for AlwaysPass {
        fn classify(&self, _source_path: &Path) -> Verdict {
            Verdict::Pass
        }
    }

    #[test]
    fn run_stops_after_first_all_passing_level() {
        let walked = walked_with_marking();
        let lang = LanguageInfo::load_default();
        let mutable_ids: Vec<NodeId> = walked
            .id_to_type
            .iter()
            .filter(|(id, _)| walked.marking.is_mutable(**id))
            .map(|(id, _)| *id)
            .collect();
        assert!(mutable_ids.len() >= 2);

        let dir = tempfile::tempdir().unwrap();
        let asts_root = dir.path().join("asts");
        let code_root = dir.path().join("code");
        let oracle = AlwaysPass;

        let last_level = run(&walked, &lang, &mutable_ids, &asts_root, &code_root, &oracle, 11).unwrap();

        assert_eq!(last_level, 1);
        assert!(code_root.join("1").join("grouped_files.json").exists());
        assert!(!code_root.join("2").exists());
    }
}
