//! Per-node-kind mutators.
//!
//! `Mutator` generalizes the teacher's `Mutation` trait (`is_mutation_point`
//! / `mutate_randomly`) from Solidity text-splice mutation to structured
//! edits on a `CNode`. Dispatch mirrors `select_mutator` in the original:
//! `Constant` goes to [`constant::ConstantMutator`], `UnaryOp`/`BinaryOp`/
//! `Assignment` go to [`operator::OperatorMutator`], and every other
//! handled kind goes to the matching "other" mutator.

mod constant;
mod goto;
mod identifier_type;
mod loop_control;
mod operator;
mod qualifier;

pub use constant::ConstantMutator;
pub use goto::GotoMutator;
pub use identifier_type::IdentifierTypeMutator;
pub use loop_control::LoopControlMutator;
pub use operator::OperatorMutator;
pub use qualifier::QualifierMutator;

use crate::ast::{CNode, MarkingTable, NodeId};
use crate::combinatorics::MutationSiteSet;
use crate::language::LanguageInfo;
use rand_pcg::Pcg64;
use std::collections::{HashMap, HashSet};

/// Shared context every mutator needs: the static language tables and the
/// set of label names a `Goto` may legally target.
pub struct MutationCtx<'a> {
    pub language_info: &'a LanguageInfo,
    pub goto_labels: &'a HashSet<String>,
}

/// Result of attempting a mutation: either the node's new attribute value
/// in textual form (for ledger bookkeeping), or a signal that no legal
/// alternative existed and the node was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Mutated(String),
    NoChange,
}

impl MutationOutcome {
    pub fn is_mutated(&self) -> bool {
        matches!(self, MutationOutcome::Mutated(_))
    }
}

pub trait Mutator {
    /// Whether this mutator applies to `node` at all (a coarser check than
    /// the classifier's `is_mutable`: the classifier decides "eligible
    /// site", this decides "this mutator's kind matches").
    fn is_applicable(&self, node: &CNode) -> bool;

    /// Mutates `node` in place, returning whether a change was made.
    fn mutate(&self, node: &mut CNode, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome;
}

/// Dispatches a single node to its matching mutator, mirroring
/// `select_mutator`. `avoid_values` carries the constant mutator's
/// rejection set forward across retries for the same node (the original
/// seeds it with the node's own current value). `parent` is the node's
/// immediate parent in the tree, if any -- only [`ConstantMutator`] reads
/// it, to resolve its value category from an enclosing `Decl`'s declared
/// type (`constant_mutator`'s `parent['type']['type']['names']` lookup).
pub fn apply_mutation(
    node: &mut CNode,
    parent: Option<&CNode>,
    ctx: &MutationCtx,
    rng: &mut Pcg64,
    avoid_values: &HashSet<i64>,
) -> MutationOutcome {
    match node {
        CNode::Constant { .. } => ConstantMutator { avoid_values, parent }.mutate(node, ctx, rng),
        CNode::UnaryOp { .. } | CNode::BinaryOp { .. } | CNode::Assignment { .. } => {
            OperatorMutator.mutate(node, ctx, rng)
        }
        CNode::Decl { .. } | CNode::Typename { .. } => QualifierMutator.mutate(node, ctx, rng),
        CNode::IdentifierType { .. } => IdentifierTypeMutator.mutate(node, ctx, rng),
        CNode::Goto { .. } => GotoMutator.mutate(node, ctx, rng),
        CNode::Continue { .. } | CNode::Break { .. } => LoopControlMutator.mutate(node, ctx, rng),
        _ => MutationOutcome::NoChange,
    }
}

/// Applies mutation to every node id in `targets` that `marking` judges
/// mutable, mirroring `ast_mutator`/`node_mutator`'s node-id-targeted
/// traversal -- generalized, unlike the original, to actually track which
/// target nodes changed (the Python discards each recursive call's return
/// value via `_ = node_mutator(...)`, so its reported `is_mutated` reduces
/// to whatever the very last visited node happened to return). Marks
/// `marking.is_mutated` for every node that changed and returns the
/// per-target outcome map, which callers use both to decide "did this
/// combination produce a distinct variant" (phase1) and to build the
/// per-node mutation ledger (learn_b).
pub fn mutate_combination(
    root: &mut CNode,
    marking: &mut MarkingTable,
    targets: &MutationSiteSet,
    ctx: &MutationCtx,
    rng: &mut Pcg64,
) -> HashMap<NodeId, MutationOutcome> {
    let mut outcomes = HashMap::new();
    visit_mut(root, None, targets, marking, ctx, rng, &mut outcomes);
    outcomes
}

fn visit_mut(
    node: &mut CNode,
    parent: Option<&CNode>,
    targets: &MutationSiteSet,
    marking: &mut MarkingTable,
    ctx: &MutationCtx,
    rng: &mut Pcg64,
    outcomes: &mut HashMap<NodeId, MutationOutcome>,
) {
    let id = node.node_id();
    if targets.contains(&id) && marking.is_mutable(id) {
        let avoid_values: HashSet<i64> = match node {
            CNode::Constant { value, .. } => value.parse().ok().into_iter().collect(),
            _ => HashSet::new(),
        };
        let outcome = apply_mutation(node, parent, ctx, rng, &avoid_values);
        if outcome.is_mutated() {
            marking.set_mutated(id);
        }
        outcomes.insert(id, outcome);
    }

    // Only a `Decl` parent ever changes a child's mutation (the enclosing-
    // declared-type override `ConstantMutator` reads); every other parent
    // kind is equivalent to none for every mutator, so only a `Decl` is
    // worth snapshotting before its children are visited mutably.
    let decl_parent = matches!(node, CNode::Decl { .. }).then(|| node.clone());
    node.for_each_child_mut(|child| visit_mut(child, decl_parent.as_ref(), targets, marking, ctx, rng, outcomes));
}

/// Whether any node touched by [`mutate_combination`]'s outcome map
/// actually changed -- the aggregate signal `phase1`/`phase3` need to
/// decide whether a combination produced a distinct variant worth writing.
pub fn any_mutated(outcomes: &HashMap<NodeId, MutationOutcome>) -> bool {
    outcomes.values().any(MutationOutcome::is_mutated)
}
