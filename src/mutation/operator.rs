//! Unary/binary/assignment operator mutation.
//!
//! Grounded in `OperatorMutator.py`: swaps an operator token for another
//! token drawn from the same operator class, excluding the current token.
//! Unary `*`, `&`, and `!` are never mutated (pointer/address/negation
//! operators whose replacement would almost always fail to parse as the
//! same expression shape). Plain `=` assignment is excluded by the
//! classifier already, so [`assignment_mutator`] never sees it, but keeps
//! the guard for defense in depth.

use super::{MutationCtx, MutationOutcome, Mutator};
use crate::ast::CNode;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;

const UNARY_AVOID: &[&str] = &["*", "&", "!"];

pub struct OperatorMutator;

impl Mutator for OperatorMutator {
    fn is_applicable(&self, node: &CNode) -> bool {
        matches!(node, CNode::UnaryOp { .. } | CNode::BinaryOp { .. } | CNode::Assignment { .. })
    }

    fn mutate(&self, node: &mut CNode, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
        match node {
            CNode::UnaryOp { op, .. } => unary_mutator(op, ctx, rng),
            CNode::BinaryOp { op, .. } => binary_mutator(op, ctx, rng),
            CNode::Assignment { op, .. } => assignment_mutator(op, ctx, rng),
            _ => MutationOutcome::NoChange,
        }
    }
}

fn unary_mutator(op: &mut String, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
    if UNARY_AVOID.contains(&op.as_str()) {
        return MutationOutcome::NoChange;
    }
    swap_within_class(op, ctx, rng)
}

fn binary_mutator(op: &mut String, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
    swap_within_class(op, ctx, rng)
}

fn assignment_mutator(op: &mut String, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
    if op == "=" {
        return MutationOutcome::NoChange;
    }
    let Some(assignments) = ctx.language_info.operators.get("assignment") else {
        return MutationOutcome::NoChange;
    };
    let pool: Vec<&String> = assignments.iter().filter(|a| *a != op).collect();
    match pool.choose(rng) {
        Some(new_op) => {
            *op = (*new_op).clone();
            MutationOutcome::Mutated(op.clone())
        }
        None => MutationOutcome::NoChange,
    }
}

/// Finds the operator class `op` belongs to (first match wins, mirroring
/// the original's dict-iteration order dependence) and swaps it for
/// another token in that same class.
fn swap_within_class(op: &mut String, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
    for values in ctx.language_info.operators.values() {
        if values.iter().any(|v| v == op.as_str()) {
            let pool: Vec<&String> = values.iter().filter(|v| *v != op).collect();
            if let Some(new_op) = pool.choose(rng) {
                *op = (*new_op).clone();
                return MutationOutcome::Mutated(op.clone());
            }
            return MutationOutcome::NoChange;
        }
    }
    MutationOutcome::NoChange
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeHeader;
    use crate::language::LanguageInfo;
    use std::collections::HashSet;

    #[test]
    fn pointer_dereference_is_never_mutated() {
        let mut node = CNode::UnaryOp {
            header: NodeHeader::default(),
            op: "*".into(),
            expr: Box::new(CNode::ID {
                header: NodeHeader::default(),
                name: "p".into(),
            }),
        };
        let lang = LanguageInfo::load_default();
        let goto_labels = HashSet::new();
        let ctx = MutationCtx {
            language_info: &lang,
            goto_labels: &goto_labels,
        };
        let mut rng = Pcg64::new(1, 2);
        let outcome = OperatorMutator.mutate(&mut node, &ctx, &mut rng);
        assert_eq!(outcome, MutationOutcome::NoChange);
    }

    #[test]
    fn binary_plus_swaps_to_another_arithmetic_operator() {
        let mut node = CNode::BinaryOp {
            header: NodeHeader::default(),
            op: "+".into(),
            left: Box::new(CNode::ID {
                header: NodeHeader::default(),
                name: "a".into(),
            }),
            right: Box::new(CNode::ID {
                header: NodeHeader::default(),
                name: "b".into(),
            }),
        };
        let lang = LanguageInfo::load_default();
        let goto_labels = HashSet::new();
        let ctx = MutationCtx {
            language_info: &lang,
            goto_labels: &goto_labels,
        };
        let mut rng = Pcg64::new(1, 2);
        OperatorMutator.mutate(&mut node, &ctx, &mut rng);
        if let CNode::BinaryOp { op, .. } = &node {
            assert_ne!(op, "+");
        }
    }
}
