//! `Goto` target mutation.
//!
//! Grounded in `OtherMutator.py`'s `goto_mutator`: redirects a `goto` to a
//! different label from the set collected during the walk. The classifier
//! already refuses to mark a `Goto` mutable when fewer than two labels
//! exist, so `goto_labels` here is always non-empty with at least one
//! legal alternative.

use super::{MutationCtx, MutationOutcome, Mutator};
use crate::ast::CNode;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;

pub struct GotoMutator;

impl Mutator for GotoMutator {
    fn is_applicable(&self, node: &CNode) -> bool {
        matches!(node, CNode::Goto { .. })
    }

    fn mutate(&self, node: &mut CNode, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
        let CNode::Goto { name, .. } = node else {
            return MutationOutcome::NoChange;
        };
        debug_assert!(!ctx.goto_labels.is_empty(), "goto_labels must not be empty");

        let pool: Vec<&String> = ctx.goto_labels.iter().filter(|l| *l != name).collect();
        match pool.choose(rng) {
            Some(new_label) => {
                *name = (*new_label).clone();
                MutationOutcome::Mutated(name.clone())
            }
            None => MutationOutcome::NoChange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeHeader;
    use crate::language::LanguageInfo;
    use std::collections::HashSet;

    #[test]
    fn goto_jumps_to_a_different_label() {
        let mut node = CNode::Goto {
            header: NodeHeader::default(),
            name: "start".into(),
        };
        let lang = LanguageInfo::load_default();
        let mut goto_labels = HashSet::new();
        goto_labels.insert("start".to_string());
        goto_labels.insert("done".to_string());
        let ctx = MutationCtx {
            language_info: &lang,
            goto_labels: &goto_labels,
        };
        let mut rng = Pcg64::new(1, 2);
        let outcome = GotoMutator.mutate(&mut node, &ctx, &mut rng);
        assert!(outcome.is_mutated());
        if let CNode::Goto { name, .. } = &node {
            assert_eq!(name, "done");
        }
    }
}
