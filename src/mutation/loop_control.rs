//! `Break`/`Continue` mutation.
//!
//! Grounded in `OtherMutator.py`'s `loop_cf_mutator`: flips a `break` into
//! a `continue` and vice versa by swapping the node's kind outright. The
//! original leaves this dispatch unwired in `other_mutators` (`Break`/
//! `Continue` fall through without a matching arm); this crate wires it in
//! since both kinds are handled-types the classifier does mark mutable.

use super::{MutationCtx, MutationOutcome, Mutator};
use crate::ast::{CNode, NodeHeader};
use rand_pcg::Pcg64;

pub struct LoopControlMutator;

impl Mutator for LoopControlMutator {
    fn is_applicable(&self, node: &CNode) -> bool {
        matches!(node, CNode::Break { .. } | CNode::Continue { .. })
    }

    fn mutate(&self, node: &mut CNode, _ctx: &MutationCtx, _rng: &mut Pcg64) -> MutationOutcome {
        let header = *node.header();
        match node {
            CNode::Break { .. } => {
                *node = CNode::Continue { header };
                MutationOutcome::Mutated("Continue".to_string())
            }
            CNode::Continue { .. } => {
                *node = CNode::Break { header };
                MutationOutcome::Mutated("Break".to_string())
            }
            _ => MutationOutcome::NoChange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageInfo;
    use std::collections::HashSet;

    #[test]
    fn break_flips_to_continue() {
        let mut node = CNode::Break {
            header: NodeHeader::default(),
        };
        let lang = LanguageInfo::load_default();
        let goto_labels = HashSet::new();
        let ctx = MutationCtx {
            language_info: &lang,
            goto_labels: &goto_labels,
        };
        let mut rng = Pcg64::new(1, 2);
        LoopControlMutator.mutate(&mut node, &ctx, &mut rng);
        assert!(matches!(node, CNode::Continue { .. }));
    }
}
