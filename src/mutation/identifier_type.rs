//! `IdentifierType` mutation.
//!
//! Grounded in `OtherMutator.py`'s `identifier_type_mutator`: replaces the
//! primary type name with another name drawn from whichever data-type
//! family (`types2` short names, `types3` long/floating names) the current
//! name belongs to. A type whose name is in neither family is left
//! unchanged, matching the original's silent no-op.

use super::{MutationCtx, MutationOutcome, Mutator};
use crate::ast::CNode;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;

pub struct IdentifierTypeMutator;

impl Mutator for IdentifierTypeMutator {
    fn is_applicable(&self, node: &CNode) -> bool {
        matches!(node, CNode::IdentifierType { .. })
    }

    fn mutate(&self, node: &mut CNode, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
        let CNode::IdentifierType { names, .. } = node else {
            return MutationOutcome::NoChange;
        };
        debug_assert!(!names.is_empty(), "IdentifierType node must have a name");
        let Some(current) = names.first().cloned() else {
            return MutationOutcome::NoChange;
        };

        let select_from = if ctx.language_info.data_types.types2.contains(&current) {
            &ctx.language_info.data_types.types2
        } else if ctx.language_info.data_types.types3.contains(&current) {
            &ctx.language_info.data_types.types3
        } else {
            return MutationOutcome::NoChange;
        };

        let pool: Vec<&String> = select_from.iter().filter(|t| **t != current).collect();
        match pool.choose(rng) {
            Some(new_name) => {
                names[0] = (*new_name).clone();
                MutationOutcome::Mutated(names[0].clone())
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
    fn short_type_is_replaced_within_its_family() {
        let mut node = CNode::IdentifierType {
            header: NodeHeader::default(),
            names: vec!["int".into()],
        };
        let lang = LanguageInfo::load_default();
        let goto_labels = HashSet::new();
        let ctx = MutationCtx {
            language_info: &lang,
            goto_labels: &goto_labels,
        };
        let mut rng = Pcg64::new(1, 2);
        let outcome = IdentifierTypeMutator.mutate(&mut node, &ctx, &mut rng);
        assert!(outcome.is_mutated());
        if let CNode::IdentifierType { names, .. } = &node {
            assert!(lang.data_types.types2.contains(&names[0]));
            assert_ne!(names[0], "int");
        }
    }
}
