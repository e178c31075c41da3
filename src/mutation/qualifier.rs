//! Type-qualifier mutation.
//!
//! Grounded in `OtherMutator.py`'s `qualifier_mutator`: each qualifier on a
//! `Decl`/`Typename` is independently replaced with a different qualifier
//! drawn from `qualifiers1`.

use super::{MutationCtx, MutationOutcome, Mutator};
use crate::ast::CNode;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;

pub struct QualifierMutator;

impl Mutator for QualifierMutator {
    fn is_applicable(&self, node: &CNode) -> bool {
        matches!(node, CNode::Decl { .. } | CNode::Typename { .. })
    }

    fn mutate(&self, node: &mut CNode, ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
        let current_quals = match node {
            CNode::Decl { quals, .. } | CNode::Typename { quals, .. } => quals.clone(),
            _ => return MutationOutcome::NoChange,
        };
        if current_quals.is_empty() || ctx.language_info.qualifiers1.is_empty() {
            return MutationOutcome::NoChange;
        }

        let mut new_quals = Vec::with_capacity(current_quals.len());
        for qual in current_quals.iter() {
            let pool: Vec<&String> = ctx
                .language_info
                .qualifiers1
                .iter()
                .filter(|q| *q != qual)
                .collect();
            match pool.choose(rng) {
                Some(new_qual) => new_quals.push((*new_qual).clone()),
                None => new_quals.push(qual.clone()),
            }
        }

        if new_quals == current_quals {
            return MutationOutcome::NoChange;
        }

        let rendered = new_quals.join(" ");
        match node {
            CNode::Decl { quals, decl_type, .. } => {
                *quals = new_quals.clone();
                mirror_into_decl_type(decl_type, &new_quals);
            }
            CNode::Typename { quals, decl_type, .. } => {
                *quals = new_quals.clone();
                mirror_into_decl_type(decl_type, &new_quals);
            }
            _ => unreachable!(),
        }
        MutationOutcome::Mutated(rendered)
    }
}

/// Mirrors a `Decl`/`Typename`'s qualifier change into the nested
/// `TypeDecl`'s own `quals` field, matching the original's
/// `node['type']['type']['quals'] = ...` side-write (pycparser duplicates
/// qualifiers on both the declarator and its type-decl).
fn mirror_into_decl_type(decl_type: &mut CNode, new_quals: &[String]) {
    if let CNode::TypeDecl { quals, .. } = decl_type {
        *quals = new_quals.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeHeader;
    use crate::language::LanguageInfo;
    use std::collections::HashSet;

    #[test]
    fn qualifiers_are_replaced_with_a_different_choice() {
        let mut node = CNode::Typename {
            header: NodeHeader::default(),
            name: None,
            quals: vec!["const".into()],
            decl_type: Box::new(CNode::IdentifierType {
                header: NodeHeader::default(),
                names: vec!["int".into()],
            }),
        };
        let lang = LanguageInfo::load_default();
        let goto_labels = HashSet::new();
        let ctx = MutationCtx {
            language_info: &lang,
            goto_labels: &goto_labels,
        };
        let mut rng = Pcg64::new(1, 2);
        let outcome = QualifierMutator.mutate(&mut node, &ctx, &mut rng);
        assert!(outcome.is_mutated());
        if let CNode::Typename { quals, .. } = &node {
            assert_ne!(quals[0], "const");
        }
    }
}
