//! Constant-value mutation.
//!
//! Grounded in `ConstantMutator.py`: picks a new literal value for an
//! integer/char/float/bool constant from a fixed pool of boundary values,
//! rejection-sampling against both the node's current value and any
//! caller-supplied avoid set. The value category comes from the
//! enclosing `Decl`'s declared type when this constant is its initializer
//! (`constant_mutator`'s `parent['type']['type']['names']` branch), and
//! only from the constant's own `value_type` otherwise -- the parser
//! tags every integer/char literal `"int"` and every float literal
//! `"double"` regardless of where they appear (pycparser does the same;
//! a literal's lexical form, not its context, decides its raw type), so
//! the `Decl` lookup is what lets `char`/`unsigned char`/`_Bool`
//! initializers ever reach their own boundary-value pools.

use super::{MutationCtx, MutationOutcome, Mutator};
use crate::ast::CNode;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;
use std::collections::HashSet;

// ISO C standard (ISO/IEC 9899) integer limits.
const SCHAR_MAX: i64 = 127;
const UCHAR_MAX: i64 = 255;
const INT16_MAX: i64 = 32767;
const INT32_MAX: i64 = 2147483647;
const INT64_MAX: i64 = 9223372036854775807;

// IEEE754 double-precision boundary constants.
const FLOAT_MIN: f64 = 5e-324;
const FLOAT_MAX: f64 = 1.7976931348623157e308;

const INTEGER_TYPES: &[&str] = &[
    "int",
    "unsigned int",
    "short",
    "short int",
    "unsigned short",
    "unsigned short int",
    "long",
    "long int",
    "unsigned long",
    "unsigned long int",
];
const CHAR_TYPES: &[&str] = &["char", "unsigned char", "signed char"];
const FLOAT_TYPES: &[&str] = &["float", "double", "long double"];
const BOOL_TYPES: &[&str] = &["_Bool"];

pub struct ConstantMutator<'a> {
    pub avoid_values: &'a HashSet<i64>,
    /// This constant's immediate parent node, if any. Only a `Decl`
    /// parent changes anything (see [`decl_declared_type`]); every other
    /// kind falls back to the constant's own `value_type`, matching
    /// `constant_mutator`'s `if '_nodetype' in parent and parent['_nodetype']
    /// == 'Decl'` guard.
    pub parent: Option<&'a CNode>,
}

impl Mutator for ConstantMutator<'_> {
    fn is_applicable(&self, node: &CNode) -> bool {
        matches!(node, CNode::Constant { .. })
    }

    fn mutate(&self, node: &mut CNode, _ctx: &MutationCtx, rng: &mut Pcg64) -> MutationOutcome {
        let (own_type, value) = match node {
            CNode::Constant { value_type, value, .. } => (value_type.clone(), value.clone()),
            _ => return MutationOutcome::NoChange,
        };

        let value_type = decl_declared_type(self.parent).unwrap_or(own_type);

        let new_value = if INTEGER_TYPES.contains(&value_type.as_str()) {
            integer_mutator(&value, self.avoid_values, rng)
        } else if CHAR_TYPES.contains(&value_type.as_str()) {
            char_mutator(&value, self.avoid_values, rng)
        } else if FLOAT_TYPES.contains(&value_type.as_str()) {
            float_mutator(&value, self.avoid_values, rng)
        } else if BOOL_TYPES.contains(&value_type.as_str()) {
            Some(bool_mutator(&value))
        } else {
            None
        };

        match new_value {
            Some(v) if v != value => {
                if let CNode::Constant { value, .. } = node {
                    *value = v.clone();
                }
                MutationOutcome::Mutated(v)
            }
            _ => MutationOutcome::NoChange,
        }
    }
}

fn choose_excluding(choices: &[i64], avoid: &HashSet<i64>, current: i64, rng: &mut Pcg64) -> Option<i64> {
    let pool: Vec<i64> = choices
        .iter()
        .copied()
        .filter(|v| *v != current && !avoid.contains(v))
        .collect();
    pool.choose(rng).copied()
}

fn integer_mutator(value: &str, avoid: &HashSet<i64>, rng: &mut Pcg64) -> Option<String> {
    let current: i64 = value.parse().ok()?;
    let choices: Vec<i64> = if current < INT16_MAX + 1 {
        vec![0, 1, INT16_MAX / 2, INT16_MAX - 1, INT16_MAX, INT16_MAX + 1]
    } else if current <= INT32_MAX {
        vec![INT16_MAX, INT16_MAX + 1, INT32_MAX / 2, INT32_MAX - 1, INT32_MAX, INT32_MAX + 1]
    } else {
        vec![INT32_MAX, INT32_MAX + 1, INT64_MAX / 2, INT64_MAX - 1, INT64_MAX]
    };
    choose_excluding(&choices, avoid, current, rng).map(|v| v.to_string())
}

fn char_mutator(value: &str, avoid: &HashSet<i64>, rng: &mut Pcg64) -> Option<String> {
    let current: i64 = value.parse().ok()?;
    let choices: Vec<i64> = if current < SCHAR_MAX + 1 {
        vec![0, 1, SCHAR_MAX / 2, SCHAR_MAX - 1, SCHAR_MAX, SCHAR_MAX + 1]
    } else {
        vec![0, 1, UCHAR_MAX / 2, UCHAR_MAX - 1, UCHAR_MAX, UCHAR_MAX + 1]
    };
    choose_excluding(&choices, avoid, current, rng).map(|v| v.to_string())
}

fn float_mutator(value: &str, avoid: &HashSet<i64>, rng: &mut Pcg64) -> Option<String> {
    let current: f64 = value.parse().ok()?;
    let choices = [0.0, FLOAT_MIN, 1.0, FLOAT_MAX / 2.0, FLOAT_MAX - 1.0, FLOAT_MAX];
    let pool: Vec<f64> = choices
        .iter()
        .copied()
        .filter(|v| *v != current && !avoid.contains(&(*v as i64)))
        .collect();
    pool.choose(rng).map(|v| v.to_string())
}

fn bool_mutator(value: &str) -> String {
    if value.trim() == "1" {
        "0".to_string()
    } else {
        "1".to_string()
    }
}

/// `' '.join(parent['type']['type']['names'])` from `constant_mutator`:
/// when `parent` is a `Decl` (i.e. this constant is its `init` value),
/// drills through the declarator chain to the `IdentifierType` at its
/// core and joins its names with a space (`"unsigned int"`, `"_Bool"`,
/// ...). `None` for any other parent, including no parent at all.
fn decl_declared_type(parent: Option<&CNode>) -> Option<String> {
    let CNode::Decl { decl_type, .. } = parent? else {
        return None;
    };
    identifier_type_names(decl_type).map(|names| names.join(" "))
}

/// Unwraps `TypeDecl`/`PtrDecl`/`ArrayDecl` declarator wrapping down to
/// the `IdentifierType` they ultimately qualify.
fn identifier_type_names(node: &CNode) -> Option<&[String]> {
    match node {
        CNode::IdentifierType { names, .. } => Some(names),
        CNode::TypeDecl { decl_type, .. } | CNode::PtrDecl { decl_type, .. } | CNode::ArrayDecl { decl_type, .. } => {
            identifier_type_names(decl_type)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{walk, MarkingTable, NodeId, WalkedAst};
    use crate::classify;
    use crate::combinatorics::MutationSiteSet;
    use crate::language::{LanguageInfo, SharedDict};
    use crate::mutation::mutate_combination;

    #[test]
    fn integer_constant_is_mutated_to_a_boundary_value() {
        let mut node = CNode::Constant {
            header: crate::ast::NodeHeader::default(),
            value_type: "int".into(),
            value: "3".into(),
        };
        let lang = LanguageInfo::load_default();
        let goto_labels = Default::default();
        let ctx = MutationCtx { language_info: &lang, goto_labels: &goto_labels };
        let mut rng = Pcg64::new(1, 2);
        let avoid = HashSet::new();
        let outcome = ConstantMutator { avoid_values: &avoid, parent: None }.mutate(&mut node, &ctx, &mut rng);
        assert!(outcome.is_mutated());
        if let CNode::Constant { value, .. } = &node {
            assert_ne!(value, "3");
        }
    }

    /// Parses `source`, walks and classifies it, and returns the walked
    /// AST plus the node id of its sole `Constant` -- the shape
    /// `cparse` actually produces for a `Decl` initializer, rather than
    /// a hand-built node the real pipeline never sees.
    fn parse_and_find_constant(source: &str) -> (WalkedAst, NodeId) {
        let root = crate::cparse::parse(source).unwrap();
        let mut walked = walk(root);
        let lang = LanguageInfo::load_default();
        let dict = SharedDict::load_default();
        let builtins = lang.builtins();
        let mutable = classify::mark(&walked, &lang, &dict, &builtins);
        walked.marking = MarkingTable::from_mutable_ids(&mutable);

        let constant_id = *walked
            .id_to_type
            .iter()
            .find(|(_, kind)| **kind == crate::ast::CNodeKind::Constant)
            .map(|(id, _)| id)
            .expect("source must contain exactly one Constant");
        (walked, constant_id)
    }

    fn mutate_constant(walked: &WalkedAst, constant_id: NodeId, seed: u64) -> CNode {
        let lang = LanguageInfo::load_default();
        let ctx = MutationCtx { language_info: &lang, goto_labels: &walked.goto_labels };
        let mut root = walked.root.clone();
        let mut marking = walked.marking.clone();
        let targets = MutationSiteSet::from([constant_id]);
        let mut rng = Pcg64::new(seed, constant_id.0 as u64);

        let outcomes = mutate_combination(&mut root, &mut marking, &targets, &ctx, &mut rng);
        assert!(outcomes.get(&constant_id).unwrap().is_mutated(), "constant was not mutated");

        crate::ast::find_node(&root, constant_id).unwrap().clone()
    }

    #[test]
    fn char_initializer_draws_from_the_char_boundary_pool_via_its_decl_type() {
        let (walked, constant_id) = parse_and_find_constant("int main(){ char c = 100; return c; }");

        let mutated = mutate_constant(&walked, constant_id, 7);
        let CNode::Constant { value, .. } = mutated else { panic!("expected Constant") };
        let mutated_value: i64 = value.parse().expect("char mutator must emit an integral literal");
        assert!(
            (0..=UCHAR_MAX).contains(&mutated_value),
            "char initializer mutated out of char range: {mutated_value}"
        );
        assert_ne!(mutated_value, 32768, "char initializer fell back to the int boundary pool");
    }

    #[test]
    fn bool_initializer_flips_via_its_decl_type() {
        let (walked, constant_id) = parse_and_find_constant("int main(){ _Bool ok = 1; return ok; }");

        let mutated = mutate_constant(&walked, constant_id, 3);
        let CNode::Constant { value, .. } = mutated else { panic!("expected Constant") };
        assert_eq!(value, "0");
    }
}
