//! Per-kind mutation analyzer.
//!
//! Grounded in `NodeAnalyzer.py`: given a mutated node and its counterpart
//! in the original `ast_0`, reports the node's textual attribute value
//! both before and after mutation, for Learner B's mutation ledger.
//! `select_analyzer`'s dispatch table is reproduced as a single `match` in
//! [`analyze`]. The original's `goto_analyzer` compares a name that is
//! never defined (`ast_0_node_node_label`), a plain bug; this port
//! compares `node`'s name directly against `original`'s, the evidently
//! intended behavior (see `DESIGN.md`).

use crate::ast::CNode;

/// One node's attribute value before (`original`) and after (`mutated`,
/// `None` if unchanged) mutation, both in the same textual form the
/// mutation ledger stores.
pub struct AnalyzerResult {
    pub mutated: Option<String>,
    pub original: String,
}

/// Dispatches to the analyzer matching `node`'s kind, or `None` for kinds
/// the mutation ledger does not track (mirrors `select_analyzer`'s
/// fall-through `pass`).
pub fn analyze(node: &CNode, original: &CNode) -> Option<AnalyzerResult> {
    match node {
        CNode::Constant { value, .. } => {
            let CNode::Constant { value: original_value, .. } = original else {
                return None;
            };
            Some(changed_if_different(value, original_value))
        }
        CNode::UnaryOp { op, .. } | CNode::BinaryOp { op, .. } | CNode::Assignment { op, .. } => {
            let original_op = original.op()?;
            Some(changed_if_different(op, original_op))
        }
        CNode::IdentifierType { names, .. } => {
            let CNode::IdentifierType { names: original_names, .. } = original else {
                return None;
            };
            Some(changed_if_different(names.first()?, original_names.first()?))
        }
        CNode::Goto { name, .. } => {
            let original_name = original.name_field()?;
            Some(changed_if_different(name, original_name))
        }
        CNode::Typename { .. } | CNode::Decl { .. } => {
            let quals = node.quals()?;
            let original_quals = original.quals()?;
            if quals == original_quals {
                Some(AnalyzerResult { mutated: None, original: original_quals.join(" ") })
            } else {
                Some(AnalyzerResult {
                    mutated: Some(quals.join(" ")),
                    original: original_quals.join(" "),
                })
            }
        }
        _ => None,
    }
}

fn changed_if_different(value: &str, original: &str) -> AnalyzerResult {
    let mutated = if value != original { Some(value.to_string()) } else { None };
    AnalyzerResult { mutated, original: original.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeHeader;

    fn constant(v: &str) -> CNode {
        CNode::Constant { header: NodeHeader::default(), value_type: "int".into(), value: v.into() }
    }

    #[test]
    fn constant_analyzer_reports_change() {
        let result = analyze(&constant("99"), &constant("3")).unwrap();
        assert_eq!(result.mutated.as_deref(), Some("99"));
        assert_eq!(result.original, "3");
    }

    #[test]
    fn constant_analyzer_reports_no_change() {
        let result = analyze(&constant("3"), &constant("3")).unwrap();
        assert_eq!(result.mutated, None);
        assert_eq!(result.original, "3");
    }

    #[test]
    fn goto_analyzer_compares_names_directly() {
        let node = CNode::Goto { header: NodeHeader::default(), name: "b".into() };
        let original = CNode::Goto { header: NodeHeader::default(), name: "a".into() };
        let result = analyze(&node, &original).unwrap();
        assert_eq!(result.mutated.as_deref(), Some("b"));
        assert_eq!(result.original, "a");
    }
}
