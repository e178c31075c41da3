//! Mutability classifier.
//!
//! Decides, for every node in a walked AST, whether it is a legal mutation
//! site. The policy is a direct port of `mark`/`mark_mutable_nodes`: nodes
//! outside the handled-kind allowlist are immediately excluded, then a
//! handful of per-kind guards narrow the allowlist further (qualifier-less
//! declarations, short identifier-type lists, too few goto labels,
//! out-of-table operators, loop-increment slots, `printf` arguments,
//! `Constant` directly under `Return`, non-builtin `ID`s, and plain `=`
//! assignment).

use crate::ast::{CNode, CNodeKind, NodeId, WalkedAst};
use crate::language::{LanguageInfo, SharedDict};
use std::collections::HashSet;

/// Traversal-state parameters threaded explicitly through the recursive
/// visit, replacing the original's `is_loop`/`is_print` mutable state bags
/// with typed fields set and cleared around each recursive call.
#[derive(Debug, Clone, Copy, Default)]
struct ClassifyState {
    in_for_next_slot: bool,
    in_for: bool,
    in_printf_args: bool,
}

/// Runs the classifier over a walked AST and returns the set of node ids
/// judged mutable. Asserts `walked.processed` (§4.1 contract).
pub fn mark(
    walked: &WalkedAst,
    language_info: &LanguageInfo,
    shared_dict: &SharedDict,
    builtins: &HashSet<String>,
) -> HashSet<NodeId> {
    debug_assert!(walked.processed, "classify::mark requires a walked AST");

    let mut mutable_ids = HashSet::new();
    let operators = language_info.all_operators();
    visit(
        &walked.root,
        None,
        shared_dict,
        &operators,
        builtins,
        &walked.goto_labels,
        ClassifyState::default(),
        &mut mutable_ids,
    );
    mutable_ids
}

fn visit(
    node: &CNode,
    parent: Option<&CNode>,
    shared_dict: &SharedDict,
    operators: &HashSet<&str>,
    builtins: &HashSet<String>,
    goto_labels: &HashSet<String>,
    state: ClassifyState,
    mutable_ids: &mut HashSet<NodeId>,
) {
    if is_mutable(node, parent, shared_dict, operators, builtins, goto_labels, state) {
        mutable_ids.insert(node.node_id());
    }

    let mut child_state = state;
    if let CNode::For { .. } = node {
        child_state.in_for = true;
    }
    if let CNode::FuncCall { name, .. } = node {
        if matches!(name.as_ref(), CNode::ID { name, .. } if name == "printf") {
            child_state.in_printf_args = true;
        }
    }

    match node {
        CNode::For { next, .. } => {
            // Only the `next` slot of a For carries the loop-increment guard;
            // init/cond/stmt recurse with the guard off.
            if let CNode::For {
                init, cond, stmt, ..
            } = node
            {
                if let Some(i) = init {
                    visit(i, Some(node), shared_dict, operators, builtins, goto_labels, child_state, mutable_ids);
                }
                if let Some(c) = cond {
                    visit(c, Some(node), shared_dict, operators, builtins, goto_labels, child_state, mutable_ids);
                }
                if let Some(n) = next {
                    let mut next_state = child_state;
                    if child_state.in_for {
                        next_state.in_for_next_slot = true;
                    }
                    visit(n, Some(node), shared_dict, operators, builtins, goto_labels, next_state, mutable_ids);
                }
                visit(stmt, Some(node), shared_dict, operators, builtins, goto_labels, child_state, mutable_ids);
            }
        }
        _ => {
            node.for_each_child(|child| {
                visit(
                    child,
                    Some(node),
                    shared_dict,
                    operators,
                    builtins,
                    goto_labels,
                    child_state,
                    mutable_ids,
                );
            });
        }
    }
}

fn is_mutable(
    node: &CNode,
    parent: Option<&CNode>,
    shared_dict: &SharedDict,
    operators: &HashSet<&str>,
    builtins: &HashSet<String>,
    goto_labels: &HashSet<String>,
    state: ClassifyState,
) -> bool {
    if !shared_dict.is_handled(node.kind()) {
        return false;
    }

    match node {
        CNode::Decl { quals, .. } | CNode::Typename { quals, .. } if quals.is_empty() => false,
        CNode::IdentifierType { names, .. } if names.len() < 2 => false,
        CNode::Goto { .. } if goto_labels.len() < 2 => false,
        CNode::UnaryOp { op, .. } | CNode::BinaryOp { op, .. } | CNode::Assignment { op, .. }
            if !operators.contains(op.as_str()) =>
        {
            false
        }
        _ if state.in_for_next_slot => false,
        _ if state.in_printf_args => false,
        CNode::Constant { .. }
            if matches!(parent, Some(CNode::Return { .. })) =>
        {
            false
        }
        CNode::ID { name, .. } if !builtins.contains(name) => false,
        CNode::Assignment { op, .. } if op == "=" => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{walk, NodeHeader};

    fn lang() -> LanguageInfo {
        LanguageInfo::load_default()
    }

    fn dict() -> SharedDict {
        SharedDict::load_default()
    }

    #[test]
    fn decl_without_quals_is_not_mutable() {
        let decl = CNode::Decl {
            header: NodeHeader::default(),
            name: Some("x".into()),
            quals: vec![],
            decl_type: Box::new(CNode::TypeDecl {
                header: NodeHeader::default(),
                declname: Some("x".into()),
                quals: vec![],
                decl_type: Box::new(CNode::IdentifierType {
                    header: NodeHeader::default(),
                    names: vec!["int".into()],
                }),
            }),
            init: None,
        };
        let walked = walk(decl);
        let builtins = lang().builtins();
        let mutable = mark(&walked, &lang(), &dict(), &builtins);
        assert!(!mutable.contains(&walked.root.node_id()));
    }

    #[test]
    fn constant_under_return_is_excluded() {
        let ret = CNode::Return {
            header: NodeHeader::default(),
            expr: Some(Box::new(CNode::Constant {
                header: NodeHeader::default(),
                value_type: "int".into(),
                value: "1".into(),
            })),
        };
        let walked = walk(ret);
        let builtins = lang().builtins();
        let mutable = mark(&walked, &lang(), &dict(), &builtins);
        // node 0 is Return (unhandled kind), node 1 is the Constant under it.
        assert!(!mutable.contains(&NodeId(1)));
    }

    #[test]
    fn plain_assignment_is_excluded() {
        let assign = CNode::Assignment {
            header: NodeHeader::default(),
            op: "=".into(),
            lvalue: Box::new(CNode::ID {
                header: NodeHeader::default(),
                name: "x".into(),
            }),
            rvalue: Box::new(CNode::Constant {
                header: NodeHeader::default(),
                value_type: "int".into(),
                value: "1".into(),
            }),
        };
        let walked = walk(assign);
        let builtins = lang().builtins();
        let mutable = mark(&walked, &lang(), &dict(), &builtins);
        assert!(!mutable.contains(&walked.root.node_id()));
    }
}
