//! The C abstract syntax tree.
//!
//! Nodes are a genuine tagged sum (`CNode`) rather than a dynamic
//! dictionary: a faithful port of a dict-shaped AST uses a tagged sum over
//! `_nodetype` with per-variant fields, keeping auxiliary marking data
//! (node id, mutability, mutatedness) in sidecar maps so the pristine tree
//! can always be handed to the printer untouched.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Stable pre-order identity of a node, assigned once by [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId(0)
    }
}

/// Every node carries its own id once walked. Before walking, `node_id` is
/// `NodeId(0)` on every node and must not be relied upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeHeader {
    pub node_id: NodeId,
}

/// The kind of a node, used wherever only `_nodetype` matters: the
/// handled-types allowlist, the operator dispatch table, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CNodeKind {
    FileAST,
    FuncDef,
    FuncDecl,
    ParamList,
    Decl,
    TypeDecl,
    IdentifierType,
    Typename,
    PtrDecl,
    ArrayDecl,
    Struct,
    Constant,
    ID,
    UnaryOp,
    BinaryOp,
    Assignment,
    TernaryOp,
    Cast,
    ExprList,
    FuncCall,
    Return,
    If,
    For,
    While,
    DoWhile,
    Compound,
    Label,
    Goto,
    Break,
    Continue,
    EmptyStatement,
    DeclList,
}

impl fmt::Display for CNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A node of the C abstract syntax tree.
///
/// Fields mirror the pycparser-shaped attributes the mutators inspect:
/// `Constant` carries `value`/`value_type`, operator nodes carry `op`,
/// qualified declarations carry `quals`, `IdentifierType` carries `names`,
/// and `Goto`/`Label`/`ID` carry `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CNode {
    FileAST {
        header: NodeHeader,
        leading_trivia: String,
        ext: Vec<CNode>,
    },
    FuncDef {
        header: NodeHeader,
        decl: Box<CNode>,
        body: Box<CNode>,
    },
    FuncDecl {
        header: NodeHeader,
        params: Option<Box<CNode>>,
        return_type: Box<CNode>,
    },
    ParamList {
        header: NodeHeader,
        params: Vec<CNode>,
    },
    Decl {
        header: NodeHeader,
        name: Option<String>,
        quals: Vec<String>,
        decl_type: Box<CNode>,
        init: Option<Box<CNode>>,
    },
    TypeDecl {
        header: NodeHeader,
        declname: Option<String>,
        quals: Vec<String>,
        decl_type: Box<CNode>,
    },
    IdentifierType {
        header: NodeHeader,
        names: Vec<String>,
    },
    Typename {
        header: NodeHeader,
        name: Option<String>,
        quals: Vec<String>,
        decl_type: Box<CNode>,
    },
    PtrDecl {
        header: NodeHeader,
        quals: Vec<String>,
        decl_type: Box<CNode>,
    },
    ArrayDecl {
        header: NodeHeader,
        decl_type: Box<CNode>,
        dim: Option<Box<CNode>>,
    },
    Struct {
        header: NodeHeader,
        name: Option<String>,
        decls: Option<Vec<CNode>>,
    },
    Constant {
        header: NodeHeader,
        value_type: String,
        value: String,
    },
    ID {
        header: NodeHeader,
        name: String,
    },
    UnaryOp {
        header: NodeHeader,
        op: String,
        expr: Box<CNode>,
    },
    BinaryOp {
        header: NodeHeader,
        op: String,
        left: Box<CNode>,
        right: Box<CNode>,
    },
    Assignment {
        header: NodeHeader,
        op: String,
        lvalue: Box<CNode>,
        rvalue: Box<CNode>,
    },
    TernaryOp {
        header: NodeHeader,
        cond: Box<CNode>,
        iftrue: Box<CNode>,
        iffalse: Box<CNode>,
    },
    Cast {
        header: NodeHeader,
        to_type: Box<CNode>,
        expr: Box<CNode>,
    },
    ExprList {
        header: NodeHeader,
        exprs: Vec<CNode>,
    },
    FuncCall {
        header: NodeHeader,
        name: Box<CNode>,
        args: Vec<CNode>,
    },
    Return {
        header: NodeHeader,
        expr: Option<Box<CNode>>,
    },
    If {
        header: NodeHeader,
        cond: Box<CNode>,
        iftrue: Option<Box<CNode>>,
        iffalse: Option<Box<CNode>>,
    },
    For {
        header: NodeHeader,
        init: Option<Box<CNode>>,
        cond: Option<Box<CNode>>,
        next: Option<Box<CNode>>,
        stmt: Box<CNode>,
    },
    While {
        header: NodeHeader,
        cond: Box<CNode>,
        stmt: Box<CNode>,
    },
    DoWhile {
        header: NodeHeader,
        cond: Box<CNode>,
        stmt: Box<CNode>,
    },
    Compound {
        header: NodeHeader,
        block_items: Vec<CNode>,
    },
    Label {
        header: NodeHeader,
        name: String,
        stmt: Box<CNode>,
    },
    Goto {
        header: NodeHeader,
        name: String,
    },
    Break {
        header: NodeHeader,
    },
    Continue {
        header: NodeHeader,
    },
    EmptyStatement {
        header: NodeHeader,
    },
    DeclList {
        header: NodeHeader,
        decls: Vec<CNode>,
    },
}

impl CNode {
    pub fn header(&self) -> &NodeHeader {
        match self {
            CNode::FileAST { header, .. }
            | CNode::FuncDef { header, .. }
            | CNode::FuncDecl { header, .. }
            | CNode::ParamList { header, .. }
            | CNode::Decl { header, .. }
            | CNode::TypeDecl { header, .. }
            | CNode::IdentifierType { header, .. }
            | CNode::Typename { header, .. }
            | CNode::PtrDecl { header, .. }
            | CNode::ArrayDecl { header, .. }
            | CNode::Struct { header, .. }
            | CNode::Constant { header, .. }
            | CNode::ID { header, .. }
            | CNode::UnaryOp { header, .. }
            | CNode::BinaryOp { header, .. }
            | CNode::Assignment { header, .. }
            | CNode::TernaryOp { header, .. }
            | CNode::Cast { header, .. }
            | CNode::ExprList { header, .. }
            | CNode::FuncCall { header, .. }
            | CNode::Return { header, .. }
            | CNode::If { header, .. }
            | CNode::For { header, .. }
            | CNode::While { header, .. }
            | CNode::DoWhile { header, .. }
            | CNode::Compound { header, .. }
            | CNode::Label { header, .. }
            | CNode::Goto { header, .. }
            | CNode::Break { header, .. }
            | CNode::Continue { header, .. }
            | CNode::EmptyStatement { header, .. }
            | CNode::DeclList { header, .. } => header,
        }
    }

    pub fn header_mut(&mut self) -> &mut NodeHeader {
        match self {
            CNode::FileAST { header, .. }
            | CNode::FuncDef { header, .. }
            | CNode::FuncDecl { header, .. }
            | CNode::ParamList { header, .. }
            | CNode::Decl { header, .. }
            | CNode::TypeDecl { header, .. }
            | CNode::IdentifierType { header, .. }
            | CNode::Typename { header, .. }
            | CNode::PtrDecl { header, .. }
            | CNode::ArrayDecl { header, .. }
            | CNode::Struct { header, .. }
            | CNode::Constant { header, .. }
            | CNode::ID { header, .. }
            | CNode::UnaryOp { header, .. }
            | CNode::BinaryOp { header, .. }
            | CNode::Assignment { header, .. }
            | CNode::TernaryOp { header, .. }
            | CNode::Cast { header, .. }
            | CNode::ExprList { header, .. }
            | CNode::FuncCall { header, .. }
            | CNode::Return { header, .. }
            | CNode::If { header, .. }
            | CNode::For { header, .. }
            | CNode::While { header, .. }
            | CNode::DoWhile { header, .. }
            | CNode::Compound { header, .. }
            | CNode::Label { header, .. }
            | CNode::Goto { header, .. }
            | CNode::Break { header, .. }
            | CNode::Continue { header, .. }
            | CNode::EmptyStatement { header, .. }
            | CNode::DeclList { header, .. } => header,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.header().node_id
    }

    pub fn kind(&self) -> CNodeKind {
        match self {
            CNode::FileAST { .. } => CNodeKind::FileAST,
            CNode::FuncDef { .. } => CNodeKind::FuncDef,
            CNode::FuncDecl { .. } => CNodeKind::FuncDecl,
            CNode::ParamList { .. } => CNodeKind::ParamList,
            CNode::Decl { .. } => CNodeKind::Decl,
            CNode::TypeDecl { .. } => CNodeKind::TypeDecl,
            CNode::IdentifierType { .. } => CNodeKind::IdentifierType,
            CNode::Typename { .. } => CNodeKind::Typename,
            CNode::PtrDecl { .. } => CNodeKind::PtrDecl,
            CNode::ArrayDecl { .. } => CNodeKind::ArrayDecl,
            CNode::Struct { .. } => CNodeKind::Struct,
            CNode::Constant { .. } => CNodeKind::Constant,
            CNode::ID { .. } => CNodeKind::ID,
            CNode::UnaryOp { .. } => CNodeKind::UnaryOp,
            CNode::BinaryOp { .. } => CNodeKind::BinaryOp,
            CNode::Assignment { .. } => CNodeKind::Assignment,
            CNode::TernaryOp { .. } => CNodeKind::TernaryOp,
            CNode::Cast { .. } => CNodeKind::Cast,
            CNode::ExprList { .. } => CNodeKind::ExprList,
            CNode::FuncCall { .. } => CNodeKind::FuncCall,
            CNode::Return { .. } => CNodeKind::Return,
            CNode::If { .. } => CNodeKind::If,
            CNode::For { .. } => CNodeKind::For,
            CNode::While { .. } => CNodeKind::While,
            CNode::DoWhile { .. } => CNodeKind::DoWhile,
            CNode::Compound { .. } => CNodeKind::Compound,
            CNode::Label { .. } => CNodeKind::Label,
            CNode::Goto { .. } => CNodeKind::Goto,
            CNode::Break { .. } => CNodeKind::Break,
            CNode::Continue { .. } => CNodeKind::Continue,
            CNode::EmptyStatement { .. } => CNodeKind::EmptyStatement,
            CNode::DeclList { .. } => CNodeKind::DeclList,
        }
    }

    /// Visits immediate children in the same order pycparser's `children()`
    /// would enumerate dict values: declarations before bodies, conditions
    /// before branches.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a CNode)) {
        match self {
            CNode::FileAST { ext, .. } => ext.iter().for_each(&mut f),
            CNode::FuncDef { decl, body, .. } => {
                f(decl);
                f(body);
            }
            CNode::FuncDecl {
                params,
                return_type,
                ..
            } => {
                if let Some(p) = params {
                    f(p);
                }
                f(return_type);
            }
            CNode::ParamList { params, .. } => params.iter().for_each(&mut f),
            CNode::Decl {
                decl_type, init, ..
            } => {
                f(decl_type);
                if let Some(i) = init {
                    f(i);
                }
            }
            CNode::TypeDecl { decl_type, .. } => f(decl_type),
            CNode::IdentifierType { .. } => {}
            CNode::Typename { decl_type, .. } => f(decl_type),
            CNode::PtrDecl { decl_type, .. } => f(decl_type),
            CNode::ArrayDecl { decl_type, dim, .. } => {
                f(decl_type);
                if let Some(d) = dim {
                    f(d);
                }
            }
            CNode::Struct { decls, .. } => {
                if let Some(ds) = decls {
                    ds.iter().for_each(&mut f);
                }
            }
            CNode::Constant { .. } => {}
            CNode::ID { .. } => {}
            CNode::UnaryOp { expr, .. } => f(expr),
            CNode::BinaryOp { left, right, .. } => {
                f(left);
                f(right);
            }
            CNode::Assignment { lvalue, rvalue, .. } => {
                f(lvalue);
                f(rvalue);
            }
            CNode::TernaryOp {
                cond,
                iftrue,
                iffalse,
                ..
            } => {
                f(cond);
                f(iftrue);
                f(iffalse);
            }
            CNode::Cast { to_type, expr, .. } => {
                f(to_type);
                f(expr);
            }
            CNode::ExprList { exprs, .. } => exprs.iter().for_each(&mut f),
            CNode::FuncCall { name, args, .. } => {
                f(name);
                args.iter().for_each(&mut f);
            }
            CNode::Return { expr, .. } => {
                if let Some(e) = expr {
                    f(e);
                }
            }
            CNode::If {
                cond,
                iftrue,
                iffalse,
                ..
            } => {
                f(cond);
                if let Some(t) = iftrue {
                    f(t);
                }
                if let Some(e) = iffalse {
                    f(e);
                }
            }
            CNode::For {
                init,
                cond,
                next,
                stmt,
                ..
            } => {
                if let Some(i) = init {
                    f(i);
                }
                if let Some(c) = cond {
                    f(c);
                }
                if let Some(n) = next {
                    f(n);
                }
                f(stmt);
            }
            CNode::While { cond, stmt, .. } => {
                f(cond);
                f(stmt);
            }
            CNode::DoWhile { cond, stmt, .. } => {
                f(cond);
                f(stmt);
            }
            CNode::Compound { block_items, .. } => block_items.iter().for_each(&mut f),
            CNode::Label { stmt, .. } => f(stmt),
            CNode::Goto { .. } => {}
            CNode::Break { .. } => {}
            CNode::Continue { .. } => {}
            CNode::EmptyStatement { .. } => {}
            CNode::DeclList { decls, .. } => decls.iter().for_each(&mut f),
        }
    }

    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut CNode)) {
        match self {
            CNode::FileAST { ext, .. } => ext.iter_mut().for_each(&mut f),
            CNode::FuncDef { decl, body, .. } => {
                f(decl);
                f(body);
            }
            CNode::FuncDecl {
                params,
                return_type,
                ..
            } => {
                if let Some(p) = params {
                    f(p);
                }
                f(return_type);
            }
            CNode::ParamList { params, .. } => params.iter_mut().for_each(&mut f),
            CNode::Decl {
                decl_type, init, ..
            } => {
                f(decl_type);
                if let Some(i) = init {
                    f(i);
                }
            }
            CNode::TypeDecl { decl_type, .. } => f(decl_type),
            CNode::IdentifierType { .. } => {}
            CNode::Typename { decl_type, .. } => f(decl_type),
            CNode::PtrDecl { decl_type, .. } => f(decl_type),
            CNode::ArrayDecl { decl_type, dim, .. } => {
                f(decl_type);
                if let Some(d) = dim {
                    f(d);
                }
            }
            CNode::Struct { decls, .. } => {
                if let Some(ds) = decls {
                    ds.iter_mut().for_each(&mut f);
                }
            }
            CNode::Constant { .. } => {}
            CNode::ID { .. } => {}
            CNode::UnaryOp { expr, .. } => f(expr),
            CNode::BinaryOp { left, right, .. } => {
                f(left);
                f(right);
            }
            CNode::Assignment { lvalue, rvalue, .. } => {
                f(lvalue);
                f(rvalue);
            }
            CNode::TernaryOp {
                cond,
                iftrue,
                iffalse,
                ..
            } => {
                f(cond);
                f(iftrue);
                f(iffalse);
            }
            CNode::Cast { to_type, expr, .. } => {
                f(to_type);
                f(expr);
            }
            CNode::ExprList { exprs, .. } => exprs.iter_mut().for_each(&mut f),
            CNode::FuncCall { name, args, .. } => {
                f(name);
                args.iter_mut().for_each(&mut f);
            }
            CNode::Return { expr, .. } => {
                if let Some(e) = expr {
                    f(e);
                }
            }
            CNode::If {
                cond,
                iftrue,
                iffalse,
                ..
            } => {
                f(cond);
                if let Some(t) = iftrue {
                    f(t);
                }
                if let Some(e) = iffalse {
                    f(e);
                }
            }
            CNode::For {
                init,
                cond,
                next,
                stmt,
                ..
            } => {
                if let Some(i) = init {
                    f(i);
                }
                if let Some(c) = cond {
                    f(c);
                }
                if let Some(n) = next {
                    f(n);
                }
                f(stmt);
            }
            CNode::While { cond, stmt, .. } => {
                f(cond);
                f(stmt);
            }
            CNode::DoWhile { cond, stmt, .. } => {
                f(cond);
                f(stmt);
            }
            CNode::Compound { block_items, .. } => block_items.iter_mut().for_each(&mut f),
            CNode::Label { stmt, .. } => f(stmt),
            CNode::Goto { .. } => {}
            CNode::Break { .. } => {}
            CNode::Continue { .. } => {}
            CNode::EmptyStatement { .. } => {}
            CNode::DeclList { decls, .. } => decls.iter_mut().for_each(&mut f),
        }
    }

    /// `quals` accessor for `Decl`/`Typename`, the only two variants the
    /// qualifier mutator touches. `None` for any other kind.
    pub fn quals(&self) -> Option<&[String]> {
        match self {
            CNode::Decl { quals, .. } | CNode::Typename { quals, .. } => Some(quals),
            _ => None,
        }
    }

    pub fn op(&self) -> Option<&str> {
        match self {
            CNode::UnaryOp { op, .. } | CNode::BinaryOp { op, .. } | CNode::Assignment { op, .. } => {
                Some(op)
            }
            _ => None,
        }
    }

    pub fn name_field(&self) -> Option<&str> {
        match self {
            CNode::ID { name, .. } | CNode::Goto { name, .. } | CNode::Label { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

/// Sidecar marking data produced by `classify` and updated by the
/// mutators. Kept separate from `CNode` itself so the tree handed to the
/// printer is always pristine (see module docs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkingTable {
    pub is_mutable: HashMap<NodeId, bool>,
    pub is_mutated: HashMap<NodeId, bool>,
}

impl MarkingTable {
    /// Builds a fresh table from a classifier result: every id in
    /// `mutable_ids` marked mutable, nothing yet marked mutated.
    pub fn from_mutable_ids(mutable_ids: &HashSet<NodeId>) -> Self {
        MarkingTable {
            is_mutable: mutable_ids.iter().map(|id| (*id, true)).collect(),
            is_mutated: HashMap::new(),
        }
    }

    pub fn is_mutable(&self, id: NodeId) -> bool {
        self.is_mutable.get(&id).copied().unwrap_or(false)
    }

    pub fn is_mutated(&self, id: NodeId) -> bool {
        self.is_mutated.get(&id).copied().unwrap_or(false)
    }

    pub fn set_mutated(&mut self, id: NodeId) {
        self.is_mutated.insert(id, true);
    }

    pub fn mutated_ids(&self) -> std::collections::BTreeSet<NodeId> {
        self.is_mutated
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| *k)
            .collect()
    }
}

/// A parsed-and-walked AST: the root node plus everything the walk
/// collects. `processed` becomes `true` once walked; downstream code
/// asserts this before reading `id_to_type`/`goto_labels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkedAst {
    pub root: CNode,
    pub id_to_type: HashMap<NodeId, CNodeKind>,
    pub goto_labels: HashSet<String>,
    pub node_count: u32,
    pub processed: bool,
    #[serde(default)]
    pub marking: MarkingTable,
}

struct Walker {
    next_id: u32,
    id_to_type: HashMap<NodeId, CNodeKind>,
    goto_labels: HashSet<String>,
}

impl Walker {
    fn assign(&mut self, node: &mut CNode) {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.header_mut().node_id = id;
        self.id_to_type.insert(id, node.kind());

        if let CNode::Label { name, .. } = node {
            self.goto_labels.insert(name.clone());
        }

        node.for_each_child_mut(|child| self.assign(child));
    }
}

/// Pre-order walk: assigns a strictly increasing [`NodeId`] to every node
/// starting at 0, collects the `id -> kind` map, and harvests every
/// `Label` name into `goto_labels`. The root's id is always 0.
pub fn walk(mut root: CNode) -> WalkedAst {
    let mut walker = Walker {
        next_id: 0,
        id_to_type: HashMap::new(),
        goto_labels: HashSet::new(),
    };
    walker.assign(&mut root);

    WalkedAst {
        node_count: walker.next_id,
        id_to_type: walker.id_to_type,
        goto_labels: walker.goto_labels,
        root,
        processed: true,
        marking: MarkingTable::default(),
    }
}

/// Finds the node with the given id, or `None` if absent. Used when
/// re-hydrating a mutated AST from disk to locate a particular site.
pub fn find_node(root: &CNode, target: NodeId) -> Option<&CNode> {
    if root.node_id() == target {
        return Some(root);
    }
    let mut found = None;
    root.for_each_child(|child| {
        if found.is_none() {
            found = find_node(child, target);
        }
    });
    found
}

pub fn find_node_mut(root: &mut CNode, target: NodeId) -> Option<&mut CNode> {
    if root.node_id() == target {
        return Some(root);
    }
    let mut found = None;
    root.for_each_child_mut(|child| {
        if found.is_none() {
            found = find_node_mut(child, target);
        }
    });
    found
}

/// Builds an id -> node map for fast repeated lookups (the learner
/// compares every mutated variant back to `ast_0` node by node).
pub fn map_id_to_node(root: &CNode) -> HashMap<NodeId, &CNode> {
    let mut map = HashMap::new();
    fn visit<'a>(node: &'a CNode, map: &mut HashMap<NodeId, &'a CNode>) {
        map.insert(node.node_id(), node);
        node.for_each_child(|child| visit(child, map));
    }
    visit(root, &mut map);
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_const(v: &str) -> CNode {
        CNode::Constant {
            header: NodeHeader::default(),
            value_type: "int".into(),
            value: v.into(),
        }
    }

    #[test]
    fn walk_assigns_contiguous_preorder_ids() {
        let root = CNode::Compound {
            header: NodeHeader::default(),
            block_items: vec![leaf_const("1"), leaf_const("2")],
        };
        let walked = walk(root);
        let mut ids: Vec<u32> = walked.id_to_type.keys().map(|id| id.0).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(walked.node_count, 3);
        assert_eq!(walked.root.node_id(), NodeId(0));
    }

    #[test]
    fn walk_collects_goto_labels() {
        let root = CNode::Compound {
            header: NodeHeader::default(),
            block_items: vec![CNode::Label {
                header: NodeHeader::default(),
                name: "done".into(),
                stmt: Box::new(CNode::EmptyStatement {
                    header: NodeHeader::default(),
                }),
            }],
        };
        let walked = walk(root);
        assert!(walked.goto_labels.contains("done"));
    }

    #[test]
    fn find_node_locates_by_id() {
        let root = CNode::Compound {
            header: NodeHeader::default(),
            block_items: vec![leaf_const("42")],
        };
        let walked = walk(root);
        let found = find_node(&walked.root, NodeId(1)).unwrap();
        assert!(matches!(found, CNode::Constant { value, .. } if value == "42"));
    }
}
