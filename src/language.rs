//! Language-info and shared-dictionary resources.
//!
//! Mirrors `CLanguage.json`/`SharedDictionary.json` from the original tool:
//! static tables the classifier and mutators consult (operator classes,
//! qualifier choices, data-type families, builtin function names, and the
//! handled-node-kind allowlist). Bundled as JSON under `resources/` and
//! loaded once at driver startup, the same way the teacher loads its own
//! static tables inline.

use crate::ast::CNodeKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_LANGUAGE_INFO_JSON: &str = include_str!("../resources/CLanguage.json");
pub const DEFAULT_SHARED_DICT_JSON: &str = include_str!("../resources/SharedDictionary.json");

/// Operator classes and data-type families consulted by the operator and
/// identifier-type mutators, plus the builtin function table the `ID`
/// mutability rule checks against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Keyed by operator class ("unary1", "binary1", "assignment", ...);
    /// each value is the pool of operator tokens in that class.
    pub operators: HashMap<String, Vec<String>>,
    pub qualifiers1: Vec<String>,
    #[serde(rename = "data-types")]
    pub data_types: DataTypes,
    /// Keyed by builtin category ("stdio", "stdlib", ...); values are the
    /// function names in that category.
    pub methods: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTypes {
    pub types2: Vec<String>,
    pub types3: Vec<String>,
}

impl LanguageInfo {
    pub fn load_default() -> Self {
        serde_json::from_str(DEFAULT_LANGUAGE_INFO_JSON)
            .expect("bundled CLanguage.json must parse")
    }

    /// Flattened pool of every operator token across all classes, used by
    /// the classifier's "operator in table" guard.
    pub fn all_operators(&self) -> HashSet<&str> {
        self.operators
            .values()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Collects every builtin function/method name into a single set (the
    /// classifier's `ID` whitelist).
    pub fn builtins(&self) -> HashSet<String> {
        self.methods.values().flatten().cloned().collect()
    }
}

/// `shared_dict["handled-types"]` — the allowlist of node kinds eligible
/// for mutation consideration at all. Anything outside this set is marked
/// `is_mutable = false` unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDict {
    #[serde(rename = "handled-types")]
    handled_types: Vec<String>,
    /// Diagnostic only: node kinds this crate's classifier does not
    /// recognize, populated by an offline scan (`collect_asts`-equivalent
    /// tooling). Never consulted at runtime.
    #[serde(rename = "unhandled-types", default)]
    pub unhandled_types: Vec<String>,
}

impl SharedDict {
    pub fn load_default() -> Self {
        serde_json::from_str(DEFAULT_SHARED_DICT_JSON).expect("bundled SharedDictionary.json must parse")
    }

    pub fn is_handled(&self, kind: CNodeKind) -> bool {
        self.handled_types.iter().any(|t| t == kind.to_string().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_language_info_parses() {
        let info = LanguageInfo::load_default();
        assert!(!info.operators.is_empty());
        assert!(!info.builtins().is_empty());
    }

    #[test]
    fn default_shared_dict_marks_constant_handled() {
        let dict = SharedDict::load_default();
        assert!(dict.is_handled(CNodeKind::Constant));
        assert!(!dict.is_handled(CNodeKind::Compound));
    }
}
