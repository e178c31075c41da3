//! Witness-suite generator for localizing C compiler miscompilations from a
//! single proof-of-concept file.
//!
//! The pipeline runs in five stages, each its own module: [`ast`] +
//! [`classify`] turn the proof-of-concept into a marked AST; [`phase1`]
//! sweeps node-id subsets looking for a pass/fail split; [`learn_a`] and
//! [`learn_b`] narrow that split down to the node ids that actually explain
//! it and the values they can take; [`phase3`] uses that knowledge to
//! generate a directed pool of passing and failing witness programs.
//! [`driver`] sequences all of it against an on-disk bug directory.

pub mod analyzer;
pub mod ast;
pub mod classify;
pub mod combinatorics;
pub mod config;
pub mod cparse;
pub mod cprint;
pub mod driver;
pub mod error;
pub mod language;
pub mod learn_a;
pub mod learn_b;
pub mod mutation;
pub mod oracle;
pub mod phase1;
pub mod phase3;
