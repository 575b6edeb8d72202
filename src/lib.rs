//! Runtime core for agent-oriented logic programs.
//!
//! - [`term`]: atoms, variables and literals with value equality and a
//!   structural hash.
//! - [`storage`] and [`mask`]: the hierarchical belief base. Masks are named
//!   nodes addressed by dotted paths; each mask holds facts and child masks in
//!   a storage.
//! - [`context`], [`rule`], [`unify`] and [`resolve`]: rule resolution. A goal
//!   is unified with every rule of its functor, bodies run in private
//!   contexts and only the first successful rule in declaration order commits
//!   its bindings.

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod fuzzy;
pub mod mask;
pub mod path;
pub mod resolve;
pub mod rule;
pub mod storage;
pub mod term;
pub mod trace;
pub mod unify;

#[cfg(test)]
pub(crate) mod test_utils;

pub use agent::{Agent, AgentBuilder, AgentCore};
pub use config::{ExecutionMode, ResolverConfig};
pub use context::Context;
pub use error::{Error, Result};
pub use fuzzy::{Defuzzify, FuzzyValue, Threshold};
pub use mask::{BeliefBase, Mask, MaskId};
pub use path::Path;
pub use resolve::{Resolution, Resolver, ResolverStats, ResolverStatsSnapshot};
pub use rule::{Body, Rule, RuleLibrary, Scorer, WeightScorer};
pub use storage::{ImmutableStorage, PlainStorage, Storage, StorageFactory, StorageId, SyncStorage};
pub use term::{Atom, Literal, Term, Variable};
