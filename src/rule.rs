//! Rules, rule bodies and the per-agent rule library.

use crate::agent::Agent;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::fuzzy::FuzzyValue;
use crate::path::Path;
use crate::term::{Literal, Term};
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// An executable rule or plan body.
///
/// The resolver treats bodies as opaque: it hands over a private context plus
/// the bound caller values and reads back a graded truth value. Bodies may
/// read and write the agent's belief base through the context.
pub trait Body: Send + Sync {
    fn execute(
        &self,
        parallel: bool,
        context: &mut Context,
        arguments: &[Term],
        returns: &mut Vec<Term>,
    ) -> Result<FuzzyValue>;
}

impl<F> Body for F
where
    F: Fn(&mut Context) -> Result<FuzzyValue> + Send + Sync,
{
    fn execute(
        &self,
        _parallel: bool,
        context: &mut Context,
        _arguments: &[Term],
        _returns: &mut Vec<Term>,
    ) -> Result<FuzzyValue> {
        self(context)
    }
}

/// One clause of a rule family: head, declared locals and body.
#[derive(Clone)]
pub struct Rule {
    name: Arc<str>,
    head: Literal,
    locals: Vec<Path>,
    weight: f64,
    body: Arc<dyn Body>,
}

impl Rule {
    pub fn new(head: Literal, body: impl Body + 'static) -> Self {
        Self {
            name: Arc::from(head.to_string()),
            head,
            locals: Vec::new(),
            weight: 1.0,
            body: Arc::new(body),
        }
    }

    /// Rule whose body is a plain closure over the body context.
    pub fn from_fn<F>(head: Literal, body: F) -> Self
    where
        F: Fn(&mut Context) -> Result<FuzzyValue> + Send + Sync + 'static,
    {
        Self::new(head, body)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Arc::from(name);
        self
    }

    /// Variables only used inside the body.
    pub fn with_locals<I, P>(mut self, locals: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Path>,
    {
        self.locals = locals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn head(&self) -> &Literal {
        &self.head
    }

    pub fn functor(&self) -> &Path {
        self.head.functor()
    }

    pub fn locals(&self) -> &[Path] {
        &self.locals
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn body(&self) -> &dyn Body {
        self.body.as_ref()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("head", &self.head)
            .field("locals", &self.locals)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Computes the score of a rule for plan ranking.
pub trait Scorer: Send + Sync {
    fn score(&self, rule: &Rule, agent: &dyn Agent) -> f64;
}

/// Scores each rule with its declared weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightScorer;

impl Scorer for WeightScorer {
    fn score(&self, rule: &Rule, _agent: &dyn Agent) -> f64 {
        rule.weight()
    }
}

/// Rules by head functor, in declaration order.
///
/// A second index keyed by the structural hash of the head finds rules whose
/// heads have the same shape; hash hits are confirmed with `same_shape`.
#[derive(Debug, Clone, Default)]
pub struct RuleLibrary {
    by_functor: HashMap<Path, Vec<Arc<Rule>>>,
    by_shape: HashMap<u64, SmallVec<[Arc<Rule>; 2]>>,
    len: usize,
}

impl RuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: Rule) -> Arc<Rule> {
        let rule = Arc::new(rule);
        self.by_functor
            .entry(rule.functor().clone())
            .or_default()
            .push(Arc::clone(&rule));
        self.by_shape
            .entry(rule.head().structure_hash())
            .or_default()
            .push(Arc::clone(&rule));
        self.len += 1;
        rule
    }

    /// Rules whose head has `functor`, in declaration order.
    pub fn candidates(&self, functor: &Path) -> &[Arc<Rule>] {
        self.by_functor
            .get(functor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Like `candidates`, for callers that need the functor to be defined.
    pub fn require(&self, functor: &Path) -> Result<&[Arc<Rule>]> {
        self.by_functor
            .get(functor)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UndefinedFunctor(functor.clone()))
    }

    /// Rules whose head has the same shape as `head`.
    pub fn with_shape<'a>(&'a self, head: &'a Literal) -> impl Iterator<Item = &'a Arc<Rule>> + 'a {
        self.by_shape
            .get(&head.structure_hash())
            .into_iter()
            .flatten()
            .filter(move |rule| rule.head().same_shape(head))
    }

    pub fn contains(&self, functor: &Path) -> bool {
        self.by_functor.contains_key(functor)
    }

    pub fn functors(&self) -> impl Iterator<Item = &Path> + '_ {
        self.by_functor.keys()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
#[path = "tests/rule.rs"]
mod tests;
