//! Terms: atoms, variables and literals.
//!
//! All terms are immutable once built. Literals keep their values and
//! annotations behind `Arc`s, so binding variables, re-prefixing a functor or
//! taking a shallow copy produces a new literal that shares the untouched
//! sub-terms with the original.

use crate::context::Context;
use crate::error::Result;
use crate::path::Path;
use hashbrown::HashMap;
use ordered_float::OrderedFloat;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shape hash shared by every non-literal value.
const LEAF_SHAPE: u64 = 0x9E37_79B9_7F4A_7C15;

/// An immutable scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(Arc<str>),
}

impl Atom {
    fn deep_copy(&self) -> Atom {
        match self {
            Atom::Str(s) => Atom::Str(Arc::from(s.as_ref())),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Bool(b) => write!(f, "{}", b),
            Atom::Int(n) => write!(f, "{}", n),
            Atom::Float(x) => write!(f, "{}", x.0),
            Atom::Str(s) => write!(f, "{:?}", s.as_ref()),
        }
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Atom::Bool(value)
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Int(value)
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(OrderedFloat(value))
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Str(Arc::from(value))
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Atom::Str(Arc::from(value))
    }
}

/// A named slot that may hold a value.
///
/// The wildcard `_` accepts every assignment and keeps none of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: Path,
    value: Option<Arc<Term>>,
    wildcard: bool,
}

impl Variable {
    pub const WILDCARD: &'static str = "_";

    /// An unbound variable.
    pub fn new(name: impl Into<Path>) -> Self {
        let name = name.into();
        let wildcard = name.len() == 1 && name.first() == Some(Self::WILDCARD);
        Self {
            name,
            value: None,
            wildcard,
        }
    }

    /// A variable already holding `value` (a wildcard stays empty).
    pub fn bound(name: impl Into<Path>, value: impl Into<Term>) -> Self {
        let mut var = Self::new(name);
        var.set(value.into());
        var
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Term> {
        self.value.as_deref()
    }

    /// Assign a value. Returns false for the wildcard, which never stores one.
    pub fn set(&mut self, value: Term) -> bool {
        if self.wildcard {
            return false;
        }
        self.value = Some(Arc::new(value));
        true
    }

    pub fn unset(&mut self) {
        self.value = None;
    }

    fn deep_copy(&self) -> Variable {
        Self {
            name: self.name.clone(),
            value: self.value.as_ref().map(|v| Arc::new(v.deep_copy())),
            wildcard: self.wildcard,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A term is an atom, a variable or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Atom(Atom),
    Variable(Variable),
    Literal(Literal),
}

impl Term {
    pub fn atom(value: impl Into<Atom>) -> Self {
        Term::Atom(value.into())
    }

    pub fn var(name: impl Into<Path>) -> Self {
        Term::Variable(Variable::new(name))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// True when no unbound variable (wildcards included) occurs in the term.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Atom(_) => true,
            Term::Variable(v) => v.value().map_or(false, Term::is_ground),
            Term::Literal(l) => l.values().iter().all(Term::is_ground),
        }
    }

    /// Shape-only hash. Atoms and variables all share one leaf shape.
    pub fn structure_hash(&self) -> u64 {
        match self {
            Term::Literal(l) => l.structure_hash(),
            Term::Atom(_) | Term::Variable(_) => LEAF_SHAPE,
        }
    }

    /// Recursive copy that shares nothing with `self`.
    pub fn deep_copy(&self) -> Term {
        match self {
            Term::Atom(a) => Term::Atom(a.deep_copy()),
            Term::Variable(v) => Term::Variable(v.deep_copy()),
            Term::Literal(l) => Term::Literal(l.deep_copy()),
        }
    }

    fn bind(&self, context: &Context) -> Result<Term> {
        match self {
            Term::Atom(_) => Ok(self.clone()),
            Term::Variable(v) if v.is_wildcard() => Ok(self.clone()),
            Term::Variable(v) => Ok(Term::Variable(context.variable(v.name())?.clone())),
            Term::Literal(l) => Ok(Term::Literal(l.bind(context)?)),
        }
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        match self {
            Term::Atom(_) => {}
            Term::Variable(v) => out.push(v),
            Term::Literal(l) => {
                for value in l.values() {
                    value.collect_variables(out);
                }
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(a) => write!(f, "{}", a),
            Term::Variable(v) => write!(f, "{}", v),
            Term::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<Atom> for Term {
    fn from(value: Atom) -> Self {
        Term::Atom(value)
    }
}

impl From<Variable> for Term {
    fn from(value: Variable) -> Self {
        Term::Variable(value)
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::atom(value)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::atom(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::atom(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::atom(value)
    }
}

/// A fact or goal: functor, ordered values, annotations and two flags.
///
/// Equality covers functor, negation, the `@` flag and the ordered values.
/// Annotations are carried along but do not take part in equality.
#[derive(Debug, Clone)]
pub struct Literal {
    functor: Path,
    negated: bool,
    at: bool,
    values: Arc<[Term]>,
    annotations: Arc<[Term]>,
}

impl Literal {
    pub fn new(functor: impl Into<Path>, values: impl IntoIterator<Item = Term>) -> Self {
        Self {
            functor: functor.into(),
            negated: false,
            at: false,
            values: values.into_iter().collect(),
            annotations: Arc::from(Vec::<Term>::new()),
        }
    }

    /// A literal without values.
    pub fn named(functor: impl Into<Path>) -> Self {
        Self::new(functor, Vec::new())
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn at(mut self, at: bool) -> Self {
        self.at = at;
        self
    }

    /// Replace the annotation set. Duplicates are dropped, first one wins.
    pub fn annotated(mut self, annotations: impl IntoIterator<Item = Term>) -> Self {
        let mut unique: Vec<Term> = Vec::new();
        for annotation in annotations {
            if !unique.contains(&annotation) {
                unique.push(annotation);
            }
        }
        self.annotations = unique.into();
        self
    }

    pub fn functor(&self) -> &Path {
        &self.functor
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_at(&self) -> bool {
        self.at
    }

    pub fn values(&self) -> &[Term] {
        &self.values
    }

    pub fn annotations(&self) -> &[Term] {
        &self.annotations
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Literal values grouped by their own functor, in value order.
    pub fn keyed_values(&self) -> HashMap<&Path, Vec<&Literal>> {
        let mut keyed: HashMap<&Path, Vec<&Literal>> = HashMap::new();
        for literal in self.values.iter().filter_map(Term::as_literal) {
            keyed.entry(literal.functor()).or_default().push(literal);
        }
        keyed
    }

    /// Literal values whose functor is `functor`.
    pub fn values_of<'a>(&'a self, functor: &'a Path) -> impl Iterator<Item = &'a Literal> + 'a {
        self.values
            .iter()
            .filter_map(Term::as_literal)
            .filter(move |l| l.functor() == functor)
    }

    /// Every variable in the ordered values, depth first, in order.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut out = Vec::new();
        for value in self.values.iter() {
            value.collect_variables(&mut out);
        }
        out
    }

    pub fn has_variable(&self) -> bool {
        !self.variables().is_empty()
    }

    /// Replace every variable by its binding in `context`.
    ///
    /// Fails with `UnknownVariable` when a variable is missing from the
    /// context: that means the literal is bound against the wrong context.
    pub fn bind(&self, context: &Context) -> Result<Literal> {
        if !self.has_variable() {
            return Ok(self.clone());
        }
        let values = self
            .values
            .iter()
            .map(|v| v.bind(context))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            functor: self.functor.clone(),
            negated: self.negated,
            at: self.at,
            values: values.into(),
            annotations: Arc::clone(&self.annotations),
        })
    }

    /// Same functor, flags and annotations over new values.
    pub(crate) fn with_values(&self, values: Vec<Term>) -> Literal {
        Self {
            values: values.into(),
            ..self.clone()
        }
    }

    /// Same literal with `prefix` put in front of the functor.
    pub fn with_prefix(&self, prefix: &Path) -> Literal {
        self.with_functor(self.functor.prepend(prefix))
    }

    /// Same literal under another functor. Values and annotations are shared.
    pub fn with_functor(&self, functor: Path) -> Literal {
        Self {
            functor,
            ..self.clone()
        }
    }

    /// New literal handle sharing every sub-term with `self`.
    pub fn shallow_copy(&self) -> Literal {
        self.clone()
    }

    /// Recursive copy that shares no sub-term with `self`.
    pub fn deep_copy(&self) -> Literal {
        let values: Vec<Term> = self.values.iter().map(Term::deep_copy).collect();
        let annotations: Vec<Term> = self.annotations.iter().map(Term::deep_copy).collect();
        Self {
            functor: Path::from_segments(self.functor.segments()),
            negated: self.negated,
            at: self.at,
            values: values.into(),
            annotations: annotations.into(),
        }
    }

    /// True when both handles share the same value and annotation storage.
    pub fn same_instance(&self, other: &Literal) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
            && Arc::ptr_eq(&self.annotations, &other.annotations)
    }

    /// Hash of functor text, negation, arity and nested literal shapes.
    ///
    /// Two literals that differ only in atom values or variable bindings get
    /// the same hash. Use it to pre-filter, then confirm with `same_shape`.
    pub fn structure_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for segment in self.functor.segments() {
            hasher.write(segment.as_bytes());
            hasher.write_u8(0xff);
        }
        hasher.write_u8(self.negated as u8);
        hasher.write_usize(self.values.len());
        for value in self.values.iter() {
            hasher.write_u64(value.structure_hash());
        }
        hasher.finish()
    }

    /// Structural comparison matching `structure_hash`.
    pub fn same_shape(&self, other: &Literal) -> bool {
        self.functor == other.functor
            && self.negated == other.negated
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|pair| match pair {
                    (Term::Literal(a), Term::Literal(b)) => a.same_shape(b),
                    (Term::Literal(_), _) | (_, Term::Literal(_)) => false,
                    _ => true,
                })
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.functor == other.functor
            && self.negated == other.negated
            && self.at == other.at
            && self.values == other.values
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.functor.hash(state);
        self.negated.hash(state);
        self.at.hash(state);
        self.values.hash(state);
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("~")?;
        }
        if self.at {
            f.write_str("@")?;
        }
        write!(f, "{}", self.functor)?;
        write_list(f, &self.values, '(', ')')?;
        write_list(f, &self.annotations, '[', ']')
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, terms: &[Term], open: char, close: char) -> fmt::Result {
    if terms.is_empty() {
        return Ok(());
    }
    write!(f, "{}", open)?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", term)?;
    }
    write!(f, "{}", close)
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
