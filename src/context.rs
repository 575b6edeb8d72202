//! Execution contexts: the variables one rule or plan invocation works with.

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::path::Path;
use crate::term::{Literal, Term, Variable};
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

/// Variables in scope for one execution attempt.
///
/// A context is owned by exactly one invocation. Entering a rule body derives
/// a fresh context instead of mutating the caller's, and bindings only flow
/// back through the resolver's commit step.
#[derive(Clone)]
pub struct Context {
    agent: Arc<dyn Agent>,
    instance: Arc<str>,
    variables: HashMap<Path, Variable>,
}

impl Context {
    pub fn new(
        agent: Arc<dyn Agent>,
        instance: impl Into<Arc<str>>,
        variables: impl IntoIterator<Item = Variable>,
    ) -> Self {
        Self {
            agent,
            instance: instance.into(),
            variables: collect(variables),
        }
    }

    /// Context for the variables of `literal`, all unbound.
    pub fn for_literal(agent: Arc<dyn Agent>, instance: impl Into<Arc<str>>, literal: &Literal) -> Self {
        let variables = literal
            .variables()
            .into_iter()
            .map(|v| Variable::new(v.name().clone()))
            .collect::<Vec<_>>();
        Self::new(agent, instance, variables)
    }

    /// New context for the same agent.
    pub fn derive(
        &self,
        instance: impl Into<Arc<str>>,
        variables: impl IntoIterator<Item = Variable>,
    ) -> Context {
        Self::new(Arc::clone(&self.agent), instance, variables)
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    /// Name of the rule or plan this context belongs to.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn get(&self, name: &Path) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Like `get`, but a missing name is a contract violation.
    pub fn variable(&self, name: &Path) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::UnknownVariable(name.clone()))
    }

    /// Current value of a variable, if it has one.
    pub fn value(&self, name: &Path) -> Option<&Term> {
        self.get(name).and_then(Variable::value)
    }

    /// Assign a value to a variable in scope.
    ///
    /// Returns `Ok(false)` when the variable is the wildcard.
    pub fn set(&mut self, name: &Path, value: Term) -> Result<bool> {
        let var = self
            .variables
            .get_mut(name)
            .ok_or_else(|| Error::UnknownVariable(name.clone()))?;
        Ok(var.set(value))
    }

    /// Add a variable, replacing any variable with the same name.
    pub fn declare(&mut self, variable: Variable) {
        if !variable.is_wildcard() {
            self.variables.insert(variable.name().clone(), variable);
        }
    }

    pub fn contains(&self, name: &Path) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Bind `literal` against this context and resolve it through the agent's
    /// resolver.
    pub fn resolve(&mut self, literal: &Literal) -> Result<crate::resolve::Resolution> {
        let agent = Arc::clone(&self.agent);
        agent.resolver().resolve(literal, self)
    }
}

fn collect(variables: impl IntoIterator<Item = Variable>) -> HashMap<Path, Variable> {
    variables
        .into_iter()
        .filter(|v| !v.is_wildcard())
        .map(|v| (v.name().clone(), v))
        .collect()
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("instance", &self.instance)
            .field("variables", &self.variables)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/context.rs"]
mod tests;
