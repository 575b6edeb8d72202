//! The agent handle the resolver calls back into.

use crate::config::ResolverConfig;
use crate::context::Context;
use crate::error::Result;
use crate::fuzzy::{Defuzzify, Threshold};
use crate::mask::BeliefBase;
use crate::resolve::Resolver;
use crate::rule::{Rule, RuleLibrary, Scorer, WeightScorer};
use crate::term::{Literal, Variable};
use parking_lot::RwLock;
use std::sync::Arc;

/// Capabilities an agent exposes to rule resolution.
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Rule library, functor to candidate rules.
    fn rules(&self) -> &RuleLibrary;

    fn defuzzifier(&self) -> &dyn Defuzzify;

    fn scorer(&self) -> &dyn Scorer;

    fn resolver(&self) -> &Resolver;

    /// The agent's belief base. Bodies lock it for the shortest span they can.
    fn beliefbase(&self) -> &RwLock<BeliefBase>;
}

/// Plain agent holding its services by value.
pub struct AgentCore {
    name: String,
    rules: RuleLibrary,
    beliefbase: RwLock<BeliefBase>,
    defuzzifier: Box<dyn Defuzzify>,
    scorer: Box<dyn Scorer>,
    resolver: Resolver,
}

impl AgentCore {
    pub fn builder(name: &str) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// Context for running `goal` from the top level: one unbound variable per
    /// variable of the goal.
    pub fn context_for(self: &Arc<Self>, goal: &Literal) -> Context {
        Context::for_literal(Arc::clone(self) as Arc<dyn Agent>, self.name.as_str(), goal)
    }

    /// Empty context with the given variables.
    pub fn context(self: &Arc<Self>, variables: impl IntoIterator<Item = Variable>) -> Context {
        Context::new(Arc::clone(self) as Arc<dyn Agent>, self.name.as_str(), variables)
    }
}

impl Agent for AgentCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn rules(&self) -> &RuleLibrary {
        &self.rules
    }

    fn defuzzifier(&self) -> &dyn Defuzzify {
        self.defuzzifier.as_ref()
    }

    fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn beliefbase(&self) -> &RwLock<BeliefBase> {
        &self.beliefbase
    }
}

pub struct AgentBuilder {
    name: String,
    rules: RuleLibrary,
    beliefbase: Option<BeliefBase>,
    defuzzifier: Box<dyn Defuzzify>,
    scorer: Box<dyn Scorer>,
    config: ResolverConfig,
}

impl AgentBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: RuleLibrary::new(),
            beliefbase: None,
            defuzzifier: Box::new(Threshold::default()),
            scorer: Box::new(WeightScorer),
            config: ResolverConfig::default(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.add(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        for rule in rules {
            self.rules.add(rule);
        }
        self
    }

    pub fn beliefbase(mut self, beliefbase: BeliefBase) -> Self {
        self.beliefbase = Some(beliefbase);
        self
    }

    pub fn defuzzifier(mut self, defuzzifier: impl Defuzzify + 'static) -> Self {
        self.defuzzifier = Box::new(defuzzifier);
        self
    }

    pub fn scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the agent. Without an explicit belief base, a fresh one named
    /// `beliefbase` is created with the configured separator.
    pub fn build(self) -> Result<Arc<AgentCore>> {
        self.config.validate()?;
        let beliefbase = match self.beliefbase {
            Some(beliefbase) => beliefbase,
            None => BeliefBase::new("beliefbase")?.with_separator(self.config.separator),
        };
        Ok(Arc::new(AgentCore {
            name: self.name,
            rules: self.rules,
            beliefbase: RwLock::new(beliefbase),
            defuzzifier: self.defuzzifier,
            scorer: self.scorer,
            resolver: Resolver::new(self.config),
        }))
    }
}
