use crate::agent::AgentCore;
use crate::config::{ExecutionMode, ResolverConfig};
use crate::context::Context;
use crate::error::Result;
use crate::fuzzy::FuzzyValue;
use crate::path::Path;
use crate::rule::Rule;
use crate::term::{Literal, Term};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) fn lit(functor: &str, values: impl IntoIterator<Item = Term>) -> Literal {
    Literal::new(functor, values)
}

pub(crate) fn int(n: i64) -> Term {
    Term::from(n)
}

pub(crate) fn var(name: &str) -> Term {
    Term::var(name)
}

pub(crate) fn path(text: &str) -> Path {
    Path::parse(text)
}

pub(crate) fn agent_with(rules: Vec<Rule>) -> Arc<AgentCore> {
    AgentCore::builder("agent")
        .rules(rules)
        .build()
        .expect("agent builds")
}

pub(crate) fn parallel_agent_with(rules: Vec<Rule>, threads: usize) -> Arc<AgentCore> {
    let config = ResolverConfig {
        mode: ExecutionMode::Parallel,
        max_threads: threads,
        ..ResolverConfig::default()
    };
    AgentCore::builder("agent")
        .rules(rules)
        .config(config)
        .build()
        .expect("agent builds")
}

/// Rule whose body counts its executions and returns `value`.
pub(crate) fn counting_rule(head: Literal, value: f64, calls: &Arc<AtomicUsize>) -> Rule {
    let calls = Arc::clone(calls);
    Rule::from_fn(head, move |_ctx: &mut Context| -> Result<FuzzyValue> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(FuzzyValue::new(value))
    })
}

/// Rule whose body sets `variable` to `value` and succeeds.
pub(crate) fn setting_rule(head: Literal, variable: &str, value: Term) -> Rule {
    let name = Path::parse(variable);
    Rule::from_fn(head, move |ctx: &mut Context| -> Result<FuzzyValue> {
        ctx.set(&name, value.clone())?;
        Ok(FuzzyValue::TRUE)
    })
}
