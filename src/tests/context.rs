use super::*;
use crate::test_utils::{agent_with, int, lit, path, setting_rule, var};

// ========== CONSTRUCTION ==========

#[test]
fn context_for_literal_declares_unbound_variables() {
    let agent = agent_with(Vec::new());
    let ctx = agent.context_for(&lit("foo", [var("X"), int(1), var("Y"), var("_")]));

    assert_eq!(ctx.len(), 2, "wildcard is never declared");
    assert!(ctx.contains(&path("X")));
    assert!(ctx.contains(&path("Y")));
    assert!(ctx.variables().all(|v| !v.is_bound()));
    assert_eq!(ctx.instance(), "agent");
}

#[test]
fn derive_keeps_agent_and_replaces_variables() {
    let agent = agent_with(Vec::new());
    let ctx = agent.context([Variable::new("X")]);
    let child = ctx.derive("rule", [Variable::bound("Y", int(3))]);

    assert_eq!(child.instance(), "rule");
    assert!(!child.contains(&path("X")));
    assert_eq!(child.value(&path("Y")), Some(&int(3)));
    assert!(Arc::ptr_eq(child.agent(), ctx.agent()));
}

// ========== VARIABLE ACCESS ==========

#[test]
fn set_assigns_declared_variable() {
    let agent = agent_with(Vec::new());
    let mut ctx = agent.context([Variable::new("X")]);

    assert_eq!(ctx.set(&path("X"), int(9)), Ok(true));
    assert_eq!(ctx.value(&path("X")), Some(&int(9)));
    assert!(ctx.variable(&path("X")).map(Variable::is_bound).unwrap_or(false));
}

#[test]
fn set_unknown_variable_fails() {
    let agent = agent_with(Vec::new());
    let mut ctx = agent.context([]);
    assert_eq!(
        ctx.set(&path("Q"), int(1)),
        Err(Error::UnknownVariable(path("Q")))
    );
    assert!(ctx.variable(&path("Q")).is_err());
    assert!(ctx.get(&path("Q")).is_none());
}

#[test]
fn declare_replaces_existing_variable() {
    let agent = agent_with(Vec::new());
    let mut ctx = agent.context([Variable::bound("X", int(1))]);
    ctx.declare(Variable::new("X"));
    ctx.declare(Variable::new("_"));

    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.value(&path("X")), None);
}

// ========== RESOLVE THROUGH THE CONTEXT ==========

#[test]
fn resolve_goes_through_agent_resolver() {
    let agent = agent_with(vec![setting_rule(lit("foo", [var("Y")]), "Y", int(7))]);
    let goal = lit("foo", [var("X")]);
    let mut ctx = agent.context_for(&goal);

    let resolution = ctx.resolve(&goal).expect("resolution runs");
    assert!(resolution.is_success());
    assert_eq!(ctx.value(&path("X")), Some(&int(7)));
}
