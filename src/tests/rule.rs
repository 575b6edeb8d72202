use super::*;
use crate::test_utils::{agent_with, int, lit, path, var};

fn succeed(_ctx: &mut Context) -> Result<FuzzyValue> {
    Ok(FuzzyValue::TRUE)
}

// ========== RULE CONSTRUCTION ==========

#[test]
fn rule_defaults() {
    let rule = Rule::from_fn(lit("foo", [var("X")]), succeed);
    assert_eq!(rule.name(), "foo(X)");
    assert_eq!(rule.functor(), &path("foo"));
    assert_eq!(rule.weight(), 1.0);
    assert!(rule.locals().is_empty());
}

#[test]
fn rule_builders() {
    let rule = Rule::from_fn(lit("foo", [var("X")]), succeed)
        .named("first")
        .with_locals(["Tmp", "Acc"])
        .with_weight(2.5);
    assert_eq!(rule.name(), "first");
    assert_eq!(rule.locals(), &[path("Tmp"), path("Acc")]);
    assert_eq!(rule.weight(), 2.5);
}

#[test]
fn closure_body_runs_against_context() {
    let agent = agent_with(Vec::new());
    let rule = Rule::from_fn(Literal::named("set"), |ctx: &mut Context| {
        ctx.set(&Path::parse("X"), int(1))?;
        Ok(FuzzyValue::new(0.75))
    });
    let mut ctx = agent.context([crate::term::Variable::new("X")]);
    let mut returns = Vec::new();

    let value = rule
        .body()
        .execute(false, &mut ctx, &[], &mut returns)
        .expect("body runs");
    assert_eq!(value, FuzzyValue::new(0.75));
    assert_eq!(ctx.value(&path("X")), Some(&int(1)));
}

struct Echo;

impl Body for Echo {
    fn execute(
        &self,
        _parallel: bool,
        _context: &mut Context,
        arguments: &[Term],
        returns: &mut Vec<Term>,
    ) -> Result<FuzzyValue> {
        returns.extend(arguments.iter().cloned());
        Ok(FuzzyValue::from_bool(!arguments.is_empty()))
    }
}

#[test]
fn custom_body_sees_arguments() {
    let agent = agent_with(Vec::new());
    let rule = Rule::new(lit("echo", [var("A")]), Echo);
    let mut ctx = agent.context([]);
    let mut returns = Vec::new();

    let value = rule
        .body()
        .execute(true, &mut ctx, &[int(3)], &mut returns)
        .expect("body runs");
    assert_eq!(value, FuzzyValue::TRUE);
    assert_eq!(returns, vec![int(3)]);
}

// ========== RULE LIBRARY ==========

#[test]
fn library_keeps_declaration_order() {
    let mut library = RuleLibrary::new();
    library.add(Rule::from_fn(lit("foo", [int(1)]), succeed).named("r1"));
    library.add(Rule::from_fn(lit("bar", [int(1)]), succeed).named("other"));
    library.add(Rule::from_fn(lit("foo", [int(2)]), succeed).named("r2"));
    library.add(Rule::from_fn(lit("foo", [var("X")]), succeed).named("r3"));

    let names: Vec<&str> = library.candidates(&path("foo")).iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["r1", "r2", "r3"]);
    assert_eq!(library.len(), 4);
    assert!(library.contains(&path("bar")));
    assert_eq!(library.functors().count(), 2);
}

#[test]
fn unknown_functor_has_no_candidates() {
    let library = RuleLibrary::new();
    assert!(library.candidates(&path("nothing")).is_empty());
    assert!(library.is_empty());
    assert_eq!(
        library.require(&path("nothing")).map(|rules| rules.len()),
        Err(Error::UndefinedFunctor(path("nothing")))
    );
}

#[test]
fn shape_index_filters_by_structure() {
    let mut library = RuleLibrary::new();
    library.add(Rule::from_fn(lit("foo", [int(1)]), succeed).named("unary"));
    library.add(Rule::from_fn(lit("foo", [int(1), int(2)]), succeed).named("binary"));
    library.add(
        Rule::from_fn(lit("foo", [Term::from(lit("g", [var("Y")]))]), succeed).named("nested"),
    );

    let goal = lit("foo", [var("Q")]);
    let names: Vec<&str> = library.with_shape(&goal).map(|r| r.name()).collect();
    assert_eq!(names, vec!["unary"]);

    let nested_goal = lit("foo", [Term::from(lit("g", [int(5)]))]);
    let names: Vec<&str> = library.with_shape(&nested_goal).map(|r| r.name()).collect();
    assert_eq!(names, vec!["nested"]);
}

// ========== SCORING ==========

#[test]
fn weight_scorer_uses_rule_weight() {
    let agent = agent_with(Vec::new());
    let rule = Rule::from_fn(Literal::named("a"), succeed).with_weight(0.25);
    assert_eq!(WeightScorer.score(&rule, &*agent), 0.25);
}
