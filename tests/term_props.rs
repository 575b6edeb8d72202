use agentlog::mask::BeliefBase;
use agentlog::path::Path;
use agentlog::storage::{PlainStorage, Storage};
use agentlog::term::{Literal, Term};
use proptest::prelude::*;

const FUNCTOR_NAMES: [&str; 5] = ["a", "b", "f", "g", "speed"];
const VAR_NAMES: [&str; 4] = ["X", "Y", "Z", "_"];

#[derive(Clone, Debug)]
enum RawTerm {
    Int(i64),
    Str(String),
    Var(usize),
    Lit { f: usize, negated: bool, kids: Vec<RawTerm> },
}

fn raw_term_strategy() -> impl Strategy<Value = RawTerm> {
    let leaf = prop_oneof![
        (-5i64..5).prop_map(RawTerm::Int),
        "[a-c]{1,2}".prop_map(RawTerm::Str),
        (0..VAR_NAMES.len()).prop_map(RawTerm::Var),
    ];

    leaf.prop_recursive(3, 24, 3, |inner| {
        (
            0..FUNCTOR_NAMES.len(),
            any::<bool>(),
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|(f, negated, kids)| RawTerm::Lit { f, negated, kids })
    })
}

fn raw_literal_strategy() -> impl Strategy<Value = (usize, bool, Vec<RawTerm>)> {
    (
        0..FUNCTOR_NAMES.len(),
        any::<bool>(),
        prop::collection::vec(raw_term_strategy(), 0..4),
    )
}

fn build_term(raw: &RawTerm) -> Term {
    match raw {
        RawTerm::Int(n) => Term::from(*n),
        RawTerm::Str(s) => Term::from(s.as_str()),
        RawTerm::Var(i) => Term::var(VAR_NAMES[*i]),
        RawTerm::Lit { f, negated, kids } => {
            Term::from(build_literal(&(*f, *negated, kids.clone())))
        }
    }
}

fn build_literal(raw: &(usize, bool, Vec<RawTerm>)) -> Literal {
    let (f, negated, kids) = raw;
    Literal::new(FUNCTOR_NAMES[*f], kids.iter().map(build_term)).negated(*negated)
}

/// Same shape, every leaf replaced by another leaf.
fn relabel(raw: &RawTerm) -> RawTerm {
    match raw {
        RawTerm::Int(n) => RawTerm::Var((*n).rem_euclid(3) as usize),
        RawTerm::Str(_) => RawTerm::Int(42),
        RawTerm::Var(_) => RawTerm::Str("zz".to_string()),
        RawTerm::Lit { f, negated, kids } => RawTerm::Lit {
            f: *f,
            negated: *negated,
            kids: kids.iter().map(relabel).collect(),
        },
    }
}

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,5}"
}

/// Dotted functors of one to three segments.
fn functor_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..4).prop_map(|segments| segments.join("."))
}

/// Functor pairs whose 64-bit structural hashes were found to collide by
/// accident. Empty: none seen so far.
const KNOWN_COLLISIONS: &[(&str, &str)] = &[];

fn known_collision(a: &str, b: &str) -> bool {
    KNOWN_COLLISIONS
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn equal_construction_gives_equal_literals(raw in raw_literal_strategy()) {
        let a = build_literal(&raw);
        let b = build_literal(&raw);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.structure_hash(), b.structure_hash());
        prop_assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn structure_hash_ignores_leaf_values(raw in raw_literal_strategy()) {
        let (f, negated, kids) = &raw;
        let relabeled = (*f, *negated, kids.iter().map(relabel).collect::<Vec<_>>());
        let a = build_literal(&raw);
        let b = build_literal(&relabeled);
        prop_assert_eq!(a.structure_hash(), b.structure_hash());
        prop_assert!(a.same_shape(&b));
    }

    #[test]
    fn different_functors_never_share_structure_hash(
        fa in functor_strategy(),
        fb in functor_strategy(),
        va in prop::collection::vec(raw_term_strategy(), 0..4),
        vb in prop::collection::vec(raw_term_strategy(), 0..4),
        negated in any::<bool>(),
    ) {
        prop_assume!(fa != fb);
        let a = Literal::new(fa.as_str(), va.iter().map(build_term)).negated(negated);
        let b = Literal::new(fb.as_str(), vb.iter().map(build_term)).negated(negated);
        prop_assert!(
            known_collision(&fa, &fb) || a.structure_hash() != b.structure_hash(),
            "{} and {} share a structural hash",
            a,
            b
        );
    }

    #[test]
    fn deep_copy_is_equal_but_unshared(raw in raw_literal_strategy()) {
        let original = build_literal(&raw);
        let copy = original.deep_copy();
        prop_assert_eq!(&copy, &original);
        prop_assert_eq!(copy.structure_hash(), original.structure_hash());
        prop_assert!(original.shallow_copy().same_instance(&original));
    }

    #[test]
    fn path_render_parse_round_trip(segments in prop::collection::vec(segment_strategy(), 1..6)) {
        let path = Path::from_segments(&segments);
        prop_assert_eq!(Path::parse(&path.to_string()), path.clone());
        prop_assert_eq!(Path::parse_with(&path.render('/'), '/'), path);
    }

    #[test]
    fn resolve_then_fqn_path_round_trips(segments in prop::collection::vec(segment_strategy(), 1..6)) {
        let mut base = BeliefBase::new("root").expect("valid name");
        let root = base.root();
        let factory = agentlog::storage::plain_factory();
        let path = Path::from_segments(&segments);

        let id = base.resolve(root, &path, Some(&factory)).expect("created on demand");
        prop_assert_eq!(base.fqn_path(id).expect("live mask"), path.clone());
        prop_assert_eq!(base.find(root, &path).expect("now present"), id);
    }

    #[test]
    fn storage_add_is_idempotent(raws in prop::collection::vec(raw_literal_strategy(), 1..8)) {
        let mut storage = PlainStorage::new();
        let literals: Vec<Literal> = raws.iter().map(build_literal).collect();
        for literal in &literals {
            storage.add_multi("k", literal.clone());
        }
        let size = storage.size_multi();
        for literal in &literals {
            prop_assert!(!storage.add_multi("k", literal.clone()));
        }
        prop_assert_eq!(storage.size_multi(), size);
        prop_assert!(size <= literals.len());
    }
}
