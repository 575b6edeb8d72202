use crate::context::Context;
use crate::error::Result;
use crate::path::Path;
use crate::term::{Literal, Term, Variable};
use crate::trace::trace;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};

/// Variable chains longer than this are left unexpanded when applying.
const MAX_CHAIN: usize = 256;

/// Which literal a variable name belongs to.
///
/// Caller and rule head are separate scopes: `X` in the caller and `X` in the
/// head are different variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Caller,
    Head,
}

type Slot = (Side, Path);

/// Suffix source for head variables that leave a rule body unset.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// Bindings produced by unifying a caller literal with a rule head.
///
/// When an unbound caller variable meets an unbound head variable, the caller
/// variable is bound to the head variable. Whatever value the body gives the
/// head variable then reaches the caller on commit. Two head variables that
/// meet the same caller variable become aliases: the body may set either of
/// them, and setting both to different values fails the trial.
#[derive(Debug, Clone, Default)]
pub struct Unifier {
    bindings: HashMap<Slot, (Term, Side)>,
}

enum Deref {
    Wildcard,
    Unbound(Slot),
    Value(Term, Side),
}

/// Unify a bound caller literal with a rule head.
///
/// Functors, negation and arity must agree at every literal level; atoms
/// compare by value; the wildcard matches anything. Returns `None` when the
/// two cannot be made equal.
///
/// Uses an explicit worklist and performs the occurs check.
pub fn unify(caller: &Literal, head: &Literal) -> Option<Unifier> {
    let mut unifier = Unifier::default();
    let mut worklist: SmallVec<[((Term, Side), (Term, Side)); 16]> = SmallVec::new();
    worklist.push((
        (Term::Literal(caller.clone()), Side::Caller),
        (Term::Literal(head.clone()), Side::Head),
    ));

    while let Some(((a, side_a), (b, side_b))) = worklist.pop() {
        match (unifier.deref(a, side_a), unifier.deref(b, side_b)) {
            (Deref::Wildcard, _) | (_, Deref::Wildcard) => {}
            (Deref::Unbound(x), Deref::Unbound(y)) => {
                if x == y {
                    continue;
                }
                if x.0 == Side::Caller {
                    let target = Term::var(y.1.clone());
                    unifier.bind(x, target, y.0);
                } else {
                    let target = Term::var(x.1.clone());
                    unifier.bind(y, target, x.0);
                }
            }
            (Deref::Unbound(slot), Deref::Value(term, side))
            | (Deref::Value(term, side), Deref::Unbound(slot)) => {
                if unifier.occurs(&slot, &term, side) {
                    trace!(variable = %slot.1, "unify_occurs_check_failed");
                    return None;
                }
                unifier.bind(slot, term, side);
            }
            (Deref::Value(Term::Atom(x), _), Deref::Value(Term::Atom(y), _)) => {
                if x != y {
                    trace!(left = %x, right = %y, "unify_atom_mismatch");
                    return None;
                }
            }
            (Deref::Value(Term::Literal(x), sx), Deref::Value(Term::Literal(y), sy)) => {
                if x.functor() != y.functor()
                    || x.is_negated() != y.is_negated()
                    || x.arity() != y.arity()
                {
                    trace!(left = %x, right = %y, "unify_literal_mismatch");
                    return None;
                }
                for (vx, vy) in x.values().iter().zip(y.values().iter()) {
                    worklist.push(((vx.clone(), sx), (vy.clone(), sy)));
                }
            }
            _ => {
                trace!("unify_kind_mismatch");
                return None;
            }
        }
    }

    Some(unifier)
}

impl Unifier {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    fn bind(&mut self, slot: Slot, term: Term, side: Side) {
        self.bindings.insert(slot, (term, side));
    }

    /// Follow variable values and bindings until a non-variable or an
    /// unbound variable is reached.
    fn deref(&self, mut term: Term, mut side: Side) -> Deref {
        loop {
            let next = match &term {
                Term::Variable(v) if v.is_wildcard() => return Deref::Wildcard,
                Term::Variable(v) => match v.value() {
                    Some(value) => Some((value.clone(), side)),
                    None => {
                        let slot = (side, v.name().clone());
                        match self.bindings.get(&slot) {
                            Some((bound, bound_side)) => Some((bound.clone(), *bound_side)),
                            None => return Deref::Unbound(slot),
                        }
                    }
                },
                _ => None,
            };
            match next {
                Some((t, s)) => {
                    term = t;
                    side = s;
                }
                None => return Deref::Value(term, side),
            }
        }
    }

    /// Does `slot` occur in `term`?
    fn occurs(&self, slot: &Slot, term: &Term, side: Side) -> bool {
        let mut stack: SmallVec<[(Term, Side); 16]> = SmallVec::new();
        stack.push((term.clone(), side));

        while let Some((t, s)) = stack.pop() {
            match self.deref(t, s) {
                Deref::Unbound(found) => {
                    if &found == slot {
                        return true;
                    }
                }
                Deref::Value(Term::Literal(l), s) => {
                    for value in l.values() {
                        stack.push((value.clone(), s));
                    }
                }
                _ => {}
            }
        }

        false
    }

    /// Substitute every variable in `term` that has a value, looking at the
    /// body context first for head variables.
    ///
    /// With a `generation`, head variables that are still unset come out
    /// renamed so they cannot be mistaken for caller variables.
    fn apply(
        &self,
        term: &Term,
        side: Side,
        body: Option<&Context>,
        generation: Option<u64>,
        depth: usize,
    ) -> Term {
        match term {
            Term::Atom(_) => term.clone(),
            Term::Variable(v) if v.is_wildcard() || depth >= MAX_CHAIN => term.clone(),
            Term::Variable(v) => {
                if let Some(value) = v.value() {
                    return self.apply(value, side, body, generation, depth + 1);
                }
                if side == Side::Head {
                    if let Some(value) = body.and_then(|ctx| ctx.value(v.name())) {
                        return self.apply(value, Side::Head, body, generation, depth + 1);
                    }
                }
                if let Some((bound, bound_side)) = self.bindings.get(&(side, v.name().clone())) {
                    return self.apply(bound, *bound_side, body, generation, depth + 1);
                }
                if side == Side::Caller {
                    return term.clone();
                }
                if let Some(value) = self.alias_value(v.name(), body) {
                    return self.apply(value, Side::Head, body, generation, depth + 1);
                }
                match generation {
                    Some(generation) => {
                        Term::var(Path::from_segments([format!("{}#{}", v.name(), generation)]))
                    }
                    None => term.clone(),
                }
            }
            Term::Literal(l) => {
                if !l.has_variable() {
                    return term.clone();
                }
                let values = l
                    .values()
                    .iter()
                    .map(|v| self.apply(v, side, body, generation, depth))
                    .collect();
                Term::Literal(l.with_values(values))
            }
        }
    }

    /// Body value of a head variable that unification made an alias of the
    /// head variable `name`.
    fn alias_value<'c>(&self, name: &Path, body: Option<&'c Context>) -> Option<&'c Term> {
        let body = body?;
        self.bindings.iter().find_map(|((side, other), (bound, bound_side))| match bound {
            Term::Variable(target)
                if *side == Side::Head
                    && *bound_side == Side::Head
                    && !target.is_bound()
                    && target.name() == name =>
            {
                body.value(other)
            }
            _ => None,
        })
    }

    /// Value of the variable `name` on `side`, or `None` while it is unbound.
    pub fn value_of(&self, side: Side, name: &Path, body: Option<&Context>) -> Option<Term> {
        match self.apply(&Term::var(name.clone()), side, body, None, 0) {
            Term::Variable(v) if !v.is_bound() => None,
            value => Some(value),
        }
    }

    /// False when the body gave two aliased head variables different values.
    pub fn is_consistent(&self, body: &Context) -> bool {
        self.bindings.iter().all(|((side, name), (bound, bound_side))| {
            let Term::Variable(alias) = bound else {
                return true;
            };
            if *side != Side::Head || *bound_side != Side::Head || alias.is_bound() {
                return true;
            }
            match (body.value(name), body.value(alias.name())) {
                (Some(own), Some(other)) => {
                    self.apply(own, Side::Head, Some(body), None, 0)
                        == self.apply(other, Side::Head, Some(body), None, 0)
                }
                _ => true,
            }
        })
    }

    /// Initial variables of a rule body: every head variable, holding the
    /// value unification gave it (unbound when it got none).
    pub fn head_variables(&self, head: &Literal) -> Vec<Variable> {
        let mut seen: HashSet<&Path> = HashSet::new();
        head.variables()
            .into_iter()
            .filter(|v| !v.is_wildcard() && !v.is_bound())
            .filter(|v| seen.insert(v.name()))
            .map(|v| match self.value_of(Side::Head, v.name(), None) {
                Some(value) => Variable::bound(v.name().clone(), value),
                None => Variable::new(v.name().clone()),
            })
            .collect()
    }

    /// Copy the final values of the caller's unbound variables into `target`.
    ///
    /// `caller` is the bound caller literal that was unified and `body` the
    /// context the winning body ran in. Head variables the body left unset
    /// are renamed apart inside committed values. Returns the number of
    /// variables set.
    pub fn commit(&self, caller: &Literal, body: &Context, target: &mut Context) -> Result<usize> {
        let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut committed = 0;
        for variable in caller.variables() {
            if variable.is_wildcard() || variable.is_bound() || !seen.insert(variable.name()) {
                continue;
            }
            let value = self.apply(
                &Term::var(variable.name().clone()),
                Side::Caller,
                Some(body),
                Some(generation),
                0,
            );
            if matches!(&value, Term::Variable(v) if !v.is_bound()) {
                continue;
            }
            if target.set(variable.name(), value)? {
                committed += 1;
            }
        }
        Ok(committed)
    }
}

#[cfg(test)]
#[path = "tests/unify.rs"]
mod tests;
