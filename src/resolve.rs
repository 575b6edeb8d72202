//! Rule resolution: unify a goal with candidate rules, run the first body
//! that succeeds and commit its bindings to the caller.
//!
//! Per resolution:
//! 1. look up the rules whose head has the caller's functor,
//! 2. bind the caller literal against the caller's context,
//! 3. for each candidate, unify its head with the bound caller and run its
//!    body in a fresh context,
//! 4. pick the first candidate, in declaration order, whose graded result
//!    defuzzifies to true,
//! 5. copy that candidate's bindings back into the caller's context.
//!
//! Sequential mode stops at the first success. Parallel mode runs every
//! candidate on worker threads and joins before picking, so both modes select
//! the same rule. Losing candidates never touch the caller's context.

use crate::agent::Agent;
use crate::config::{ExecutionMode, ResolverConfig};
use crate::context::Context;
use crate::error::Result;
use crate::fuzzy::FuzzyValue;
use crate::path::Path;
use crate::rule::Rule;
use crate::term::{Literal, Term, Variable};
use crate::trace::{debug, debug_span, trace};
use crate::unify::{unify, Unifier};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of one resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Graded value of the selected body, `FALSE` when nothing succeeded.
    pub value: FuzzyValue,
    pub success: bool,
    /// The rule whose bindings were committed.
    pub rule: Option<Arc<Rule>>,
    /// Number of caller variables the commit set.
    pub committed: usize,
}

impl Resolution {
    fn failed() -> Self {
        Self {
            value: FuzzyValue::FALSE,
            success: false,
            rule: None,
            committed: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Resolver counters.
///
/// Relaxed atomics: values read while resolutions are running may lag.
#[derive(Debug, Default)]
pub struct ResolverStats {
    resolutions: AtomicU64,
    candidates_tried: AtomicU64,
    unification_failures: AtomicU64,
    commits: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStatsSnapshot {
    pub resolutions: u64,
    pub candidates_tried: u64,
    pub unification_failures: u64,
    pub commits: u64,
    pub failures: u64,
}

impl ResolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_resolution(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_candidate(&self) {
        self.candidates_tried.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unification_failure(&self) {
        self.unification_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            candidates_tried: self.candidates_tried.load(Ordering::Relaxed),
            unification_failures: self.unification_failures.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// A candidate whose head unified and whose body ran.
struct Trial {
    rule: Arc<Rule>,
    unifier: Unifier,
    context: Context,
    value: FuzzyValue,
}

pub struct Resolver {
    config: ResolverConfig,
    stats: ResolverStats,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            stats: ResolverStats::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// `@` callers fan out; everything else follows the configured mode.
    pub fn mode_for(&self, caller: &Literal) -> ExecutionMode {
        if caller.is_at() {
            ExecutionMode::Parallel
        } else {
            self.config.mode
        }
    }

    /// Resolve `caller` in `context` with the mode chosen by `mode_for`.
    pub fn resolve(&self, caller: &Literal, context: &mut Context) -> Result<Resolution> {
        self.resolve_with(caller, context, self.mode_for(caller))
    }

    /// Resolve `caller` in `context` with an explicit mode.
    ///
    /// Contract violations raised while binding the caller or by a body are
    /// returned as errors; a goal that simply fails is `Ok` with
    /// `success == false`, and then `context` is left as it was.
    pub fn resolve_with(
        &self,
        caller: &Literal,
        context: &mut Context,
        mode: ExecutionMode,
    ) -> Result<Resolution> {
        let _span = debug_span!("resolve", functor = %caller.functor(), ?mode).entered();
        self.stats.record_resolution();

        let agent = Arc::clone(context.agent());
        let candidates = agent.rules().candidates(caller.functor());
        if candidates.is_empty() {
            debug!("no candidate rules");
            self.stats.record_failure();
            return Ok(Resolution::failed());
        }

        let bound = caller.bind(context)?;
        debug!(candidates = candidates.len(), caller = %bound, "resolving");

        let winner = match mode {
            ExecutionMode::Sequential => {
                self.first_sequential(&bound, context, candidates, agent.as_ref())?
            }
            ExecutionMode::Parallel => {
                self.first_parallel(&bound, context, candidates, agent.as_ref())?
            }
        };

        let Some(trial) = winner else {
            debug!("every candidate failed");
            self.stats.record_failure();
            return Ok(Resolution::failed());
        };

        let committed = trial.unifier.commit(&bound, &trial.context, context)?;
        self.stats.record_commit();
        debug!(rule = trial.rule.name(), committed, value = %trial.value, "committed");
        Ok(Resolution {
            value: trial.value,
            success: true,
            rule: Some(trial.rule),
            committed,
        })
    }

    /// Sum of the scores of every rule with head `functor`.
    ///
    /// Only rules are scored; resolution is never entered, so rule families
    /// that call themselves are scored once per clause.
    pub fn score(&self, functor: &Path, agent: &dyn Agent) -> f64 {
        agent
            .rules()
            .candidates(functor)
            .iter()
            .map(|rule| agent.scorer().score(rule, agent))
            .sum()
    }

    fn first_sequential(
        &self,
        caller: &Literal,
        context: &Context,
        candidates: &[Arc<Rule>],
        agent: &dyn Agent,
    ) -> Result<Option<Trial>> {
        for rule in candidates {
            if let Some(trial) = self.attempt(rule, caller, context, false)? {
                if agent.defuzzifier().defuzzify(trial.value) {
                    return Ok(Some(trial));
                }
            }
        }
        Ok(None)
    }

    fn first_parallel(
        &self,
        caller: &Literal,
        context: &Context,
        candidates: &[Arc<Rule>],
        agent: &dyn Agent,
    ) -> Result<Option<Trial>> {
        let workers = self.config.max_threads.clamp(1, candidates.len());

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
        for index in 0..candidates.len() {
            // The receiver is alive, so sending cannot fail.
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Result<Option<Trial>>)>();
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                scope.spawn(move || {
                    for index in jobs.iter() {
                        let outcome = self.attempt(&candidates[index], caller, context, true);
                        if results.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut outcomes: Vec<Option<Result<Option<Trial>>>> =
            (0..candidates.len()).map(|_| None).collect();
        for (index, outcome) in result_rx.try_iter() {
            outcomes[index] = Some(outcome);
        }

        // Declaration order decides, not completion order.
        for outcome in outcomes.into_iter().flatten() {
            if let Some(trial) = outcome? {
                if agent.defuzzifier().defuzzify(trial.value) {
                    return Ok(Some(trial));
                }
            }
        }
        Ok(None)
    }

    /// Unify one candidate and run its body in a private context.
    fn attempt(
        &self,
        rule: &Arc<Rule>,
        caller: &Literal,
        context: &Context,
        parallel: bool,
    ) -> Result<Option<Trial>> {
        self.stats.record_candidate();
        let Some(unifier) = unify(caller, rule.head()) else {
            trace!(rule = rule.name(), "head does not unify");
            self.stats.record_unification_failure();
            return Ok(None);
        };

        let mut variables: Vec<Variable> = rule
            .locals()
            .iter()
            .map(|name| Variable::new(name.clone()))
            .collect();
        variables.extend(unifier.head_variables(rule.head()));
        let mut body_context = context.derive(rule.shared_name(), variables);

        let arguments: Vec<Term> = caller
            .values()
            .iter()
            .map(|value| match value.as_variable().and_then(Variable::value) {
                Some(bound) => bound.clone(),
                None => value.clone(),
            })
            .collect();
        let mut returns = Vec::new();
        let value = rule
            .body()
            .execute(parallel, &mut body_context, &arguments, &mut returns)?;
        trace!(rule = rule.name(), value = %value, "body executed");
        if !unifier.is_consistent(&body_context) {
            trace!(rule = rule.name(), "aliased head variables disagree");
            return Ok(None);
        }

        Ok(Some(Trial {
            rule: Arc::clone(rule),
            unifier,
            context: body_context,
            value,
        }))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/resolve.rs"]
mod tests;
