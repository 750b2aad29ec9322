//! Diagnostic counters.
//!
//! The rewriter reports to a [`Metrics`] sink chosen at construction. The
//! default sink, [`NoMetrics`], ignores everything; [`Statistics`]
//! accumulates the counters printed with `--statistics`.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::rule::{Rule, RuleId};

/// Timed phases of the proof driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Entailment checks against the target
    Implies,
    /// Lemma application
    ApplyLemmas,
    /// Ordinary one-step rewriting
    RewriteStep,
}

/// Receives the rewriter's events. Every method defaults to doing nothing.
pub trait Metrics {
    /// A priority group of `size` rules is about to be tried.
    fn rule_group(&mut self, _size: usize) {}

    /// `rule` produced a successor.
    fn rule_applied(&mut self, _id: RuleId, _rule: &Rule) {}

    /// A search or proof layer of `size` states is about to be processed.
    fn layer(&mut self, _size: usize) {}

    /// A state was expanded.
    fn state_visited(&mut self) {}

    fn phase(&mut self, _phase: Phase, _elapsed: Duration) {}

    /// A driver returned after `elapsed`.
    fn finished(&mut self, _elapsed: Duration) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

impl Metrics for NoMetrics {}

impl<M: Metrics + ?Sized> Metrics for &mut M {
    fn rule_group(&mut self, size: usize) {
        (**self).rule_group(size)
    }

    fn rule_applied(&mut self, id: RuleId, rule: &Rule) {
        (**self).rule_applied(id, rule)
    }

    fn layer(&mut self, size: usize) {
        (**self).layer(size)
    }

    fn state_visited(&mut self) {
        (**self).state_visited()
    }

    fn phase(&mut self, phase: Phase, elapsed: Duration) {
        (**self).phase(phase, elapsed)
    }

    fn finished(&mut self, elapsed: Duration) {
        (**self).finished(elapsed)
    }
}

/// Accumulating sink.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub time_total: Duration,
    pub time_implies: Duration,
    pub time_apply_lemmas: Duration,
    pub time_rewrite_steps: Duration,
    pub layers: usize,
    pub layer_states: usize,
    pub peak_layer_states: usize,
    pub states_visited: usize,
    pub rule_groups: usize,
    pub rules_tried: usize,
    pub peak_group: usize,
    /// Successful applications per rule
    pub coverage: BTreeMap<RuleId, usize>,
}

impl Statistics {
    pub fn average_layer_states(&self) -> f64 {
        ratio(self.layer_states, self.layers)
    }

    pub fn average_group(&self) -> f64 {
        ratio(self.rules_tried, self.rule_groups)
    }

    pub fn applications(&self) -> usize {
        self.coverage.values().sum()
    }
}

fn ratio(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

impl Metrics for Statistics {
    fn rule_group(&mut self, size: usize) {
        self.rule_groups += 1;
        self.rules_tried += size;
        self.peak_group = self.peak_group.max(size);
    }

    fn rule_applied(&mut self, id: RuleId, _rule: &Rule) {
        *self.coverage.entry(id).or_default() += 1;
    }

    fn layer(&mut self, size: usize) {
        self.layers += 1;
        self.layer_states += size;
        self.peak_layer_states = self.peak_layer_states.max(size);
    }

    fn state_visited(&mut self) {
        self.states_visited += 1;
    }

    fn phase(&mut self, phase: Phase, elapsed: Duration) {
        match phase {
            Phase::Implies => self.time_implies += elapsed,
            Phase::ApplyLemmas => self.time_apply_lemmas += elapsed,
            Phase::RewriteStep => self.time_rewrite_steps += elapsed,
        }
    }

    fn finished(&mut self, elapsed: Duration) {
        self.time_total += elapsed;
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## TIME TOTAL {}", self.time_total.as_millis())?;
        writeln!(f, "## TIME IMPLIES {}", self.time_implies.as_millis())?;
        writeln!(f, "## TIME APPLY_RULES {}", self.time_apply_lemmas.as_millis())?;
        writeln!(f, "## TIME REWRITE_STEPS {}", self.time_rewrite_steps.as_millis())?;
        writeln!(f, "## STEP TOTAL {}", self.layers)?;
        writeln!(f, "## STEP TERMS {}", self.layer_states)?;
        writeln!(f, "## STEP PEAK_TERMS {}", self.peak_layer_states)?;
        writeln!(f, "## STEP AVERAGE_TERMS {}", self.average_layer_states())?;
        writeln!(f, "## STATES VISITED {}", self.states_visited)?;
        writeln!(f, "## RULE TOTAL {}", self.rules_tried)?;
        writeln!(f, "## RULE STEP_TOTAL {}", self.rule_groups)?;
        writeln!(f, "## RULE PEAK {}", self.peak_group)?;
        writeln!(f, "## RULE AVERAGE {}", self.average_group())?;
        write!(f, "## RULE APPLIED {}", self.applications())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn statistics_accumulate() {
        let rule = Rule::new(Term::constant("a"), Term::constant("b"));
        let mut stats = Statistics::default();
        stats.rule_group(3);
        stats.rule_group(1);
        stats.rule_applied(RuleId(0), &rule);
        stats.rule_applied(RuleId(0), &rule);
        stats.layer(4);
        stats.phase(Phase::Implies, Duration::from_millis(5));
        assert_eq!(stats.peak_group, 3);
        assert_eq!(stats.average_group(), 2.0);
        assert_eq!(stats.coverage.get(&RuleId(0)), Some(&2));
        assert_eq!(stats.time_implies, Duration::from_millis(5));
        let rendered = stats.to_string();
        assert!(rendered.starts_with("## TIME TOTAL 0\n"));
        assert!(rendered.contains("## RULE PEAK 3\n"));
    }

    #[test]
    fn empty_statistics_have_zero_averages() {
        let stats = Statistics::default();
        assert_eq!(stats.average_layer_states(), 0.0);
        assert_eq!(stats.average_group(), 0.0);
    }
}
