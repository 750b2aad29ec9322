use std::{
    collections::BTreeSet,
    fmt::{self, Display},
};

use crate::{
    constraint::Constraint,
    error::EvaluationError,
    solver::ConstraintOracle,
    term::{Substitution, Term, Variable},
    unify::match_term,
};

/// A term guarded by a path constraint: the unit of state.
///
/// Equality and hashing are structural, so equal states reached along
/// different paths collapse in visited sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstrainedTerm {
    pub term: Term,
    pub constraint: Constraint,
}

impl ConstrainedTerm {
    pub fn new(term: Term, constraint: Constraint) -> Self {
        Self { term, constraint }
    }

    pub fn unconstrained(term: Term) -> Self {
        Self::new(term, Constraint::truth())
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = self.constraint.variables();
        self.term.collect_variables(&mut vars);
        vars
    }

    /// Simplify the constraint and push its bindings into the term.
    pub fn expand_patterns(&self) -> Result<ConstrainedTerm, EvaluationError> {
        let constraint = self.constraint.simplify()?;
        let term = self.term.substitute_and_evaluate(constraint.substitution())?;
        Ok(Self { term, constraint })
    }

    pub fn substitute(&self, substitution: &Substitution) -> ConstrainedTerm {
        Self {
            term: self.term.substitute(substitution),
            constraint: self.constraint.substitute(substitution),
        }
    }

    /// Directed matching with entailment: find an instance of `pattern` such
    /// that `self` implies it. Variables of `pattern` that also occur in
    /// `self` are shared and are not instantiated.
    ///
    /// Return the constraint of `self` extended with the bindings of the
    /// pattern variables, or `None` if the implication cannot be shown.
    pub fn match_implies(
        &self,
        pattern: &ConstrainedTerm,
        oracle: &dyn ConstraintOracle,
    ) -> Result<Option<Constraint>, EvaluationError> {
        let (mut matching, mut obligations) = match match_term(&self.term, &pattern.term) {
            Some(result) => result,
            None => return Ok(None),
        };
        let own = self.variables();
        let shared: Vec<Variable> = matching.keys().filter(|var| own.contains(*var)).cloned().collect();
        for var in shared {
            if let Some(value) = matching.remove(&var) {
                if value != Term::Var(var.clone()) {
                    obligations.push(Term::equality(Term::Var(var), value));
                }
            }
        }

        let mut rhs = pattern.constraint.substitute(&matching);
        rhs.add_all(obligations);
        let rhs = rhs.simplify()?;
        if rhs.is_false() {
            return Ok(None);
        }

        let existentials: BTreeSet<Variable> = rhs.variables().difference(&own).cloned().collect();
        let rhs = rhs
            .orient_substitution(&existentials)
            .remove_bindings(&existentials);
        if !rhs.variables().is_disjoint(&existentials) {
            // TODO: hand existentially quantified conditions to the oracle
            return Ok(None);
        }
        if !oracle.implies(&self.constraint, &rhs) {
            return Ok(None);
        }

        let mut result = self.constraint.clone();
        for (var, value) in matching {
            result.add_binding(var, value);
        }
        Ok(Some(result))
    }

    /// Return true iff every instance of `self` is an instance of `target`.
    pub fn implies(
        &self,
        target: &ConstrainedTerm,
        oracle: &dyn ConstraintOracle,
    ) -> Result<bool, EvaluationError> {
        Ok(self.match_implies(target, oracle)?.is_some())
    }
}

impl Display for ConstrainedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} ↩ {})", self.term, self.constraint)
    }
}
