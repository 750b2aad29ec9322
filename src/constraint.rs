//! Path constraints.
//!
//! A [`Constraint`] is a conjunction of a substitution (variable bindings) and
//! boolean atoms. It is kept immutable: every operation returns a new
//! constraint.

use std::{
    collections::{BTreeSet, VecDeque},
    fmt::{self, Display},
};

use itertools::Itertools;

use crate::error::EvaluationError;
use crate::term::{Builtin, Sort, Substitution, Term, Variable};

/// Conjunctive formula.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Constraint {
    substitution: Substitution,
    atoms: Vec<Term>,
    falsified: bool,
}

impl Constraint {
    pub fn truth() -> Self {
        Self::default()
    }

    pub fn falsity() -> Self {
        Self {
            falsified: true,
            ..Self::default()
        }
    }

    pub fn from_atoms(atoms: impl IntoIterator<Item = Term>) -> Self {
        let mut constraint = Self::truth();
        constraint.add_all(atoms);
        constraint
    }

    pub fn from_substitution(substitution: Substitution) -> Self {
        Self {
            substitution,
            ..Self::default()
        }
    }

    /// Syntactically true: no binding and no atom.
    pub fn is_true(&self) -> bool {
        !self.falsified && self.substitution.is_empty() && self.atoms.is_empty()
    }

    /// Syntactically false. An unsatisfiable constraint need not be false.
    pub fn is_false(&self) -> bool {
        self.falsified
    }

    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    pub fn atoms(&self) -> &[Term] {
        &self.atoms
    }

    /// Bindings as equalities, followed by the atoms.
    pub fn conjuncts(&self) -> Vec<Term> {
        if self.falsified {
            return vec![Term::Bool(false)];
        }
        self.substitution
            .iter()
            .map(|(var, value)| Term::equality(Term::Var(var.clone()), value.clone()))
            .chain(self.atoms.iter().cloned())
            .collect()
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        for (var, value) in &self.substitution {
            vars.insert(var.clone());
            value.collect_variables(&mut vars);
        }
        for atom in &self.atoms {
            atom.collect_variables(&mut vars);
        }
        vars
    }

    /// Bind `var` to `value`. A second binding for `var` becomes an equality.
    pub fn add_binding(&mut self, var: Variable, value: Term) {
        if self.falsified {
            return;
        }
        match self.substitution.get(&var) {
            Some(existing) if *existing == value => {}
            Some(existing) => {
                let equality = Term::equality(existing.clone(), value);
                self.add(equality);
            }
            None => {
                self.substitution.insert(var, value);
            }
        }
    }

    pub fn add(&mut self, atom: Term) {
        match atom {
            _ if self.falsified => {}
            Term::Bool(true) => {}
            Term::Bool(false) => *self = Self::falsity(),
            atom => {
                if !self.atoms.contains(&atom) {
                    self.atoms.push(atom);
                }
            }
        }
    }

    pub fn add_all(&mut self, atoms: impl IntoIterator<Item = Term>) {
        for atom in atoms {
            self.add(atom);
        }
    }

    /// Conjunction.
    pub fn and(&self, other: &Constraint) -> Constraint {
        if other.falsified {
            return Self::falsity();
        }
        let mut result = self.clone();
        for (var, value) in &other.substitution {
            result.add_binding(var.clone(), value.clone());
        }
        result.add_all(other.atoms.iter().cloned());
        result
    }

    /// Apply `substitution` to keys, values and atoms, without evaluating.
    /// A key mapped to a variable is renamed; a key mapped to any other term
    /// turns its binding into an equality.
    pub fn substitute(&self, substitution: &Substitution) -> Constraint {
        if self.falsified || substitution.is_empty() {
            return self.clone();
        }
        let mut result = Self::truth();
        for (var, value) in &self.substitution {
            let value = value.substitute(substitution);
            match substitution.get(var) {
                None => result.add_binding(var.clone(), value),
                Some(Term::Var(renamed)) => result.add_binding(renamed.clone(), value),
                Some(term) => result.add(Term::equality(term.clone(), value)),
            }
        }
        result.add_all(self.atoms.iter().map(|atom| atom.substitute(substitution)));
        result
    }

    /// Normalize: evaluate atoms, turn variable equalities into bindings,
    /// decompose constructor equalities, and apply the substitution to itself
    /// until it is idempotent. The result is false if an atom evaluates to
    /// false.
    pub fn simplify(&self) -> Result<Constraint, EvaluationError> {
        if self.falsified {
            return Ok(Self::falsity());
        }
        let mut substitution = Substitution::new();
        let mut atoms: Vec<Term> = Vec::new();
        let mut pending: VecDeque<Term> = self.conjuncts().into();

        while let Some(item) = pending.pop_front() {
            let item = item.substitute_and_evaluate(&substitution)?;
            match item {
                Term::Bool(true) => continue,
                Term::Bool(false) => return Ok(Self::falsity()),
                _ => {}
            }
            if let Some(parts) = decompose(&item) {
                for part in parts.into_iter().rev() {
                    pending.push_front(part);
                }
                continue;
            }
            if let Some((var, value)) = as_binding(&item) {
                let single = Substitution::from([(var.clone(), value.clone())]);
                for existing in substitution.values_mut() {
                    *existing = existing.substitute_and_evaluate(&single)?;
                }
                substitution.insert(var, value);
                // earlier atoms may mention the new binding
                pending.extend(atoms.drain(..));
                continue;
            }
            atoms.push(item);
        }

        atoms.sort();
        atoms.dedup();
        Ok(Self {
            substitution,
            atoms,
            falsified: false,
        })
    }

    /// Flip bindings `y ↦ x` into `x ↦ y` when `x` is in `vars` and `y` is not,
    /// so that the variables in `vars` become keys wherever possible.
    pub fn orient_substitution(&self, vars: &BTreeSet<Variable>) -> Constraint {
        let mut renaming = Substitution::new();
        for (key, value) in &self.substitution {
            if let Term::Var(target) = value {
                if vars.contains(target) && !vars.contains(key) && !renaming.contains_key(target) {
                    renaming.insert(target.clone(), Term::Var(key.clone()));
                }
            }
        }
        if renaming.is_empty() {
            return self.clone();
        }

        let mut substitution = Substitution::new();
        for (key, value) in &self.substitution {
            match value {
                Term::Var(target) if renaming.get(target) == Some(&Term::Var(key.clone())) => {
                    substitution.insert(target.clone(), Term::Var(key.clone()));
                }
                value => {
                    substitution.insert(key.clone(), value.substitute(&renaming));
                }
            }
        }
        Self {
            substitution,
            atoms: self.atoms.iter().map(|atom| atom.substitute(&renaming)).collect(),
            falsified: self.falsified,
        }
    }

    /// Drop the bindings of the variables in `vars`.
    pub fn remove_bindings(&self, vars: &BTreeSet<Variable>) -> Constraint {
        let mut result = self.clone();
        result.substitution.retain(|var, _| !vars.contains(var));
        result
    }

    /// Keep only the bindings of the variables in `vars`.
    pub fn restrict(&self, vars: &BTreeSet<Variable>) -> Constraint {
        let mut result = self.clone();
        result.substitution.retain(|var, _| vars.contains(var));
        result
    }
}

// Split a constructor equality or a conjunction into its parts.
fn decompose(item: &Term) -> Option<Vec<Term>> {
    let (builtin, args) = match item {
        Term::App(_, args) => (item.builtin_symbol()?, args),
        _ => return None,
    };
    match (builtin, &args[..]) {
        (Builtin::And, [x, y]) => Some(vec![x.clone(), y.clone()]),
        (Builtin::EqK, [x @ Term::App(f, xs), y @ Term::App(g, ys)])
            if !x.is_function() && !y.is_function() && f == g && xs.len() == ys.len() =>
        {
            Some(
                xs.iter()
                    .zip(ys)
                    .map(|(x, y)| Term::equality(x.clone(), y.clone()))
                    .collect(),
            )
        }
        (Builtin::EqK, [Term::Cell(l, x), Term::Cell(m, y)]) if l == m => {
            Some(vec![Term::equality((**x).clone(), (**y).clone())])
        }
        _ => None,
    }
}

// Read an atom as a binding, if it is one.
fn as_binding(item: &Term) -> Option<(Variable, Term)> {
    match item {
        Term::Var(var) if var.sort() == Sort::Bool => Some((var.clone(), Term::Bool(true))),
        Term::App(_, args) => match (item.builtin_symbol()?, &args[..]) {
            (Builtin::Not, [Term::Var(var)]) if var.sort() == Sort::Bool => {
                Some((var.clone(), Term::Bool(false)))
            }
            (Builtin::EqK | Builtin::EqInt, [x, y]) => bind(x, y).or_else(|| bind(y, x)),
            _ => None,
        },
        _ => None,
    }
}

fn bind(var: &Term, value: &Term) -> Option<(Variable, Term)> {
    match var {
        Term::Var(var) if !value.contains_variable(var) && var.sort().accepts(value.sort()) => {
            Some((var.clone(), value.clone()))
        }
        _ => None,
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.falsified {
            write!(f, "false")
        } else if self.is_true() {
            write!(f, "true")
        } else {
            write!(f, "{}", self.conjuncts().iter().format(" ∧ "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Variable {
        Variable::new("X", Sort::Int)
    }

    fn y() -> Variable {
        Variable::new("Y", Sort::Int)
    }

    fn lt(a: Term, b: Term) -> Term {
        Term::builtin(Builtin::Lt, vec![a, b])
    }

    #[test]
    fn simplify_turns_equalities_into_bindings() {
        let c = Constraint::from_atoms([
            Term::equality(Term::Var(x()), Term::builtin(Builtin::Add, vec![Term::Var(y()), Term::int(1)])),
            Term::equality(Term::Var(y()), Term::int(2)),
        ])
        .simplify()
        .unwrap();
        assert_eq!(c.substitution().get(&x()), Some(&Term::int(3)));
        assert_eq!(c.substitution().get(&y()), Some(&Term::int(2)));
        assert!(c.atoms().is_empty());
    }

    #[test]
    fn simplify_detects_contradiction() {
        let mut c = Constraint::truth();
        c.add_binding(x(), Term::int(1));
        c.add_binding(x(), Term::int(2));
        assert!(c.simplify().unwrap().is_false());
    }

    #[test]
    fn simplify_reevaluates_atoms_after_binding() {
        let c = Constraint::from_atoms([
            lt(Term::Var(x()), Term::int(5)),
            Term::equality(Term::Var(x()), Term::int(7)),
        ]);
        assert!(c.simplify().unwrap().is_false());
    }

    #[test]
    fn simplify_decomposes_constructors() {
        let k = Variable::new("K", Sort::K);
        let c = Constraint::from_atoms([Term::equality(
            Term::app("f", vec![Term::Var(k.clone()), Term::int(1)]),
            Term::app("f", vec![Term::constant("a"), Term::int(1)]),
        )])
        .simplify()
        .unwrap();
        assert_eq!(c.substitution().get(&k), Some(&Term::constant("a")));
    }

    #[test]
    fn orientation_makes_given_variables_keys() {
        let c = Constraint::from_substitution(Substitution::from([
            (y(), Term::Var(x())),
            (Variable::new("Z", Sort::Int), Term::builtin(Builtin::Add, vec![Term::Var(x()), Term::int(1)])),
        ]));
        let oriented = c.orient_substitution(&BTreeSet::from([x()]));
        assert_eq!(oriented.substitution().get(&x()), Some(&Term::Var(y())));
        assert_eq!(
            oriented.substitution().get(&Variable::new("Z", Sort::Int)),
            Some(&Term::builtin(Builtin::Add, vec![Term::Var(y()), Term::int(1)]))
        );
        assert!(oriented.remove_bindings(&BTreeSet::from([x()])).substitution().get(&x()).is_none());
    }

    #[test]
    fn substitute_renames_keys() {
        let c = Constraint::from_substitution(Substitution::from([(x(), Term::int(1))]));
        let renamed = c.substitute(&Substitution::from([(x(), Term::Var(y()))]));
        assert_eq!(renamed.substitution().get(&y()), Some(&Term::int(1)));
        let instantiated = c.substitute(&Substitution::from([(x(), Term::int(2))]));
        assert!(instantiated.simplify().unwrap().is_false());
    }

    #[test]
    fn conjunction_with_false_is_false() {
        let c = Constraint::from_atoms([lt(Term::Var(x()), Term::int(5))]);
        assert!(c.and(&Constraint::falsity()).is_false());
        assert_eq!(c.and(&Constraint::truth()), c);
    }
}
