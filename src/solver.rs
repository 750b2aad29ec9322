//! Constraint oracles: satisfiability and entailment queries.

use num::ToPrimitive;
use tracing::trace;
use z3::{
    ast::{Ast, Bool, Int},
    Config, Context, SatResult, Solver,
};

use crate::constraint::Constraint;
use crate::term::{Builtin, Sort, Term};

/// Decides the questions the rewriter asks about path constraints.
///
/// Answers are one-sided: `false` from either method means "not shown".
pub trait ConstraintOracle {
    /// Return true only if `constraint` has no model.
    fn check_unsat(&self, constraint: &Constraint) -> bool;

    /// Return true only if every model of `lhs` is a model of `rhs`.
    fn implies(&self, lhs: &Constraint, rhs: &Constraint) -> bool;
}

/// Decides only what simplification decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntacticOracle;

impl ConstraintOracle for SyntacticOracle {
    fn check_unsat(&self, constraint: &Constraint) -> bool {
        constraint.simplify().map_or(false, |c| c.is_false())
    }

    fn implies(&self, lhs: &Constraint, rhs: &Constraint) -> bool {
        let (lhs, rhs) = match (lhs.simplify(), rhs.simplify()) {
            (Ok(lhs), Ok(rhs)) => (lhs, rhs),
            _ => return false,
        };
        if lhs.is_false() || rhs.is_true() {
            return true;
        }
        let known = lhs.conjuncts();
        rhs.conjuncts().iter().all(|conjunct| known.contains(conjunct))
    }
}

/// Oracle backed by the z3 SMT solver.
///
/// Integer and boolean conjuncts are encoded. A conjunct that cannot be
/// encoded is dropped from an assumption and makes a goal fail.
pub struct Z3Oracle {
    context: Context,
}

impl Z3Oracle {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Bound every query by `timeout_ms` milliseconds. A query that times
    /// out counts as "not shown".
    pub fn with_timeout(timeout_ms: Option<u64>) -> Self {
        let mut config = Config::new();
        if let Some(timeout) = timeout_ms {
            config.set_timeout_msec(timeout);
        }
        Self {
            context: Context::new(&config),
        }
    }

    fn assumptions<'ctx>(&'ctx self, constraint: &Constraint) -> Vec<Bool<'ctx>> {
        constraint
            .conjuncts()
            .iter()
            .filter_map(|conjunct| encode_formula(&self.context, conjunct))
            .collect()
    }

    fn unsat(&self, formulas: &[Bool<'_>]) -> bool {
        let solver = Solver::new(&self.context);
        for formula in formulas {
            solver.assert(formula);
        }
        let result = solver.check();
        trace!(?result, "z3 query");
        result == SatResult::Unsat
    }
}

impl Default for Z3Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintOracle for Z3Oracle {
    fn check_unsat(&self, constraint: &Constraint) -> bool {
        if constraint.is_false() {
            return true;
        }
        let constraint = match constraint.simplify() {
            Ok(c) if c.is_false() => return true,
            Ok(c) => c,
            Err(_) => return false,
        };
        self.unsat(&self.assumptions(&constraint))
    }

    fn implies(&self, lhs: &Constraint, rhs: &Constraint) -> bool {
        let (lhs, rhs) = match (lhs.simplify(), rhs.simplify()) {
            (Ok(lhs), Ok(rhs)) => (lhs, rhs),
            _ => return false,
        };
        if lhs.is_false() || rhs.is_true() {
            return true;
        }
        if rhs.is_false() {
            return self.check_unsat(&lhs);
        }
        let goals = match rhs
            .conjuncts()
            .iter()
            .map(|conjunct| encode_formula(&self.context, conjunct))
            .collect::<Option<Vec<_>>>()
        {
            Some(goals) => goals,
            None => return false,
        };
        let goals: Vec<&Bool> = goals.iter().collect();
        let mut formulas = self.assumptions(&lhs);
        formulas.push(Bool::and(&self.context, &goals).not());
        self.unsat(&formulas)
    }
}

enum Encoded<'ctx> {
    Int(Int<'ctx>),
    Bool(Bool<'ctx>),
}

fn encode_formula<'ctx>(ctx: &'ctx Context, term: &Term) -> Option<Bool<'ctx>> {
    match encode(ctx, term)? {
        Encoded::Bool(b) => Some(b),
        Encoded::Int(_) => None,
    }
}

fn encode_int<'ctx>(ctx: &'ctx Context, term: &Term) -> Option<Int<'ctx>> {
    match encode(ctx, term)? {
        Encoded::Int(i) => Some(i),
        Encoded::Bool(_) => None,
    }
}

fn encode<'ctx>(ctx: &'ctx Context, term: &Term) -> Option<Encoded<'ctx>> {
    match term {
        Term::Int(n) => Some(Encoded::Int(Int::from_i64(ctx, n.to_i64()?))),
        Term::Bool(b) => Some(Encoded::Bool(Bool::from_bool(ctx, *b))),
        Term::Var(var) => match var.sort() {
            Sort::Int => Some(Encoded::Int(Int::new_const(ctx, var.symbol()))),
            Sort::Bool => Some(Encoded::Bool(Bool::new_const(ctx, var.symbol()))),
            _ => None,
        },
        Term::App(_, args) => {
            let builtin = term.builtin_symbol()?;
            let ints = || -> Option<(Int<'ctx>, Int<'ctx>)> {
                Some((encode_int(ctx, args.get(0)?)?, encode_int(ctx, args.get(1)?)?))
            };
            let bools = || -> Option<(Bool<'ctx>, Bool<'ctx>)> {
                Some((encode_formula(ctx, args.get(0)?)?, encode_formula(ctx, args.get(1)?)?))
            };
            Some(match builtin {
                Builtin::Add => {
                    let (a, b) = ints()?;
                    Encoded::Int(Int::add(ctx, &[&a, &b]))
                }
                Builtin::Sub => {
                    let (a, b) = ints()?;
                    Encoded::Int(Int::sub(ctx, &[&a, &b]))
                }
                Builtin::Mul => {
                    let (a, b) = ints()?;
                    Encoded::Int(Int::mul(ctx, &[&a, &b]))
                }
                Builtin::Div => {
                    let (a, b) = ints()?;
                    Encoded::Int(truncated_div(ctx, &a, &b))
                }
                Builtin::Mod => {
                    let (a, b) = ints()?;
                    let quotient = truncated_div(ctx, &a, &b);
                    Encoded::Int(Int::sub(ctx, &[&a, &Int::mul(ctx, &[&b, &quotient])]))
                }
                Builtin::Lt => {
                    let (a, b) = ints()?;
                    Encoded::Bool(a.lt(&b))
                }
                Builtin::Le => {
                    let (a, b) = ints()?;
                    Encoded::Bool(a.le(&b))
                }
                Builtin::Gt => {
                    let (a, b) = ints()?;
                    Encoded::Bool(a.gt(&b))
                }
                Builtin::Ge => {
                    let (a, b) = ints()?;
                    Encoded::Bool(a.ge(&b))
                }
                Builtin::EqInt => {
                    let (a, b) = ints()?;
                    Encoded::Bool(a._eq(&b))
                }
                Builtin::NeInt => {
                    let (a, b) = ints()?;
                    Encoded::Bool(a._eq(&b).not())
                }
                Builtin::And => {
                    let (a, b) = bools()?;
                    Encoded::Bool(Bool::and(ctx, &[&a, &b]))
                }
                Builtin::Or => {
                    let (a, b) = bools()?;
                    Encoded::Bool(Bool::or(ctx, &[&a, &b]))
                }
                Builtin::Not => Encoded::Bool(encode_formula(ctx, args.get(0)?)?.not()),
                Builtin::EqK => match (encode(ctx, args.get(0)?)?, encode(ctx, args.get(1)?)?) {
                    (Encoded::Int(a), Encoded::Int(b)) => Encoded::Bool(a._eq(&b)),
                    (Encoded::Bool(a), Encoded::Bool(b)) => Encoded::Bool(a._eq(&b)),
                    _ => return None,
                },
            })
        }
        Term::Token(_, _) | Term::Cell(_, _) => None,
    }
}

// z3 divides euclidean; the builtins round towards zero.
fn truncated_div<'ctx>(ctx: &'ctx Context, a: &Int<'ctx>, b: &Int<'ctx>) -> Int<'ctx> {
    let zero = Int::from_i64(ctx, 0);
    let negated = Int::sub(ctx, &[&zero, a]);
    let towards_zero = Int::sub(ctx, &[&zero, &negated.div(b)]);
    a.ge(&zero).ite(&a.div(b), &towards_zero)
}
