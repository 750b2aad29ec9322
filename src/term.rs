//! Symbolic terms.
//!
//! A term is an immutable tree of sorted variables, builtin values, symbol
//! applications and named cells. Applications of the builtin symbols of
//! [`Builtin`] are functions: they evaluate away once their arguments are
//! concrete, and stay symbolic otherwise.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use num::{BigInt, Zero};

use crate::error::EvaluationError;

/// Label of a cell.
pub type CellLabel = Arc<str>;

/// Mapping from variables to the terms they stand for.
pub type Substitution = BTreeMap<Variable, Term>;

/// The K sequence constructor `_~>_`.
pub const KSEQ: &str = "~>";
/// The empty K sequence.
pub const DOT_K: &str = ".K";
/// Label of the computation cell.
pub const K_CELL: &str = "k";
/// Constructor of a bag of sibling cells.
pub const CELL_BAG: &str = "_cells_";

/// Sorts of terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sort {
  Int,
  Bool,
  Id,
  /// Any term, including configurations and computations
  K,
}

impl Sort {
  /// Return true iff terms of sorts `self` and `other` may be equal.
  pub fn compatible(self, other: Sort) -> bool {
    self == other || self == Sort::K || other == Sort::K
  }

  /// Return true iff a variable of sort `self` may be bound to a term of sort `other`.
  pub fn accepts(self, other: Sort) -> bool {
    self == other || self == Sort::K
  }
}

impl fmt::Display for Sort {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Sort::Int => write!(f, "Int"),
      Sort::Bool => write!(f, "Bool"),
      Sort::Id => write!(f, "Id"),
      Sort::K => write!(f, "K"),
    }
  }
}

/// A sorted logical variable.
///
/// Variables made by renaming carry a generation. No name a user can write
/// collides with a renamed variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
  name: Arc<str>,
  sort: Sort,
  generation: Option<u64>,
}

impl Variable {
  pub fn new(name: impl Into<Arc<str>>, sort: Sort) -> Self {
    Self {
      name: name.into(),
      sort,
      generation: None,
    }
  }

  /// The name, without the generation added by renaming.
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn sort(&self) -> Sort {
    self.sort
  }

  pub fn generation(&self) -> Option<u64> {
    self.generation
  }

  /// Anonymous variables start with `_` and are never reported.
  pub fn is_anonymous(&self) -> bool {
    self.name.starts_with('_')
  }

  /// The `n`th renaming of this variable.
  pub(crate) fn renamed(&self, n: u64) -> Self {
    Self {
      name: self.name.clone(),
      sort: self.sort,
      generation: Some(n),
    }
  }

  /// A solver symbol, distinct for distinct variables.
  pub fn symbol(&self) -> String {
    let generation = self.generation.map(|n| n.to_string()).unwrap_or_default();
    format!("{}|{}|{}|{}", self.name.len(), self.name, generation, self.sort)
  }
}

impl fmt::Display for Variable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.generation {
      Some(n) => write!(f, "{}#{}:{}", self.name, n, self.sort),
      None => write!(f, "{}:{}", self.name, self.sort),
    }
  }
}

/// Builtin function symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Lt,
  Le,
  Gt,
  Ge,
  EqInt,
  NeInt,
  And,
  Or,
  Not,
  EqK,
}

impl Builtin {
  pub fn from_symbol(symbol: &str) -> Option<Self> {
    use Builtin::*;
    match symbol {
      "+Int" => Some(Add),
      "-Int" => Some(Sub),
      "*Int" => Some(Mul),
      "/Int" => Some(Div),
      "%Int" => Some(Mod),
      "<Int" => Some(Lt),
      "<=Int" => Some(Le),
      ">Int" => Some(Gt),
      ">=Int" => Some(Ge),
      "==Int" => Some(EqInt),
      "=/=Int" => Some(NeInt),
      "andBool" => Some(And),
      "orBool" => Some(Or),
      "notBool" => Some(Not),
      "==K" => Some(EqK),
      _ => None,
    }
  }

  pub fn symbol(self) -> &'static str {
    use Builtin::*;
    match self {
      Add => "+Int",
      Sub => "-Int",
      Mul => "*Int",
      Div => "/Int",
      Mod => "%Int",
      Lt => "<Int",
      Le => "<=Int",
      Gt => ">Int",
      Ge => ">=Int",
      EqInt => "==Int",
      NeInt => "=/=Int",
      And => "andBool",
      Or => "orBool",
      Not => "notBool",
      EqK => "==K",
    }
  }

  pub fn result_sort(self) -> Sort {
    use Builtin::*;
    match self {
      Add | Sub | Mul | Div | Mod => Sort::Int,
      _ => Sort::Bool,
    }
  }

  fn arity(self) -> usize {
    match self {
      Builtin::Not => 1,
      _ => 2,
    }
  }

  /// Apply the builtin to evaluated arguments.
  /// Return `None` if the application stays symbolic.
  fn apply(self, args: &[Term]) -> Result<Option<Term>, EvaluationError> {
    use Builtin::*;
    if args.len() != self.arity() {
      return Err(EvaluationError::Arity {
        symbol: self.symbol(),
        expected: self.arity(),
        found: args.len(),
      });
    }
    match self {
      Add | Sub | Mul | Div | Mod | Lt | Le | Gt | Ge | EqInt | NeInt => {
        let (x, y) = match (self.int_arg(&args[0])?, self.int_arg(&args[1])?) {
          (Some(x), Some(y)) => (x, y),
          _ => {
            return Ok(match self {
              EqInt if args[0] == args[1] => Some(Term::Bool(true)),
              NeInt if args[0] == args[1] => Some(Term::Bool(false)),
              _ => None,
            })
          }
        };
        Ok(Some(match self {
          Add => Term::Int(x + y),
          Sub => Term::Int(x - y),
          Mul => Term::Int(x * y),
          Div if y.is_zero() => return Err(EvaluationError::DivisionByZero(self.symbol())),
          Div => Term::Int(x / y),
          Mod if y.is_zero() => return Err(EvaluationError::DivisionByZero(self.symbol())),
          Mod => Term::Int(x % y),
          Lt => Term::Bool(x < y),
          Le => Term::Bool(x <= y),
          Gt => Term::Bool(x > y),
          Ge => Term::Bool(x >= y),
          EqInt => Term::Bool(x == y),
          _ => Term::Bool(x != y),
        }))
      }
      And => Ok(match (self.bool_arg(&args[0])?, self.bool_arg(&args[1])?) {
        (Some(false), _) | (_, Some(false)) => Some(Term::Bool(false)),
        (Some(true), _) => Some(args[1].clone()),
        (_, Some(true)) => Some(args[0].clone()),
        _ => None,
      }),
      Or => Ok(match (self.bool_arg(&args[0])?, self.bool_arg(&args[1])?) {
        (Some(true), _) | (_, Some(true)) => Some(Term::Bool(true)),
        (Some(false), _) => Some(args[1].clone()),
        (_, Some(false)) => Some(args[0].clone()),
        _ => None,
      }),
      Not => Ok(match (self.bool_arg(&args[0])?, &args[0]) {
        (Some(b), _) => Some(Term::Bool(!b)),
        (None, Term::App(symbol, inner)) if &**symbol == Not.symbol() => Some(inner[0].clone()),
        _ => None,
      }),
      EqK => Ok(equal_constructors(&args[0], &args[1]).map(Term::Bool)),
    }
  }

  fn int_arg<'a>(self, arg: &'a Term) -> Result<Option<&'a BigInt>, EvaluationError> {
    match arg {
      Term::Int(n) => Ok(Some(n)),
      t if t.is_value() => Err(self.mismatch(Sort::Int, t)),
      t if t.sort().compatible(Sort::Int) => Ok(None),
      t => Err(self.mismatch(Sort::Int, t)),
    }
  }

  fn bool_arg(self, arg: &Term) -> Result<Option<bool>, EvaluationError> {
    match arg {
      Term::Bool(b) => Ok(Some(*b)),
      t if t.is_value() => Err(self.mismatch(Sort::Bool, t)),
      t if t.sort().compatible(Sort::Bool) => Ok(None),
      t => Err(self.mismatch(Sort::Bool, t)),
    }
  }

  fn mismatch(self, expected: Sort, found: &Term) -> EvaluationError {
    EvaluationError::SortMismatch {
      symbol: self.symbol(),
      expected,
      found: found.to_string(),
    }
  }
}

// Decide `x ==K y` when the outermost constructors settle it.
fn equal_constructors(x: &Term, y: &Term) -> Option<bool> {
  if x == y {
    return Some(true);
  }
  if x.is_ground() && y.is_ground() {
    return Some(false);
  }
  match (x, y) {
    (Term::App(f, xs), Term::App(g, ys)) if !x.is_function() && !y.is_function() => {
      if f != g || xs.len() != ys.len() {
        Some(false)
      } else {
        None
      }
    }
    (Term::Cell(l, _), Term::Cell(m, _)) => if l != m { Some(false) } else { None },
    (Term::Var(_), _) | (_, Term::Var(_)) => None,
    _ if x.is_function() || y.is_function() => None,
    // two distinct kinds of constructor
    _ => Some(false),
  }
}

/// Symbolic terms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
  Var(Variable),
  Int(BigInt),
  Bool(bool),
  /// A token of a given sort, e.g. an identifier
  Token(Sort, Arc<str>),
  App(Arc<str>, Vec<Term>),
  Cell(CellLabel, Box<Term>),
}

impl Term {
  pub fn var(name: impl Into<Arc<str>>, sort: Sort) -> Self {
    Term::Var(Variable::new(name, sort))
  }

  pub fn int(n: i64) -> Self {
    Term::Int(BigInt::from(n))
  }

  pub fn token(sort: Sort, value: impl Into<Arc<str>>) -> Self {
    Term::Token(sort, value.into())
  }

  pub fn app(symbol: impl Into<Arc<str>>, args: Vec<Term>) -> Self {
    Term::App(symbol.into(), args)
  }

  /// A constructor without arguments.
  pub fn constant(symbol: impl Into<Arc<str>>) -> Self {
    Term::App(symbol.into(), Vec::new())
  }

  pub fn builtin(builtin: Builtin, args: Vec<Term>) -> Self {
    Term::App(builtin.symbol().into(), args)
  }

  pub fn cell(label: impl Into<CellLabel>, content: Term) -> Self {
    Term::Cell(label.into(), Box::new(content))
  }

  /// A bag of sibling cells.
  pub fn bag(cells: Vec<Term>) -> Self {
    Term::App(CELL_BAG.into(), cells)
  }

  pub fn dot_k() -> Self {
    Term::constant(DOT_K)
  }

  /// The K sequence `items ~> frame`, ending in `.K` when there is no frame.
  pub fn kseq(items: Vec<Term>, frame: Option<Variable>) -> Self {
    let tail = frame.map_or_else(Term::dot_k, Term::Var);
    items
      .into_iter()
      .rev()
      .fold(tail, |rest, item| Term::app(KSEQ, vec![item, rest]))
  }

  /// The equality of `x` and `y` at the most specific sort.
  pub fn equality(x: Term, y: Term) -> Self {
    if x.sort() == Sort::Int && y.sort() == Sort::Int {
      Term::builtin(Builtin::EqInt, vec![x, y])
    } else {
      Term::builtin(Builtin::EqK, vec![x, y])
    }
  }

  pub fn not(term: Term) -> Self {
    Term::builtin(Builtin::Not, vec![term])
  }

  pub fn sort(&self) -> Sort {
    match self {
      Term::Var(v) => v.sort(),
      Term::Int(_) => Sort::Int,
      Term::Bool(_) => Sort::Bool,
      Term::Token(sort, _) => *sort,
      Term::App(symbol, _) => Builtin::from_symbol(symbol).map_or(Sort::K, Builtin::result_sort),
      Term::Cell(_, _) => Sort::K,
    }
  }

  /// The builtin function at the top, if any.
  pub fn builtin_symbol(&self) -> Option<Builtin> {
    match self {
      Term::App(symbol, _) => Builtin::from_symbol(symbol),
      _ => None,
    }
  }

  /// Return true iff the term is an application of a builtin function.
  pub fn is_function(&self) -> bool {
    self.builtin_symbol().is_some()
  }

  /// Integer, boolean and token literals.
  pub fn is_value(&self) -> bool {
    matches!(self, Term::Int(_) | Term::Bool(_) | Term::Token(_, _))
  }

  /// Return true iff the term contains no variable and no function.
  pub fn is_ground(&self) -> bool {
    match self {
      Term::Var(_) => false,
      Term::App(_, args) => !self.is_function() && args.iter().all(Term::is_ground),
      Term::Cell(_, content) => content.is_ground(),
      _ => true,
    }
  }

  /// The constructor symbol at the top, if it is not a function.
  pub fn head_symbol(&self) -> Option<&Arc<str>> {
    match self {
      Term::App(symbol, _) if !self.is_function() => Some(symbol),
      _ => None,
    }
  }

  pub fn variables(&self) -> BTreeSet<Variable> {
    let mut vars = BTreeSet::new();
    self.collect_variables(&mut vars);
    vars
  }

  pub fn collect_variables(&self, vars: &mut BTreeSet<Variable>) {
    match self {
      Term::Var(v) => {
        vars.insert(v.clone());
      }
      Term::App(_, args) => args.iter().for_each(|arg| arg.collect_variables(vars)),
      Term::Cell(_, content) => content.collect_variables(vars),
      _ => {}
    }
  }

  pub fn contains_variable(&self, var: &Variable) -> bool {
    match self {
      Term::Var(v) => v == var,
      Term::App(_, args) => args.iter().any(|arg| arg.contains_variable(var)),
      Term::Cell(_, content) => content.contains_variable(var),
      _ => false,
    }
  }

  /// Replace variables, without evaluating.
  pub fn substitute(&self, substitution: &Substitution) -> Term {
    if substitution.is_empty() {
      return self.clone();
    }
    match self {
      Term::Var(v) => substitution.get(v).cloned().unwrap_or_else(|| self.clone()),
      Term::App(symbol, args) => Term::App(
        symbol.clone(),
        args.iter().map(|arg| arg.substitute(substitution)).collect(),
      ),
      Term::Cell(label, content) => Term::Cell(label.clone(), Box::new(content.substitute(substitution))),
      _ => self.clone(),
    }
  }

  /// Evaluate the builtin functions whose arguments are concrete, bottom up.
  pub fn evaluate(&self) -> Result<Term, EvaluationError> {
    match self {
      Term::App(symbol, args) => {
        let args = args.iter().map(Term::evaluate).collect::<Result<Vec<_>, _>>()?;
        match Builtin::from_symbol(symbol) {
          Some(builtin) => Ok(builtin
            .apply(&args)?
            .unwrap_or_else(|| Term::App(symbol.clone(), args))),
          None => Ok(Term::App(symbol.clone(), args)),
        }
      }
      Term::Cell(label, content) => Ok(Term::Cell(label.clone(), Box::new(content.evaluate()?))),
      _ => Ok(self.clone()),
    }
  }

  pub fn substitute_and_evaluate(&self, substitution: &Substitution) -> Result<Term, EvaluationError> {
    self.substitute(substitution).evaluate()
  }

  /// Contents of every cell labelled `label`, outermost first.
  pub fn cell_contents(&self, label: &str) -> Vec<&Term> {
    let mut contents = Vec::new();
    self.collect_cells(label, &mut contents);
    contents
  }

  fn collect_cells<'a>(&'a self, label: &str, contents: &mut Vec<&'a Term>) {
    match self {
      Term::Cell(l, content) => {
        if &**l == label {
          contents.push(content);
        }
        content.collect_cells(label, contents);
      }
      Term::App(_, args) => args.iter().for_each(|arg| arg.collect_cells(label, contents)),
      _ => {}
    }
  }

  pub fn contains_cell(&self) -> bool {
    match self {
      Term::Cell(_, _) => true,
      Term::App(_, args) => args.iter().any(Term::contains_cell),
      _ => false,
    }
  }

  /// Cells whose content holds no further cell, in order of occurrence.
  pub fn leaf_cells(&self) -> Vec<(&CellLabel, &Term)> {
    fn collect<'a>(term: &'a Term, cells: &mut Vec<(&'a CellLabel, &'a Term)>) {
      match term {
        Term::Cell(label, content) if !content.contains_cell() => cells.push((label, content)),
        Term::Cell(_, content) => collect(content, cells),
        Term::App(_, args) => args.iter().for_each(|arg| collect(arg, cells)),
        _ => {}
      }
    }
    let mut cells = Vec::new();
    collect(self, &mut cells);
    cells
  }

  /// Replace the content of the cells labelled `label`.
  /// Return `None` if there is no such cell.
  pub fn replace_cell(&self, label: &str, content: &Term) -> Option<Term> {
    match self {
      Term::Cell(l, _) if &**l == label => Some(Term::Cell(l.clone(), Box::new(content.clone()))),
      Term::Cell(l, inner) => inner
        .replace_cell(label, content)
        .map(|inner| Term::Cell(l.clone(), Box::new(inner))),
      Term::App(symbol, args) => {
        let mut replaced = false;
        let args = args
          .iter()
          .map(|arg| match arg.replace_cell(label, content) {
            Some(arg) => {
              replaced = true;
              arg
            }
            None => arg.clone(),
          })
          .collect();
        if replaced {
          Some(Term::App(symbol.clone(), args))
        } else {
          None
        }
      }
      _ => None,
    }
  }

  /// The first item of a K sequence, `None` if the sequence is empty or a variable.
  pub fn first_item(&self) -> Option<&Term> {
    match self {
      Term::App(symbol, args) if &**symbol == KSEQ && args.len() == 2 => Some(&args[0]),
      Term::App(symbol, _) if &**symbol == DOT_K => None,
      Term::Var(v) if v.sort() == Sort::K => None,
      item => Some(item),
    }
  }

  /// Split a K sequence into its items and a trailing K variable.
  pub fn split_content_and_frame(&self) -> (Term, Option<Variable>) {
    let mut items = Vec::new();
    let mut rest = self;
    loop {
      match rest {
        Term::App(symbol, args) if &**symbol == KSEQ && args.len() == 2 => {
          items.push(args[0].clone());
          rest = &args[1];
        }
        Term::App(symbol, _) if &**symbol == DOT_K => return (Term::kseq(items, None), None),
        Term::Var(v) if v.sort() == Sort::K => return (Term::kseq(items, None), Some(v.clone())),
        item => {
          items.push(item.clone());
          return (Term::kseq(items, None), None);
        }
      }
    }
  }
}

impl From<Variable> for Term {
  fn from(var: Variable) -> Self {
    Term::Var(var)
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Term::Var(v) => write!(f, "{}", v),
      Term::Int(n) => write!(f, "{}", n),
      Term::Bool(b) => write!(f, "{}", b),
      Term::Token(_, value) => write!(f, "{}", value),
      Term::App(symbol, args) if args.is_empty() => write!(f, "{}", symbol),
      Term::App(symbol, args) if &**symbol == CELL_BAG => write!(f, "{}", args.iter().format(" ")),
      Term::App(symbol, args) if args.len() == 2 && (&**symbol == KSEQ || self.is_function()) => {
        write!(f, "({} {} {})", args[0], symbol, args[1])
      }
      Term::App(symbol, args) => write!(f, "{}({})", symbol, args.iter().format(", ")),
      Term::Cell(label, content) => write!(f, "<{}> {} </{}>", label, content, label),
    }
  }
}
