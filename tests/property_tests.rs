//! Property-based tests for the rewrite drivers
//!
//! These check determinism, bound respect and the transparency of the
//! disabled-rule cache over randomized inputs.

mod common;

use common::*;
use proptest::prelude::*;
use symbolic_rewrite::solver::SyntacticOracle;
use symbolic_rewrite::{
  ConstrainedTerm, Definition, RewriterOptions, SearchPattern, SearchType, Sort, Substitution, SymbolicRewriter, Term,
};

// ============================================================================
// Helper functions
// ============================================================================

fn search_type() -> impl Strategy<Value = SearchType> {
  prop_oneof![
    Just(SearchType::One),
    Just(SearchType::Star),
    Just(SearchType::Final),
    Just(SearchType::Plus),
  ]
}

fn run_search(
  definition: &Definition,
  flips_count: i64,
  bound: Option<usize>,
  depth: Option<usize>,
  search_type: SearchType,
  disabled_rule_cache: bool,
) -> Vec<Substitution> {
  let options = RewriterOptions {
    transitions: ["transition".to_string()].into_iter().collect(),
    disabled_rule_cache,
    ..RewriterOptions::default()
  };
  let pattern = SearchPattern::new(coins_config(Term::var("_K", Sort::K), int_var("Coins")));
  let mut rewriter = SymbolicRewriter::new(definition, options).with_oracle(SyntacticOracle);
  let results = rewriter
    .search(flips(flips_count), &pattern, bound, depth, search_type)
    .unwrap();
  assert_eq!(rewriter.live_states(), 0);
  results
}

// ============================================================================
// Search properties
// ============================================================================

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn prop_search_is_deterministic(
    n in 0i64..4,
    bound in proptest::option::of(0usize..10),
    depth in proptest::option::of(0usize..5),
    ty in search_type(),
  ) {
    let definition = branching();
    let first = run_search(&definition, n, bound, depth, ty, true);
    let second = run_search(&definition, n, bound, depth, ty, true);
    prop_assert_eq!(first, second);
  }

  #[test]
  fn prop_search_respects_result_bound(
    n in 0i64..4,
    bound in 0usize..10,
    depth in proptest::option::of(0usize..5),
    ty in search_type(),
  ) {
    let results = run_search(&branching(), n, Some(bound), depth, ty, true);
    prop_assert!(results.len() <= bound);
  }

  #[test]
  fn prop_cache_is_transparent(
    n in 0i64..4,
    bound in proptest::option::of(0usize..10),
    depth in proptest::option::of(0usize..5),
    ty in search_type(),
  ) {
    let definition = branching();
    let cached = run_search(&definition, n, bound, depth, ty, true);
    let uncached = run_search(&definition, n, bound, depth, ty, false);
    prop_assert_eq!(cached, uncached);
  }

  #[test]
  fn prop_cache_is_transparent_for_disjoint_cells(
    a in 0i64..3,
    b in 0i64..3,
    bound in proptest::option::of(1usize..8),
    depth in 1usize..6,
  ) {
    let (definition, _) = two_cells();
    let pattern = SearchPattern::new(Term::bag(vec![
      Term::cell("a", int_var("A").into()),
      Term::cell("b", int_var("B").into()),
    ]));
    let search = |disabled_rule_cache| {
      let options = RewriterOptions {
        disabled_rule_cache,
        ..RewriterOptions::default()
      };
      SymbolicRewriter::new(&definition, options)
        .with_oracle(SyntacticOracle)
        .search(two_cells_state(a, b).term, &pattern, bound, Some(depth), SearchType::Star)
        .unwrap()
    };
    prop_assert_eq!(search(true), search(false));
  }

  #[test]
  fn prop_one_step_search_finds_direct_successors(n in 1i64..4) {
    // the first transition flips one coin
    let results = run_search(&branching(), n, None, None, SearchType::One, true);
    prop_assert_eq!(results.len(), 2);
  }
}

// ============================================================================
// Execution properties
// ============================================================================

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn prop_execute_counts_bounded_steps(start in -100i64..100, bound in 0usize..20) {
    let definition = counter();
    let mut rewriter = SymbolicRewriter::new(&definition, RewriterOptions::default()).with_oracle(SyntacticOracle);
    let execution = rewriter
      .execute(ConstrainedTerm::unconstrained(Term::cell("x", Term::int(start))), Some(bound))
      .unwrap();
    prop_assert_eq!(execution.steps, bound);
    prop_assert_eq!(execution.state.term, Term::cell("x", Term::int(start + bound as i64)));
  }

  #[test]
  fn prop_countdown_terminates_at_zero(start in 0i64..30) {
    let definition = countdown();
    let mut rewriter = SymbolicRewriter::new(&definition, RewriterOptions::default()).with_oracle(SyntacticOracle);
    let initial = countdown_config(Term::kseq(vec![Term::constant("loop")], None), Term::int(start));
    let execution = rewriter.execute(ConstrainedTerm::unconstrained(initial), None).unwrap();
    prop_assert!(execution.status.is_final());
    prop_assert_eq!(execution.steps, start as usize + 1);
  }
}
