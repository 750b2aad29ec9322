mod demo;

use std::error::Error;
use std::process;

use clap::Parser;
use symbolic_rewrite::metrics::Statistics;
use symbolic_rewrite::options::SearchFlags;
use symbolic_rewrite::output::{exit_code, render_search_results};
use symbolic_rewrite::solver::Z3Oracle;
use symbolic_rewrite::{ConstrainedTerm, RewriterOptions, SymbolicRewriter};
use tracing::error;

use demo::DemoName;

/// Symbolic rewriting of the built-in definitions
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Definition to rewrite
    #[clap(arg_enum, default_value = "counter")]
    definition: DemoName,
    /// Input of the initial configuration
    #[clap(short, long, default_value_t = 3)]
    input: i64,
    /// Maximum number of steps to execute, or of search results
    #[clap(long)]
    bound: Option<usize>,
    /// Maximum number of transitions a search takes
    #[clap(long)]
    depth: Option<usize>,
    /// Search for final states, or all states with --depth
    #[clap(long)]
    search: bool,
    #[clap(long)]
    search_final: bool,
    #[clap(long)]
    search_all: bool,
    #[clap(long)]
    search_one_step: bool,
    #[clap(long)]
    search_one_or_more_steps: bool,
    /// Prove the definition's reachability claim
    #[clap(long)]
    prove: bool,
    /// Attribute marking transition rules; defaults to the definition's
    #[clap(long = "transition")]
    transitions: Vec<String>,
    /// Do not remember rules that failed at a state
    #[clap(long)]
    no_rule_cache: bool,
    /// Solver timeout in milliseconds
    #[clap(long)]
    solver_timeout: Option<u64>,
    /// Print statistics to stderr
    #[clap(long)]
    statistics: bool,
}

fn main() {
  tracing_subscriber::fmt::init();
  let args = Args::parse();
  match run(args) {
    Ok(code) => process::exit(code),
    Err(err) => {
      error!("{}", err);
      process::exit(1)
    }
  }
}

fn run(args: Args) -> Result<i32, Box<dyn Error>> {
  let demo = args.definition.build(args.input);
  let flags = SearchFlags {
    search: args.search,
    search_final: args.search_final,
    search_all: args.search_all,
    search_one_step: args.search_one_step,
    search_one_or_more_steps: args.search_one_or_more_steps,
  };
  let search_type = flags.search_type(args.depth)?;

  let transitions = if args.transitions.is_empty() {
    demo.transitions.iter().map(|tag| tag.to_string()).collect()
  } else {
    args.transitions.iter().cloned().collect()
  };
  let options = RewriterOptions {
    transitions,
    disabled_rule_cache: !args.no_rule_cache,
    statistics: args.statistics,
    solver_timeout_ms: args.solver_timeout,
  };
  let mut rewriter = SymbolicRewriter::new(&demo.definition, options).with_metrics(Statistics::default());

  let code = if let Some(search_type) = search_type {
    let results = rewriter.search(demo.initial, &demo.pattern, args.bound, args.depth, search_type)?;
    print!("{}", render_search_results(&results));
    0
  } else if args.prove {
    let (initial, target) = demo.claim;
    let residuals = rewriter.prove(initial, &target, &demo.lemmas)?;
    if residuals.is_empty() {
      println!("true");
    }
    for residual in &residuals {
      println!("{}", residual);
    }
    if residuals.is_empty() { 0 } else { 1 }
  } else {
    let execution = rewriter.execute(ConstrainedTerm::unconstrained(demo.initial), args.bound)?;
    println!("{}", execution.state);
    println!("[{} after {} steps]", execution.status, execution.steps);
    exit_code(&execution.state, &demo.exit_pattern, &Z3Oracle::with_timeout(args.solver_timeout))?
  };

  if args.statistics {
    eprintln!("{}", rewriter.metrics());
  }
  Ok(code)
}
