//! Engine configuration.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::OptionsError;

/// Which states a search reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
  /// States reachable in exactly one transition
  One,
  /// States reachable in zero or more transitions
  Star,
  /// States without successors, or at exactly the depth bound
  Final,
  /// States reachable in one or more transitions
  Plus,
}

impl FromStr for SearchType {
  type Err = OptionsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "=>1" | "one" => Ok(SearchType::One),
      "=>*" | "star" => Ok(SearchType::Star),
      "=>!" | "final" => Ok(SearchType::Final),
      "=>+" | "plus" => Ok(SearchType::Plus),
      _ => Err(OptionsError::UnknownSearchType(s.to_string())),
    }
  }
}

impl fmt::Display for SearchType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SearchType::One => write!(f, "=>1"),
      SearchType::Star => write!(f, "=>*"),
      SearchType::Final => write!(f, "=>!"),
      SearchType::Plus => write!(f, "=>+"),
    }
  }
}

/// The search flags of the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFlags {
  /// `--search`: `=>*` with a depth bound, `=>!` without
  pub search: bool,
  pub search_final: bool,
  pub search_all: bool,
  pub search_one_step: bool,
  pub search_one_or_more_steps: bool,
}

impl SearchFlags {
  /// Resolve the flags to a search type, `None` if no search was requested.
  pub fn search_type(&self, depth: Option<usize>) -> Result<Option<SearchType>, OptionsError> {
    let requested = [
      (self.search, if depth.is_some() { SearchType::Star } else { SearchType::Final }),
      (self.search_final, SearchType::Final),
      (self.search_all, SearchType::Star),
      (self.search_one_step, SearchType::One),
      (self.search_one_or_more_steps, SearchType::Plus),
    ];
    let mut selected = requested.iter().filter(|(set, _)| *set).map(|(_, ty)| *ty);
    match (selected.next(), selected.next()) {
      (None, _) => Ok(None),
      (Some(ty), None) => Ok(Some(ty)),
      (Some(_), Some(_)) => Err(OptionsError::ConflictingSearchTypes),
    }
  }
}

/// Options of a [`crate::rewriter::SymbolicRewriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriterOptions {
  /// Attributes marking transition rules; empty makes every rule a transition
  pub transitions: BTreeSet<String>,
  /// Skip rules known to fail at a state
  pub disabled_rule_cache: bool,
  /// Log the collected statistics when a driver returns
  pub statistics: bool,
  pub solver_timeout_ms: Option<u64>,
}

impl Default for RewriterOptions {
  fn default() -> Self {
    Self {
      transitions: BTreeSet::new(),
      disabled_rule_cache: true,
      statistics: false,
      solver_timeout_ms: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_search_depends_on_depth() {
    let flags = SearchFlags {
      search: true,
      ..SearchFlags::default()
    };
    assert_eq!(flags.search_type(None), Ok(Some(SearchType::Final)));
    assert_eq!(flags.search_type(Some(3)), Ok(Some(SearchType::Star)));
    assert_eq!(SearchFlags::default().search_type(None), Ok(None));
  }

  #[test]
  fn conflicting_flags_are_rejected() {
    let flags = SearchFlags {
      search_all: true,
      search_one_step: true,
      ..SearchFlags::default()
    };
    assert_eq!(flags.search_type(None), Err(OptionsError::ConflictingSearchTypes));
    assert_eq!(
      OptionsError::ConflictingSearchTypes.to_string(),
      "You can specify only one type of search."
    );
  }

  #[test]
  fn search_type_syntax() {
    for ty in [SearchType::One, SearchType::Star, SearchType::Final, SearchType::Plus] {
      assert_eq!(ty.to_string().parse::<SearchType>(), Ok(ty));
    }
    assert!("=>?".parse::<SearchType>().is_err());
  }
}
