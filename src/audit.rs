//! Rule auditing: a debugging hook around rule application.

use crate::rule::RuleId;

/// Decides which rule applications are under audit. The rewriter fails
/// with [`crate::error::RewriteError::AuditFailed`] when an audited
/// application produces no successor.
pub trait RuleAudit {
  fn audits(&self, step: usize, rule: RuleId) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudit;

impl RuleAudit for NoAudit {
  fn audits(&self, _step: usize, _rule: RuleId) -> bool {
    false
  }
}

/// Audit one rule, at one step or at every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditRule {
  pub rule: RuleId,
  pub step: Option<usize>,
}

impl RuleAudit for AuditRule {
  fn audits(&self, step: usize, rule: RuleId) -> bool {
    rule == self.rule && self.step.map_or(true, |s| s == step)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn audit_matches_rule_and_step() {
    let audit = AuditRule {
      rule: RuleId(2),
      step: Some(3),
    };
    assert!(audit.audits(3, RuleId(2)));
    assert!(!audit.audits(4, RuleId(2)));
    assert!(!audit.audits(3, RuleId(1)));
    assert!(!NoAudit.audits(3, RuleId(2)));
  }
}
