use crate::{Config, NetworkPolicy, SourceWorkload, TargetService};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// The outcome of evaluating one peer (or an isolating policy) against the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub policy: String,
    pub reason: String,
    pub outcome: Outcome,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Allowed,
    Blocked,
    Unsupported,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    Allowed,
    Blocked,
}

/// The verdict to reach when the only decisions for the affecting policies are unsupported.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum UnsupportedFallback {
    Allow,
    #[default]
    Deny,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub target: TargetService,
    pub source: SourceWorkload,
    pub affecting_policies: Vec<NetworkPolicy>,
    pub allowing: Vec<PolicyDecision>,
    pub blocking: Vec<PolicyDecision>,
    pub unsupported: Vec<PolicyDecision>,
    pub verdict: Verdict,
}

/// Partitions decisions by outcome and computes the final verdict.
///
/// A target that no policy selects is allowed. Otherwise any allowing decision admits the
/// traffic, since rules are OR'd within and across policies.
pub fn aggregate(
    config: &Config,
    target: TargetService,
    source: SourceWorkload,
    affecting_policies: Vec<NetworkPolicy>,
    decisions: Vec<PolicyDecision>,
) -> EvaluationResult {
    let mut allowing = Vec::new();
    let mut blocking = Vec::new();
    let mut unsupported = Vec::new();
    for decision in decisions {
        match decision.outcome {
            Outcome::Allowed => allowing.push(decision),
            Outcome::Blocked => blocking.push(decision),
            Outcome::Unsupported => unsupported.push(decision),
        }
    }

    let verdict = if affecting_policies.is_empty() || !allowing.is_empty() {
        Verdict::Allowed
    } else if !blocking.is_empty() {
        Verdict::Blocked
    } else {
        debug!(
            unsupported = unsupported.len(),
            fallback = ?config.unsupported_fallback,
            "No supported decisions"
        );
        match config.unsupported_fallback {
            UnsupportedFallback::Allow => Verdict::Allowed,
            UnsupportedFallback::Deny => Verdict::Blocked,
        }
    };

    EvaluationResult {
        target,
        source,
        affecting_policies,
        allowing,
        blocking,
        unsupported,
        verdict,
    }
}

// === impl PolicyDecision ===

impl PolicyDecision {
    pub fn allowed(policy: &NetworkPolicy, reason: impl Into<String>) -> Self {
        Self::new(policy, reason, Outcome::Allowed)
    }

    pub fn blocked(policy: &NetworkPolicy, reason: impl Into<String>) -> Self {
        Self::new(policy, reason, Outcome::Blocked)
    }

    pub fn unsupported(policy: &NetworkPolicy, reason: impl Into<String>) -> Self {
        Self::new(policy, reason, Outcome::Unsupported)
    }

    fn new(policy: &NetworkPolicy, reason: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            policy: policy.name.clone(),
            reason: reason.into(),
            outcome,
        }
    }
}

// === impl EvaluationResult ===

impl EvaluationResult {
    /// Returns false when no policy selects the target, so traffic is allowed by default.
    pub fn is_affected(&self) -> bool {
        !self.affecting_policies.is_empty()
    }

    /// Returns true if some peers could not be evaluated, so the verdict may not reflect how the
    /// cluster actually treats the traffic.
    pub fn is_incomplete(&self) -> bool {
        !self.unsupported.is_empty()
    }

    /// Returns the fallback that decided the verdict when every decision was unsupported.
    pub fn decided_by_fallback(&self) -> Option<UnsupportedFallback> {
        if !self.is_affected() || !self.allowing.is_empty() || !self.blocking.is_empty() {
            return None;
        }
        Some(match self.verdict {
            Verdict::Allowed => UnsupportedFallback::Allow,
            Verdict::Blocked => UnsupportedFallback::Deny,
        })
    }
}

// === impl Verdict ===

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => f.write_str("Allowed"),
            Self::Blocked => f.write_str("Disallowed"),
        }
    }
}

// === impl UnsupportedFallback ===

impl std::str::FromStr for UnsupportedFallback {
    type Err = InvalidFallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            s => Err(InvalidFallback(s.to_string())),
        }
    }
}

impl fmt::Display for UnsupportedFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid fallback {0:?}; expected `allow` or `deny`")]
pub struct InvalidFallback(String);
