#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Decides whether a source workload may reach a target service under the `NetworkPolicy`
//! objects installed in the target's namespace.
//!
//! An evaluation runs in three stages: the policies that select the target are found, each of
//! their ingress rules is evaluated against the source, and the resulting decisions are
//! aggregated into a single verdict.

mod affecting;
mod decision;
mod lookup;
mod policy;
mod ports;
mod rules;
mod target;


pub use self::{
    affecting::select_affecting,
    decision::{
        aggregate, EvaluationResult, InvalidFallback, Outcome, PolicyDecision,
        UnsupportedFallback, Verdict,
    },
    lookup::{Lookup, LookupError},
    policy::{IngressRule, NetworkPolicy, Peer, PortRule},
    ports::ports_admit,
    rules::{
        evaluate_policy, ALLOWED_FROM_ALL_SOURCES, BLOCKED_BY_PORTS, ISOLATING_POLICY, UNSUPPORTED,
    },
    target::{ParseTargetError, ServiceRef, SourceWorkload, TargetService},
};
pub use ipnet::IpNet;
pub use trek_k8s_api::{labels, Labels, Selector};

use tracing::{debug, instrument};

/// Options that influence an evaluation.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub unsupported_fallback: UnsupportedFallback,
}

/// Evaluates whether `source` may reach `target`.
///
/// All cluster state is read before any decision is made, so a lookup failure aborts the
/// evaluation without producing a partial result.
#[instrument(skip_all, fields(target = %target, source = %source))]
pub async fn evaluate<L>(
    lookup: &L,
    config: &Config,
    target: TargetService,
    source: SourceWorkload,
) -> Result<EvaluationResult, LookupError>
where
    L: Lookup + ?Sized,
{
    let target_labels = lookup
        .service_selector(&target.namespace, &target.name)
        .await?;
    if target_labels.is_empty() {
        debug!("Service has no selector");
    }

    let policies = lookup.network_policies(&target.namespace).await?;
    let affecting = select_affecting(&target_labels, policies);
    debug!(policies = affecting.len(), "Selected affecting policies");

    let namespace_labels = if affecting.iter().any(NetworkPolicy::selects_namespaces) {
        lookup.namespace_labels(&source.namespace).await?
    } else {
        Labels::default()
    };

    let decisions = affecting
        .iter()
        .flat_map(|policy| evaluate_policy(policy, &source, &namespace_labels, &target))
        .collect::<Vec<_>>();

    let result = aggregate(config, target, source, affecting, decisions);
    debug!(
        verdict = ?result.verdict,
        allowing = result.allowing.len(),
        blocking = result.blocking.len(),
        unsupported = result.unsupported.len(),
        "Evaluated",
    );
    Ok(result)
}
