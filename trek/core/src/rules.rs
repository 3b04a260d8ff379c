use crate::{ports_admit, NetworkPolicy, Peer, PolicyDecision, SourceWorkload, TargetService};
use tracing::{trace, warn};
use trek_k8s_api::{Labels, Selector};

pub const ISOLATING_POLICY: &str = "Isolating Policy";
pub const UNSUPPORTED: &str = "Unsupported";
pub const BLOCKED_BY_PORTS: &str = "Blocked by Ports";
pub const ALLOWED_FROM_ALL_SOURCES: &str = "Allowed from All Sources";

/// How a single peer classifies the source, before ports are considered.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PeerMatch {
    Allowed(String),
    Blocked(String),
    Unsupported,
}

/// Evaluates a policy's ingress rules against the source workload.
///
/// `namespace_labels` are the labels of the source's namespace. Decisions are returned in rule
/// and peer order.
pub fn evaluate_policy(
    policy: &NetworkPolicy,
    source: &SourceWorkload,
    namespace_labels: &Labels,
    target: &TargetService,
) -> Vec<PolicyDecision> {
    if policy.is_isolating() {
        trace!(policy = %policy.name, "Isolating");
        return vec![PolicyDecision::blocked(policy, ISOLATING_POLICY)];
    }

    let mut decisions = Vec::new();
    for rule in &policy.ingress {
        let admit = |reason: String| {
            if ports_admit(&rule.ports, target) {
                PolicyDecision::allowed(policy, reason)
            } else {
                PolicyDecision::blocked(policy, BLOCKED_BY_PORTS)
            }
        };

        if rule.peers.is_empty() {
            decisions.push(admit(ALLOWED_FROM_ALL_SOURCES.to_string()));
            continue;
        }

        for peer in &rule.peers {
            let decision = match match_peer(peer, source, namespace_labels) {
                PeerMatch::Allowed(reason) => admit(reason),
                PeerMatch::Blocked(reason) => PolicyDecision::blocked(policy, reason),
                PeerMatch::Unsupported => {
                    warn!(policy = %policy.name, ?peer, "IP block peers are not evaluated");
                    PolicyDecision::unsupported(policy, UNSUPPORTED)
                }
            };
            trace!(
                policy = %policy.name,
                outcome = ?decision.outcome,
                reason = %decision.reason,
                "Evaluated peer",
            );
            decisions.push(decision);
        }
    }

    decisions
}

fn match_peer(peer: &Peer, source: &SourceWorkload, namespace_labels: &Labels) -> PeerMatch {
    match peer {
        Peer::IpBlock { .. } => PeerMatch::Unsupported,

        Peer::NamespaceSelector(sel) => {
            if sel.matches(namespace_labels) {
                PeerMatch::Allowed(format!("Allowed by Namespace Selector : {sel}"))
            } else {
                PeerMatch::Blocked(format!("Disallowed by Namespace Selector : {sel}"))
            }
        }

        Peer::PodSelector(sel) => {
            if sel.matches(&source.labels) {
                PeerMatch::Allowed(format!("Allowed by Pod Selector : {sel}"))
            } else {
                PeerMatch::Blocked(format!("Disallowed by Pod Selector : {sel}"))
            }
        }

        Peer::NamespaceAndPodSelector { namespace, pod } => {
            match_combined(namespace, pod, namespace_labels, &source.labels)
        }
    }
}

/// Both selectors must match for a combined peer to admit the source.
fn match_combined(
    ns: &Selector,
    pod: &Selector,
    ns_labels: &Labels,
    pod_labels: &Labels,
) -> PeerMatch {
    match (ns.matches(ns_labels), pod.matches(pod_labels)) {
        (true, true) => {
            PeerMatch::Allowed(format!("Allowed by Namespace ({ns}) && Pod ({pod}) Selectors"))
        }
        (false, true) => PeerMatch::Blocked(format!(
            "Allowed by Pod Selector ({pod}) but Disallowed by Namespace ({ns})"
        )),
        (true, false) => PeerMatch::Blocked(format!(
            "Allowed by Namespace Selector ({ns}) but Disallowed by Pod ({pod})"
        )),
        (false, false) => PeerMatch::Blocked(format!(
            "Disallowed by Namespace ({ns}) && Pod ({pod}) Selectors"
        )),
    }
}
