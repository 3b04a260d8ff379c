use crate::IpNet;
use serde::Serialize;
use trek_k8s_api::Selector;

/// An ingress-only view of a `NetworkPolicy`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    pub name: String,
    pub pod_selector: Selector,

    /// When empty, the policy isolates the pods it selects.
    pub ingress: Vec<IngressRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngressRule {
    /// Admissible sources. An empty list admits traffic from any source.
    pub peers: Vec<Peer>,

    /// An empty list admits traffic on any port.
    pub ports: Vec<PortRule>,
}

/// Describes one admissible source of traffic in an ingress rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Peer {
    /// Literal address blocks are not evaluated.
    IpBlock { cidr: IpNet, except: Vec<IpNet> },
    NamespaceSelector(Selector),
    PodSelector(Selector),
    NamespaceAndPodSelector { namespace: Selector, pod: Selector },
}

/// A port restriction. `None` fields match any value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PortRule {
    pub port: Option<String>,
    pub protocol: Option<String>,
}

// === impl NetworkPolicy ===

impl NetworkPolicy {
    pub fn is_isolating(&self) -> bool {
        self.ingress.is_empty()
    }

    /// Returns true if any peer in the policy depends on the source namespace's labels.
    pub fn selects_namespaces(&self) -> bool {
        self.ingress
            .iter()
            .flat_map(|rule| rule.peers.iter())
            .any(|peer| {
                matches!(
                    peer,
                    Peer::NamespaceSelector(_) | Peer::NamespaceAndPodSelector { .. }
                )
            })
    }
}
