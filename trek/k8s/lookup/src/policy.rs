//! Converts `networking.k8s.io/v1` objects into the ingress model evaluated by `trek-core`.

use trek_core::{IngressRule, IpNet, LookupError, NetworkPolicy, Peer, PortRule};
use trek_k8s_api::{self as k8s, IntOrString, ResourceExt, Selector};

const KIND: &str = "networkpolicy";

pub(crate) fn convert(np: k8s::NetworkPolicy) -> Result<NetworkPolicy, LookupError> {
    let name = np.name_unchecked();
    let qualified = format!("{}/{}", np.namespace().unwrap_or_default(), name);
    let invalid = |reason: String| LookupError::Invalid {
        kind: KIND,
        name: qualified.clone(),
        reason,
    };

    let spec = np.spec.unwrap_or_default();
    let pod_selector = Selector::try_from(&spec.pod_selector)
        .map_err(|error| invalid(format!("podSelector: {error}")))?;

    let ingress = spec
        .ingress
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, rule)| {
            ingress_rule(rule).map_err(|reason| invalid(format!("ingress[{i}]: {reason}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NetworkPolicy {
        name,
        pod_selector,
        ingress,
    })
}

fn ingress_rule(rule: k8s::NetworkPolicyIngressRule) -> Result<IngressRule, String> {
    let peers = rule
        .from
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, p)| peer(p).map_err(|reason| format!("from[{i}]: {reason}")))
        .collect::<Result<Vec<_>, _>>()?;

    let ports = rule.ports.into_iter().flatten().map(port).collect();

    Ok(IngressRule { peers, ports })
}

fn peer(peer: k8s::NetworkPolicyPeer) -> Result<Peer, String> {
    let k8s::NetworkPolicyPeer {
        ip_block,
        namespace_selector,
        pod_selector,
    } = peer;

    match (ip_block, namespace_selector, pod_selector) {
        (Some(block), None, None) => {
            let cidr = parse_net(&block.cidr)?;
            let except = block
                .except
                .iter()
                .flatten()
                .map(|net| parse_net(net))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Peer::IpBlock { cidr, except })
        }
        (Some(_), _, _) => Err("ipBlock may not be combined with selectors".to_string()),
        (None, Some(ns), None) => Ok(Peer::NamespaceSelector(
            Selector::try_from(&ns).map_err(|e| format!("namespaceSelector: {e}"))?,
        )),
        (None, None, Some(pod)) => Ok(Peer::PodSelector(
            Selector::try_from(&pod).map_err(|e| format!("podSelector: {e}"))?,
        )),
        (None, Some(ns), Some(pod)) => Ok(Peer::NamespaceAndPodSelector {
            namespace: Selector::try_from(&ns).map_err(|e| format!("namespaceSelector: {e}"))?,
            pod: Selector::try_from(&pod).map_err(|e| format!("podSelector: {e}"))?,
        }),
        (None, None, None) => {
            Err("peer must set one of ipBlock, namespaceSelector, or podSelector".to_string())
        }
    }
}

fn port(port: k8s::NetworkPolicyPort) -> PortRule {
    if let Some(end) = port.end_port {
        tracing::debug!(
            port = ?port.port,
            end,
            "Port ranges are matched on their first port only"
        );
    }

    PortRule {
        port: port.port.map(|p| match p {
            IntOrString::Int(n) => n.to_string(),
            IntOrString::String(name) => name,
        }),
        protocol: port.protocol,
    }
}

fn parse_net(net: &str) -> Result<IpNet, String> {
    net.parse()
        .map_err(|error| format!("invalid CIDR {net:?}: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s::{
        IPBlock, LabelSelector, LabelSelectorRequirement, NetworkPolicyPeer, NetworkPolicyPort,
        ObjectMeta,
    };
    use maplit::btreemap;
    use trek_k8s_api::Labels;

    fn labels(k: &str, v: &str) -> LabelSelector {
        LabelSelector {
            match_labels: Some(btreemap! { k.to_string() => v.to_string() }),
            ..Default::default()
        }
    }

    fn mk_policy(ingress: Option<Vec<k8s::NetworkPolicyIngressRule>>) -> k8s::NetworkPolicy {
        k8s::NetworkPolicy {
            metadata: ObjectMeta {
                namespace: Some("prod".to_string()),
                name: Some("web".to_string()),
                ..Default::default()
            },
            spec: Some(k8s::NetworkPolicySpec {
                pod_selector: labels("app", "web"),
                ingress,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn isolating_policy() {
        let np = convert(mk_policy(None)).unwrap();
        assert_eq!(np.name, "web");
        assert!(np.is_isolating());
        assert!(np
            .pod_selector
            .matches(&Labels::from_iter(Some(("app", "web")))));
    }

    #[test]
    fn peers_and_ports() {
        let np = convert(mk_policy(Some(vec![k8s::NetworkPolicyIngressRule {
            from: Some(vec![
                NetworkPolicyPeer {
                    pod_selector: Some(labels("app", "client")),
                    ..Default::default()
                },
                NetworkPolicyPeer {
                    namespace_selector: Some(labels("team", "frontend")),
                    ..Default::default()
                },
                NetworkPolicyPeer {
                    namespace_selector: Some(LabelSelector::default()),
                    pod_selector: Some(labels("app", "client")),
                    ..Default::default()
                },
                NetworkPolicyPeer {
                    ip_block: Some(IPBlock {
                        cidr: "10.0.0.0/8".to_string(),
                        except: Some(vec!["10.1.0.0/16".to_string()]),
                    }),
                    ..Default::default()
                },
            ]),
            ports: Some(vec![
                NetworkPolicyPort {
                    port: Some(IntOrString::Int(8080)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                },
                NetworkPolicyPort {
                    port: Some(IntOrString::String("http".to_string())),
                    protocol: None,
                    ..Default::default()
                },
            ]),
        }])))
        .unwrap();

        let rule = &np.ingress[0];
        assert_eq!(
            rule.peers,
            vec![
                Peer::PodSelector(Selector::from_iter(Some(("app", "client")))),
                Peer::NamespaceSelector(Selector::from_iter(Some(("team", "frontend")))),
                Peer::NamespaceAndPodSelector {
                    namespace: Selector::default(),
                    pod: Selector::from_iter(Some(("app", "client"))),
                },
                Peer::IpBlock {
                    cidr: "10.0.0.0/8".parse().unwrap(),
                    except: vec!["10.1.0.0/16".parse().unwrap()],
                },
            ]
        );
        assert_eq!(
            rule.ports,
            vec![
                PortRule {
                    port: Some("8080".to_string()),
                    protocol: Some("TCP".to_string()),
                },
                PortRule {
                    port: Some("http".to_string()),
                    protocol: None,
                },
            ]
        );
    }

    #[test]
    fn empty_from_admits_all_sources() {
        let rule = k8s::NetworkPolicyIngressRule::default();
        let np = convert(mk_policy(Some(vec![rule]))).unwrap();
        assert_eq!(np.ingress, vec![IngressRule::default()]);
        assert!(!np.is_isolating());
    }

    #[test]
    fn rejects_invalid_peers() {
        for peer in [
            NetworkPolicyPeer::default(),
            NetworkPolicyPeer {
                ip_block: Some(IPBlock {
                    cidr: "10.0.0.0/8".to_string(),
                    except: None,
                }),
                pod_selector: Some(labels("app", "client")),
                ..Default::default()
            },
            NetworkPolicyPeer {
                ip_block: Some(IPBlock {
                    cidr: "not-a-network".to_string(),
                    except: None,
                }),
                ..Default::default()
            },
        ] {
            let np = mk_policy(Some(vec![k8s::NetworkPolicyIngressRule {
                from: Some(vec![peer]),
                ports: None,
            }]));
            let err = convert(np).unwrap_err();
            assert!(
                matches!(&err, LookupError::Invalid { name, .. } if name == "prod/web"),
                "{err}"
            );
        }
    }

    #[test]
    fn pod_selector_expressions() {
        let mut np = mk_policy(None);
        let spec = np.spec.as_mut().unwrap();
        spec.pod_selector = LabelSelector {
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "app".to_string(),
                operator: "In".to_string(),
                values: Some(vec!["web".to_string(), "api".to_string()]),
            }]),
            ..Default::default()
        };
        let converted = convert(np.clone()).unwrap();
        assert_eq!(converted.pod_selector.to_string(), "app in (api,web)");
        assert!(converted
            .pod_selector
            .matches(&Labels::from_iter(Some(("app", "api")))));

        np.spec.as_mut().unwrap().pod_selector.match_expressions = Some(vec![
            LabelSelectorRequirement {
                key: "app".to_string(),
                operator: "Matches".to_string(),
                values: None,
            },
        ]);
        let err = convert(np).unwrap_err();
        assert!(
            matches!(&err, LookupError::Invalid { reason, .. } if reason.starts_with("podSelector: ")),
            "{err}"
        );
    }

    #[test]
    fn missing_spec_selects_all_pods_and_isolates() {
        let np = k8s::NetworkPolicy {
            metadata: ObjectMeta {
                namespace: Some("prod".to_string()),
                name: Some("deny-all".to_string()),
                ..Default::default()
            },
            spec: None,
        };
        let np = convert(np).unwrap();
        assert!(np.is_isolating());
        assert!(np.pod_selector.matches(&Labels::default()));
    }
}
