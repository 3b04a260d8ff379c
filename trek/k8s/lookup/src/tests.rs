use super::*;
use http::{Request, Response, StatusCode};
use kube::client::Body;
use serde_json::{json, Value};
use trek_core::Peer;
use trek_k8s_api::Selector;

/// Builds a lookup backed by a mock API server that answers a fixed set of paths.
fn mock_cluster() -> KubeLookup {
    let (svc, mut handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    tokio::spawn(async move {
        while let Some((req, send)) = handle.next_request().await {
            let (status, body) = respond(req.uri().path());
            let rsp = Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap();
            send.send_response(rsp);
        }
    });
    KubeLookup::new(kube::Client::new(svc, "default"))
}

fn respond(path: &str) -> (StatusCode, Value) {
    match path {
        "/api/v1/namespaces/dev/pods/client" => (
            StatusCode::OK,
            json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {
                    "name": "client",
                    "namespace": "dev",
                    "labels": { "app": "client" }
                }
            }),
        ),
        "/api/v1/namespaces/dev" => status(StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        "/api/v1/namespaces/prod" => (
            StatusCode::OK,
            json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": "prod", "labels": { "team": "web" } }
            }),
        ),
        "/api/v1/namespaces/prod/services/headless" => (
            StatusCode::OK,
            json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": { "name": "headless", "namespace": "prod" },
                "spec": { "ports": [{ "port": 80 }] }
            }),
        ),
        "/api/v1/namespaces/prod/services/web" => (
            StatusCode::OK,
            json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": { "name": "web", "namespace": "prod" },
                "spec": { "selector": { "app": "web" }, "ports": [{ "port": 8080 }] }
            }),
        ),
        "/apis/networking.k8s.io/v1/namespaces/prod/networkpolicies" => (
            StatusCode::OK,
            json!({
                "apiVersion": "networking.k8s.io/v1",
                "kind": "NetworkPolicyList",
                "metadata": {},
                "items": [{
                    "apiVersion": "networking.k8s.io/v1",
                    "kind": "NetworkPolicy",
                    "metadata": { "name": "allow-client", "namespace": "prod" },
                    "spec": {
                        "podSelector": { "matchLabels": { "app": "web" } },
                        "ingress": [{
                            "from": [{ "podSelector": { "matchLabels": { "app": "client" } } }],
                            "ports": [{ "port": 8080, "protocol": "TCP" }]
                        }]
                    }
                }]
            }),
        ),
        _ => status(StatusCode::NOT_FOUND, "NotFound")
    }
}

fn status(code: StatusCode, reason: &str) -> (StatusCode, Value) {
    (
        code,
        json!({
            "apiVersion": "v1",
            "kind": "Status",
            "metadata": {},
            "status": "Failure",
            "message": reason,
            "reason": reason,
            "code": code.as_u16()
        }),
    )
}

#[tokio::test]
async fn reads_pod_labels() {
    let lookup = mock_cluster();
    let pod = lookup.pod("dev", "client").await.unwrap();
    assert_eq!(pod.name, "client");
    assert_eq!(pod.namespace, "dev");
    assert_eq!(pod.labels, Labels::from_iter(Some(("app", "client"))));
}

#[tokio::test]
async fn missing_pod_is_not_found() {
    let lookup = mock_cluster();
    let err = lookup.pod("dev", "missing").await.unwrap_err();
    assert!(
        matches!(&err, LookupError::NotFound { kind: "pod", name } if name == "dev/missing"),
        "{err}"
    );
}

#[tokio::test]
async fn server_errors_are_api_errors() {
    let lookup = mock_cluster();
    let err = lookup.namespace_labels("dev").await.unwrap_err();
    assert!(
        matches!(&err, LookupError::Api { kind: "namespace", name, .. } if name == "dev"),
        "{err}"
    );

    let labels = lookup.namespace_labels("prod").await.unwrap();
    assert_eq!(labels, Labels::from_iter(Some(("team", "web"))));
}

#[tokio::test]
async fn service_selectors() {
    let lookup = mock_cluster();
    let web = lookup.service_selector("prod", "web").await.unwrap();
    assert_eq!(web, Labels::from_iter(Some(("app", "web"))));

    let headless = lookup.service_selector("prod", "headless").await.unwrap();
    assert!(headless.is_empty());
    assert_eq!(headless, Labels::default());

    let err = lookup.service_selector("prod", "gone").await.unwrap_err();
    assert!(
        matches!(err, LookupError::NotFound { kind: "service", .. }),
        "{err}"
    );
}

#[tokio::test]
async fn lists_network_policies() {
    let lookup = mock_cluster();
    let policies = lookup.network_policies("prod").await.unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].name, "allow-client");
    assert!(policies[0]
        .pod_selector
        .matches(&Labels::from_iter(Some(("app", "web")))));
    assert_eq!(
        policies[0].ingress[0].peers,
        vec![Peer::PodSelector(Selector::from_iter(Some(("app", "client"))))]
    );
    assert_eq!(policies[0].ingress[0].ports[0].port.as_deref(), Some("8080"));

    let missing = lookup.network_policies("staging").await;
    assert!(
        matches!(missing, Err(LookupError::Api { kind: "networkpolicies", .. })),
        "list failures are reported as API errors"
    );
}
