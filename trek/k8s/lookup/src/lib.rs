#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod policy;

#[cfg(test)]
mod tests;

use kube::api::{Api, ListParams};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use trek_core::{Lookup, LookupError, NetworkPolicy, SourceWorkload};
use trek_k8s_api::{self as k8s, Labels, ResourceExt};

/// Reads cluster state through the Kubernetes API.
#[derive(Clone)]
pub struct KubeLookup {
    client: kube::Client,
}

// === impl KubeLookup ===

impl KubeLookup {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    async fn get<K>(
        &self,
        api: Api<K>,
        kind: &'static str,
        name: &str,
        qualified: String,
    ) -> Result<K, LookupError>
    where
        K: Clone + DeserializeOwned + std::fmt::Debug,
    {
        match api.get_opt(name).await {
            Ok(Some(obj)) => Ok(obj),
            Ok(None) => Err(LookupError::NotFound {
                kind,
                name: qualified,
            }),
            Err(error) => Err(api_error(kind, qualified, error)),
        }
    }
}

#[async_trait::async_trait]
impl Lookup for KubeLookup {
    #[instrument(skip(self))]
    async fn network_policies(&self, namespace: &str) -> Result<Vec<NetworkPolicy>, LookupError> {
        let api = Api::<k8s::NetworkPolicy>::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|error| api_error("networkpolicies", namespace.to_string(), error))?;
        debug!(policies = list.items.len(), "Listed");

        list.items.into_iter().map(policy::convert).collect()
    }

    #[instrument(skip(self))]
    async fn pod(&self, namespace: &str, name: &str) -> Result<SourceWorkload, LookupError> {
        let api = Api::<k8s::Pod>::namespaced(self.client.clone(), namespace);
        let pod = self
            .get(api, "pod", name, format!("{namespace}/{name}"))
            .await?;
        Ok(SourceWorkload {
            name: name.to_string(),
            namespace: namespace.to_string(),
            labels: pod.labels().clone().into(),
        })
    }

    #[instrument(skip(self))]
    async fn namespace_labels(&self, name: &str) -> Result<Labels, LookupError> {
        let api = Api::<k8s::Namespace>::all(self.client.clone());
        let ns = self.get(api, "namespace", name, name.to_string()).await?;
        Ok(ns.labels().clone().into())
    }

    #[instrument(skip(self))]
    async fn service_selector(&self, namespace: &str, name: &str) -> Result<Labels, LookupError> {
        let api = Api::<k8s::Service>::namespaced(self.client.clone(), namespace);
        let svc = self
            .get(api, "service", name, format!("{namespace}/{name}"))
            .await?;
        Ok(svc.spec.and_then(|spec| spec.selector).into())
    }
}

fn api_error(kind: &'static str, name: String, error: kube::Error) -> LookupError {
    LookupError::Api {
        kind,
        name,
        source: Box::new(error),
    }
}
