use crate::{NetworkPolicy, SourceWorkload};
use trek_k8s_api::Labels;

/// Retrieves the cluster state an evaluation depends on.
///
/// Every call is treated as an immutable snapshot for the duration of one evaluation.
#[async_trait::async_trait]
pub trait Lookup {
    /// Lists the network policies in `namespace`, in API order.
    async fn network_policies(&self, namespace: &str) -> Result<Vec<NetworkPolicy>, LookupError>;

    /// Fails with [`LookupError::NotFound`] if the pod does not exist.
    async fn pod(&self, namespace: &str, name: &str) -> Result<SourceWorkload, LookupError>;

    async fn namespace_labels(&self, name: &str) -> Result<Labels, LookupError>;

    /// Returns the labels a service selects its pods with. A service without a selector has an
    /// empty label set.
    async fn service_selector(&self, namespace: &str, name: &str) -> Result<Labels, LookupError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("failed to get {kind} {name}: {source}")]
    Api {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("invalid {kind} {name}: {reason}")]
    Invalid {
        kind: &'static str,
        name: String,
        reason: String,
    },
}
