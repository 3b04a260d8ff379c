use crate::NetworkPolicy;
use tracing::trace;
use trek_k8s_api::Labels;

/// Returns the policies whose pod selector matches the target workload's labels, in their
/// original order.
pub fn select_affecting(
    target_labels: &Labels,
    policies: impl IntoIterator<Item = NetworkPolicy>,
) -> Vec<NetworkPolicy> {
    policies
        .into_iter()
        .filter(|policy| {
            let selected = policy.pod_selector.matches(target_labels);
            trace!(policy = %policy.name, selector = %policy.pod_selector, selected);
            selected
        })
        .collect()
}
