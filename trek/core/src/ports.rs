use crate::{PortRule, TargetService};

/// Returns true if the rule's port restrictions admit the target's port and protocol.
///
/// Ports and protocols are compared verbatim; named ports and port ranges are not resolved.
pub fn ports_admit(rules: &[PortRule], target: &TargetService) -> bool {
    if rules.is_empty() {
        return true;
    }

    rules.iter().any(|rule| rule.admits(target))
}

// === impl PortRule ===

impl PortRule {
    fn admits(&self, target: &TargetService) -> bool {
        let port = self.port.as_deref().map_or(true, |p| p == target.port);
        let protocol = self
            .protocol
            .as_deref()
            .map_or(true, |p| p == target.protocol);
        port && protocol
    }
}
