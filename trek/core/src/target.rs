use serde::Serialize;
use std::fmt;
use trek_k8s_api::Labels;

/// The destination of a hypothetical connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TargetService {
    pub name: String,
    pub namespace: String,
    pub port: String,
    pub protocol: String,
}

/// A service named as `name.namespace`, optionally followed by `.svc` and a cluster domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRef {
    pub name: String,
    pub namespace: String,
}

/// The origin of a hypothetical connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceWorkload {
    pub name: String,
    pub namespace: String,
    pub labels: Labels,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseTargetError {
    #[error("service {0:?} must be qualified with a namespace (e.g. web.prod)")]
    MissingNamespace(String),

    #[error("service {0:?} has an empty name or namespace")]
    Empty(String),

    #[error("service {0:?} must be of the form name.namespace[.svc[.cluster-domain]]")]
    Malformed(String),
}

// === impl TargetService ===

impl TargetService {
    pub fn new(svc: ServiceRef, port: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: svc.name,
            namespace: svc.namespace,
            port: port.into(),
            protocol: protocol.into(),
        }
    }
}

impl fmt::Display for TargetService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}:{}/{}",
            self.name, self.namespace, self.port, self.protocol
        )
    }
}

// === impl ServiceRef ===

impl std::str::FromStr for ServiceRef {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let name = parts.next().unwrap_or_default();
        let namespace = parts
            .next()
            .ok_or_else(|| ParseTargetError::MissingNamespace(s.to_string()))?;
        if name.is_empty() || namespace.is_empty() {
            return Err(ParseTargetError::Empty(s.to_string()));
        }

        match parts.next() {
            None | Some("svc") => {}
            Some(_) => return Err(ParseTargetError::Malformed(s.to_string())),
        }

        Ok(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }
}

// === impl SourceWorkload ===

impl fmt::Display for SourceWorkload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
