//! Pluggable client-key derivation.

use lorekeep_domain::KeyStrategy;

/// What the transport layer knows about the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Network address (or leftmost forwarded address).
    pub address: Option<String>,
    pub user_agent: Option<String>,
    /// Client-supplied identifier, e.g. an `X-Client-Id` header.
    pub client_id: Option<String>,
}

impl ClientIdentity {
    pub fn from_address(address: impl Into<String>) -> Self {
        Self { address: Some(address.into()), ..Self::default() }
    }
}

/// Derives the rate-limit key for a request. `None` means no key could be
/// derived; the gate then skips limiting.
pub trait KeyExtractor: Send + Sync {
    fn key(&self, identity: &ClientIdentity) -> Option<String>;
}

/// Network address, refined by a client id when one is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressKey;

impl KeyExtractor for AddressKey {
    fn key(&self, identity: &ClientIdentity) -> Option<String> {
        let address = non_empty(identity.address.as_deref())?;
        Some(match non_empty(identity.client_id.as_deref()) {
            Some(id) => format!("{address}#{id}"),
            None => address.to_string(),
        })
    }
}

/// Network address combined with the user agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressAndAgentKey;

impl KeyExtractor for AddressAndAgentKey {
    fn key(&self, identity: &ClientIdentity) -> Option<String> {
        let base = AddressKey.key(identity)?;
        Some(match non_empty(identity.user_agent.as_deref()) {
            Some(agent) => format!("{base}|{agent}"),
            None => base,
        })
    }
}

/// Extractor for a configured strategy.
pub fn extractor_for(strategy: KeyStrategy) -> Box<dyn KeyExtractor> {
    match strategy {
        KeyStrategy::Address => Box::new(AddressKey),
        KeyStrategy::AddressAgent => Box::new(AddressAndAgentKey),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
