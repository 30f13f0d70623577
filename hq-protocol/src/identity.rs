use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use log::{debug, info};

/// Opaque handle of a known device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Maps a transmitted identifier and source address to an internal device.
///
/// Resolution is authoritative: a frame whose identifier does not resolve
/// is dropped, never decoded against a fabricated device.
pub trait DeviceResolver: Send {
    fn resolve(&mut self, ident: &str, source: SocketAddr) -> Option<DeviceId>;
}

/// In-memory device table.
///
/// By default unseen identifiers are registered on first contact. Built
/// with [`with_known_devices`](Self::with_known_devices) it instead rejects
/// anything not on the list.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceId>,
    next_id: u64,
    reject_unknown: bool,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry restricted to the given identifiers.
    pub fn with_known_devices<I, S>(idents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self {
            reject_unknown: true,
            ..Self::default()
        };
        for ident in idents {
            registry.register(ident.into());
        }
        registry
    }

    fn register(&mut self, ident: String) -> DeviceId {
        self.next_id += 1;
        let id = DeviceId(self.next_id);
        self.devices.insert(ident, id);
        id
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceResolver for DeviceRegistry {
    fn resolve(&mut self, ident: &str, source: SocketAddr) -> Option<DeviceId> {
        if let Some(id) = self.devices.get(ident) {
            return Some(*id);
        }
        if self.reject_unknown {
            debug!("unknown device {ident} from {source}");
            return None;
        }
        let id = self.register(ident.to_owned());
        info!("registered device {ident} from {source} as {id}");
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SocketAddr {
        "192.0.2.1:7700".parse().unwrap()
    }

    #[test]
    fn test_auto_registration_is_stable() {
        let mut registry = DeviceRegistry::new();
        let first = registry.resolve("135790246811220", source()).unwrap();
        let second = registry.resolve("135790246811220", source()).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_identifiers_get_distinct_handles() {
        let mut registry = DeviceRegistry::new();
        let a = registry.resolve("1000000001", source()).unwrap();
        let b = registry.resolve("1000000002", source()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_allow_list_rejects_unknown() {
        let mut registry = DeviceRegistry::with_known_devices(["1000000001"]);
        assert!(registry.resolve("1000000001", source()).is_some());
        assert_eq!(registry.resolve("2000000002", source()), None);
        assert_eq!(registry.len(), 1);
    }
}
