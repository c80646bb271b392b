//! Address-map table: rewrites a server's listed IPv4 address for clients, used when a
//! server is reachable internally at one address but must be advertised at another (e.g.
//! a NAT/forwarding setup). Loaded once at startup from [configuration](crate::config);
//! applies only to IPv4 records, never IPv6.

use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Read-only table of `from -> to` IPv4 address substitutions applied to outgoing
/// `getserversResponse`/`getserversExtResponse` records.
#[derive(Debug, Clone, Default)]
pub struct AddrMap(HashMap<Ipv4Addr, Ipv4Addr>);

impl AddrMap {
    /// An empty table: no address is ever rewritten.
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Builds a table from `(from, to)` pairs, e.g. parsed out of a config file.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Ipv4Addr, Ipv4Addr)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Returns the address a server at `from` should be advertised as, if the table maps it.
    pub fn resolve(&self, from: Ipv4Addr) -> Option<Ipv4Addr> {
        self.0.get(&from).copied()
    }

    /// Whether the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
