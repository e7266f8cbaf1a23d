//! Registry of downstream nodes that receive propagated triggers.
//!
//! Entries arrive as OSC messages from the network, so every field is
//! untrusted. Messages that don't decode to exactly four address octets and a
//! port are dropped without a reply; the registry just doesn't change. A
//! rejection counter and `debug` logs are the only trace they leave.

use std::net::{Ipv4Addr, SocketAddrV4};

use indexmap::IndexSet;
use rosc::{OscMessage, OscType};
use tracing::{debug, info};

/// A downstream node: IPv4 address and UDP port.
pub type OscListener = SocketAddrV4;

const LISTENER_FIELDS: usize = 5;

/// Ordered set of listeners. Iteration follows arrival order.
#[derive(Debug, Default, Clone)]
pub struct NodeListenerArray {
    listeners: IndexSet<OscListener>,
    rejected: u64,
}

impl NodeListenerArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the listener described by `msg` unless it is malformed or already
    /// registered.
    pub fn handle_add_listener(&mut self, msg: &OscMessage) {
        let Some(listener) = self.decode(msg) else {
            return;
        };

        if self.listeners.insert(listener) {
            info!(%listener, count = self.listeners.len(), "listener added");
        } else {
            debug!(%listener, "duplicate listener ignored");
        }
    }

    /// Remove the listener described by `msg`, if present.
    pub fn handle_remove_listener(&mut self, msg: &OscMessage) {
        let Some(listener) = self.decode(msg) else {
            return;
        };

        if self.listeners.shift_remove(&listener) {
            info!(%listener, count = self.listeners.len(), "listener removed");
        } else {
            debug!(%listener, "no such listener");
        }
    }

    /// Drop every listener. The message contents are not inspected.
    pub fn handle_remove_listeners(&mut self, _msg: &OscMessage) {
        self.clear();
    }

    pub fn add(&mut self, listener: OscListener) -> bool {
        self.listeners.insert(listener)
    }

    pub fn remove(&mut self, listener: &OscListener) -> bool {
        self.listeners.shift_remove(listener)
    }

    pub fn clear(&mut self) {
        if !self.listeners.is_empty() {
            info!(count = self.listeners.len(), "all listeners removed");
        }
        self.listeners.clear();
    }

    pub fn count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&OscListener> {
        self.listeners.get_index(idx)
    }

    pub fn contains(&self, listener: &OscListener) -> bool {
        self.listeners.contains(listener)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OscListener> {
        self.listeners.iter()
    }

    /// Number of add/remove messages discarded as malformed.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    fn decode(&mut self, msg: &OscMessage) -> Option<OscListener> {
        let listener = decode_listener(&msg.args);
        if listener.is_none() {
            self.rejected += 1;
            debug!(addr = %msg.addr, args = msg.args.len(), "malformed listener message dropped");
        }
        listener
    }
}

impl<'a> IntoIterator for &'a NodeListenerArray {
    type Item = &'a OscListener;
    type IntoIter = indexmap::set::Iter<'a, OscListener>;

    fn into_iter(self) -> Self::IntoIter {
        self.listeners.iter()
    }
}

/// Decode `[a, b, c, d, port]` integer arguments into a listener.
///
/// Octets must fit in 0..=255 and the port in 0..=65535; anything else,
/// including the wrong number of arguments or a non-integer, yields `None`.
pub fn decode_listener(args: &[OscType]) -> Option<OscListener> {
    if args.len() != LISTENER_FIELDS {
        return None;
    }

    let mut octets = [0u8; 4];
    for (octet, arg) in octets.iter_mut().zip(&args[..4]) {
        *octet = match arg {
            OscType::Int(v) => u8::try_from(*v).ok()?,
            _ => return None,
        };
    }

    let port = match &args[4] {
        OscType::Int(v) => u16::try_from(*v).ok()?,
        _ => return None,
    };

    Some(SocketAddrV4::new(Ipv4Addr::from(octets), port))
}

/// Encode a listener as the five integer arguments `decode_listener` accepts.
pub fn encode_listener(listener: &OscListener) -> Vec<OscType> {
    let mut args: Vec<OscType> = listener
        .ip()
        .octets()
        .iter()
        .map(|&o| OscType::Int(o as i32))
        .collect();
    args.push(OscType::Int(listener.port() as i32));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: "/listener/add".to_string(),
            args,
        }
    }

    fn ints(values: &[i32]) -> Vec<OscType> {
        values.iter().map(|&v| OscType::Int(v)).collect()
    }

    #[test]
    fn adding_same_pair_twice_keeps_one() {
        let mut reg = NodeListenerArray::new();
        let m = msg(ints(&[192, 168, 1, 20, 7770]));
        reg.handle_add_listener(&m);
        reg.handle_add_listener(&m);
        assert_eq!(reg.count(), 1);
        assert_eq!(
            reg.get(0),
            Some(&SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 7770))
        );
    }

    #[test]
    fn same_address_different_port_is_distinct() {
        let mut reg = NodeListenerArray::new();
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 1, 7770])));
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 1, 7771])));
        assert_eq!(reg.count(), 2);
    }

    #[test]
    fn four_field_add_is_rejected() {
        let mut reg = NodeListenerArray::new();
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 1])));
        assert_eq!(reg.count(), 0);
        assert_eq!(reg.rejected(), 1);
    }

    #[test]
    fn non_integer_field_is_rejected() {
        let mut reg = NodeListenerArray::new();
        let mut args = ints(&[10, 0, 0, 1]);
        args.push(OscType::Float(7770.0));
        reg.handle_add_listener(&msg(args));

        let mut args = ints(&[10, 0, 1]);
        args.insert(1, OscType::String("0".into()));
        args.push(OscType::Int(7770));
        reg.handle_add_listener(&msg(args));

        assert_eq!(reg.count(), 0);
        assert_eq!(reg.rejected(), 2);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut reg = NodeListenerArray::new();
        reg.handle_add_listener(&msg(ints(&[256, 0, 0, 1, 7770])));
        reg.handle_add_listener(&msg(ints(&[10, -1, 0, 1, 7770])));
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 1, 70_000])));
        assert!(reg.is_empty());
        assert_eq!(reg.rejected(), 3);
    }

    #[test]
    fn remove_erases_matching_pair_only() {
        let mut reg = NodeListenerArray::new();
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 1, 7770])));
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 2, 7770])));
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 3, 7770])));

        reg.handle_remove_listener(&msg(ints(&[10, 0, 0, 2, 7771])));
        assert_eq!(reg.count(), 3);

        reg.handle_remove_listener(&msg(ints(&[10, 0, 0, 2, 7770])));
        let left: Vec<_> = reg.iter().map(|l| l.ip().octets()[3]).collect();
        assert_eq!(left, vec![1, 3]);
    }

    #[test]
    fn removing_missing_pair_is_noop() {
        let mut reg = NodeListenerArray::new();
        reg.handle_remove_listener(&msg(ints(&[10, 0, 0, 9, 7770])));
        assert_eq!(reg.count(), 0);
        assert_eq!(reg.rejected(), 0);
    }

    #[test]
    fn remove_all_clears_and_tolerates_empty() {
        let mut reg = NodeListenerArray::new();
        reg.handle_remove_listeners(&msg(vec![]));
        assert_eq!(reg.count(), 0);

        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 1, 7770])));
        reg.handle_add_listener(&msg(ints(&[10, 0, 0, 2, 7770])));
        reg.handle_remove_listeners(&msg(ints(&[1, 2, 3])));
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn encode_and_decode_agree() {
        let listener = SocketAddrV4::new(Ipv4Addr::new(239, 0, 0, 1), 7771);
        assert_eq!(decode_listener(&encode_listener(&listener)), Some(listener));
    }
}
