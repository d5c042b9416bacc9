//! Per-game connection registry
//!
//! Each websocket has an unbounded channel whose receiver is drained by
//! the connection's own task, so sends here never block on the network.

use crate::messages::SocketMessage;
use gobloks_core::PlayerId;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub type ConnectionId = u64;

pub type Outbound = UnboundedSender<Arc<SocketMessage>>;

struct Connection {
    pid: PlayerId,
    tx: Outbound,
}

#[derive(Default)]
pub struct SocketRegistry {
    next_id: ConnectionId,
    connections: FxHashMap<ConnectionId, Connection>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, pid: PlayerId, tx: Outbound) -> ConnectionId {
        self.next_id += 1;
        self.connections.insert(self.next_id, Connection { pid, tx });
        self.next_id
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Deliver to every connection of one player
    pub fn send(&mut self, pid: PlayerId, msg: SocketMessage) {
        self.deliver(Arc::new(msg), |conn| conn.pid == pid);
    }

    pub fn broadcast(&mut self, msg: SocketMessage) {
        self.deliver(Arc::new(msg), |_| true);
    }

    fn deliver(&mut self, msg: Arc<SocketMessage>, wanted: impl Fn(&Connection) -> bool) {
        let mut dead = Vec::new();
        for (&id, conn) in &self.connections {
            if wanted(conn) && conn.tx.send(Arc::clone(&msg)).is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            tracing::warn!(connection = id, "dropping closed socket");
            self.connections.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_send_targets_player() {
        let mut registry = SocketRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        registry.connect(1, tx1);
        registry.connect(2, tx2);

        registry.send(2, SocketMessage::system("hello"));
        assert!(rx1.try_recv().is_err());
        assert!(matches!(&*rx2.try_recv().unwrap(), SocketMessage::ChatMessage { origin: 0, .. }));

        registry.broadcast(SocketMessage::system("all"));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_closed_receiver_is_dropped() {
        let mut registry = SocketRegistry::new();
        let (tx, rx) = unbounded_channel();
        let id = registry.connect(1, tx);
        drop(rx);
        registry.broadcast(SocketMessage::system("anyone?"));
        assert!(registry.is_empty());
        assert!(!registry.disconnect(id));
    }
}
