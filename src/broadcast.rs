//! Broadcaster (BR): fans a vehicle update out to every client subscribed to
//! its route, without a data-layer round trip per recipient (§4.6).
//!
//! Subscription is per-route: a client `join`s a route's room and receives
//! every update `emit`ted for that route from then on. Rooms are created
//! lazily on first `join` and dropped once their last subscriber disconnects,
//! so an idle route costs nothing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

const ROOM_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Broadcaster<T> {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<T>>>>,
}

impl<T: Clone + Send + 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribes to a route's room, creating it if this is the first
    /// subscriber.
    pub async fn join(&self, route_id: &str) -> broadcast::Receiver<T> {
        let rooms = self.rooms.read().await;
        if let Some(tx) = rooms.get(route_id) {
            return tx.subscribe();
        }
        drop(rooms);

        let mut rooms = self.rooms.write().await;
        let tx = rooms
            .entry(route_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0);
        tx.subscribe()
    }

    /// Publishes an update to every current subscriber of a route. A route
    /// with no room (nobody has ever joined it) or no subscribers is a no-op.
    pub async fn emit(&self, route_id: &str, update: T) {
        let rooms = self.rooms.read().await;
        let Some(tx) = rooms.get(route_id) else {
            return;
        };

        if tx.receiver_count() == 0 {
            drop(rooms);
            self.rooms.write().await.remove(route_id);
            return;
        }

        let _ = tx.send(update);
    }
}
