//! Named progress channels with scoped subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use s3deck_protocol::envelope::ChannelMessage;

/// Per-subscription buffer, in messages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fan-out hub for messages the transfer engine emits.
///
/// Each [`listen`](Self::listen) call returns a [`Subscription`] with its own
/// bounded buffer; emitting waits for buffer space so no message is dropped
/// while a subscriber is alive. Cloning shares the same hub.
#[derive(Clone)]
pub struct ProgressChannels {
    inner: Arc<Mutex<HubInner>>,
    capacity: usize,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: HashMap<String, Vec<Listener>>,
}

struct Listener {
    id: u64,
    tx: mpsc::Sender<ChannelMessage>,
}

impl Default for ProgressChannels {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ProgressChannels {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner::default())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to `channel`. Dropping the subscription unsubscribes.
    pub fn listen(&self, channel: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(channel.to_string())
            .or_default()
            .push(Listener { id, tx });
        debug!(channel, id, "listener registered");

        Subscription {
            channel: channel.to_string(),
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `msg` to every current listener on its channel.
    ///
    /// Returns the number of listeners that received it.
    pub async fn publish(&self, msg: ChannelMessage) -> usize {
        let senders: Vec<_> = {
            let inner = self.inner.lock().unwrap();
            match inner.listeners.get(&msg.channel) {
                Some(list) => list.iter().map(|l| l.tx.clone()).collect(),
                None => Vec::new(),
            }
        };
        if senders.is_empty() {
            trace!(channel = %msg.channel, "no listeners, message dropped");
            return 0;
        }

        let mut delivered = 0;
        let last = senders.len() - 1;
        let mut msg = Some(msg);
        for (i, tx) in senders.into_iter().enumerate() {
            let m = if i == last {
                msg.take()
            } else {
                msg.clone()
            };
            let Some(m) = m else { break };
            // A closed receiver is a subscription being dropped.
            if tx.send(m).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Serializes `payload` and publishes it on `channel`.
    pub async fn emit<T: Serialize>(
        &self,
        channel: &str,
        payload: &T,
    ) -> Result<usize, serde_json::Error> {
        let msg = ChannelMessage::new(channel, payload)?;
        Ok(self.publish(msg).await)
    }

    /// Number of live subscriptions on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .listeners
            .get(channel)
            .map_or(0, Vec::len)
    }
}

/// Receiving end of one [`ProgressChannels::listen`] call.
pub struct Subscription {
    channel: String,
    id: u64,
    rx: mpsc::Receiver<ChannelMessage>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for the next message. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    /// Returns an already-buffered message without waiting.
    pub fn try_recv(&mut self) -> Option<ChannelMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let mut inner = hub.lock().unwrap();
        if let Some(list) = inner.listeners.get_mut(&self.channel) {
            list.retain(|l| l.id != self.id);
            if list.is_empty() {
                inner.listeners.remove(&self.channel);
            }
        }
        debug!(channel = %self.channel, id = self.id, "listener released");
    }
}
