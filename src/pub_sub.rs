//! Channel registry for `SUBSCRIBE` / `PUBLISH`.
//!
//! Subscribers are identified by session id and reached through their outbound
//! queue, so publishing never touches another connection's socket directly.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::{resp::RespValue, session::Outbound};

#[derive(Debug, Default)]
pub struct PubSub {
    channels: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<Outbound>>>>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, channel: &str, session_id: u64, sender: mpsc::Sender<Outbound>) {
        self.channels
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .insert(session_id, sender);
    }

    pub async fn unsubscribe(&self, channel: &str, session_id: u64) {
        let mut channels = self.channels.write().await;

        if let Some(subscribers) = channels.get_mut(channel) {
            subscribers.remove(&session_id);

            if subscribers.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Drops `session_id` from every channel in `channels`. Called when a
    /// subscribed connection goes away.
    pub async fn remove_session<'a, I>(&self, session_id: u64, channels: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for channel in channels {
            self.unsubscribe(channel, session_id).await;
        }
    }

    /// Sends `message` to every subscriber of `channel`.
    ///
    /// # Returns
    ///
    /// The number of subscribers the message was delivered to. Subscribers whose
    /// connection has already closed are not counted.
    pub async fn publish(&self, channel: &str, message: &str) -> usize {
        let senders: Vec<mpsc::Sender<Outbound>> = match self.channels.read().await.get(channel) {
            Some(subscribers) => subscribers.values().cloned().collect(),
            None => return 0,
        };

        let payload = RespValue::command(["message", channel, message]).encode();
        let mut delivered = 0;

        for sender in senders {
            if sender.send(Outbound::Resp(payload.clone())).await.is_ok() {
                delivered += 1;
            }
        }

        debug!(channel, delivered, "message published");

        delivered
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let pub_sub = PubSub::new();
        let (first_sender, mut first) = mpsc::channel(4);
        let (second_sender, mut second) = mpsc::channel(4);

        pub_sub.subscribe("news", 1, first_sender).await;
        pub_sub.subscribe("news", 2, second_sender).await;

        assert_eq!(pub_sub.publish("news", "hello").await, 2);
        assert_eq!(pub_sub.publish("sports", "ignored").await, 0);

        let expected = Outbound::Resp("*3\r\n$7\r\nmessage\r\n$4\r\nnews\r\n$5\r\nhello\r\n".into());
        assert_eq!(first.recv().await, Some(expected.clone()));
        assert_eq!(second.recv().await, Some(expected));
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_not_counted() {
        let pub_sub = PubSub::new();
        let (sender, receiver) = mpsc::channel(4);

        pub_sub.subscribe("news", 1, sender).await;
        drop(receiver);

        assert_eq!(pub_sub.publish("news", "hello").await, 0);
    }

    #[tokio::test]
    async fn test_remove_session_cleans_up_channels() {
        let pub_sub = PubSub::new();
        let (sender, _receiver) = mpsc::channel(4);
        let channels = vec!["a".to_string(), "b".to_string()];

        for channel in &channels {
            pub_sub.subscribe(channel, 7, sender.clone()).await;
        }

        pub_sub.remove_session(7, &channels).await;

        assert_eq!(pub_sub.subscriber_count("a").await, 0);
        assert_eq!(pub_sub.subscriber_count("b").await, 0);
    }
}
