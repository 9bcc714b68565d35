//! Subscription registry
//!
//! Maps a topic to the ordered list of client ids subscribed to it. Topics are
//! matched by exact string equality. Repeated subscribes of the same client are
//! kept as separate entries, so that client receives one copy per entry.

use std::collections::HashMap;

pub type SubscriberId = String;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: HashMap<String, Vec<SubscriberId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `client_id` to the subscribers of `topic`, creating the topic entry.
    pub fn subscribe(&mut self, topic: &str, client_id: SubscriberId) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(client_id);
    }

    /// Remove one occurrence of `client_id` from each of `topics`, dropping
    /// topic entries left empty. Returns the topics `client_id` was not
    /// subscribed to; those are left untouched.
    pub fn unsubscribe(&mut self, topics: &[String], client_id: &str) -> Vec<String> {
        let mut missing = Vec::new();

        for topic in topics {
            let Some(subscribers) = self.topics.get_mut(topic) else {
                missing.push(topic.clone());
                continue;
            };
            match subscribers.iter().position(|s| s == client_id) {
                Some(idx) => {
                    subscribers.remove(idx);
                }
                None => missing.push(topic.clone()),
            }
            if subscribers.is_empty() {
                self.topics.remove(topic);
            }
        }

        missing
    }

    /// Current subscribers of `topic` in subscription order.
    pub fn subscribers_of(&self, topic: &str) -> &[SubscriberId] {
        self.topics.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<SubscriberId>)> {
        self.topics.iter()
    }
}
