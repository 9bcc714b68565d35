//! Retained messages: the last retained publish per topic.

use std::collections::HashMap;

use crate::message::PublishMessage;

#[derive(Debug, Default)]
pub struct RetainedStore {
    messages: HashMap<String, PublishMessage>,
}

impl RetainedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `message` for `topic`, replacing whatever was there.
    pub fn put(&mut self, topic: &str, message: PublishMessage) {
        self.messages.insert(topic.to_string(), message);
    }

    pub fn get(&self, topic: &str) -> Option<&PublishMessage> {
        self.messages.get(topic)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &String> {
        self.messages.keys()
    }
}
