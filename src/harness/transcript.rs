//! Turns a thread's message list into one exchange per user turn.
//!
//! A single user turn can produce several assistant messages (one per run
//! step); they are merged into one logical reply.

use serde::Serialize;

use crate::assistants::messages::{Message, Role};

/// Merges every run of adjacent assistant messages into the first message of
/// the run, concatenating their content.
pub fn coalesce_assistant_messages(messages: &[Message]) -> Vec<Message> {
    let mut coalesced: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        match coalesced.last_mut() {
            Some(previous)
                if previous.role == Role::Assistant && message.role == Role::Assistant =>
            {
                previous.content.extend(message.content.iter().cloned());
            }
            _ => coalesced.push(message.clone()),
        }
    }
    coalesced
}

/// Text parts and first citation quote of one logical assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogicalReply {
    pub texts: Vec<String>,
    pub quote: Option<String>,
}

impl LogicalReply {
    fn from_message(message: &Message) -> Self {
        let texts = message
            .content
            .iter()
            .filter_map(|content| content.as_text())
            .map(|text| text.value.clone())
            .collect();
        let quote = message
            .content
            .iter()
            .filter_map(|content| content.as_text())
            .flat_map(|text| text.annotations.iter())
            .find_map(|annotation| annotation.quote())
            .map(str::to_string);
        LogicalReply { texts, quote }
    }
}

/// A user message and whatever the assistant answered to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user_message: String,
    pub reply: Option<LogicalReply>,
}

/// Pairs each user message with the coalesced reply that follows it.
/// Assistant messages before the first user message are dropped.
pub fn exchanges(messages: &[Message]) -> Vec<Exchange> {
    let mut exchanges: Vec<Exchange> = Vec::new();
    for message in coalesce_assistant_messages(messages) {
        match message.role {
            Role::User => exchanges.push(Exchange {
                user_message: message.text(),
                reply: None,
            }),
            Role::Assistant => {
                if let Some(exchange) = exchanges.last_mut() {
                    exchange.reply = Some(LogicalReply::from_message(&message));
                }
            }
        }
    }
    exchanges
}
