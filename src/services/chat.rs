use jiff::{Timestamp, ToSpan};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        chat::{Channel, ChatGroup, ChatGroupKind, ChatMessage, ReplyRef},
        store::Store,
    },
    notify::Notifier,
    services::lookup::{self, LookupError},
    storage::{Storage, StorageError},
};

/// Canned answers used by the simulated teammate.
pub const AUTO_REPLIES: [&str; 5] = ["Acknowledged.", "Will check.", "Okay.", "Done.", "On it."];

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Sign in to use the chat")]
    NotSignedIn,

    #[error("Message must have text or an image")]
    EmptyMessage,

    #[error("Chat group name cannot be empty")]
    EmptyGroupName,

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Default)]
pub struct SendMessageParameters {
    pub channel: String,
    pub text: String,
    pub image: Option<String>,
    /// Message being replied to, by id prefix
    pub reply_to: Option<String>,
    /// Have a teammate answer right away
    pub simulate_reply: bool,
}

pub struct SendMessageOutcome {
    pub message: ChatMessage,
    pub reply: Option<ChatMessage>,
}

fn current_user_id(store: &Store) -> Result<Uuid, ChatError> {
    store
        .current_user()
        .map(|e| e.id)
        .ok_or(ChatError::NotSignedIn)
}

fn reply_reference(store: &Store, query: &str) -> Result<ReplyRef, ChatError> {
    let id = lookup::resolve_message(store, query)?;
    let message = store
        .messages
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| LookupError::MessageNotFound(query.to_string()))?;

    Ok(ReplyRef {
        id,
        text: message.text.clone(),
        sender_name: store
            .employee_name(message.sender_id)
            .unwrap_or("Unknown")
            .to_string(),
    })
}

/// Answer from another employee, chosen from the message id so the same
/// message always gets the same teammate and text.
fn simulated_reply(store: &Store, message: &ChatMessage) -> Option<ChatMessage> {
    let others: Vec<Uuid> = store
        .employees
        .iter()
        .map(|e| e.id)
        .filter(|id| *id != message.sender_id)
        .collect();
    if others.is_empty() {
        return None;
    }

    let seed = message.id.as_bytes();
    let sender_id = others[seed[0] as usize % others.len()];
    let text = AUTO_REPLIES[seed[1] as usize % AUTO_REPLIES.len()];
    let timestamp = message
        .timestamp
        .checked_add(2.seconds())
        .unwrap_or(message.timestamp);

    Some(ChatMessage {
        id: Uuid::new_v4(),
        sender_id,
        text: text.to_string(),
        timestamp,
        channel: message.channel,
        image: None,
        reply_to: None,
        is_forwarded: false,
        read_by: vec![],
    })
}

pub fn send_message(
    store: &mut Store,
    storage: &impl Storage,
    notifier: &impl Notifier,
    parameters: SendMessageParameters,
    now: Timestamp,
) -> Result<SendMessageOutcome, ChatError> {
    let sender_id = current_user_id(store)?;
    let text = parameters.text.trim().to_string();
    if text.is_empty() && parameters.image.is_none() {
        return Err(ChatError::EmptyMessage);
    }

    let channel = lookup::resolve_channel(store, &parameters.channel)?;
    let reply_to = parameters
        .reply_to
        .map(|query| reply_reference(store, &query))
        .transpose()?;

    let message = ChatMessage {
        id: Uuid::new_v4(),
        sender_id,
        text,
        timestamp: now,
        channel,
        image: parameters.image,
        reply_to,
        is_forwarded: false,
        read_by: vec![sender_id],
    };
    store.messages.push(message.clone());

    let reply = if parameters.simulate_reply {
        simulated_reply(store, &message)
    } else {
        None
    };
    if let Some(reply) = &reply {
        store.messages.push(reply.clone());
    }

    storage.save(store)?;

    if let Some(reply) = &reply
        && !store.is_channel_muted(channel, sender_id)
    {
        let from = store.employee_name(reply.sender_id).unwrap_or("Unknown");
        notifier.notify(
            &format!("{from} in {}", store.channel_name(channel)),
            &reply.text,
        );
    }

    log::debug!("message {} posted to {channel}", message.short_id());
    Ok(SendMessageOutcome { message, reply })
}

/// Reposts a message's text and image to another channel as the current
/// user.
pub fn forward_message(
    store: &mut Store,
    storage: &impl Storage,
    message_query: &str,
    channel_query: &str,
    now: Timestamp,
) -> Result<ChatMessage, ChatError> {
    let sender_id = current_user_id(store)?;
    let source_id = lookup::resolve_message(store, message_query)?;
    let channel = lookup::resolve_channel(store, channel_query)?;
    let source = store
        .messages
        .iter()
        .find(|m| m.id == source_id)
        .ok_or_else(|| LookupError::MessageNotFound(message_query.to_string()))?;

    let forwarded = ChatMessage {
        id: Uuid::new_v4(),
        sender_id,
        text: source.text.clone(),
        timestamp: now,
        channel,
        image: source.image.clone(),
        reply_to: None,
        is_forwarded: true,
        read_by: vec![sender_id],
    };
    store.messages.push(forwarded.clone());
    storage.save(store)?;

    Ok(forwarded)
}

/// Messages of a channel in posting order, optionally narrowed to those whose
/// text contains `query`. Every returned message is marked read by the
/// current user.
pub fn channel_history(
    store: &mut Store,
    storage: &impl Storage,
    channel_query: &str,
    query: Option<&str>,
) -> Result<(Channel, Vec<ChatMessage>), ChatError> {
    let channel = lookup::resolve_channel(store, channel_query)?;
    let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
    let reader = store.current_user().map(|e| e.id);

    let mut marked = false;
    let mut history = vec![];
    for message in store
        .messages
        .iter_mut()
        .filter(|m| m.channel == channel)
        .filter(|m| needle.is_empty() || m.text.to_lowercase().contains(&needle))
    {
        if let Some(reader) = reader
            && !message.read_by.contains(&reader)
        {
            message.read_by.push(reader);
            marked = true;
        }
        history.push(message.clone());
    }

    if marked {
        storage.save(store)?;
    }
    Ok((channel, history))
}

/// Creates a social chat group with the whole team as members.
pub fn create_chat_group(
    store: &mut Store,
    storage: &impl Storage,
    name: &str,
) -> Result<ChatGroup, ChatError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::EmptyGroupName);
    }

    let chat_group = ChatGroup {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind: ChatGroupKind::Social,
        color: "indigo".to_string(),
        member_ids: store.employees.iter().map(|e| e.id).collect(),
        muted_by: vec![],
    };
    store.chat_groups.push(chat_group.clone());
    storage.save(store)?;

    Ok(chat_group)
}
