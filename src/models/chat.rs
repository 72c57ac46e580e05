use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GENERAL_CHANNEL: &str = "general";

/// Destination a message is tagged with: the team-wide channel or a work /
/// chat group addressed by its id.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(into = "String", try_from = "String")]
pub enum Channel {
    #[default]
    General,
    Group(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::General => f.write_str(GENERAL_CHANNEL),
            Channel::Group(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for Channel {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == GENERAL_CHANNEL {
            Ok(Channel::General)
        } else {
            Uuid::parse_str(s).map(Channel::Group)
        }
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.to_string()
    }
}

impl TryFrom<String> for Channel {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatGroupKind {
    Work,
    #[default]
    Social,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct ChatGroup {
    pub id: Uuid,
    pub name: String,
    pub kind: ChatGroupKind,
    pub color: String,
    pub member_ids: Vec<Uuid>,
    #[serde(default)]
    pub muted_by: Vec<Uuid>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReplyRef {
    pub id: Uuid,
    pub text: String,
    pub sender_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub timestamp: Timestamp,
    pub channel: Channel,
    /// Path or URL of an attached image
    pub image: Option<String>,
    pub reply_to: Option<ReplyRef>,
    #[serde(default)]
    pub is_forwarded: bool,
    #[serde(default)]
    pub read_by: Vec<Uuid>,
}

impl ChatMessage {
    /// Short form of the id shown in listings and accepted on input.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}
