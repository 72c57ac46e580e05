use slug::slugify;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{chat::Channel, group::Group, group::toggle_membership, store::Store},
    services::lookup::{self, LookupError},
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum SaveGroupError {
    #[error("Only admins can create or edit groups")]
    NotAdmin,

    #[error("Group name cannot be empty")]
    EmptyName,

    #[error("Group with name '{}' already exists", .0)]
    GroupAlreadyExists(String),

    #[error("Default due day must be between 1 and 31, got {0}")]
    InvalidDueDay(u8),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct SaveGroupParameters {
    /// Group being edited; a new group is created when absent
    pub existing: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Employee names or emails
    pub members: Vec<String>,
    pub default_due_day: Option<u8>,
    pub is_recurring: bool,
    pub is_restricted: bool,
}

/// Creates a group, or rewrites the editable fields of an existing one while
/// keeping its icon, color and mute set.
pub fn save_group(
    store: &mut Store,
    storage: &impl Storage,
    parameters: SaveGroupParameters,
) -> Result<Group, SaveGroupError> {
    if !store.session.is_admin {
        return Err(SaveGroupError::NotAdmin);
    }
    let name = parameters.name.trim().to_string();
    if name.is_empty() {
        return Err(SaveGroupError::EmptyName);
    }
    if let Some(day) = parameters.default_due_day
        && !(1..=31).contains(&day)
    {
        return Err(SaveGroupError::InvalidDueDay(day));
    }

    let member_ids = parameters
        .members
        .iter()
        .map(|member| lookup::resolve_employee(store, member))
        .collect::<Result<Vec<_>, _>>()?;

    let existing_id = parameters
        .existing
        .map(|query| lookup::resolve_group(store, &query))
        .transpose()?;

    let slug = slugify(&name);
    if store
        .groups
        .iter()
        .any(|g| g.slug == slug && Some(g.id) != existing_id)
    {
        return Err(SaveGroupError::GroupAlreadyExists(name));
    }

    let group_id = match existing_id {
        Some(id) => {
            if let Some(group) = store.get_group_mut(id) {
                group.name = name;
                group.slug = slug;
                group.description = parameters.description;
                group.member_ids = member_ids;
                group.default_due_day = parameters.default_due_day;
                group.is_recurring = parameters.is_recurring;
                group.is_restricted = parameters.is_restricted;
            }
            id
        }
        None => {
            let group = Group {
                id: Uuid::new_v4(),
                name,
                slug,
                icon: "Briefcase".to_string(),
                color: "blue".to_string(),
                description: parameters.description,
                member_ids,
                default_due_day: parameters.default_due_day,
                is_recurring: parameters.is_recurring,
                is_restricted: parameters.is_restricted,
                muted_by: vec![],
            };
            let id = group.id;
            store.groups.push(group);
            id
        }
    };

    storage.save(store)?;

    store
        .get_group(group_id)
        .cloned()
        .ok_or_else(|| LookupError::GroupNotFound(group_id.to_string()).into())
}

#[derive(Debug, Error)]
pub enum GroupSettingError {
    #[error("Only admins can change group restrictions")]
    NotAdmin,

    #[error("Sign in to mute or unmute channels")]
    NotSignedIn,

    #[error("The general channel cannot be muted")]
    GeneralNotMutable,

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub fn toggle_restriction(
    store: &mut Store,
    storage: &impl Storage,
    group_query: &str,
) -> Result<Group, GroupSettingError> {
    if !store.session.is_admin {
        return Err(GroupSettingError::NotAdmin);
    }
    let id = lookup::resolve_group(store, group_query)?;
    let group = store
        .get_group_mut(id)
        .ok_or_else(|| LookupError::GroupNotFound(group_query.to_string()))?;
    group.is_restricted = !group.is_restricted;
    let group = group.clone();

    storage.save(store)?;
    Ok(group)
}

/// Flips the current user's mute on a work group or chat group channel.
/// Returns whether the channel is now muted.
pub fn toggle_mute(
    store: &mut Store,
    storage: &impl Storage,
    channel_query: &str,
) -> Result<bool, GroupSettingError> {
    let member = store
        .current_user()
        .map(|e| e.id)
        .ok_or(GroupSettingError::NotSignedIn)?;
    let channel = lookup::resolve_channel(store, channel_query)?;

    let muted = match channel {
        Channel::General => return Err(GroupSettingError::GeneralNotMutable),
        Channel::Group(id) => {
            if let Some(group) = store.get_group_mut(id) {
                toggle_membership(&mut group.muted_by, member)
            } else if let Some(chat_group) = store.get_chat_group_mut(id) {
                toggle_membership(&mut chat_group.muted_by, member)
            } else {
                return Err(LookupError::ChannelNotFound(channel_query.to_string()).into());
            }
        }
    };

    storage.save(store)?;
    Ok(muted)
}
