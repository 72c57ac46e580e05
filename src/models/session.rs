use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_REMINDER_INTERVAL_MINUTES: u32 = 20;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    /// Account commands act as
    pub current_account: Option<Uuid>,
    /// Accounts signed in on this machine, in sign-in order
    pub accounts: Vec<Uuid>,
    /// Admin mode unlocks restriction toggling and team management
    pub is_admin: bool,
    pub reminder: ReminderSettings,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            current_account: None,
            accounts: vec![],
            is_admin: true,
            reminder: ReminderSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReminderSettings {
    pub interval_minutes: u32,
    pub enabled: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_REMINDER_INTERVAL_MINUTES,
            enabled: true,
        }
    }
}
