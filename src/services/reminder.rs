use std::time::Duration;

use thiserror::Error;

use crate::{
    models::{session::ReminderSettings, store::Store},
    notify::Notifier,
    storage::{Storage, StorageError},
};

pub const REMINDER_TITLE: &str = "Hydration Check";
pub const REMINDER_BODY: &str = "Time to drink water!";

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Reminder interval must be at least one minute")]
    InvalidInterval,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub fn update_settings(
    store: &mut Store,
    storage: &impl Storage,
    interval_minutes: Option<u32>,
    enabled: Option<bool>,
) -> Result<ReminderSettings, ReminderError> {
    if interval_minutes == Some(0) {
        return Err(ReminderError::InvalidInterval);
    }

    let reminder = &mut store.session.reminder;
    if let Some(interval) = interval_minutes {
        reminder.interval_minutes = interval;
    }
    if let Some(enabled) = enabled {
        reminder.enabled = enabled;
    }
    let settings = reminder.clone();

    storage.save(store)?;
    Ok(settings)
}

/// Waits one interval before each reminder. Runs until `count` reminders
/// were sent, or forever when no count is given. Returns the number sent.
pub fn run_reminders(
    notifier: &impl Notifier,
    settings: &ReminderSettings,
    count: Option<u32>,
    mut sleep: impl FnMut(Duration),
) -> u32 {
    if !settings.enabled {
        log::info!("reminders are disabled");
        return 0;
    }

    let interval = Duration::from_secs(u64::from(settings.interval_minutes) * 60);
    let mut sent = 0;
    while count.is_none_or(|count| sent < count) {
        sleep(interval);
        notifier.notify(REMINDER_TITLE, REMINDER_BODY);
        sent += 1;
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use crate::storage::testing::InMemoryStorage;

    #[test]
    fn test_run_reminders_waits_between_notifications() {
        let notifier = RecordingNotifier::default();
        let mut waits = vec![];

        let sent = run_reminders(&notifier, &ReminderSettings::default(), Some(3), |d| {
            waits.push(d)
        });

        assert_eq!(sent, 3);
        assert_eq!(waits, vec![Duration::from_secs(1200); 3]);
        assert_eq!(
            notifier.sent.borrow()[0],
            (REMINDER_TITLE.to_string(), REMINDER_BODY.to_string())
        );
    }

    #[test]
    fn test_disabled_reminders_send_nothing() {
        let notifier = RecordingNotifier::default();
        let settings = ReminderSettings {
            enabled: false,
            ..ReminderSettings::default()
        };
        assert_eq!(run_reminders(&notifier, &settings, None, |_| {}), 0);
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn test_update_settings() {
        let mut store = Store::default();
        let storage = InMemoryStorage::default();

        let settings = update_settings(&mut store, &storage, Some(45), None).unwrap();
        assert_eq!(settings.interval_minutes, 45);
        assert!(settings.enabled);

        let settings = update_settings(&mut store, &storage, None, Some(false)).unwrap();
        assert_eq!(settings.interval_minutes, 45);
        assert!(!settings.enabled);

        assert!(matches!(
            update_settings(&mut store, &storage, Some(0), None),
            Err(ReminderError::InvalidInterval)
        ));
    }
}
