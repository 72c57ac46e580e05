use colored::*;

/// Version reported to the user interface.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Email,
}

/// Short user-facing message produced by an operation, shown after the
/// command output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn email(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Email,
            message: message.into(),
        }
    }
}

/// Desktop notification dispatch.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str);
}

/// Prints notifications to the terminal and rings the bell.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) {
        log::debug!("dispatching notification '{title}'");
        println!("\x07  {} {}", title.bold().blue(), body);
    }
}

pub fn render_notice(notice: &Notice) {
    let line = match notice.kind {
        NoticeKind::Success => format!("✓ {}", notice.message).green(),
        NoticeKind::Info => format!("ℹ {}", notice.message).normal(),
        NoticeKind::Email => format!("✉ {}", notice.message).magenta(),
    };
    println!("  {line}");
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::Notifier;

    /// Records every dispatched notification.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: RefCell<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.sent
                .borrow_mut()
                .push((title.to_string(), body.to_string()));
        }
    }
}
