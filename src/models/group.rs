use jiff::ToSpan;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Group {
    /// UUID of the group
    pub id: Uuid,
    /// Name of the group
    pub name: String,
    /// Slug of the group, used to address it from the command line
    pub slug: String,
    /// Icon tag shown next to the group
    pub icon: String,
    /// Color tag of the group
    pub color: String,
    pub description: Option<String>,
    /// Employees working in this group
    pub member_ids: Vec<Uuid>,
    /// Day of the month new tasks fall due on when none is given (1-31)
    pub default_due_day: Option<u8>,
    /// Month-to-month compliance work
    pub is_recurring: bool,
    /// Only visible to admins
    pub is_restricted: bool,
    /// Employees who muted this group's chat channel
    #[serde(default)]
    pub muted_by: Vec<Uuid>,
}

impl Group {
    /// Due date for a new task added today without an explicit date.
    pub fn auto_due_date(&self, today: Date) -> Option<Date> {
        self.default_due_day.map(|day| next_due_date(day, today))
    }

    pub fn is_muted_by(&self, employee_id: Uuid) -> bool {
        self.muted_by.contains(&employee_id)
    }
}

/// Next occurrence of `day` counting today: this month when today is on or
/// before that day, next month otherwise. Days past the end of a month land
/// on its last day.
pub fn next_due_date(day: u8, today: Date) -> Date {
    let day = day.clamp(1, 31) as i8;
    let month_start = today.first_of_month();
    let target_month = if today.day() > day {
        month_start.saturating_add(1.month())
    } else {
        month_start
    };
    let last_day = target_month.last_of_month().day();
    let day = day.min(last_day);
    Date::new(target_month.year(), target_month.month(), day).unwrap_or(target_month)
}

/// Flips `member` in a muting set.
pub fn toggle_membership(set: &mut Vec<Uuid>, member: Uuid) -> bool {
    if let Some(pos) = set.iter().position(|id| *id == member) {
        set.remove(pos);
        false
    } else {
        set.push(member);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn test_due_day_later_this_month() {
        assert_eq!(next_due_date(15, date("2025-03-10")), date("2025-03-15"));
    }

    #[test]
    fn test_due_day_today_stays_in_month() {
        assert_eq!(next_due_date(15, date("2025-03-15")), date("2025-03-15"));
    }

    #[test]
    fn test_due_day_passed_rolls_to_next_month() {
        assert_eq!(next_due_date(15, date("2025-03-16")), date("2025-04-15"));
        assert_eq!(next_due_date(5, date("2025-12-20")), date("2026-01-05"));
    }

    #[test]
    fn test_due_day_clamped_to_short_month() {
        assert_eq!(next_due_date(31, date("2025-02-10")), date("2025-02-28"));
        assert_eq!(next_due_date(31, date("2025-04-01")), date("2025-04-30"));
    }

    #[test]
    fn test_out_of_range_due_day_is_clamped() {
        assert_eq!(next_due_date(200, date("2025-03-10")), date("2025-03-31"));
        assert_eq!(next_due_date(255, date("2025-02-28")), date("2025-02-28"));
        assert_eq!(next_due_date(0, date("2025-03-10")), date("2025-04-01"));
    }

    #[test]
    fn test_group_without_default_day_has_no_auto_date() {
        let group = Group::default();
        assert_eq!(group.auto_due_date(date("2025-03-10")), None);
    }

    #[test]
    fn test_toggle_membership() {
        let member = Uuid::new_v4();
        let mut set = vec![];
        assert!(toggle_membership(&mut set, member));
        assert_eq!(set, vec![member]);
        assert!(!toggle_membership(&mut set, member));
        assert!(set.is_empty());
    }
}
