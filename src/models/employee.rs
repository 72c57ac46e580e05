use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub initials: String,
    /// Color tag of the avatar
    pub color: String,
    pub status: EmployeeStatus,
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    /// Registered
    #[default]
    Active,
    /// Invited, has not logged in yet
    Pending,
}

impl Employee {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(email))
    }
}

/// First letter of the first two words, uppercased ("Priya Patel" -> "PP").
pub fn initials_from_name(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

/// First two letters of the name, uppercased. Used for invitations.
pub fn initials_from_prefix(name: &str) -> String {
    name.chars().take(2).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials() {
        assert_eq!(initials_from_name("Priya Patel"), "PP");
        assert_eq!(initials_from_name("vikram singh malhotra"), "VS");
        assert_eq!(initials_from_name("Cher"), "C");
        assert_eq!(initials_from_prefix("neha"), "NE");
    }

    #[test]
    fn test_email_match_ignores_case() {
        let employee = Employee {
            email: Some("Rahul@TaskFlow.com".into()),
            ..Employee::default()
        };
        assert!(employee.has_email("rahul@taskflow.com"));
        assert!(!employee.has_email("amit@taskflow.com"));
        assert!(!Employee::default().has_email("rahul@taskflow.com"));
    }
}
