use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        employee::{Employee, EmployeeStatus, initials_from_prefix},
        store::Store,
    },
    notify::Notice,
    services::lookup::{self, LookupError},
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum InviteEmployeeError {
    #[error("Only admins can manage the team")]
    NotAdmin,

    #[error("Name and email are required")]
    MissingField,

    #[error("An employee with email '{0}' already exists")]
    EmailTaken(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct InviteEmployeeParameters {
    pub name: String,
    pub role: String,
    pub email: String,
}

/// Adds a pending employee. The invite is linked when that email signs in.
pub fn invite_employee(
    store: &mut Store,
    storage: &impl Storage,
    parameters: InviteEmployeeParameters,
) -> Result<(Employee, Notice), InviteEmployeeError> {
    if !store.session.is_admin {
        return Err(InviteEmployeeError::NotAdmin);
    }
    let name = parameters.name.trim();
    let email = parameters.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(InviteEmployeeError::MissingField);
    }
    if store.employees.iter().any(|e| e.has_email(email)) {
        return Err(InviteEmployeeError::EmailTaken(email.to_string()));
    }

    let employee = Employee {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: Some(email.to_string()),
        role: parameters.role.trim().to_string(),
        initials: initials_from_prefix(name),
        color: "blue".to_string(),
        status: EmployeeStatus::Pending,
    };
    store.employees.push(employee.clone());
    storage.save(store)?;

    log::info!("invited {email}");
    Ok((employee, Notice::email(format!("Invitation sent to {email}"))))
}

#[derive(Debug, Error)]
pub enum RemoveEmployeeError {
    #[error("Only admins can manage the team")]
    NotAdmin,

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Removes an employee from the directory. Their tasks, memberships and
/// messages are left as they are.
pub fn remove_employee(
    store: &mut Store,
    storage: &impl Storage,
    employee_query: &str,
) -> Result<Employee, RemoveEmployeeError> {
    if !store.session.is_admin {
        return Err(RemoveEmployeeError::NotAdmin);
    }
    let id = lookup::resolve_employee(store, employee_query)?;
    let position = store
        .employees
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| LookupError::EmployeeNotFound(employee_query.to_string()))?;
    let removed = store.employees.remove(position);

    storage.save(store)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::InMemoryStorage;

    fn setup() -> (Store, InMemoryStorage) {
        (
            Store::seeded("2025-03-05".parse().unwrap()),
            InMemoryStorage::default(),
        )
    }

    fn invite(name: &str, email: &str) -> InviteEmployeeParameters {
        InviteEmployeeParameters {
            name: name.to_string(),
            role: "Article Assistant".to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_invite_creates_pending_employee() {
        let (mut store, storage) = setup();
        let (employee, notice) =
            invite_employee(&mut store, &storage, invite("neha kapoor", "neha@taskflow.com"))
                .unwrap();

        assert_eq!(employee.status, EmployeeStatus::Pending);
        assert_eq!(employee.initials, "NE");
        assert_eq!(notice, Notice::email("Invitation sent to neha@taskflow.com"));
        assert_eq!(store.employees.len(), 6);
    }

    #[test]
    fn test_invite_rejects_duplicates_and_viewers() {
        let (mut store, storage) = setup();
        assert!(matches!(
            invite_employee(&mut store, &storage, invite("Rahul", "RAHUL@taskflow.com")),
            Err(InviteEmployeeError::EmailTaken(_))
        ));
        store.session.is_admin = false;
        assert!(matches!(
            invite_employee(&mut store, &storage, invite("Neha", "neha@taskflow.com")),
            Err(InviteEmployeeError::NotAdmin)
        ));
    }

    #[test]
    fn test_remove_employee() {
        let (mut store, storage) = setup();
        let removed = remove_employee(&mut store, &storage, "sneha").unwrap();
        assert_eq!(removed.name, "Sneha Gupta");
        assert_eq!(store.employees.len(), 4);
        assert!(matches!(
            remove_employee(&mut store, &storage, "sneha"),
            Err(RemoveEmployeeError::Lookup(LookupError::EmployeeNotFound(_)))
        ));
    }
}
