//! Sign-in, account switching and the admin toggle.
//!
//! Several accounts can be signed in on one machine; commands act as the
//! current one. Signing in with an email that was invited activates the
//! pending employee instead of creating a new one.

use std::collections::HashSet;

use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        employee::{Employee, EmployeeStatus, initials_from_name},
        store::Store,
    },
    notify::Notice,
    services::lookup::{self, LookupError},
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Identity verification failed. Try again.")]
    InvalidCredential(#[source] jsonwebtoken::errors::Error),

    #[error("Name and email are required")]
    MissingField,

    #[error("Account '{0}' is not signed in")]
    AccountNotSignedIn(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct SessionOutcome {
    pub account: Option<Employee>,
    pub notice: Notice,
}

/// Claims read from an identity provider's ID token.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// Reads the claims of a JWT without verifying its signature or expiry.
fn decode_identity(credential: &str) -> Result<IdentityClaims, jsonwebtoken::errors::Error> {
    let header = decode_header(credential)?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<IdentityClaims>(credential, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Pending employee invited under `email`, if any.
fn pending_invite(store: &Store, email: &str) -> Option<Uuid> {
    store
        .employees
        .iter()
        .find(|e| e.status == EmployeeStatus::Pending && e.has_email(email))
        .map(|e| e.id)
}

/// Marks an invite active under its signed-in name.
fn activate_invite(store: &mut Store, id: Uuid, name: Option<&str>) -> Option<Employee> {
    let employee = store.get_employee_mut(id)?;
    employee.status = EmployeeStatus::Active;
    if let Some(name) = name {
        employee.name = name.to_string();
    }
    Some(employee.clone())
}

/// Adds the account to the signed-in list (once per email) and makes it
/// current.
fn finalize_account(store: &mut Store, account: &Employee) {
    let already_signed_in = store.session.accounts.iter().any(|id| {
        *id == account.id
            || store.get_employee(*id).is_some_and(|e| {
                account.email.as_deref().is_some_and(|email| e.has_email(email))
            })
    });
    if !already_signed_in {
        store.session.accounts.push(account.id);
    }
    store.session.current_account = Some(account.id);
}

/// Signs in with an identity provider credential (a JWT).
pub fn login_with_credential(
    store: &mut Store,
    storage: &impl Storage,
    credential: &str,
) -> Result<SessionOutcome, SessionError> {
    let claims = decode_identity(credential).map_err(|e| {
        log::warn!("login credential could not be decoded: {e}");
        SessionError::InvalidCredential(e)
    })?;

    let invite = claims
        .email
        .as_deref()
        .and_then(|email| pending_invite(store, email));

    let (account, notice) = match invite.and_then(|id| activate_invite(store, id, claims.name.as_deref())) {
        Some(account) => (
            account,
            Notice::success("Welcome! Account active and data linked."),
        ),
        None => {
            let name = claims.name.unwrap_or_else(|| "TaskFlow User".to_string());
            let id = claims
                .sub
                .map(|sub| Uuid::new_v5(&Uuid::NAMESPACE_OID, sub.as_bytes()))
                .unwrap_or_else(Uuid::new_v4);
            let account = Employee {
                id,
                initials: initials_from_name(&name),
                name,
                email: claims.email,
                role: "Team Member".to_string(),
                color: "blue".to_string(),
                status: EmployeeStatus::Active,
            };
            let known = store.employees.iter().find(|e| {
                e.id == account.id
                    || account.email.as_deref().is_some_and(|email| e.has_email(email))
            });
            let account = match known {
                Some(existing) => existing.clone(),
                None => {
                    store.employees.push(account.clone());
                    account
                }
            };
            let notice = Notice::success(format!("Welcome back, {}!", account.name));
            (account, notice)
        }
    };

    finalize_account(store, &account);
    storage.save(store)?;

    log::info!("signed in as {}", account.name);
    Ok(SessionOutcome {
        account: Some(account),
        notice,
    })
}

/// Signs in with a plain email and display name.
pub fn login_with_email(
    store: &mut Store,
    storage: &impl Storage,
    email: &str,
    name: &str,
) -> Result<SessionOutcome, SessionError> {
    let email = email.trim();
    let name = name.trim();
    if email.is_empty() || name.is_empty() {
        return Err(SessionError::MissingField);
    }

    let invite = pending_invite(store, email);
    let (account, notice) = match invite.and_then(|id| activate_invite(store, id, Some(name))) {
        Some(account) => (
            account,
            Notice::success("Linked! All your work data is ready."),
        ),
        None => {
            let account = Employee {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: Some(email.to_string()),
                role: "Project Member".to_string(),
                initials: initials_from_name(name),
                color: "indigo".to_string(),
                status: EmployeeStatus::Active,
            };
            store.employees.push(account.clone());
            (account, Notice::success(format!("Hello, {name}!")))
        }
    };

    finalize_account(store, &account);
    storage.save(store)?;

    log::info!("signed in as {}", account.name);
    Ok(SessionOutcome {
        account: Some(account),
        notice,
    })
}

/// Signs in as a throwaway administrator.
pub fn login_as_guest(
    store: &mut Store,
    storage: &impl Storage,
) -> Result<SessionOutcome, SessionError> {
    let guest = Employee {
        id: Uuid::new_v4(),
        name: "Guest Admin".to_string(),
        email: Some("guest@taskflow.local".to_string()),
        role: "Project Manager (Guest)".to_string(),
        initials: "GA".to_string(),
        color: "slate".to_string(),
        status: EmployeeStatus::Active,
    };
    store.employees.push(guest.clone());
    store.session.is_admin = true;

    finalize_account(store, &guest);
    storage.save(store)?;

    Ok(SessionOutcome {
        account: Some(guest),
        notice: Notice::info("Entered as Guest Administrator"),
    })
}

pub fn switch_account(
    store: &mut Store,
    storage: &impl Storage,
    account_query: &str,
) -> Result<SessionOutcome, SessionError> {
    let id = lookup::resolve_employee(store, account_query)?;
    if !store.session.accounts.contains(&id) {
        return Err(SessionError::AccountNotSignedIn(account_query.to_string()));
    }
    let account = store
        .get_employee(id)
        .cloned()
        .ok_or_else(|| LookupError::EmployeeNotFound(account_query.to_string()))?;

    store.session.current_account = Some(id);
    storage.save(store)?;

    let notice = Notice::info(format!("Switched to {}", account.name));
    Ok(SessionOutcome {
        account: Some(account),
        notice,
    })
}

/// Signs the current account out and falls back to the first remaining one.
pub fn logout(store: &mut Store, storage: &impl Storage) -> Result<SessionOutcome, SessionError> {
    let Some(current_id) = store.session.current_account else {
        return Ok(SessionOutcome {
            account: None,
            notice: Notice::info("No account is signed in."),
        });
    };
    let current_name = store
        .employee_name(current_id)
        .unwrap_or("account")
        .to_string();

    store.session.accounts.retain(|id| *id != current_id);
    let next = store
        .session
        .accounts
        .iter()
        .find_map(|id| store.get_employee(*id))
        .cloned();
    store.session.current_account = next.as_ref().map(|e| e.id);
    storage.save(store)?;

    let notice = match &next {
        Some(next) => Notice::info(format!(
            "Signed out of {current_name}. Switched to {}",
            next.name
        )),
        None => Notice::info("Successfully signed out."),
    };
    Ok(SessionOutcome {
        account: next,
        notice,
    })
}

/// Flips between admin and viewer mode. Returns whether admin mode is on.
pub fn toggle_admin(store: &mut Store, storage: &impl Storage) -> Result<bool, SessionError> {
    store.session.is_admin = !store.session.is_admin;
    storage.save(store)?;
    Ok(store.session.is_admin)
}
