//! The dashboard view model: users, audit log and backend health.

use std::fmt;

use crate::api::{ApiClient, AuditEvent, Health, User};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Users,
    Audit,
    Health,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Users => write!(f, "users"),
            Section::Audit => write!(f, "audit"),
            Section::Health => write!(f, "health"),
        }
    }
}

/// A section that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFailure {
    pub section: Section,
    pub message: String,
    /// The failure was an auth problem the user can fix by signing in.
    pub sign_in_required: bool,
}

/// Everything the dashboard shows. A section is `None` when its fetch failed.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub users: Option<Vec<User>>,
    pub audit: Option<Vec<AuditEvent>>,
    pub health: Option<Health>,
    pub failures: Vec<SectionFailure>,
}

impl Dashboard {
    /// Fetch all three sections concurrently.
    ///
    /// A failing section is recorded in [`Dashboard::failures`]; the others
    /// still load.
    pub async fn load(api: &ApiClient) -> Self {
        let (users, audit, health) = futures::join!(api.users(), api.audit(), api.health());

        let mut dashboard = Dashboard::default();
        dashboard.users = dashboard.keep(Section::Users, users);
        dashboard.audit = dashboard.keep(Section::Audit, audit);
        dashboard.health = dashboard.keep(Section::Health, health);
        dashboard
    }

    /// Whether every section loaded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn keep<T>(&mut self, section: Section, result: Result<T, Error>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Failed to load {section}: {e}");
                self.failures.push(SectionFailure {
                    section,
                    message: e.to_string(),
                    sign_in_required: e.is_interaction_required(),
                });
                None
            }
        }
    }
}
