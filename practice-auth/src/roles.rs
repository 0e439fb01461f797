//! Role catalog — static role definitions and their permission grants
//!
//! Loaded once per engine and shared read-only behind an `Arc`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Grants every permission
pub const WILDCARD: &str = "*";

/// Presentation metadata carried by each role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMeta {
    /// Short badge text shown next to avatars
    pub badge: String,
    /// Hex color for the badge
    pub color: String,
    pub description: String,
}

/// A role with its permission set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    /// Seniority rank (higher = more senior); display and ordering only
    pub level: u8,
    pub hourly_rate: f64,
    pub permissions: BTreeSet<String>,
    pub display_meta: RoleMeta,
}

impl Role {
    /// True if the role holds the wildcard or the exact permission
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.contains(WILDCARD) || self.permissions.contains(permission)
    }
}

/// Registry of the roles known to this process
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    /// Sorted by ascending level
    roles: Vec<Role>,
}

impl RoleCatalog {
    /// The five practice roles, each a superset of the one below
    pub fn standard() -> Self {
        let tiers: [(&str, &str, f64, &[&str], (&str, &str, &str)); 5] = [
            (
                "paralegal",
                "Paralegal",
                95.0,
                &[
                    "clients.view",
                    "matters.view",
                    "time.view",
                    "time.create",
                    "documents.view",
                    "documents.upload",
                ],
                ("PL", "#64748b", "Supports matters; records own time"),
            ),
            (
                "associate",
                "Associate",
                225.0,
                &[
                    "clients.create",
                    "clients.edit",
                    "matters.create",
                    "matters.edit",
                    "time.edit",
                    "invoices.view",
                    "documents.edit",
                ],
                ("AS", "#0ea5e9", "Handles matters and client work"),
            ),
            (
                "senior_associate",
                "Senior Associate",
                325.0,
                &[
                    "invoices.create",
                    "invoices.edit",
                    "reports.view",
                    "users.view",
                ],
                ("SA", "#6366f1", "Leads matters; drafts invoices"),
            ),
            (
                "partner",
                "Partner",
                450.0,
                &[
                    "clients.delete",
                    "matters.delete",
                    "time.delete",
                    "invoices.send",
                    "documents.delete",
                    "reports.export",
                    "users.create",
                    "users.edit",
                    "users.delete",
                ],
                ("PT", "#d97706", "Owns client relationships and billing"),
            ),
            (
                "admin",
                "Administrator",
                0.0,
                &[WILDCARD],
                ("AD", "#dc2626", "Full access to every feature"),
            ),
        ];

        let mut granted = BTreeSet::new();
        let roles = tiers
            .iter()
            .zip(1u8..)
            .map(|(&(id, name, hourly_rate, extra, (badge, color, description)), level)| {
                granted.extend(extra.iter().map(|p| p.to_string()));
                let permissions = if extra.contains(&WILDCARD) {
                    BTreeSet::from([WILDCARD.to_string()])
                } else {
                    granted.clone()
                };
                Role {
                    id: id.into(),
                    name: name.into(),
                    level,
                    hourly_rate,
                    permissions,
                    display_meta: RoleMeta {
                        badge: badge.into(),
                        color: color.into(),
                        description: description.into(),
                    },
                }
            })
            .collect();

        Self { roles }
    }

    pub fn role_by_id(&self, id: &str) -> Result<&Role> {
        self.roles
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AuthError::InvalidRole(id.to_string()))
    }

    pub fn permissions_for<'a>(&self, role: &'a Role) -> &'a BTreeSet<String> {
        &role.permissions
    }

    /// All roles in ascending seniority
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Highest-level role
    pub fn most_senior(&self) -> &Role {
        // standard() always has five entries
        &self.roles[self.roles.len() - 1]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.roles.iter().any(|r| r.id == id)
    }
}
