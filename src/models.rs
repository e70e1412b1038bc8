//! Database row types and the enums stored in them.
//!
//! Rows serialize to the camelCase JSON shapes the HTTP API returns. Password
//! hashes are never serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A local-government unit (barangay). Root of tenancy partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub municipality: String,
    pub province: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A resident account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_number: String,
    pub address: String,
    #[serde(rename = "barangayId")]
    pub unit_id: i64,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AdminRole {
    /// Cross-unit administrator with provisioning powers.
    SuperAdmin,
    /// Staff scoped to a single unit.
    UnitAdmin,
}

/// A staff account. `unit_id` is `None` exactly when `role` is `SuperAdmin`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    #[serde(rename = "barangayId")]
    pub unit_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    pub fn is_super_admin(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Noise,
    Garbage,
    Lighting,
    Road,
    Water,
    Peace,
    Business,
    Other,
}

impl Category {
    pub const ALL: [Self; 8] = [
        Self::Noise,
        Self::Garbage,
        Self::Lighting,
        Self::Road,
        Self::Water,
        Self::Peace,
        Self::Business,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::Garbage => "garbage",
            Self::Lighting => "lighting",
            Self::Road => "road",
            Self::Water => "water",
            Self::Peace => "peace",
            Self::Business => "business",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Low, Self::Medium, Self::High]
            .into_iter()
            .find(|p| p.as_str() == s)
    }
}

/// Complaint status. Ordered `Submitted < UnderReview < Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
pub enum ComplaintStatus {
    Submitted,
    #[serde(rename = "Under Review")]
    #[sqlx(rename = "Under Review")]
    UnderReview,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::Resolved => "Resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Submitted, Self::UnderReview, Self::Resolved]
            .into_iter()
            .find(|st| st.as_str() == s)
    }

    /// Whether the complaint still awaits resolution.
    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

/// A filed complaint. Submitter fields are denormalized; filing needs no account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: i64,
    pub complaint_id: String,
    pub full_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub category: Category,
    pub description: String,
    pub location: String,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub photo_filename: Option<String>,
    #[serde(rename = "barangayId")]
    pub unit_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only staff note on a complaint, keyed by the public complaint id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminNote {
    pub id: i64,
    pub complaint_id: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    #[serde(rename = "barangayId")]
    pub unit_id: i64,
    pub is_announcement: bool,
    pub is_pinned: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumReply {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public-facing author summary attached to forum content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// Aggregate complaint counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStats {
    pub total: u64,
    pub resolved: u64,
    pub pending: u64,
    pub this_month: u64,
}
