//! Marketplace rows: technicians, service offerings, bookings, reviews.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// TECHNICIANS
// =============================================================================

/// Admin verification state of a technician listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

/// Public technician listing. Mirrors the `technicians` table; `id` is the
/// technician's profile id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Appliance kinds this technician repairs (e.g. `dishwasher`, `oven`).
    #[serde(default)]
    pub appliances: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub hourly_rate_cents: Option<i64>,
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub verification_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TechnicianFilter {
    #[serde(default)]
    pub status: Option<VerificationStatus>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub appliance: Option<String>,
}

/// Admin decision written to a technician row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationUpdate {
    pub verification_status: VerificationStatus,
    pub verification_note: Option<String>,
}

/// A priced repair service offered by one technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub technician_id: Uuid,
    pub title: String,
    pub appliance: String,
    pub base_price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// BOOKINGS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub technician_id: Uuid,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: BookingStatus,
}

/// Insert payload for the `bookings` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub technician_id: Uuid,
    pub service_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    pub address: String,
    pub notes: Option<String>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub customer_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
}

// =============================================================================
// REVIEWS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub technician_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub technician_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
}
