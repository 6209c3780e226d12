//! Booking creation, listing and status transitions.
//!
//! DESIGN
//! ======
//! A booking moves through a small state machine. Each edge names the
//! party allowed to take it:
//!
//! ```text
//! pending   --technician--> confirmed --technician--> completed
//!    |                          |
//!    +--customer|technician-----+------> cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal.

use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Caller, ServiceError, optional_text};
use crate::backend::MarketplaceStore;
use crate::model::{Booking, BookingFilter, BookingStatus, NewBooking, Role, VerificationStatus};

pub const MAX_ADDRESS_CHARS: usize = 500;
pub const MAX_NOTES_CHARS: usize = 2000;

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub technician_id: Uuid,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Which side of a booking the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Customer,
    Technician,
}

fn party(booking: &Booking, caller: &Caller) -> Option<Party> {
    if caller.user_id == booking.customer_id {
        Some(Party::Customer)
    } else if caller.user_id == booking.technician_id {
        Some(Party::Technician)
    } else {
        None
    }
}

fn permitted(from: BookingStatus, to: BookingStatus, party: Party) -> bool {
    use BookingStatus::{Cancelled, Completed, Confirmed, Pending};
    match (from, to) {
        (Pending, Confirmed) | (Confirmed, Completed) => party == Party::Technician,
        (Pending | Confirmed, Cancelled) => true,
        _ => false,
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Create a pending booking for the calling customer.
///
/// # Errors
///
/// [`ServiceError::Forbidden`] for non-customers, [`ServiceError::Invalid`]
/// for a past time, blank address, unverified technician, or a service that
/// technician does not offer.
pub async fn create_booking(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    request: BookingRequest,
    now: OffsetDateTime,
) -> Result<Booking, ServiceError> {
    if caller.role != Some(Role::Customer) {
        return Err(ServiceError::Forbidden("only customers can book repairs"));
    }
    if request.scheduled_for <= now {
        return Err(ServiceError::Invalid("scheduled time must be in the future".into()));
    }
    let address = optional_text(Some(request.address), "address", MAX_ADDRESS_CHARS)?
        .ok_or_else(|| ServiceError::Invalid("address is required".into()))?;
    let notes = optional_text(request.notes, "notes", MAX_NOTES_CHARS)?;

    let technician = store
        .get_technician(&caller.access_token, request.technician_id)
        .await?;
    if technician.verification_status != VerificationStatus::Verified {
        return Err(ServiceError::Invalid("technician is not accepting bookings".into()));
    }
    if let Some(service_id) = request.service_id {
        let services = store
            .list_services(&caller.access_token, technician.id)
            .await?;
        if !services.iter().any(|s| s.id == service_id) {
            return Err(ServiceError::Invalid("service is not offered by this technician".into()));
        }
    }

    let booking = store
        .insert_booking(
            &caller.access_token,
            &NewBooking {
                customer_id: caller.user_id,
                technician_id: technician.id,
                service_id: request.service_id,
                scheduled_for: request.scheduled_for,
                address,
                notes,
                status: BookingStatus::Pending,
            },
        )
        .await?;
    tracing::info!(booking_id = %booking.id, technician_id = %booking.technician_id, "booking created");
    Ok(booking)
}

/// Bookings visible to the caller: their own, their assignments, or all (admin).
///
/// # Errors
///
/// [`ServiceError::Forbidden`] when the caller has no role yet.
pub async fn list_bookings(store: &dyn MarketplaceStore, caller: &Caller) -> Result<Vec<Booking>, ServiceError> {
    let filter = match caller.role {
        Some(Role::Customer) => BookingFilter { customer_id: Some(caller.user_id), technician_id: None },
        Some(Role::Provider) => BookingFilter { customer_id: None, technician_id: Some(caller.user_id) },
        Some(Role::Admin) => BookingFilter::default(),
        None => return Err(ServiceError::Forbidden("choose a role first")),
    };
    Ok(store.list_bookings(&caller.access_token, &filter).await?)
}

/// Move a booking to `next`, if the caller's side may take that edge.
///
/// # Errors
///
/// [`ServiceError::NotFound`] when the caller is not a party to the booking,
/// [`ServiceError::Invalid`] for an edge that does not exist or belongs to
/// the other party.
pub async fn update_status(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    id: Uuid,
    next: BookingStatus,
) -> Result<Booking, ServiceError> {
    let booking = store.get_booking(&caller.access_token, id).await?;
    let Some(side) = party(&booking, caller) else {
        return Err(ServiceError::NotFound("booking".into()));
    };
    if !permitted(booking.status, next, side) {
        return Err(ServiceError::Invalid(format!(
            "cannot move booking from {} to {}",
            booking.status.as_str(),
            next.as_str()
        )));
    }

    let updated = store
        .update_booking_status(&caller.access_token, id, next)
        .await?;
    tracing::info!(booking_id = %id, from = booking.status.as_str(), to = next.as_str(), "booking status changed");
    Ok(updated)
}

#[cfg(test)]
#[path = "booking_test.rs"]
mod tests;
