//! Customer reviews of completed bookings.

use serde::Deserialize;
use uuid::Uuid;

use super::{Caller, ServiceError, optional_text};
use crate::backend::MarketplaceStore;
use crate::model::{BookingStatus, NewReview, Review};

pub const MAX_COMMENT_CHARS: usize = 2000;
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub booking_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Review a booking. One review per booking, by its customer, once completed.
///
/// # Errors
///
/// [`ServiceError::Invalid`] for a bad rating, long comment or unfinished
/// booking; [`ServiceError::Forbidden`] when the caller is not the booking's
/// customer; [`ServiceError::Conflict`] when a review already exists.
pub async fn submit_review(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    request: ReviewRequest,
) -> Result<Review, ServiceError> {
    if !RATING_RANGE.contains(&request.rating) {
        return Err(ServiceError::Invalid("rating must be between 1 and 5".into()));
    }
    let comment = optional_text(request.comment, "comment", MAX_COMMENT_CHARS)?;

    let booking = store
        .get_booking(&caller.access_token, request.booking_id)
        .await?;
    if booking.customer_id != caller.user_id {
        return Err(ServiceError::Forbidden("only the booking's customer can review it"));
    }
    if booking.status != BookingStatus::Completed {
        return Err(ServiceError::Invalid("only completed bookings can be reviewed".into()));
    }

    let review = NewReview {
        booking_id: booking.id,
        customer_id: caller.user_id,
        technician_id: booking.technician_id,
        rating: request.rating,
        comment,
    };
    match store.insert_review(&caller.access_token, &review).await {
        Ok(row) => {
            tracing::info!(booking_id = %row.booking_id, rating = row.rating, "review submitted");
            Ok(row)
        }
        Err(crate::backend::BackendError::Conflict(_)) => {
            Err(ServiceError::Conflict("this booking has already been reviewed".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "review_test.rs"]
mod tests;
