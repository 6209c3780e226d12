//! Technician catalog: listings and detail pages.

use serde::Serialize;
use uuid::Uuid;

use super::{Caller, ServiceError};
use crate::backend::MarketplaceStore;
use crate::model::{Review, ServiceOffering, Technician, TechnicianFilter, VerificationStatus};

/// A technician with everything the detail page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicianDetail {
    #[serde(flatten)]
    pub technician: Technician,
    pub services: Vec<ServiceOffering>,
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
}

/// Mean rating rounded to one decimal, `None` without reviews.
#[must_use]
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = f64::from(total) / reviews.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// List technicians. Only admins may see unverified listings.
///
/// # Errors
///
/// Returns [`ServiceError::Backend`] when the backend call fails.
pub async fn list_technicians(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    filter: TechnicianFilter,
) -> Result<Vec<Technician>, ServiceError> {
    let status = if caller.is_admin() { filter.status } else { Some(VerificationStatus::Verified) };
    let filter = TechnicianFilter {
        status,
        city: clean(filter.city),
        appliance: clean(filter.appliance).map(|a| a.to_lowercase()),
    };
    Ok(store.list_technicians(&caller.access_token, &filter).await?)
}

/// Technician detail with services, reviews and the average rating.
///
/// Unverified technicians are visible to admins and to themselves only.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] for unknown or hidden technicians.
pub async fn technician_detail(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    id: Uuid,
) -> Result<TechnicianDetail, ServiceError> {
    let technician = store.get_technician(&caller.access_token, id).await?;
    let visible = technician.verification_status == VerificationStatus::Verified
        || caller.is_admin()
        || caller.user_id == technician.id;
    if !visible {
        return Err(ServiceError::NotFound("technician".into()));
    }

    let services = store.list_services(&caller.access_token, id).await?;
    let reviews = store.list_reviews(&caller.access_token, id).await?;
    let average_rating = average_rating(&reviews);
    Ok(TechnicianDetail { technician, services, reviews, average_rating })
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
