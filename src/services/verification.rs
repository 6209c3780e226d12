//! Admin review of technician listings.

use serde::Deserialize;
use uuid::Uuid;

use super::{Caller, ServiceError, optional_text};
use crate::backend::MarketplaceStore;
use crate::model::{Technician, TechnicianFilter, VerificationStatus, VerificationUpdate};

pub const MAX_NOTE_CHARS: usize = 500;

/// Body of `PUT /api/admin/technicians/{id}/verification`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationRequest {
    pub status: VerificationStatus,
    #[serde(default)]
    pub note: Option<String>,
}

fn require_admin(caller: &Caller) -> Result<(), ServiceError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("admin only"))
    }
}

/// Technicians in the given verification state (all when `None`).
///
/// # Errors
///
/// [`ServiceError::Forbidden`] for non-admins.
pub async fn list_for_review(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    status: Option<VerificationStatus>,
) -> Result<Vec<Technician>, ServiceError> {
    require_admin(caller)?;
    let filter = TechnicianFilter { status, ..TechnicianFilter::default() };
    Ok(store.list_technicians(&caller.access_token, &filter).await?)
}

/// Mark a technician verified or rejected.
///
/// # Errors
///
/// [`ServiceError::Forbidden`] for non-admins, [`ServiceError::Invalid`]
/// when asked to move a listing back to pending.
pub async fn set_verification(
    store: &dyn MarketplaceStore,
    caller: &Caller,
    id: Uuid,
    request: VerificationRequest,
) -> Result<Technician, ServiceError> {
    require_admin(caller)?;
    if request.status == VerificationStatus::Pending {
        return Err(ServiceError::Invalid("status must be verified or rejected".into()));
    }
    let update = VerificationUpdate {
        verification_status: request.status,
        verification_note: optional_text(request.note, "note", MAX_NOTE_CHARS)?,
    };
    let technician = store
        .update_verification(&caller.access_token, id, &update)
        .await?;
    tracing::info!(
        technician_id = %id,
        admin_id = %caller.user_id,
        status = request.status.as_str(),
        "technician verification updated"
    );
    Ok(technician)
}

#[cfg(test)]
#[path = "verification_test.rs"]
mod tests;
