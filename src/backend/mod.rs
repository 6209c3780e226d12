//! Hosted backend-as-a-service client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Authentication, storage and row-level security all live in the hosted
//! backend. This module is the only place that speaks its wire format. The
//! rest of the crate depends on the token-scoped traits below so tests can
//! substitute an in-memory fake.
//!
//! Every call is single-attempt; failures are returned to the caller.

pub mod rest;
pub mod types;

#[cfg(test)]
pub mod test_helpers;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    Booking, BookingFilter, BookingStatus, Credentials, NewBooking, NewReview, Profile, ProfileUpdate, Review,
    ServiceOffering, Session, Technician, TechnicianFilter, VerificationUpdate,
};
pub use rest::BaasClient;
pub use types::{AuthError, BackendError};

/// Credential exchange with the backend auth service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// `Ok(None)` means the account exists but email confirmation is pending.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;
}

/// Access to the `profiles` table on behalf of a signed-in user.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with [`BackendError::NotFound`] when no row exists.
    async fn get_profile(&self, access_token: &str, user_id: Uuid) -> Result<Profile, BackendError>;

    async fn update_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError>;
}

/// Marketplace tables, as seen through row-level security for the token holder.
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn list_technicians(
        &self,
        access_token: &str,
        filter: &TechnicianFilter,
    ) -> Result<Vec<Technician>, BackendError>;

    async fn get_technician(&self, access_token: &str, id: Uuid) -> Result<Technician, BackendError>;

    async fn update_verification(
        &self,
        access_token: &str,
        id: Uuid,
        update: &VerificationUpdate,
    ) -> Result<Technician, BackendError>;

    async fn list_services(&self, access_token: &str, technician_id: Uuid) -> Result<Vec<ServiceOffering>, BackendError>;

    async fn list_reviews(&self, access_token: &str, technician_id: Uuid) -> Result<Vec<Review>, BackendError>;

    async fn insert_review(&self, access_token: &str, review: &NewReview) -> Result<Review, BackendError>;

    async fn get_booking(&self, access_token: &str, id: Uuid) -> Result<Booking, BackendError>;

    async fn list_bookings(&self, access_token: &str, filter: &BookingFilter) -> Result<Vec<Booking>, BackendError>;

    async fn insert_booking(&self, access_token: &str, booking: &NewBooking) -> Result<Booking, BackendError>;

    async fn update_booking_status(
        &self,
        access_token: &str,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, BackendError>;
}
