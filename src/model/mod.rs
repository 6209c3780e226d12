//! Domain types.
//!
//! DESIGN
//! ======
//! `auth` holds identity, session and profile types consumed by the guard and
//! the state holder. `market` holds the marketplace rows (technicians,
//! services, bookings, reviews). Both are normalized at the deserialization
//! boundary so the rest of the crate only sees closed enums.

pub mod auth;
pub mod market;

pub use auth::{
    AuthSnapshot, Credentials, Identity, OnboardingDetails, Profile, ProfileUpdate, Role, Session, UnknownRole,
    ValidationError,
};
pub use market::{
    Booking, BookingFilter, BookingStatus, NewBooking, NewReview, Review, ServiceOffering, Technician, TechnicianFilter,
    VerificationStatus, VerificationUpdate,
};
