//! In-memory stand-in for the hosted backend, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::{AuthApi, AuthError, BackendError, MarketplaceStore, ProfileStore};
use crate::model::{
    Booking, BookingFilter, BookingStatus, Credentials, Identity, NewBooking, NewReview, Profile, ProfileUpdate,
    Review, Role, ServiceOffering, Session, Technician, TechnicianFilter, VerificationStatus, VerificationUpdate,
};

#[derive(Default)]
struct Data {
    accounts: HashMap<String, (String, Identity)>,
    access: HashMap<String, Uuid>,
    refresh: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, Profile>,
    technicians: HashMap<Uuid, Technician>,
    services: Vec<ServiceOffering>,
    bookings: HashMap<Uuid, Booking>,
    reviews: Vec<Review>,
    issued: u64,
}

/// Fake backend. Tokens are only valid if this fake issued them.
#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<Data>,
    fail_profiles: AtomicBool,
    profile_gate: Mutex<Option<Arc<Semaphore>>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub profile_fetches: AtomicUsize,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().expect("fake backend mutex")
    }

    /// Register an account with an empty profile row.
    pub fn add_account(&self, email: &str, password: &str) -> Identity {
        let identity = Identity { id: Uuid::new_v4(), email: Some(email.to_owned()) };
        let mut data = self.data();
        data.accounts
            .insert(email.to_owned(), (password.to_owned(), identity.clone()));
        data.profiles.insert(identity.id, Profile::new(identity.id));
        identity
    }

    /// Register an account whose profile already has a role and phone.
    pub fn add_onboarded(&self, email: &str, role: Role) -> Identity {
        let identity = self.add_account(email, "pw");
        self.update_row(identity.id, |p| {
            p.role = Some(role);
            p.phone = Some("5550102030".into());
            p.onboarding_complete = Some(true);
        });
        identity
    }

    pub fn update_row(&self, user_id: Uuid, edit: impl FnOnce(&mut Profile)) {
        let mut data = self.data();
        let profile = data
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id));
        edit(profile);
    }

    pub fn remove_profile(&self, user_id: Uuid) {
        self.data().profiles.remove(&user_id);
    }

    #[must_use]
    pub fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.data().profiles.get(&user_id).cloned()
    }

    /// Issue a session directly, bypassing the password check.
    pub fn issue(&self, user: &Identity) -> Session {
        self.issue_with_expiry(user, OffsetDateTime::now_utc().unix_timestamp() + 3600)
    }

    pub fn issue_with_expiry(&self, user: &Identity, expires_at: i64) -> Session {
        let mut data = self.data();
        data.issued += 1;
        let n = data.issued;
        let session = Session {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            expires_at,
            user: user.clone(),
        };
        data.access.insert(session.access_token.clone(), user.id);
        data.refresh.insert(session.refresh_token.clone(), user.id);
        session
    }

    pub fn set_profile_failure(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    /// Park profile fetches until [`FakeBackend::release_profiles`].
    pub fn hold_profiles(&self) {
        *self.profile_gate.lock().expect("gate mutex") = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_profiles(&self) {
        if let Some(gate) = self.profile_gate.lock().expect("gate mutex").take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn add_technician(&self, id: Uuid, name: &str, status: VerificationStatus) -> Technician {
        let tech = Technician {
            id,
            full_name: name.to_owned(),
            city: Some("Minneapolis".into()),
            appliances: vec!["oven".into(), "dishwasher".into()],
            bio: None,
            hourly_rate_cents: Some(8_500),
            verification_status: status,
            verification_note: None,
        };
        self.data().technicians.insert(id, tech.clone());
        tech
    }

    pub fn add_service(&self, technician_id: Uuid, title: &str, price_cents: i64) -> ServiceOffering {
        let service = ServiceOffering {
            id: Uuid::new_v4(),
            technician_id,
            title: title.to_owned(),
            appliance: "oven".into(),
            base_price_cents: price_cents,
            description: None,
        };
        self.data().services.push(service.clone());
        service
    }

    pub fn add_booking(&self, booking: Booking) {
        self.data().bookings.insert(booking.id, booking);
    }

    pub fn add_review(&self, review: Review) {
        self.data().reviews.push(review);
    }

    #[must_use]
    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.data().bookings.get(&id).cloned()
    }

    fn check_token(&self, access_token: &str) -> Result<Uuid, BackendError> {
        self.data()
            .access
            .get(access_token)
            .copied()
            .ok_or(BackendError::Rejected { status: 401, body: "invalid JWT".into() })
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let identity = {
            let data = self.data();
            match data.accounts.get(&credentials.email) {
                Some((password, identity)) if *password == credentials.password => identity.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        Ok(self.issue(&identity))
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        if self.data().accounts.contains_key(&credentials.email) {
            return Err(AuthError::AlreadyRegistered);
        }
        let identity = self.add_account(&credentials.email, &credentials.password);
        if credentials.email.starts_with("confirm") {
            return Ok(None);
        }
        Ok(Some(self.issue(&identity)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if access_token == "unreachable" {
            return Err(AuthError::Request("connection refused".into()));
        }
        self.data().access.remove(access_token);
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave, as a real round trip would.
        tokio::task::yield_now().await;
        let user_id = self
            .data()
            .refresh
            .remove(refresh_token)
            .ok_or(AuthError::SessionExpired)?;
        let identity = {
            let data = self.data();
            data.accounts
                .values()
                .map(|(_, identity)| identity.clone())
                .find(|identity| identity.id == user_id)
                .unwrap_or(Identity { id: user_id, email: None })
        };
        Ok(self.issue(&identity))
    }
}

#[async_trait]
impl ProfileStore for FakeBackend {
    async fn get_profile(&self, access_token: &str, user_id: Uuid) -> Result<Profile, BackendError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.profile_gate.lock().expect("gate mutex").clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
        self.check_token(access_token)?;
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(BackendError::Request("connection reset".into()));
        }
        self.profile(user_id)
            .ok_or_else(|| BackendError::NotFound("profile".into()))
    }

    async fn update_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        self.check_token(access_token)?;
        let mut data = self.data();
        let profile = data
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| BackendError::NotFound("profile".into()))?;
        update.apply_to(profile);
        Ok(profile.clone())
    }
}

#[async_trait]
impl MarketplaceStore for FakeBackend {
    async fn list_technicians(
        &self,
        access_token: &str,
        filter: &TechnicianFilter,
    ) -> Result<Vec<Technician>, BackendError> {
        self.check_token(access_token)?;
        let mut out: Vec<Technician> = self
            .data()
            .technicians
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.verification_status == s))
            .filter(|t| {
                filter
                    .city
                    .as_deref()
                    .is_none_or(|c| t.city.as_deref().is_some_and(|tc| tc.eq_ignore_ascii_case(c)))
            })
            .filter(|t| filter.appliance.as_deref().is_none_or(|a| t.appliances.iter().any(|x| x == a)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(out)
    }

    async fn get_technician(&self, access_token: &str, id: Uuid) -> Result<Technician, BackendError> {
        self.check_token(access_token)?;
        self.data()
            .technicians
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound("technician".into()))
    }

    async fn update_verification(
        &self,
        access_token: &str,
        id: Uuid,
        update: &VerificationUpdate,
    ) -> Result<Technician, BackendError> {
        self.check_token(access_token)?;
        let mut data = self.data();
        let tech = data
            .technicians
            .get_mut(&id)
            .ok_or_else(|| BackendError::NotFound("technician".into()))?;
        tech.verification_status = update.verification_status;
        tech.verification_note.clone_from(&update.verification_note);
        Ok(tech.clone())
    }

    async fn list_services(&self, access_token: &str, technician_id: Uuid) -> Result<Vec<ServiceOffering>, BackendError> {
        self.check_token(access_token)?;
        Ok(self
            .data()
            .services
            .iter()
            .filter(|s| s.technician_id == technician_id)
            .cloned()
            .collect())
    }

    async fn list_reviews(&self, access_token: &str, technician_id: Uuid) -> Result<Vec<Review>, BackendError> {
        self.check_token(access_token)?;
        Ok(self
            .data()
            .reviews
            .iter()
            .filter(|r| r.technician_id == technician_id)
            .cloned()
            .collect())
    }

    async fn insert_review(&self, access_token: &str, review: &NewReview) -> Result<Review, BackendError> {
        self.check_token(access_token)?;
        let mut data = self.data();
        if data.reviews.iter().any(|r| r.booking_id == review.booking_id) {
            return Err(BackendError::Conflict("duplicate key value violates unique constraint".into()));
        }
        let row = Review {
            id: Uuid::new_v4(),
            booking_id: review.booking_id,
            customer_id: review.customer_id,
            technician_id: review.technician_id,
            rating: review.rating,
            comment: review.comment.clone(),
        };
        data.reviews.push(row.clone());
        Ok(row)
    }

    async fn get_booking(&self, access_token: &str, id: Uuid) -> Result<Booking, BackendError> {
        self.check_token(access_token)?;
        self.booking(id)
            .ok_or_else(|| BackendError::NotFound("booking".into()))
    }

    async fn list_bookings(&self, access_token: &str, filter: &BookingFilter) -> Result<Vec<Booking>, BackendError> {
        self.check_token(access_token)?;
        let mut out: Vec<Booking> = self
            .data()
            .bookings
            .values()
            .filter(|b| filter.customer_id.is_none_or(|id| b.customer_id == id))
            .filter(|b| filter.technician_id.is_none_or(|id| b.technician_id == id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.scheduled_for.cmp(&a.scheduled_for));
        Ok(out)
    }

    async fn insert_booking(&self, access_token: &str, booking: &NewBooking) -> Result<Booking, BackendError> {
        self.check_token(access_token)?;
        let row = Booking {
            id: Uuid::new_v4(),
            customer_id: booking.customer_id,
            technician_id: booking.technician_id,
            service_id: booking.service_id,
            scheduled_for: booking.scheduled_for,
            address: booking.address.clone(),
            notes: booking.notes.clone(),
            status: booking.status,
        };
        self.add_booking(row.clone());
        Ok(row)
    }

    async fn update_booking_status(
        &self,
        access_token: &str,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, BackendError> {
        self.check_token(access_token)?;
        let mut data = self.data();
        let booking = data
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BackendError::NotFound("booking".into()))?;
        booking.status = status;
        Ok(booking.clone())
    }
}
