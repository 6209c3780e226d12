use time::Duration;

use super::*;
use crate::backend::test_helpers::FakeBackend;
use crate::services::test_helpers::caller;

fn signed_in(fake: &FakeBackend, role: Role) -> Caller {
    let identity = fake.add_onboarded(&format!("{}@example.com", Uuid::new_v4()), role);
    let session = fake.issue(&identity);
    caller(identity.id, Some(role), &session.access_token)
}

fn request(technician_id: Uuid, now: OffsetDateTime) -> BookingRequest {
    BookingRequest {
        technician_id,
        service_id: None,
        scheduled_for: now + Duration::days(2),
        address: "  12 Elm St  ".into(),
        notes: Some("oven won't heat".into()),
    }
}

fn seeded(fake: &FakeBackend, customer: &Caller, technician: &Caller, status: BookingStatus) -> Booking {
    let booking = Booking {
        id: Uuid::new_v4(),
        customer_id: customer.user_id,
        technician_id: technician.user_id,
        service_id: None,
        scheduled_for: OffsetDateTime::now_utc() + Duration::days(1),
        address: "12 Elm St".into(),
        notes: None,
        status,
    };
    fake.add_booking(booking.clone());
    booking
}

// =============================================================================
// create_booking
// =============================================================================

#[tokio::test]
async fn customer_books_verified_technician() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech_id = Uuid::new_v4();
    fake.add_technician(tech_id, "Ada", VerificationStatus::Verified);
    let now = OffsetDateTime::now_utc();

    let booking = create_booking(&*fake, &customer, request(tech_id, now), now)
        .await
        .expect("booking");

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.customer_id, customer.user_id);
    assert_eq!(booking.address, "12 Elm St");
    assert!(fake.booking(booking.id).is_some());
}

#[tokio::test]
async fn providers_cannot_book() {
    let fake = FakeBackend::new();
    let provider = signed_in(&fake, Role::Provider);
    let tech_id = Uuid::new_v4();
    fake.add_technician(tech_id, "Ada", VerificationStatus::Verified);
    let now = OffsetDateTime::now_utc();

    let err = create_booking(&*fake, &provider, request(tech_id, now), now)
        .await
        .expect_err("provider");

    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn past_time_and_blank_address_rejected() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech_id = Uuid::new_v4();
    fake.add_technician(tech_id, "Ada", VerificationStatus::Verified);
    let now = OffsetDateTime::now_utc();

    let mut past = request(tech_id, now);
    past.scheduled_for = now - Duration::hours(1);
    let err = create_booking(&*fake, &customer, past, now).await.expect_err("past");
    assert!(matches!(err, ServiceError::Invalid(_)));

    let mut blank = request(tech_id, now);
    blank.address = "   ".into();
    let err = create_booking(&*fake, &customer, blank, now).await.expect_err("blank");
    assert_eq!(err, ServiceError::Invalid("address is required".into()));
}

#[tokio::test]
async fn unverified_technician_not_bookable() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech_id = Uuid::new_v4();
    fake.add_technician(tech_id, "Bo", VerificationStatus::Pending);
    let now = OffsetDateTime::now_utc();

    let err = create_booking(&*fake, &customer, request(tech_id, now), now)
        .await
        .expect_err("unverified");

    assert_eq!(err, ServiceError::Invalid("technician is not accepting bookings".into()));
}

#[tokio::test]
async fn service_must_belong_to_technician() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();
    fake.add_technician(tech_id, "Ada", VerificationStatus::Verified);
    fake.add_technician(other_id, "Cy", VerificationStatus::Verified);
    let foreign = fake.add_service(other_id, "Dishwasher pump", 9_000);
    let own = fake.add_service(tech_id, "Oven thermostat", 11_000);
    let now = OffsetDateTime::now_utc();

    let mut req = request(tech_id, now);
    req.service_id = Some(foreign.id);
    let err = create_booking(&*fake, &customer, req, now).await.expect_err("foreign");
    assert!(matches!(err, ServiceError::Invalid(_)));

    let mut req = request(tech_id, now);
    req.service_id = Some(own.id);
    let booking = create_booking(&*fake, &customer, req, now).await.expect("own service");
    assert_eq!(booking.service_id, Some(own.id));
}

// =============================================================================
// list_bookings
// =============================================================================

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let other_customer = signed_in(&fake, Role::Customer);
    let tech = signed_in(&fake, Role::Provider);
    let admin = signed_in(&fake, Role::Admin);
    seeded(&fake, &customer, &tech, BookingStatus::Pending);
    seeded(&fake, &other_customer, &tech, BookingStatus::Pending);

    assert_eq!(list_bookings(&*fake, &customer).await.expect("customer").len(), 1);
    assert_eq!(list_bookings(&*fake, &tech).await.expect("tech").len(), 2);
    assert_eq!(list_bookings(&*fake, &admin).await.expect("admin").len(), 2);

    let roleless = caller(customer.user_id, None, &customer.access_token);
    assert!(matches!(list_bookings(&*fake, &roleless).await, Err(ServiceError::Forbidden(_))));
}

// =============================================================================
// update_status
// =============================================================================

#[test]
fn transition_table() {
    use BookingStatus::{Cancelled, Completed, Confirmed, Pending};

    assert!(permitted(Pending, Confirmed, Party::Technician));
    assert!(!permitted(Pending, Confirmed, Party::Customer));
    assert!(permitted(Confirmed, Completed, Party::Technician));
    assert!(!permitted(Confirmed, Completed, Party::Customer));
    assert!(permitted(Pending, Cancelled, Party::Customer));
    assert!(permitted(Confirmed, Cancelled, Party::Technician));
    assert!(!permitted(Pending, Completed, Party::Technician));
    assert!(!permitted(Completed, Cancelled, Party::Customer));
    assert!(!permitted(Cancelled, Pending, Party::Technician));
}

#[tokio::test]
async fn technician_confirms_then_completes() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech = signed_in(&fake, Role::Provider);
    let booking = seeded(&fake, &customer, &tech, BookingStatus::Pending);

    update_status(&*fake, &tech, booking.id, BookingStatus::Confirmed)
        .await
        .expect("confirm");
    let done = update_status(&*fake, &tech, booking.id, BookingStatus::Completed)
        .await
        .expect("complete");

    assert_eq!(done.status, BookingStatus::Completed);
}

#[tokio::test]
async fn customer_cannot_confirm() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech = signed_in(&fake, Role::Provider);
    let booking = seeded(&fake, &customer, &tech, BookingStatus::Pending);

    let err = update_status(&*fake, &customer, booking.id, BookingStatus::Confirmed)
        .await
        .expect_err("customer confirm");

    assert_eq!(err, ServiceError::Invalid("cannot move booking from pending to confirmed".into()));
    assert_eq!(fake.booking(booking.id).map(|b| b.status), Some(BookingStatus::Pending));
}

#[tokio::test]
async fn strangers_see_not_found() {
    let fake = FakeBackend::new();
    let customer = signed_in(&fake, Role::Customer);
    let tech = signed_in(&fake, Role::Provider);
    let stranger = signed_in(&fake, Role::Customer);
    let booking = seeded(&fake, &customer, &tech, BookingStatus::Pending);

    let err = update_status(&*fake, &stranger, booking.id, BookingStatus::Cancelled)
        .await
        .expect_err("stranger");

    assert_eq!(err, ServiceError::NotFound("booking".into()));
}
