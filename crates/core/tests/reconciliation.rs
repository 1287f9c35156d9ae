//! Reconciliation behaviour: create/update/cancel classification and
//! event-idempotence of the merge.

mod support;

use chrono::NaiveDate;
use staysync_core::booking::ports::BookingRepository;
use staysync_core::{MergeOutcome, ReconciliationService};
use staysync_domain::{BookingStatus, Platform};
use support::fixtures::{booking, day, event, PROPERTY};
use support::repositories::InMemoryLedger;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn replaying_an_identical_feed_changes_nothing() {
    let ledger = InMemoryLedger::new();
    let service = ReconciliationService::new(ledger.clone());
    let ev = event("X", Platform::Airbnb, "John Smith", day(10), day(12));

    let (_, outcome) = service.merge_event(&ev, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Created);

    let (_, outcome) = service.merge_event(&ev, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Unchanged);

    assert_eq!(ledger.booking_rows().len(), 1, "no duplicate rows on replay");
}

#[tokio::test]
async fn extending_the_stay_updates_the_booking_and_nights() {
    let ledger = InMemoryLedger::new();
    let service = ReconciliationService::new(ledger.clone());

    let first = event("X", Platform::Airbnb, "John Smith", date(2024, 3, 10), date(2024, 3, 12));
    let (_, outcome) = service.merge_event(&first, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Created);

    let extended = event("X", Platform::Airbnb, "John Smith", date(2024, 3, 10), date(2024, 3, 13));
    let (updated, outcome) = service.merge_event(&extended, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Updated);
    assert_eq!(updated.nights, 3);
    assert_eq!(updated.check_out, date(2024, 3, 13));

    let rows = ledger.booking_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].nights, 3);
}

#[tokio::test]
async fn guest_name_changes_count_as_updates() {
    let ledger = InMemoryLedger::new();
    let service = ReconciliationService::new(ledger.clone());

    let ev = event("X", Platform::Booking, "Ana", day(5), day(8));
    service.merge_event(&ev, "src-1", PROPERTY).await.expect("merge");

    let renamed = event("X", Platform::Booking, "Ana Costa", day(5), day(8));
    let (updated, outcome) = service.merge_event(&renamed, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Updated);
    assert_eq!(updated.guest_name, "Ana Costa");
}

#[tokio::test]
async fn feed_cancellation_cancels_the_booking_once() {
    let ledger = InMemoryLedger::new();
    let service = ReconciliationService::new(ledger.clone());

    let ev = event("X", Platform::Airbnb, "John Smith", day(10), day(12));
    service.merge_event(&ev, "src-1", PROPERTY).await.expect("merge");

    let mut cancelled = ev.clone();
    cancelled.status = BookingStatus::Cancelled;
    let (stored, outcome) = service.merge_event(&cancelled, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Cancelled);
    assert_eq!(stored.status, BookingStatus::Cancelled);

    // A second cancellation for an already-cancelled booking is a no-op.
    let (_, outcome) = service.merge_event(&cancelled, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Unchanged);
}

#[tokio::test]
async fn cancellation_for_an_unknown_stay_still_creates_a_record() {
    let ledger = InMemoryLedger::new();
    let service = ReconciliationService::new(ledger.clone());

    let mut ev = event("GONE", Platform::Booking, "Maria", day(3), day(6));
    ev.status = BookingStatus::Cancelled;
    let (stored, outcome) = service.merge_event(&ev, "src-1", PROPERTY).await.expect("merge");
    assert_eq!(outcome, MergeOutcome::Created);
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn maintenance_pass_completes_past_bookings() {
    let ledger = InMemoryLedger::new();
    let service = ReconciliationService::new(ledger.clone());

    let past = booking(Platform::Airbnb, "Old Guest", day(-10), day(-7));
    let future = booking(Platform::Airbnb, "New Guest", day(7), day(10));
    BookingRepository::insert(ledger.as_ref(), &past).await.expect("insert");
    BookingRepository::insert(ledger.as_ref(), &future).await.expect("insert");

    let completed = service.mark_completed(PROPERTY, day(0)).await.expect("maintenance");
    assert_eq!(completed, 1);

    let rows = ledger.booking_rows();
    let past_row = rows.iter().find(|b| b.id == past.id).expect("past row");
    let future_row = rows.iter().find(|b| b.id == future.id).expect("future row");
    assert_eq!(past_row.status, BookingStatus::Completed);
    assert_eq!(future_row.status, BookingStatus::Confirmed);
}
