//! Builders for domain fixtures used across the integration tests.

use chrono::{Duration, NaiveDate, Utc};
use staysync_domain::utils::dates;
use staysync_domain::{
    Booking, BookingEvent, BookingStatus, CalendarSource, Platform,
};
use uuid::Uuid;

pub const PROPERTY: &str = "prop-1";

/// A date `offset` days from today; keeps test stays in the future so the
/// completed-bookings maintenance pass leaves them alone.
pub fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(offset)
}

pub fn source(id: &str, platform: Platform, feed_url: &str) -> CalendarSource {
    CalendarSource {
        id: id.to_string(),
        property_id: PROPERTY.to_string(),
        platform,
        feed_url: feed_url.to_string(),
        sync_enabled: true,
        sync_interval_minutes: 30,
        last_synced_at: None,
        last_sync_status: None,
        created_at: Utc::now(),
    }
}

pub fn event(
    external_id: &str,
    platform: Platform,
    guest: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> BookingEvent {
    BookingEvent {
        external_id: external_id.to_string(),
        platform,
        status: BookingStatus::Confirmed,
        check_in,
        check_out,
        nights: dates::nights_between(check_in, check_out),
        guest_name: guest.to_string(),
        raw_payload: format!("{{\"uid\":\"{external_id}\"}}"),
    }
}

pub fn booking(
    platform: Platform,
    guest: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Booking {
    let now = Utc::now();
    Booking {
        id: Uuid::now_v7().to_string(),
        property_id: PROPERTY.to_string(),
        calendar_source_id: None,
        external_id: None,
        platform,
        status: BookingStatus::Confirmed,
        check_in,
        check_out,
        nights: dates::nights_between(check_in, check_out),
        guest_name: guest.to_string(),
        guest_email: None,
        guest_phone: None,
        guest_count: 1,
        total_price: None,
        currency: "EUR".into(),
        raw_payload: None,
        created_at: now,
        updated_at: now,
    }
}

/// Render a minimal iCalendar document from `(uid, summary, check_in,
/// check_out)` event tuples.
pub fn ical_document(events: &[(&str, &str, NaiveDate, NaiveDate)]) -> String {
    let mut doc = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n");
    for (uid, summary, check_in, check_out) in events {
        doc.push_str(&format!(
            "BEGIN:VEVENT\r\nUID:{uid}\r\nSUMMARY:{summary}\r\nDTSTART;VALUE=DATE:{}\r\nDTEND;VALUE=DATE:{}\r\nEND:VEVENT\r\n",
            check_in.format("%Y%m%d"),
            check_out.format("%Y%m%d"),
        ));
    }
    doc.push_str("END:VCALENDAR\r\n");
    doc
}
