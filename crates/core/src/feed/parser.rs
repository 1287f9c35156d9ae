//! Calendar feed document parser.
//!
//! Turns a raw iCalendar text document into normalized [`BookingEvent`]
//! records. A single malformed event is logged and skipped; only a document
//! that is not a calendar at all fails the parse. Platform-specific
//! behavior is confined to guest-name extraction and status-keyword
//! detection.

use chrono::NaiveDate;
use serde_json::json;
use staysync_domain::constants::BLOCK_KEYWORDS;
use staysync_domain::utils::dates;
use staysync_domain::{extract_guest_name, BookingEvent, BookingStatus, Platform, Result, StaySyncError};
use tracing::{debug, warn};

/// Parse a feed document into normalized booking events.
pub fn parse_feed(content: &str, platform: Platform) -> Result<Vec<BookingEvent>> {
    if !content.contains("BEGIN:VCALENDAR") {
        return Err(StaySyncError::Parse("document is not an iCalendar feed".into()));
    }

    let lines = unfold_lines(content);
    let mut events = Vec::new();
    let mut current: Option<Vec<Property>> = None;

    for line in lines {
        match line.as_str() {
            "BEGIN:VEVENT" => current = Some(Vec::new()),
            "END:VEVENT" => {
                if let Some(properties) = current.take() {
                    if let Some(event) = extract_event(&properties, platform) {
                        events.push(event);
                    }
                }
            }
            _ => {
                if let Some(properties) = current.as_mut() {
                    if let Some(property) = Property::parse(&line) {
                        properties.push(property);
                    }
                }
            }
        }
    }

    debug!(platform = %platform, count = events.len(), "parsed feed events");
    Ok(events)
}

/// One content line split into name and value; parameters are dropped.
struct Property {
    name: String,
    value: String,
}

impl Property {
    fn parse(line: &str) -> Option<Self> {
        let (name_part, value) = line.split_once(':')?;
        let name = name_part.split(';').next().unwrap_or(name_part);
        Some(Self { name: name.to_ascii_uppercase(), value: value.to_string() })
    }
}

fn find_value<'a>(properties: &'a [Property], name: &str) -> Option<&'a str> {
    properties.iter().find(|p| p.name == name).map(|p| p.value.as_str())
}

fn extract_event(properties: &[Property], platform: Platform) -> Option<BookingEvent> {
    let summary = unescape_text(find_value(properties, "SUMMARY").unwrap_or_default());
    let description = unescape_text(find_value(properties, "DESCRIPTION").unwrap_or_default());
    let raw_status = find_value(properties, "STATUS").unwrap_or("CONFIRMED").to_string();

    let uid = find_value(properties, "UID").unwrap_or_default().trim().to_string();
    if uid.is_empty() {
        warn!(summary = %summary, "event missing UID, skipping");
        return None;
    }

    let (Some(dtstart), Some(dtend)) =
        (find_value(properties, "DTSTART"), find_value(properties, "DTEND"))
    else {
        warn!(summary = %summary, "event missing dates, skipping");
        return None;
    };

    let (Some(check_in), Some(check_out)) = (parse_feed_date(dtstart), parse_feed_date(dtend))
    else {
        warn!(summary = %summary, "could not parse event dates, skipping");
        return None;
    };

    let nights = dates::nights_between(check_in, check_out);
    if nights <= 0 {
        warn!(summary = %summary, nights, "invalid booking duration, skipping");
        return None;
    }

    let status = normalize_status(&raw_status, &summary, &description);
    let guest_name = extract_guest_name(&summary, &description, platform);

    let raw_payload = json!({
        "summary": summary,
        "description": description,
        "uid": uid,
        "status": raw_status,
        "dtstart": check_in.to_string(),
        "dtend": check_out.to_string(),
    })
    .to_string();

    Some(BookingEvent {
        external_id: uid,
        platform,
        status,
        check_in,
        check_out,
        nights,
        guest_name,
        raw_payload,
    })
}

/// Map a feed status token onto the canonical set, letting block keywords in
/// the summary or description override whatever the feed claims.
///
/// `TENTATIVE` maps to confirmed, matching the established sync behavior:
/// an optimistic hold blocks the calendar the same way a firm reservation
/// does. Flagged for product review rather than changed here.
fn normalize_status(raw_status: &str, summary: &str, description: &str) -> BookingStatus {
    let summary_lower = summary.to_lowercase();
    let description_lower = description.to_lowercase();
    if BLOCK_KEYWORDS
        .iter()
        .any(|keyword| summary_lower.contains(keyword) || description_lower.contains(keyword))
    {
        return BookingStatus::Blocked;
    }

    match raw_status.trim().to_ascii_uppercase().as_str() {
        "CANCELLED" => BookingStatus::Cancelled,
        // TENTATIVE intentionally lands here
        _ => BookingStatus::Confirmed,
    }
}

/// Parse `20240601` or `20240601T150000Z` down to the calendar date.
fn parse_feed_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()
}

/// Join folded content lines: a line starting with whitespace continues the
/// previous line.
fn unfold_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in content.lines() {
        let line = raw.trim_end_matches('\r');
        if let Some(continuation) = line.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(continuation);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Undo the TEXT value escapes feeds apply to summaries and descriptions.
fn unescape_text(value: &str) -> String {
    value
        .replace("\\n", "\n")
        .replace("\\N", "\n")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}
