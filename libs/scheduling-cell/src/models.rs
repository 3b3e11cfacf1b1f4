// libs/scheduling-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::services::codec;

// ==============================================================================
// CANONICAL DATE / TIME MODELS
// ==============================================================================

/// A calendar day in canonical `YYYY-MM-DD` form.
///
/// Only range checks are applied (day 1-31, month 1-12, year 1000-9999); a
/// value such as 31/02 is representable. Use [`CalendarDate::is_calendar_valid`]
/// to ask whether the day actually exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate {
    year: i32,
    month: u32,
    day: u32,
}

impl CalendarDate {
    pub const MIN_YEAR: i32 = 1000;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        let in_range = (Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year)
            && (1..=12).contains(&month)
            && (1..=31).contains(&day);

        in_range.then_some(Self { year, month, day })
    }

    pub fn from_naive(date: NaiveDate) -> Option<Self> {
        use chrono::Datelike;
        Self::new(date.year(), date.month(), date.day())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// `None` when the day does not exist in that month (e.g. 31/02, 29/02 off a leap year).
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn is_calendar_valid(&self) -> bool {
        self.to_naive().is_some()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        codec::parse_canonical_date(&value).ok_or_else(|| format!("invalid calendar date: {}", value))
    }
}

impl From<CalendarDate> for String {
    fn from(value: CalendarDate) -> Self {
        value.to_string()
    }
}

/// A wall-clock time of day, canonical form `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u32,
    minute: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour <= 23 && minute <= 59).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive(&self) -> NaiveTime {
        // Both components are range checked on construction.
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        codec::parse_canonical_time(&value).ok_or_else(|| format!("invalid clock time: {}", value))
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// `YYYY-MM-DDTHH:mm:ss` with no offset. Always wall-clock time in the
/// provider's calendar; nothing in this crate converts it to or from UTC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalTimestamp {
    text: String,
    date: CalendarDate,
    time: ClockTime,
    second: u32,
}

impl LocalTimestamp {
    /// Only the codec builds timestamps; `text` must already be the
    /// concatenation of the three parts.
    pub(crate) fn from_parts(text: String, date: CalendarDate, time: ClockTime, second: u32) -> Self {
        Self { text, date, time, second }
    }

    pub fn parse(text: &str) -> Option<Self> {
        codec::parse_local_timestamp(text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn date(&self) -> CalendarDate {
        self.date
    }

    pub fn time(&self) -> ClockTime {
        self.time
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    /// Split back into the date and time the user edits.
    pub fn split(&self) -> (CalendarDate, ClockTime) {
        (self.date, self.time)
    }

    /// Naive (offset-free) view; `None` for a calendar-invalid date.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        self.date
            .to_naive()
            .and_then(|date| date.and_hms_opt(self.time.hour(), self.time.minute(), self.second))
    }
}

impl PartialOrd for LocalTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalTimestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.date, self.time, self.second).cmp(&(other.date, other.time, other.second))
    }
}

impl fmt::Display for LocalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for LocalTimestamp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid local timestamp: {}", value))
    }
}

impl From<LocalTimestamp> for String {
    fn from(value: LocalTimestamp) -> Self {
        value.text
    }
}

// ==============================================================================
// DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalField {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub medical_field: Option<MedicalField>,
}

impl Doctor {
    pub fn field_id(&self) -> Option<i64> {
        self.medical_field.as_ref().map(|field| field.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub medical_fields: Vec<MedicalField>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty() && self.medical_fields.is_empty()
    }
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that still hold a slot and may be moved or cancelled.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Rescheduled => write!(f, "RESCHEDULED"),
        }
    }
}

/// An existing appointment as the store reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRef {
    pub id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub medical_field_id: Option<i64>,
    #[serde(default)]
    pub medical_field_name: Option<String>,
    pub appointment_date: LocalTimestamp,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentFilter {
    #[default]
    All,
    Upcoming,
    Past,
}

impl fmt::Display for AppointmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentFilter::All => write!(f, "all"),
            AppointmentFilter::Upcoming => write!(f, "upcoming"),
            AppointmentFilter::Past => write!(f, "past"),
        }
    }
}

/// Payload handed to `create_appointment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub doctor_id: i64,
    pub appointment_date: LocalTimestamp,
    pub notes: String,
}

// ==============================================================================
// WIZARD MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Field = 1,
    Doctor = 2,
    Schedule = 3,
    Confirm = 4,
}

impl WizardStage {
    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn next(&self) -> Option<WizardStage> {
        match self {
            WizardStage::Field => Some(WizardStage::Doctor),
            WizardStage::Doctor => Some(WizardStage::Schedule),
            WizardStage::Schedule => Some(WizardStage::Confirm),
            WizardStage::Confirm => None,
        }
    }

    pub fn previous(&self) -> Option<WizardStage> {
        match self {
            WizardStage::Field => None,
            WizardStage::Doctor => Some(WizardStage::Field),
            WizardStage::Schedule => Some(WizardStage::Doctor),
            WizardStage::Confirm => Some(WizardStage::Schedule),
        }
    }
}

impl fmt::Display for WizardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardStage::Field => write!(f, "field"),
            WizardStage::Doctor => write!(f, "doctor"),
            WizardStage::Schedule => write!(f, "schedule"),
            WizardStage::Confirm => write!(f, "confirm"),
        }
    }
}

/// Selections of one in-flight booking session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardState {
    pub stage: WizardStage,
    pub selected_field_id: Option<i64>,
    pub selected_doctor_id: Option<i64>,
    pub selected_date: Option<CalendarDate>,
    pub selected_slot: Option<ClockTime>,
    pub notes: String,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            stage: WizardStage::Field,
            selected_field_id: None,
            selected_doctor_id: None,
            selected_date: None,
            selected_slot: None,
            notes: String::new(),
        }
    }
}

/// A downstream selection or option list dropped because an upstream choice changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidatedSelection {
    Doctor,
    DoctorOptions,
    Date,
    Slot,
    SlotOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_date_range_checks() {
        assert!(CalendarDate::new(2025, 2, 31).is_some());
        assert!(CalendarDate::new(2025, 13, 1).is_none());
        assert!(CalendarDate::new(2025, 1, 0).is_none());
        assert!(CalendarDate::new(999, 1, 1).is_none());
        assert!(CalendarDate::new(10000, 1, 1).is_none());
    }

    #[test]
    fn test_calendar_validity_is_reported_not_enforced() {
        let feb_31 = CalendarDate::new(2026, 2, 31).unwrap();
        assert!(!feb_31.is_calendar_valid());
        assert_eq!(feb_31.to_string(), "2026-02-31");

        let leap = CalendarDate::new(2024, 2, 29).unwrap();
        assert!(leap.is_calendar_valid());
    }

    #[test]
    fn test_calendar_date_orders_by_year_month_day() {
        let a = CalendarDate::new(2025, 12, 31).unwrap();
        let b = CalendarDate::new(2026, 1, 1).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_clock_time_bounds() {
        assert!(ClockTime::new(23, 59).is_some());
        assert!(ClockTime::new(24, 0).is_none());
        assert!(ClockTime::new(0, 60).is_none());
        assert_eq!(ClockTime::new(9, 5).unwrap().to_string(), "09:05");
    }

    #[test]
    fn test_appointment_ref_deserializes_wire_shape() {
        let appointment: AppointmentRef = serde_json::from_value(serde_json::json!({
            "id": 12,
            "doctorId": 7,
            "doctorName": "Dr. Smith",
            "medicalFieldId": 1,
            "medicalFieldName": "Cardiology",
            "appointmentDate": "2026-12-25T14:30:00",
            "status": "RESCHEDULED",
            "notes": null,
            "createdAt": "2026-10-01T08:00:00.123456"
        }))
        .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Rescheduled);
        assert_eq!(appointment.appointment_date.as_str(), "2026-12-25T14:30:00");
        assert!(appointment.status.is_active());
    }

    #[test]
    fn test_booking_request_wire_shape() {
        let date = CalendarDate::new(2026, 12, 25).unwrap();
        let time = ClockTime::new(14, 30).unwrap();
        let request = BookingRequest {
            doctor_id: 7,
            appointment_date: codec::combine_local_timestamp(Some(&date), Some(&time)).unwrap(),
            notes: String::new(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"doctorId": 7, "appointmentDate": "2026-12-25T14:30:00", "notes": ""})
        );
    }

    #[test]
    fn test_stage_navigation() {
        assert_eq!(WizardStage::Field.next(), Some(WizardStage::Doctor));
        assert_eq!(WizardStage::Confirm.next(), None);
        assert_eq!(WizardStage::Field.previous(), None);
        assert_eq!(WizardStage::Confirm.number(), 4);
    }
}
