//! Canonical data models for the Rustoria console.
//!
//! These are the shapes the UI works with. Whatever the API sends is mapped
//! onto them in [`crate::api::wire`], so components never see wire drift.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Stable identity of a record, used as the row key and the mutation target.
///
/// The API mixes numeric and string ids, so both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self::new(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => RecordId(n.to_string()),
            RawId::Text(s) => RecordId(s),
        })
    }
}

/// The four resources the console manages. Each owns one cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Queue,
    Appointments,
    Doctors,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Queue,
        Resource::Appointments,
        Resource::Users,
        Resource::Doctors,
    ];

    /// Collection path on the API, without a leading slash.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Queue => "queue",
            Resource::Appointments => "appointments",
            Resource::Doctors => "doctors",
            Resource::Users => "users",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Resource::Queue => "Patient Queue",
            Resource::Appointments => "Appointments",
            Resource::Doctors => "Doctors",
            Resource::Users => "Users",
        }
    }
}

/// A closed set of values driving a picker or badge.
pub trait StatusSet: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn position(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Waiting,
    #[serde(rename = "With Doctor")]
    WithDoctor,
    Completed,
}

impl StatusSet for QueueStatus {
    const ALL: &'static [Self] = &[
        QueueStatus::Waiting,
        QueueStatus::WithDoctor,
        QueueStatus::Completed,
    ];

    fn label(self) -> &'static str {
        match self {
            QueueStatus::Waiting => "Waiting",
            QueueStatus::WithDoctor => "With Doctor",
            QueueStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl StatusSet for AppointmentStatus {
    const ALL: &'static [Self] = &[
        AppointmentStatus::Booked,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Patient,
}

impl StatusSet for Role {
    const ALL: &'static [Self] = &[Role::Staff, Role::Patient];

    fn label(self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Patient => "patient",
        }
    }
}

/// Reference to a patient or doctor: an id, an embedded summary, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyRef {
    pub id: Option<RecordId>,
    pub name: Option<String>,
}

impl PartyRef {
    /// Name for display, falling back to the id, then to `unknown`.
    pub fn display(&self, unknown: &str) -> String {
        match (&self.name, &self.id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("#{id}"),
            _ => unknown.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: RecordId,
    pub queue_number: u32,
    pub status: QueueStatus,
    pub created_at: Option<OffsetDateTime>,
    pub patient: PartyRef,
    pub doctor: PartyRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorSummary {
    pub id: Option<RecordId>,
    pub name: String,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: RecordId,
    pub patient_name: Option<String>,
    pub doctor: Option<DoctorSummary>,
    pub date: Option<Date>,
    pub time: Option<Time>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctor {
    pub id: RecordId,
    pub name: String,
    pub specialization: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: Option<OffsetDateTime>,
}

/// Body of `POST /queue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueueEntry {
    pub queue_number: u32,
    pub status: QueueStatus,
    pub user: u64,
    pub doctor: u64,
    pub created_at: String,
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_name: String,
    pub doctor_id: String,
    pub date: String,
    pub time: String,
}

/// Body of `POST /doctors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialization: String,
    pub gender: String,
    pub location: String,
    pub availability: String,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// A record to create, tagged by resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRecord {
    QueueEntry(NewQueueEntry),
    Appointment(NewAppointment),
    Doctor(NewDoctor),
    User(NewUser),
}

impl NewRecord {
    pub fn resource(&self) -> Resource {
        match self {
            NewRecord::QueueEntry(_) => Resource::Queue,
            NewRecord::Appointment(_) => Resource::Appointments,
            NewRecord::Doctor(_) => Resource::Doctors,
            NewRecord::User(_) => Resource::Users,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            NewRecord::QueueEntry(r) => serde_json::to_value(r),
            NewRecord::Appointment(r) => serde_json::to_value(r),
            NewRecord::Doctor(r) => serde_json::to_value(r),
            NewRecord::User(r) => serde_json::to_value(r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuePatch {
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// A partial update, tagged by resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    Queue(QueuePatch),
    Appointment(AppointmentPatch),
    Doctor(DoctorPatch),
    User(UserPatch),
}

impl Patch {
    pub fn resource(&self) -> Resource {
        match self {
            Patch::Queue(_) => Resource::Queue,
            Patch::Appointment(_) => Resource::Appointments,
            Patch::Doctor(_) => Resource::Doctors,
            Patch::User(_) => Resource::Users,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Patch::Queue(p) => serde_json::to_value(p),
            Patch::Appointment(p) => serde_json::to_value(p),
            Patch::Doctor(p) => serde_json::to_value(p),
            Patch::User(p) => serde_json::to_value(p),
        }
    }
}

/// Parses the timestamp shapes the API and the forms produce.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (assumed UTC) and a bare date
/// (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    let spaced = format_description!("[year]-[month]-[day] [hour]:[minute]");
    for format in [with_seconds, without_seconds, spaced] {
        if let Ok(ts) = PrimitiveDateTime::parse(raw, format) {
            return Some(ts.assume_utc());
        }
    }
    parse_date(raw).map(|date| date.midnight().assume_utc())
}

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn parse_time(raw: &str) -> Option<Time> {
    let raw = raw.trim();
    Time::parse(raw, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]:[second]")))
        .ok()
}

/// Shifts to the local offset when the platform can report it.
fn to_local(ts: OffsetDateTime) -> OffsetDateTime {
    match UtcOffset::current_local_offset() {
        Ok(offset) => ts.to_offset(offset),
        Err(_) => ts,
    }
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn format_time(time: Time) -> String {
    time.format(format_description!("[hour]:[minute]"))
        .unwrap_or_default()
}

/// Local calendar date of a timestamp, or `-` when absent.
pub fn display_date(ts: Option<OffsetDateTime>) -> String {
    ts.map(|ts| format_date(to_local(ts).date()))
        .unwrap_or_else(|| "-".to_string())
}

/// Local wall-clock time of a timestamp, or `-` when absent.
pub fn display_time(ts: Option<OffsetDateTime>) -> String {
    ts.map(|ts| format_time(to_local(ts).time()))
        .unwrap_or_else(|| "-".to_string())
}

/// RFC 3339 rendering used for outgoing timestamps.
pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}
