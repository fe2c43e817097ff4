//! Wire shapes accepted from the API and their mapping to canonical models.
//!
//! The backend has changed its record shapes over time: queue entries carry
//! either ids or embedded users and doctors, and appointments name the
//! patient as `patientName`, `user.name` or `patient.name`. Every variant is
//! accepted here and folded into one model.

use crate::cache::Listing;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    parse_date, parse_time, parse_timestamp, Appointment, AppointmentStatus, Doctor, DoctorSummary,
    PartyRef, QueueEntry, QueueStatus, RecordId, Resource, Role, User,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

/// A related party, either referenced by id or embedded.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireParty {
    Ref(RecordId),
    Embedded(WireSummary),
}

#[derive(Debug, Deserialize)]
struct WireSummary {
    id: Option<RecordId>,
    name: Option<String>,
    specialization: Option<String>,
}

impl WireParty {
    fn into_ref(self) -> PartyRef {
        match self {
            WireParty::Ref(id) => PartyRef {
                id: Some(id),
                name: None,
            },
            WireParty::Embedded(summary) => PartyRef {
                id: summary.id,
                name: summary.name,
            },
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            WireParty::Ref(_) => None,
            WireParty::Embedded(summary) => summary.name.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQueueEntry {
    id: RecordId,
    queue_number: u32,
    status: QueueStatus,
    created_at: Option<String>,
    user: Option<WireParty>,
    patient: Option<WireParty>,
    user_id: Option<RecordId>,
    doctor: Option<WireParty>,
    doctor_id: Option<RecordId>,
}

impl From<WireQueueEntry> for QueueEntry {
    fn from(wire: WireQueueEntry) -> Self {
        let patient = wire
            .user
            .or(wire.patient)
            .map(WireParty::into_ref)
            .unwrap_or(PartyRef {
                id: wire.user_id,
                name: None,
            });
        let doctor = wire.doctor.map(WireParty::into_ref).unwrap_or(PartyRef {
            id: wire.doctor_id,
            name: None,
        });
        QueueEntry {
            id: wire.id,
            queue_number: wire.queue_number,
            status: wire.status,
            created_at: timestamp(wire.created_at),
            patient,
            doctor,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAppointment {
    id: RecordId,
    status: AppointmentStatus,
    patient_name: Option<String>,
    user: Option<WireParty>,
    patient: Option<WireParty>,
    doctor: Option<WireParty>,
    doctor_id: Option<RecordId>,
    appointment_date: Option<String>,
    date: Option<String>,
    time: Option<String>,
}

impl From<WireAppointment> for Appointment {
    fn from(wire: WireAppointment) -> Self {
        let patient_name = wire
            .patient_name
            .filter(|name| !name.is_empty())
            .or_else(|| wire.user.as_ref().and_then(WireParty::name).map(str::to_string))
            .or_else(|| wire.patient.as_ref().and_then(WireParty::name).map(str::to_string));

        let doctor = match wire.doctor {
            Some(WireParty::Embedded(summary)) => Some(DoctorSummary {
                id: summary.id,
                name: summary.name.unwrap_or_default(),
                specialization: summary.specialization,
            }),
            Some(WireParty::Ref(id)) => Some(DoctorSummary {
                id: Some(id),
                name: String::new(),
                specialization: None,
            }),
            None => wire.doctor_id.map(|id| DoctorSummary {
                id: Some(id),
                name: String::new(),
                specialization: None,
            }),
        };

        // A combined timestamp wins; separate date/time fields fill the gaps.
        let scheduled = wire.appointment_date.as_deref().and_then(parse_timestamp);
        let date = scheduled
            .map(|ts| ts.date())
            .or_else(|| wire.date.as_deref().and_then(parse_date));
        let time = wire.time.as_deref().and_then(parse_time).or_else(|| {
            scheduled
                .map(|ts| ts.time())
                .filter(|t| *t != time::Time::MIDNIGHT)
        });

        Appointment {
            id: wire.id,
            patient_name,
            doctor,
            date,
            time,
            status: wire.status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDoctor {
    id: RecordId,
    name: String,
    #[serde(default)]
    specialization: String,
    email: Option<String>,
    phone: Option<String>,
    gender: Option<String>,
    location: Option<String>,
    availability: Option<String>,
    created_at: Option<String>,
}

impl From<WireDoctor> for Doctor {
    fn from(wire: WireDoctor) -> Self {
        Doctor {
            id: wire.id,
            name: wire.name,
            specialization: wire.specialization,
            email: wire.email,
            phone: wire.phone,
            gender: wire.gender,
            location: wire.location,
            availability: wire.availability,
            created_at: timestamp(wire.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: RecordId,
    name: String,
    #[serde(default)]
    email: String,
    role: Role,
    created_at: Option<String>,
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        User {
            id: wire.id,
            name: wire.name,
            email: wire.email,
            role: wire.role,
            created_at: timestamp(wire.created_at),
        }
    }
}

fn timestamp(raw: Option<String>) -> Option<OffsetDateTime> {
    raw.as_deref().and_then(parse_timestamp)
}

/// Decodes a JSON array of `W` and maps each element to `T`.
fn rows<W, T>(body: Value) -> ClientResult<Vec<T>>
where
    W: DeserializeOwned,
    T: From<W>,
{
    let Value::Array(items) = body else {
        return Err(ClientError::Malformed("expected a JSON array".to_string()));
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value::<W>(item).map(T::from).map_err(ClientError::from))
        .collect()
}

/// Maps a list response body for `resource` onto canonical records.
pub fn decode_listing(resource: Resource, body: Value) -> ClientResult<Listing> {
    Ok(match resource {
        Resource::Queue => Listing::Queue(rows::<WireQueueEntry, _>(body)?),
        Resource::Appointments => Listing::Appointments(rows::<WireAppointment, _>(body)?),
        Resource::Doctors => Listing::Doctors(rows::<WireDoctor, _>(body)?),
        Resource::Users => Listing::Users(rows::<WireUser, _>(body)?),
    })
}

#[derive(Debug, Deserialize)]
struct WireLogin {
    #[serde(alias = "accessToken", alias = "access_token")]
    token: String,
}

/// Pulls the bearer token out of a `POST /login` response.
pub fn decode_token(body: Value) -> ClientResult<String> {
    let login: WireLogin = serde_json::from_value(body)?;
    if login.token.is_empty() {
        return Err(ClientError::Malformed("empty token".to_string()));
    }
    Ok(login.token)
}

/// The `message` field of an error body, if there is one.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, time};

    #[test]
    fn queue_entry_with_embedded_parties() {
        let body = json!([{
            "id": 1,
            "queueNumber": 3,
            "status": "With Doctor",
            "createdAt": "2024-03-01T08:15:00.000Z",
            "user": { "id": 10, "name": "Ann", "email": "ann@example.com", "role": "patient" },
            "doctor": { "id": "d2", "name": "Dr. Grey", "specialization": "Surgery" }
        }]);
        let Listing::Queue(rows) = decode_listing(Resource::Queue, body).unwrap() else {
            panic!("wrong listing");
        };
        assert_eq!(rows[0].id, RecordId::new("1"));
        assert_eq!(rows[0].queue_number, 3);
        assert_eq!(rows[0].status, QueueStatus::WithDoctor);
        assert_eq!(rows[0].patient.name.as_deref(), Some("Ann"));
        assert_eq!(rows[0].doctor.id, Some(RecordId::new("d2")));
        assert!(rows[0].created_at.is_some());
    }

    #[test]
    fn queue_entry_with_bare_ids() {
        let body = json!([{ "id": 2, "queueNumber": 1, "status": "Waiting", "user": 4, "doctorId": 9 }]);
        let Listing::Queue(rows) = decode_listing(Resource::Queue, body).unwrap() else {
            panic!("wrong listing");
        };
        assert_eq!(rows[0].patient.id, Some(RecordId::new("4")));
        assert_eq!(rows[0].patient.name, None);
        assert_eq!(rows[0].doctor.id, Some(RecordId::new("9")));
    }

    #[test]
    fn appointment_patient_name_prefers_flat_field() {
        let body = json!([
            { "id": "a1", "status": "booked", "patientName": "Jane", "user": { "name": "Other" },
              "appointmentDate": "2024-05-01T09:30:00Z",
              "doctor": { "id": 1, "name": "Dr. Who", "specialization": "GP" } },
            { "id": "a2", "status": "cancelled", "user": { "name": "Bob" },
              "date": "2024-05-02", "time": "14:00" }
        ]);
        let Listing::Appointments(rows) = decode_listing(Resource::Appointments, body).unwrap() else {
            panic!("wrong listing");
        };
        assert_eq!(rows[0].patient_name.as_deref(), Some("Jane"));
        assert_eq!(rows[0].date, Some(date!(2024 - 05 - 01)));
        assert_eq!(rows[0].time, Some(time!(9:30)));
        assert_eq!(rows[0].doctor.as_ref().unwrap().specialization.as_deref(), Some("GP"));

        assert_eq!(rows[1].patient_name.as_deref(), Some("Bob"));
        assert_eq!(rows[1].date, Some(date!(2024 - 05 - 02)));
        assert_eq!(rows[1].time, Some(time!(14:00)));
        assert!(rows[1].doctor.is_none());
    }

    #[test]
    fn doctor_accepts_both_historical_shapes() {
        let body = json!([
            { "id": 1, "name": "Dr. A", "specialization": "ENT", "email": "a@h.org", "phone": "555",
              "createdAt": "2024-01-01T00:00:00Z" },
            { "id": 2, "name": "Dr. B", "specialization": "GP", "gender": "F", "location": "Wing 2",
              "availability": "9 AM - 5 PM" }
        ]);
        let Listing::Doctors(rows) = decode_listing(Resource::Doctors, body).unwrap() else {
            panic!("wrong listing");
        };
        assert_eq!(rows[0].email.as_deref(), Some("a@h.org"));
        assert_eq!(rows[1].location.as_deref(), Some("Wing 2"));
        assert_eq!(rows[1].email, None);
    }

    #[test]
    fn non_array_body_is_malformed() {
        let err = decode_listing(Resource::Users, json!({ "users": [] })).unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn unknown_status_is_malformed() {
        let body = json!([{ "id": 1, "queueNumber": 1, "status": "Lost" }]);
        assert!(matches!(
            decode_listing(Resource::Queue, body),
            Err(ClientError::Malformed(_))
        ));
    }

    #[test]
    fn token_aliases() {
        assert_eq!(decode_token(json!({ "token": "abc" })).unwrap(), "abc");
        assert_eq!(decode_token(json!({ "accessToken": "xyz" })).unwrap(), "xyz");
        assert!(decode_token(json!({ "user": 1 })).is_err());
    }

    #[test]
    fn error_message_reads_message_field() {
        assert_eq!(
            error_message(r#"{"message":"db unavailable"}"#).as_deref(),
            Some("db unavailable")
        );
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"message":""}"#), None);
    }
}
