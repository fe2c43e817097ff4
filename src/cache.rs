//! Process-wide query cache, one entry per resource.
//!
//! A [`Query`] tracks the last good list, whether it is stale, and which
//! fetch (by sequence number) is in flight. Mutations never touch the data;
//! they only [`QueryCache::invalidate`] so the next loop refetches.

use crate::error::ClientError;
use crate::models::{Appointment, Doctor, QueueEntry, Resource, User};
use std::time::{Duration, Instant};

/// Staleness and retry settings for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    pub stale_after: Duration,
    pub retries: u8,
}

impl QueryPolicy {
    pub fn for_resource(resource: Resource) -> Self {
        match resource {
            Resource::Users => QueryPolicy {
                stale_after: Duration::from_secs(60),
                retries: 2,
            },
            Resource::Queue | Resource::Appointments | Resource::Doctors => QueryPolicy {
                stale_after: Duration::ZERO,
                retries: 0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// What happened to a fetch completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// Failed, but the policy allows another attempt.
    Retry,
    /// Superseded by a newer fetch; ignored.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Query<T> {
    data: Option<Vec<T>>,
    status: FetchStatus,
    fetched_at: Option<Instant>,
    stale: bool,
    refetch_after_flight: bool,
    seq: u64,
    in_flight: Option<u64>,
    failures: u8,
    policy: QueryPolicy,
}

impl<T> Query<T> {
    pub fn new(policy: QueryPolicy) -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            fetched_at: None,
            stale: false,
            refetch_after_flight: false,
            seq: 0,
            in_flight: None,
            failures: 0,
            policy,
        }
    }

    /// The cached list, or `None` while nothing usable has arrived.
    pub fn data(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// True only for the first load, when there is nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && matches!(self.status, FetchStatus::Idle | FetchStatus::Loading)
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Called when a page showing this query becomes active.
    pub fn mount(&mut self, now: Instant) {
        let expired = match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) >= self.policy.stale_after,
            None => true,
        };
        if expired {
            self.stale = true;
        }
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
        if self.in_flight.is_some() {
            self.refetch_after_flight = true;
        }
    }

    pub fn needs_fetch(&self) -> bool {
        self.in_flight.is_none() && (self.stale || self.status == FetchStatus::Idle)
    }

    /// Marks a fetch as started and returns its sequence number.
    pub fn begin_fetch(&mut self) -> u64 {
        self.seq += 1;
        self.in_flight = Some(self.seq);
        self.stale = false;
        if self.data.is_none() {
            self.status = FetchStatus::Loading;
        }
        self.seq
    }

    pub fn complete(&mut self, seq: u64, result: Result<Vec<T>, ClientError>, now: Instant) -> Resolution {
        if self.in_flight != Some(seq) {
            return Resolution::Discarded;
        }
        self.in_flight = None;
        let refetch = std::mem::take(&mut self.refetch_after_flight);

        match result {
            Ok(rows) => {
                self.data = Some(rows);
                self.status = FetchStatus::Ready;
                self.fetched_at = Some(now);
                self.failures = 0;
                self.stale = refetch;
                Resolution::Applied
            }
            Err(err) => {
                self.failures += 1;
                if self.failures <= self.policy.retries {
                    self.stale = true;
                    return Resolution::Retry;
                }
                self.failures = 0;
                self.status = FetchStatus::Failed(err.to_string());
                self.stale = refetch;
                Resolution::Applied
            }
        }
    }

    fn clear(&mut self) {
        *self = Self::new(self.policy);
    }
}

/// A fetched list, tagged by resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Queue(Vec<QueueEntry>),
    Appointments(Vec<Appointment>),
    Doctors(Vec<Doctor>),
    Users(Vec<User>),
}

impl Listing {
    pub fn resource(&self) -> Resource {
        match self {
            Listing::Queue(_) => Resource::Queue,
            Listing::Appointments(_) => Resource::Appointments,
            Listing::Doctors(_) => Resource::Doctors,
            Listing::Users(_) => Resource::Users,
        }
    }
}

/// Shared read state for all four resources.
#[derive(Debug, Clone)]
pub struct QueryCache {
    pub queue: Query<QueueEntry>,
    pub appointments: Query<Appointment>,
    pub doctors: Query<Doctor>,
    pub users: Query<User>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            queue: Query::new(QueryPolicy::for_resource(Resource::Queue)),
            appointments: Query::new(QueryPolicy::for_resource(Resource::Appointments)),
            doctors: Query::new(QueryPolicy::for_resource(Resource::Doctors)),
            users: Query::new(QueryPolicy::for_resource(Resource::Users)),
        }
    }

    pub fn invalidate(&mut self, resource: Resource) {
        tracing::debug!(resource = resource.path(), "invalidating query");
        match resource {
            Resource::Queue => self.queue.invalidate(),
            Resource::Appointments => self.appointments.invalidate(),
            Resource::Doctors => self.doctors.invalidate(),
            Resource::Users => self.users.invalidate(),
        }
    }

    pub fn mount(&mut self, resource: Resource, now: Instant) {
        match resource {
            Resource::Queue => self.queue.mount(now),
            Resource::Appointments => self.appointments.mount(now),
            Resource::Doctors => self.doctors.mount(now),
            Resource::Users => self.users.mount(now),
        }
    }

    pub fn needs_fetch(&self, resource: Resource) -> bool {
        match resource {
            Resource::Queue => self.queue.needs_fetch(),
            Resource::Appointments => self.appointments.needs_fetch(),
            Resource::Doctors => self.doctors.needs_fetch(),
            Resource::Users => self.users.needs_fetch(),
        }
    }

    pub fn begin_fetch(&mut self, resource: Resource) -> u64 {
        match resource {
            Resource::Queue => self.queue.begin_fetch(),
            Resource::Appointments => self.appointments.begin_fetch(),
            Resource::Doctors => self.doctors.begin_fetch(),
            Resource::Users => self.users.begin_fetch(),
        }
    }

    /// Applies a fetch completion to the matching query.
    pub fn complete(
        &mut self,
        resource: Resource,
        seq: u64,
        result: Result<Listing, ClientError>,
        now: Instant,
    ) -> Resolution {
        let resolution = match (resource, result) {
            (Resource::Queue, Ok(Listing::Queue(rows))) => self.queue.complete(seq, Ok(rows), now),
            (Resource::Appointments, Ok(Listing::Appointments(rows))) => {
                self.appointments.complete(seq, Ok(rows), now)
            }
            (Resource::Doctors, Ok(Listing::Doctors(rows))) => self.doctors.complete(seq, Ok(rows), now),
            (Resource::Users, Ok(Listing::Users(rows))) => self.users.complete(seq, Ok(rows), now),
            (resource, Ok(other)) => {
                let err = ClientError::Malformed(format!(
                    "expected {} but received {}",
                    resource.path(),
                    other.resource().path()
                ));
                self.fail(resource, seq, err, now)
            }
            (resource, Err(err)) => self.fail(resource, seq, err, now),
        };
        match resolution {
            Resolution::Retry => {
                tracing::warn!(resource = resource.path(), "fetch failed, retrying");
            }
            Resolution::Discarded => {
                tracing::debug!(resource = resource.path(), seq, "discarding stale response");
            }
            Resolution::Applied => {}
        }
        resolution
    }

    fn fail(&mut self, resource: Resource, seq: u64, err: ClientError, now: Instant) -> Resolution {
        match resource {
            Resource::Queue => self.queue.complete(seq, Err(err), now),
            Resource::Appointments => self.appointments.complete(seq, Err(err), now),
            Resource::Doctors => self.doctors.complete(seq, Err(err), now),
            Resource::Users => self.users.complete(seq, Err(err), now),
        }
    }

    pub fn status(&self, resource: Resource) -> &FetchStatus {
        match resource {
            Resource::Queue => self.queue.status(),
            Resource::Appointments => self.appointments.status(),
            Resource::Doctors => self.doctors.status(),
            Resource::Users => self.users.status(),
        }
    }

    pub fn len(&self, resource: Resource) -> Option<usize> {
        match resource {
            Resource::Queue => self.queue.data().map(<[_]>::len),
            Resource::Appointments => self.appointments.data().map(<[_]>::len),
            Resource::Doctors => self.doctors.data().map(<[_]>::len),
            Resource::Users => self.users.data().map(<[_]>::len),
        }
    }

    /// Drops every cached list. Used when the session ends.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.appointments.clear();
        self.doctors.clear();
        self.users.clear();
    }
}
