//! Requests the UI asks for, and the results that come back.
//!
//! Components never call the API. They return a [`Command`]; the app hands it
//! to the dispatcher, and the matching [`Outcome`] is fed back on a later
//! frame.

use crate::cache::Listing;
use crate::error::ClientError;
use crate::models::{NewRecord, Patch, RecordId, Resource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Fetch { resource: Resource, seq: u64 },
    Create(NewRecord),
    Update { id: RecordId, patch: Patch },
    Delete { resource: Resource, id: RecordId },
}

impl Command {
    /// The mutation this command performs, if it writes.
    pub fn mutation(&self) -> Option<Mutation> {
        match self {
            Command::Login { .. } | Command::Fetch { .. } => None,
            Command::Create(record) => Some(Mutation {
                resource: record.resource(),
                kind: MutationKind::Create,
            }),
            Command::Update { id, patch } => Some(Mutation {
                resource: patch.resource(),
                kind: MutationKind::Update(id.clone()),
            }),
            Command::Delete { resource, id } => Some(Mutation {
                resource: *resource,
                kind: MutationKind::Delete(id.clone()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update(RecordId),
    Delete(RecordId),
}

/// Identifies a finished write so the owning page can settle its local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub resource: Resource,
    pub kind: MutationKind,
}

#[derive(Debug)]
pub enum Outcome {
    LoggedIn {
        username: String,
        result: Result<String, ClientError>,
    },
    Fetched {
        resource: Resource,
        seq: u64,
        result: Result<Listing, ClientError>,
    },
    Mutated {
        mutation: Mutation,
        result: Result<(), ClientError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueuePatch, QueueStatus};

    #[test]
    fn update_maps_to_mutation_on_patch_resource() {
        let command = Command::Update {
            id: RecordId::new("1"),
            patch: Patch::Queue(QueuePatch {
                status: QueueStatus::Completed,
            }),
        };
        assert_eq!(
            command.mutation(),
            Some(Mutation {
                resource: Resource::Queue,
                kind: MutationKind::Update(RecordId::new("1")),
            })
        );
    }

    #[test]
    fn reads_are_not_mutations() {
        let fetch = Command::Fetch {
            resource: Resource::Users,
            seq: 1,
        };
        assert_eq!(fetch.mutation(), None);
    }
}
