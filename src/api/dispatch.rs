//! Runs [`Command`]s on the async runtime and reports [`Outcome`]s back to the
//! UI loop over a channel, so the terminal never blocks on the network.

use super::ApiClient;
use crate::commands::{Command, Mutation, MutationKind, Outcome};
use crate::error::ClientError;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub struct Dispatcher {
    runtime: Handle,
    client: ApiClient,
    outcomes: UnboundedSender<Outcome>,
}

impl Dispatcher {
    /// Creates a dispatcher and the receiver the UI loop drains.
    pub fn new(runtime: Handle, client: ApiClient) -> (Self, UnboundedReceiver<Outcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        (
            Self {
                runtime,
                client,
                outcomes,
            },
            rx,
        )
    }

    pub fn dispatch(&self, command: Command) {
        let client = self.client.clone();
        let outcomes = self.outcomes.clone();
        self.runtime.spawn(async move {
            let outcome = execute(&client, command).await;
            if outcomes.send(outcome).is_err() {
                tracing::debug!("outcome dropped, UI loop has exited");
            }
        });
    }
}

/// Performs one command against the API.
pub async fn execute(client: &ApiClient, command: Command) -> Outcome {
    match command {
        Command::Login { username, password } => {
            let result = client.login(&username, &password).await;
            Outcome::LoggedIn { username, result }
        }
        Command::Fetch { resource, seq } => Outcome::Fetched {
            resource,
            seq,
            result: client.list(resource).await,
        },
        Command::Create(record) => {
            let mutation = Mutation {
                resource: record.resource(),
                kind: MutationKind::Create,
            };
            settle(mutation, client.create(&record).await.map(|_| ()))
        }
        Command::Update { id, patch } => {
            let result = client.update(&id, &patch).await.map(|_| ());
            let mutation = Mutation {
                resource: patch.resource(),
                kind: MutationKind::Update(id),
            };
            settle(mutation, result)
        }
        Command::Delete { resource, id } => {
            let result = client.remove(resource, &id).await;
            let mutation = Mutation {
                resource,
                kind: MutationKind::Delete(id),
            };
            settle(mutation, result)
        }
    }
}

fn settle(mutation: Mutation, result: Result<(), ClientError>) -> Outcome {
    match &result {
        Ok(()) => tracing::info!(?mutation, "mutation succeeded"),
        Err(err) => tracing::warn!(?mutation, error = %err, "mutation failed"),
    }
    Outcome::Mutated { mutation, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MockApi;
    use crate::config::Config;
    use crate::models::{RecordId, Resource};
    use crate::session::SessionToken;

    async fn client(api: &MockApi) -> ApiClient {
        let config = Config {
            api_url: api.serve().await,
            ..Config::default()
        };
        ApiClient::new(&config, SessionToken::default()).unwrap()
    }

    #[tokio::test]
    async fn delete_reports_mutation_outcome() {
        let api = MockApi::default();
        api.respond("DELETE /doctors/5", 200, r#"{"ok":true}"#);
        let client = client(&api).await;

        let outcome = execute(
            &client,
            Command::Delete {
                resource: Resource::Doctors,
                id: RecordId::new("5"),
            },
        )
        .await;

        match outcome {
            Outcome::Mutated { mutation, result } => {
                assert_eq!(
                    mutation,
                    Mutation {
                        resource: Resource::Doctors,
                        kind: MutationKind::Delete(RecordId::new("5")),
                    }
                );
                assert!(result.is_ok());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_carries_sequence_number() {
        let api = MockApi::default();
        let client = client(&api).await;

        let outcome = execute(
            &client,
            Command::Fetch {
                resource: Resource::Users,
                seq: 42,
            },
        )
        .await;

        match outcome {
            Outcome::Fetched { resource, seq, result } => {
                assert_eq!(resource, Resource::Users);
                assert_eq!(seq, 42);
                assert!(result.is_ok());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatcher_delivers_over_channel() {
        let api = MockApi::default();
        api.respond("POST /login", 200, r#"{"token":"tok"}"#);
        let client = client(&api).await;

        let (dispatcher, mut rx) = Dispatcher::new(Handle::current(), client);
        dispatcher.dispatch(Command::Login {
            username: "admin".to_string(),
            password: "pw".to_string(),
        });

        match rx.recv().await {
            Some(Outcome::LoggedIn { username, result }) => {
                assert_eq!(username, "admin");
                assert_eq!(result.unwrap(), "tok");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
