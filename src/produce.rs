use crate::backend::{BackendCommand, BackendResponse};
use crate::config::ProduceConfig;
use crate::resource::types::{Payload, ResponseList};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub name: String,
    pub age: u32,
    pub gender: String,
}

pub fn friends() -> Vec<Friend> {
    vec![Friend {
        name: "Vikram".to_string(),
        age: 25,
        gender: "boy".to_string(),
    }]
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProduceOutcome {
    Sent(ResponseList),
    Rejected(ResponseList),
    Failed(String),
}

/// Backs the /produce screen: a fixed friends list, each of which can be
/// published to the configured topic.
pub struct ProducerModel {
    cmd_tx: mpsc::Sender<BackendCommand>,
    config: ProduceConfig,
    friends: Vec<Friend>,
    last: Option<ProduceOutcome>,
    in_flight: usize,
}

impl ProducerModel {
    pub fn new(cmd_tx: mpsc::Sender<BackendCommand>, config: ProduceConfig) -> Self {
        let friends = friends();
        for friend in &friends {
            log::info!("{}", friend.name);
        }
        ProducerModel {
            cmd_tx,
            config,
            friends,
            last: None,
            in_flight: 0,
        }
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn last(&self) -> Option<&ProduceOutcome> {
        self.last.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.in_flight
    }

    pub fn payload_for(&self, friend: &Friend) -> Payload {
        Payload::new(&self.config.client)
            .with_uuid(Uuid::new_v4())
            .with_correlation_id(&friend.name)
            .with_schema_id("friend")
            .with_data(serde_json::to_value(friend).unwrap_or_default())
    }

    /// Publish the friend at `index`. Returns false for an unknown index or
    /// a dead backend.
    pub fn produce(&mut self, index: usize) -> bool {
        let Some(friend) = self.friends.get(index) else {
            return false;
        };
        let payload = self.payload_for(friend);
        let cmd = BackendCommand::Produce {
            topic: self.config.topic.clone(),
            payloads: vec![payload],
        };
        if self.cmd_tx.send(cmd).is_err() {
            self.last = Some(ProduceOutcome::Failed("backend unavailable".to_string()));
            return false;
        }
        self.in_flight += 1;
        true
    }

    pub fn on_response(&mut self, response: &BackendResponse) -> bool {
        let BackendResponse::Produced { topic, result } = response else {
            return false;
        };
        self.in_flight = self.in_flight.saturating_sub(1);
        self.last = Some(match result {
            Ok(list) if list.is_success() => {
                log::info!("Produced to {}: {} response(s)", topic, list.responses.len());
                ProduceOutcome::Sent(list.clone())
            }
            Ok(list) => {
                log::warn!("Produce to {} rejected: {:?}", topic, list.errors());
                ProduceOutcome::Rejected(list.clone())
            }
            Err(e) => ProduceOutcome::Failed(e.clone()),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::types::ProduceResponse;

    fn model() -> (ProducerModel, mpsc::Receiver<BackendCommand>) {
        let (tx, rx) = mpsc::channel();
        let config = ProduceConfig {
            topic: "friends".to_string(),
            client: "mailpage".to_string(),
        };
        (ProducerModel::new(tx, config), rx)
    }

    #[test]
    fn test_friends_list() {
        let (model, _rx) = model();
        assert_eq!(model.friends().len(), 1);
        assert_eq!(model.friends()[0].name, "Vikram");
        assert_eq!(model.friends()[0].age, 25);
    }

    #[test]
    fn test_produce_sends_one_payload() {
        let (mut model, rx) = model();
        assert!(model.produce(0));
        match rx.try_recv().unwrap() {
            BackendCommand::Produce { topic, payloads } => {
                assert_eq!(topic, "friends");
                assert_eq!(payloads.len(), 1);
                let payload = &payloads[0];
                assert_eq!(payload.client.as_deref(), Some("mailpage"));
                assert_eq!(payload.correlation_id.as_deref(), Some("Vikram"));
                assert!(Uuid::parse_str(payload.uuid.as_deref().unwrap()).is_ok());
                assert_eq!(payload.data["gender"], "boy");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(model.pending(), 1);
        assert!(!model.produce(3));
    }

    #[test]
    fn test_outcomes() {
        let (mut model, _rx) = model();
        model.produce(0);
        model.on_response(&BackendResponse::Produced {
            topic: "friends".to_string(),
            result: Ok(ResponseList {
                status: 400,
                responses: vec![ProduceResponse {
                    partition: None,
                    offset: None,
                    errors: vec!["bad".to_string()],
                }],
            }),
        });
        assert!(matches!(model.last(), Some(ProduceOutcome::Rejected(_))));
        assert_eq!(model.pending(), 0);

        model.on_response(&BackendResponse::Produced {
            topic: "friends".to_string(),
            result: Err("HTTP error: refused".to_string()),
        });
        assert!(matches!(model.last(), Some(ProduceOutcome::Failed(_))));

        assert!(!model.on_response(&BackendResponse::Count(Ok(1))));
    }
}
