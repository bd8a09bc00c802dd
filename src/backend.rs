use crate::policy::BodyLocator;
use crate::resource::types::{Body, Email, MessageId, Payload, ResponseList};
use crate::resource::EmailResource;
use serde_json::Value;
use std::sync::mpsc;
use std::thread;

/// Commands sent from the UI thread to the backend thread.
#[derive(Debug)]
pub enum BackendCommand {
    QueryEmails {
        seq: u64,
        page: u32,
        size: Option<u32>,
    },
    CountEmails,
    DeleteEmail {
        message_id: MessageId,
    },
    FetchBody {
        message_id: MessageId,
        locator: BodyLocator,
    },
    FetchMetrics,
    Produce {
        topic: String,
        payloads: Vec<Payload>,
    },
    Shutdown,
}

/// Responses sent from the backend thread to the UI thread.
#[derive(Debug)]
pub enum BackendResponse {
    Emails {
        seq: u64,
        page: u32,
        emails: Result<Vec<Email>, String>,
    },
    Count(Result<u64, String>),
    Deleted {
        message_id: MessageId,
        result: Result<(), String>,
    },
    Body {
        message_id: MessageId,
        result: Box<Result<Body, String>>,
    },
    Metrics(Result<Value, String>),
    Produced {
        topic: String,
        result: Result<ResponseList, String>,
    },
}

/// Spawn the backend thread. Returns the command sender and response receiver.
pub fn spawn(
    resource: Box<dyn EmailResource>,
) -> (
    mpsc::Sender<BackendCommand>,
    mpsc::Receiver<BackendResponse>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>();
    let (resp_tx, resp_rx) = mpsc::channel::<BackendResponse>();

    thread::spawn(move || {
        backend_loop(resource.as_ref(), cmd_rx, resp_tx);
    });

    (cmd_tx, resp_rx)
}

fn backend_loop(
    resource: &dyn EmailResource,
    cmd_rx: mpsc::Receiver<BackendCommand>,
    resp_tx: mpsc::Sender<BackendResponse>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        let response = match cmd {
            BackendCommand::QueryEmails { seq, page, size } => BackendResponse::Emails {
                seq,
                page,
                emails: resource.query(page, size).map_err(|e| e.to_string()),
            },
            BackendCommand::CountEmails => {
                BackendResponse::Count(resource.count().map_err(|e| e.to_string()))
            }
            BackendCommand::DeleteEmail { message_id } => {
                let result = resource.delete(&message_id).map_err(|e| e.to_string());
                if let Err(ref e) = result {
                    log::warn!("Failed to delete email {}: {}", message_id, e);
                }
                BackendResponse::Deleted { message_id, result }
            }
            BackendCommand::FetchBody {
                message_id,
                locator,
            } => BackendResponse::Body {
                message_id,
                result: Box::new(resource.body(&locator).map_err(|e| e.to_string())),
            },
            BackendCommand::FetchMetrics => {
                BackendResponse::Metrics(resource.metrics().map_err(|e| e.to_string()))
            }
            BackendCommand::Produce { topic, payloads } => {
                let result = resource
                    .produce(&topic, &payloads)
                    .map_err(|e| e.to_string());
                BackendResponse::Produced { topic, result }
            }
            BackendCommand::Shutdown => break,
        };

        if resp_tx.send(response).is_err() {
            break;
        }
    }
    log::debug!("Backend thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ApiError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory stand-in for the email service: `total` emails with ids
    /// 1..=total, recording every call.
    struct FakeResource {
        total: u64,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeResource {
        fn new(total: u64) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                FakeResource {
                    total,
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl EmailResource for FakeResource {
        fn query(&self, page: u32, size: Option<u32>) -> Result<Vec<Email>, ApiError> {
            self.record(format!("query {} {:?}", page, size));
            let size = size.unwrap_or(20) as u64;
            let start = page as u64 * size + 1;
            Ok((start..=self.total)
                .take(size as usize)
                .map(Email::new)
                .collect())
        }

        fn count(&self) -> Result<u64, ApiError> {
            self.record("count".to_string());
            Ok(self.total)
        }

        fn delete(&self, message_id: &MessageId) -> Result<(), ApiError> {
            self.record(format!("delete {}", message_id));
            if *message_id == MessageId::from(13) {
                return Err(ApiError::Status {
                    code: 500,
                    body: "unlucky".to_string(),
                });
            }
            Ok(())
        }

        fn body(&self, locator: &BodyLocator) -> Result<Body, ApiError> {
            self.record(format!("body {}", locator));
            Ok(Body {
                content_type: "text/html".to_string(),
                text: "<p>hello</p>".to_string(),
            })
        }

        fn produce(&self, topic: &str, payloads: &[Payload]) -> Result<ResponseList, ApiError> {
            self.record(format!("produce {} {}", topic, payloads.len()));
            Ok(ResponseList {
                status: 200,
                responses: Vec::new(),
            })
        }

        fn metrics(&self) -> Result<Value, ApiError> {
            self.record("metrics".to_string());
            Ok(serde_json::json!({"record-send-rate": 1.5}))
        }
    }

    fn recv(rx: &mpsc::Receiver<BackendResponse>) -> BackendResponse {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_backend_answers_in_order() {
        let (fake, calls) = FakeResource::new(250);
        let (tx, rx) = spawn(Box::new(fake));

        tx.send(BackendCommand::CountEmails).unwrap();
        tx.send(BackendCommand::QueryEmails {
            seq: 1,
            page: 2,
            size: Some(100),
        })
        .unwrap();

        match recv(&rx) {
            BackendResponse::Count(Ok(n)) => assert_eq!(n, 250),
            other => panic!("unexpected {:?}", other),
        }
        match recv(&rx) {
            BackendResponse::Emails { seq, page, emails } => {
                assert_eq!(seq, 1);
                assert_eq!(page, 2);
                let emails = emails.unwrap();
                assert_eq!(emails.len(), 50);
                assert_eq!(emails[0].message_id, MessageId::from(201));
            }
            other => panic!("unexpected {:?}", other),
        }

        tx.send(BackendCommand::Shutdown).unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["count".to_string(), "query 2 Some(100)".to_string()]
        );
    }

    #[test]
    fn test_backend_reports_delete_failure() {
        let (fake, _calls) = FakeResource::new(20);
        let (tx, rx) = spawn(Box::new(fake));

        tx.send(BackendCommand::DeleteEmail {
            message_id: MessageId::from(13),
        })
        .unwrap();
        match recv(&rx) {
            BackendResponse::Deleted { message_id, result } => {
                assert_eq!(message_id, MessageId::from(13));
                assert!(result.unwrap_err().contains("500"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_closes_channel() {
        let (fake, _calls) = FakeResource::new(0);
        let (tx, rx) = spawn(Box::new(fake));
        tx.send(BackendCommand::Shutdown).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    }
}
