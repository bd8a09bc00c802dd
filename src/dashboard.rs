use crate::backend::{BackendCommand, BackendResponse};
use crate::home::page_count;
use serde_json::Value;
use std::sync::mpsc;

/// Backs the /dashboard screen: email total, page count and producer metrics.
pub struct DashboardModel {
    cmd_tx: mpsc::Sender<BackendCommand>,
    per_page: u32,
    total: Option<u64>,
    metrics: Option<Result<Value, String>>,
    error: Option<String>,
    in_flight: usize,
}

impl DashboardModel {
    pub fn new(cmd_tx: mpsc::Sender<BackendCommand>, per_page: u32) -> Self {
        let mut model = DashboardModel {
            cmd_tx,
            per_page,
            total: None,
            metrics: None,
            error: None,
            in_flight: 0,
        };
        model.refresh();
        model
    }

    pub fn refresh(&mut self) {
        self.error = None;
        for cmd in [BackendCommand::CountEmails, BackendCommand::FetchMetrics] {
            if self.cmd_tx.send(cmd).is_err() {
                self.error = Some("backend unavailable".to_string());
                return;
            }
            self.in_flight += 1;
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn pages(&self) -> u64 {
        page_count(self.total, Some(self.per_page))
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn metrics(&self) -> Option<&Result<Value, String>> {
        self.metrics.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pending(&self) -> usize {
        self.in_flight
    }

    pub fn on_response(&mut self, response: &BackendResponse) -> bool {
        match response {
            BackendResponse::Count(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(total) => self.total = Some(*total),
                    Err(e) => self.error = Some(format!("Failed to count emails: {}", e)),
                }
                true
            }
            BackendResponse::Metrics(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.metrics = Some(result.clone());
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dashboard_requests_and_applies() {
        let (tx, rx) = mpsc::channel();
        let mut model = DashboardModel::new(tx, 100);
        let cmds: Vec<_> = rx.try_iter().collect();
        assert!(matches!(
            cmds.as_slice(),
            [BackendCommand::CountEmails, BackendCommand::FetchMetrics]
        ));
        assert_eq!(model.pending(), 2);

        model.on_response(&BackendResponse::Count(Ok(250)));
        model.on_response(&BackendResponse::Metrics(Ok(json!({"rate": 2}))));
        assert_eq!(model.total(), Some(250));
        assert_eq!(model.pages(), 3);
        assert_eq!(model.metrics(), Some(&Ok(json!({"rate": 2}))));
        assert_eq!(model.pending(), 0);
    }

    #[test]
    fn test_refresh_clears_previous_error() {
        let (tx, _rx) = mpsc::channel();
        let mut model = DashboardModel::new(tx, 100);
        model.on_response(&BackendResponse::Count(Err("HTTP error: timed out".to_string())));
        assert!(model.error().unwrap().contains("timed out"));

        model.refresh();
        assert!(model.error().is_none());
        model.on_response(&BackendResponse::Count(Ok(10)));
        assert!(model.error().is_none());
        assert_eq!(model.total(), Some(10));
    }
}
