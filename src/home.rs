use crate::backend::{BackendCommand, BackendResponse};
use crate::policy::{BodyLocator, BodyPolicy, PolicyError};
use crate::resource::types::{Body, Email};
use std::ops::Range;
use std::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum BodyState {
    NotLoaded,
    Loading,
    Loaded(Body),
    Failed(String),
}

/// One email in the list plus its transient display flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub email: Email,
    pub show: bool,
    pub show_body: bool,
    pub body: BodyState,
}

impl Row {
    fn new(email: Email) -> Self {
        Row {
            email,
            show: false,
            show_body: false,
            body: BodyState::NotLoaded,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeState {
    pub page: u32,
    pub per_page: Option<u32>,
    pub max_size: u32,
    pub total: Option<u64>,
    pub rows: Vec<Row>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Number of page links for `total` emails: `total / per_page` rounded half
/// up. This undercounts when the remainder is below half a page.
pub fn page_count(total: Option<u64>, per_page: Option<u32>) -> u64 {
    match (total, per_page) {
        (Some(total), Some(per_page)) if per_page > 0 => {
            let per_page = u64::from(per_page);
            total / per_page + u64::from(total % per_page >= per_page.div_ceil(2))
        }
        _ => 0,
    }
}

type RenderCallback = Box<dyn FnMut(&HomeState)>;

/// State and behaviour behind the /home screen.
///
/// Every network effect goes out as a [`BackendCommand`]; results come back
/// through [`HomeViewModel::on_response`]. After each state change the
/// registered render callback sees the new state.
pub struct HomeViewModel {
    cmd_tx: mpsc::Sender<BackendCommand>,
    policy: BodyPolicy,
    state: HomeState,
    query_seq: u64,
    in_flight: usize,
    on_change: Option<RenderCallback>,
}

impl HomeViewModel {
    /// Create the model and request the count and the first page.
    pub fn new(
        cmd_tx: mpsc::Sender<BackendCommand>,
        policy: BodyPolicy,
        per_page: u32,
        max_size: u32,
    ) -> Self {
        let mut model = HomeViewModel {
            cmd_tx,
            policy,
            state: HomeState {
                page: 0,
                per_page: Some(per_page),
                max_size,
                total: None,
                rows: Vec::new(),
                loading: false,
                error: None,
            },
            query_seq: 0,
            in_flight: 0,
            on_change: None,
        };
        model.send(BackendCommand::CountEmails);
        model.issue_query();
        model
    }

    pub fn state(&self) -> &HomeState {
        &self.state
    }

    pub fn policy(&self) -> &BodyPolicy {
        &self.policy
    }

    /// Requests sent whose responses have not come back yet.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&HomeState) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    fn emit(&mut self) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.state);
        }
    }

    fn send(&mut self, cmd: BackendCommand) -> bool {
        if self.cmd_tx.send(cmd).is_err() {
            log::error!("Backend channel closed");
            self.state.error = Some("backend unavailable".to_string());
            return false;
        }
        self.in_flight += 1;
        true
    }

    fn issue_query(&mut self) {
        self.query_seq += 1;
        self.state.loading = true;
        let cmd = BackendCommand::QueryEmails {
            seq: self.query_seq,
            page: self.state.page,
            size: self.state.per_page,
        };
        if !self.send(cmd) {
            self.state.loading = false;
        }
    }

    /// Jump to page `page` and re-query. Pages past the end are requested
    /// as-is; the server decides what an out-of-range page holds.
    pub fn get_page(&mut self, page: u32) {
        self.state.page = page;
        self.issue_query();
        self.emit();
    }

    /// Change the page size. Always goes back to page 1.
    pub fn update_per_page(&mut self, per_page: Option<u32>) {
        self.state.per_page = per_page;
        self.state.page = 1;
        self.issue_query();
        self.emit();
    }

    /// Toggle a row open or closed. Closing a row also hides its body;
    /// opening never shows the body.
    pub fn show_hide(&mut self, index: usize) -> bool {
        let Some(row) = self.state.rows.get_mut(index) else {
            return false;
        };
        if row.show {
            row.show = false;
            row.show_body = false;
        } else {
            row.show = true;
        }
        self.emit();
        true
    }

    /// Toggle body visibility. This does not look at `show`; the first time
    /// a body becomes visible it is fetched.
    pub fn show_text(&mut self, index: usize) -> bool {
        let Some(row) = self.state.rows.get_mut(index) else {
            return false;
        };
        row.show_body = !row.show_body;

        let wants_fetch = row.show_body
            && matches!(row.body, BodyState::NotLoaded | BodyState::Failed(_));
        if wants_fetch {
            let message_id = row.email.message_id.clone();
            match self.policy.locate(&message_id) {
                Ok(locator) => {
                    if let Some(row) = self.state.rows.get_mut(index) {
                        row.body = BodyState::Loading;
                    }
                    self.send(BackendCommand::FetchBody {
                        message_id,
                        locator,
                    });
                }
                Err(e) => {
                    log::warn!("Refusing body for {}: {}", message_id, e);
                    if let Some(row) = self.state.rows.get_mut(index) {
                        row.body = BodyState::Failed(e.to_string());
                    }
                }
            }
        }
        self.emit();
        true
    }

    /// Remove the row locally, then tell the server. There is no rollback:
    /// a failed server delete only shows up as an error message.
    pub fn delete_email(&mut self, index: usize) -> Option<Email> {
        if index >= self.state.rows.len() {
            return None;
        }
        let row = self.state.rows.remove(index);
        self.send(BackendCommand::DeleteEmail {
            message_id: row.email.message_id.clone(),
        });
        self.emit();
        Some(row.email)
    }

    /// Page indices for the pagination control; empty when either the total
    /// or the page size is unknown or zero. Counts past `u32::MAX` saturate.
    pub fn get_number(&self, total: Option<u64>) -> Range<u32> {
        let count = page_count(total, self.state.per_page);
        0..u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// At most `max_size` page indices around the current page.
    pub fn page_window(&self, total: Option<u64>) -> Vec<u32> {
        let pages = self.get_number(total);
        let count = pages.end;
        let window = self.state.max_size;
        if count <= window {
            return pages.collect();
        }
        let current = self.state.page.min(count - 1);
        let start = current.saturating_sub(window / 2).min(count - window);
        (start..start + window).collect()
    }

    /// Locator for rendering this email's body inline, if the policy allows it.
    pub fn trust_src(&self, email: &Email) -> Result<BodyLocator, PolicyError> {
        self.policy.locate(&email.message_id)
    }

    /// Apply a backend response. Returns true when the state changed.
    pub fn on_response(&mut self, response: &BackendResponse) -> bool {
        match response {
            BackendResponse::Emails { seq, page, emails } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if *seq != self.query_seq {
                    log::debug!(
                        "Dropping stale email list for page {} (seq {}, latest {})",
                        page,
                        seq,
                        self.query_seq
                    );
                    return false;
                }
                self.state.loading = false;
                match emails {
                    Ok(emails) => {
                        let mut emails = emails.clone();
                        emails.sort_by(|a, b| a.message_id.cmp(&b.message_id));
                        if let Some(limit) = self.state.per_page.filter(|n| *n > 0) {
                            if emails.len() > limit as usize {
                                log::warn!(
                                    "Server returned {} emails for page size {}",
                                    emails.len(),
                                    limit
                                );
                                emails.truncate(limit as usize);
                            }
                        }
                        self.state.rows = emails.into_iter().map(Row::new).collect();
                        self.state.error = None;
                    }
                    Err(e) => {
                        self.state.error = Some(format!("Failed to fetch emails: {}", e));
                    }
                }
            }
            BackendResponse::Count(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(total) => self.state.total = Some(*total),
                    Err(e) => self.state.error = Some(format!("Failed to count emails: {}", e)),
                }
            }
            BackendResponse::Deleted { message_id, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(()) => log::info!("Deleted email {}", message_id),
                    Err(e) => {
                        self.state.error =
                            Some(format!("Failed to delete email {}: {}", message_id, e));
                    }
                }
            }
            BackendResponse::Body { message_id, result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let Some(row) = self
                    .state
                    .rows
                    .iter_mut()
                    .find(|row| row.email.message_id == *message_id)
                else {
                    return false;
                };
                let outcome = match result.as_ref() {
                    Ok(body) => self
                        .policy
                        .admit(body)
                        .map(|()| body.clone())
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.clone()),
                };
                row.body = match outcome {
                    Ok(body) => BodyState::Loaded(body),
                    Err(e) => {
                        self.state.error =
                            Some(format!("Failed to load body {}: {}", message_id, e));
                        BodyState::Failed(e)
                    }
                };
            }
            _ => return false,
        }
        self.emit();
        true
    }
}
