use crate::backend::BackendResponse;
use crate::produce::{ProduceOutcome, ProducerModel};
use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::{global_key, View, ViewAction};
use std::io;

pub struct ProduceView {
    model: ProducerModel,
    cursor: usize,
}

impl ProduceView {
    pub fn new(model: ProducerModel) -> Self {
        ProduceView { model, cursor: 0 }
    }

    fn outcome_lines(outcome: &ProduceOutcome) -> Vec<String> {
        match outcome {
            ProduceOutcome::Sent(list) => {
                let mut lines = vec![format!("Sent (status {})", list.status)];
                for r in &list.responses {
                    lines.push(format!(
                        "  partition {} offset {}",
                        r.partition.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                        r.offset.map(|o| o.to_string()).unwrap_or_else(|| "-".into()),
                    ));
                }
                lines
            }
            ProduceOutcome::Rejected(list) => {
                let mut lines = vec![format!("Rejected (status {})", list.status)];
                lines.extend(list.errors().into_iter().map(|e| format!("  {}", e)));
                lines
            }
            ProduceOutcome::Failed(e) => vec![format!("Failed: {}", e)],
        }
    }
}

impl View for ProduceView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;

        term.move_to(1, 1)?;
        term.set_bold()?;
        term.write_truncated(&format!("Produce to topic '{}'", self.model.topic()), term.cols)?;
        term.reset_attr()?;

        term.move_to(2, 1)?;
        term.write_str(&"-".repeat(term.cols as usize))?;

        let mut row = 3u16;
        for (i, friend) in self.model.friends().iter().enumerate() {
            term.move_to(row, 1)?;
            if i == self.cursor {
                term.set_reverse()?;
            }
            let line = format!(" {:20} {:>4}  {}", friend.name, friend.age, friend.gender);
            term.write_truncated(&line, term.cols)?;
            term.reset_attr()?;
            row += 1;
        }

        row += 1;
        let result_lines = match self.model.last() {
            Some(outcome) => Self::outcome_lines(outcome),
            None if self.model.pending() > 0 => vec!["Sending...".to_string()],
            None => Vec::new(),
        };
        for line in result_lines {
            if row >= term.rows {
                break;
            }
            term.move_to(row, 1)?;
            term.write_truncated(&format!(" {}", line), term.cols)?;
            row += 1;
        }

        term.status_bar(" RET:produce j/k:move H:home D:dashboard ?:help q:quit")?;
        term.flush()
    }

    fn handle_key(&mut self, key: Key, _term_rows: u16) -> ViewAction {
        if let Some(action) = global_key(&key) {
            return action;
        }
        let len = self.model.friends().len();
        match key {
            Key::Char('j') | Key::Down => {
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            Key::Char('k') | Key::Up => self.cursor = self.cursor.saturating_sub(1),
            Key::Enter => {
                self.model.produce(self.cursor);
            }
            _ => {}
        }
        ViewAction::Continue
    }

    fn on_response(&mut self, response: &BackendResponse) -> bool {
        self.model.on_response(response)
    }
}
