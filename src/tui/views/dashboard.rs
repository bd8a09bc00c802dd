use crate::backend::BackendResponse;
use crate::dashboard::DashboardModel;
use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::{global_key, View, ViewAction};
use std::io;

pub struct DashboardView {
    model: DashboardModel,
    scroll: usize,
}

impl DashboardView {
    pub fn new(model: DashboardModel) -> Self {
        DashboardView { model, scroll: 0 }
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Emails:    {}",
                self.model
                    .total()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ),
            format!("Per page:  {}", self.model.per_page()),
            format!("Pages:     {}", self.model.pages()),
            String::new(),
            "Producer metrics:".to_string(),
        ];
        match self.model.metrics() {
            Some(Ok(metrics)) => {
                let pretty =
                    serde_json::to_string_pretty(metrics).unwrap_or_else(|_| metrics.to_string());
                lines.extend(pretty.lines().map(|l| format!("  {}", l)));
            }
            Some(Err(e)) => lines.push(format!("  unavailable: {}", e)),
            None => lines.push("  loading...".to_string()),
        }
        lines
    }
}

impl View for DashboardView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;

        term.move_to(1, 1)?;
        term.set_bold()?;
        term.write_truncated("Dashboard", term.cols)?;
        term.reset_attr()?;
        term.move_to(2, 1)?;
        term.write_str(&"-".repeat(term.cols as usize))?;

        let visible = (term.rows as usize).saturating_sub(3);
        for (i, line) in self.lines().iter().skip(self.scroll).take(visible).enumerate() {
            term.move_to(3 + i as u16, 1)?;
            term.write_truncated(&format!(" {}", line), term.cols)?;
        }

        let status = match self.model.error() {
            Some(e) => format!(" {}", e),
            None => " r:refresh H:home P:produce ?:help q:quit".to_string(),
        };
        term.status_bar(&status)?;
        term.flush()
    }

    fn handle_key(&mut self, key: Key, _term_rows: u16) -> ViewAction {
        if let Some(action) = global_key(&key) {
            return action;
        }
        match key {
            Key::Char('r') => self.model.refresh(),
            Key::Char('j') | Key::Down => {
                if self.scroll + 1 < self.lines().len() {
                    self.scroll += 1;
                }
            }
            Key::Char('k') | Key::Up => self.scroll = self.scroll.saturating_sub(1),
            _ => {}
        }
        ViewAction::Continue
    }

    fn on_response(&mut self, response: &BackendResponse) -> bool {
        self.model.on_response(response)
    }
}
