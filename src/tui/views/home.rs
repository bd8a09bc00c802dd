use crate::backend::BackendResponse;
use crate::home::{BodyState, HomeViewModel, Row};
use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::{global_key, View, ViewAction};
use std::cell::Cell;
use std::io;
use std::rc::Rc;

const PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];

#[derive(Clone, Copy, PartialEq)]
enum LineKind {
    Summary,
    Detail,
}

/// The /home screen: one page of emails with a cursor.
pub struct HomeView {
    model: HomeViewModel,
    cursor: usize,
    dirty: Rc<Cell<bool>>,
}

impl HomeView {
    pub fn new(mut model: HomeViewModel) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = dirty.clone();
        model.subscribe(move |_state| flag.set(true));
        HomeView {
            model,
            cursor: 0,
            dirty,
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.model.state().rows.len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    fn next_page_size(current: Option<u32>) -> u32 {
        match current {
            Some(size) => PAGE_SIZES
                .iter()
                .copied()
                .find(|s| *s > size)
                .unwrap_or(PAGE_SIZES[0]),
            None => PAGE_SIZES[0],
        }
    }

    fn summary_line(row: &Row) -> String {
        let email = &row.email;
        let marker = if row.show { "-" } else { "+" };
        format!(
            " {} {:>8} {:10} {:20} {}",
            marker,
            email.message_id.to_string(),
            email.date.as_deref().map(short_date).unwrap_or(""),
            truncate(email.from.as_deref().unwrap_or("(unknown)"), 20),
            email.subject.as_deref().unwrap_or("(no subject)")
        )
    }

    fn row_lines(&self, row: &Row, width: u16) -> Vec<(String, LineKind)> {
        let mut lines = vec![(Self::summary_line(row), LineKind::Summary)];
        let email = &row.email;

        if row.show {
            let fields = [
                ("From", email.from.as_deref()),
                ("To", email.to.as_deref()),
                ("Date", email.date.as_deref()),
                ("Subject", email.subject.as_deref()),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    lines.push((format!("     {}: {}", name, value), LineKind::Detail));
                }
            }
        }

        // body visibility is tracked separately from the expanded flag
        if row.show_body {
            let body_width = (width as usize).saturating_sub(6);
            match &row.body {
                BodyState::Loaded(body) => match self.model.policy().render(body, body_width) {
                    Ok(body_lines) => lines.extend(
                        body_lines
                            .into_iter()
                            .map(|l| (format!("     | {}", l), LineKind::Detail)),
                    ),
                    Err(e) => lines.push((format!("     ! {}", e), LineKind::Detail)),
                },
                BodyState::Loading | BodyState::NotLoaded => {
                    lines.push(("     Loading body...".to_string(), LineKind::Detail))
                }
                BodyState::Failed(e) => {
                    lines.push((format!("     ! Body unavailable: {}", e), LineKind::Detail))
                }
            }
        }
        lines
    }

    fn pager_line(&self) -> String {
        let state = self.model.state();
        let pages = self.model.page_window(state.total);
        if pages.is_empty() {
            return " Pages: -".to_string();
        }
        let links: Vec<String> = pages
            .iter()
            .map(|p| {
                if *p == state.page {
                    format!("[{}]", p)
                } else {
                    p.to_string()
                }
            })
            .collect();
        format!(" Pages: {}", links.join(" "))
    }
}

fn short_date(date: &str) -> &str {
    match date.char_indices().nth(10) {
        Some((end, _)) => &date[..end],
        None => date,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        s.chars().take(max).collect()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

impl View for HomeView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;
        let state = self.model.state();

        // Header
        term.move_to(1, 1)?;
        term.set_bold()?;
        let header = format!(
            "Emails | page {} | {} per page | {} total",
            state.page,
            state
                .per_page
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            state
                .total
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        term.write_truncated(&header, term.cols)?;
        term.reset_attr()?;

        term.move_to(2, 1)?;
        term.write_truncated(&self.pager_line(), term.cols)?;

        term.move_to(3, 1)?;
        term.write_str(&"-".repeat(term.cols as usize))?;

        if state.loading && state.rows.is_empty() {
            term.move_to(4, 1)?;
            term.write_truncated("Loading emails...", term.cols)?;
        } else if state.rows.is_empty() {
            term.move_to(4, 1)?;
            term.write_truncated("No messages.", term.cols)?;
        } else {
            let mut lines = Vec::new();
            let mut cursor_line = 0;
            for (i, row) in state.rows.iter().enumerate() {
                if i == self.cursor {
                    cursor_line = lines.len();
                }
                lines.extend(
                    self.row_lines(row, term.cols)
                        .into_iter()
                        .map(|(text, kind)| (text, kind, i == self.cursor)),
                );
            }

            let max_items = (term.rows as usize).saturating_sub(5);
            let scroll_offset = if cursor_line >= max_items {
                cursor_line - max_items + 1
            } else {
                0
            };

            for (i, (text, kind, selected)) in
                lines.iter().skip(scroll_offset).take(max_items).enumerate()
            {
                term.move_to(4 + i as u16, 1)?;
                if *selected && *kind == LineKind::Summary {
                    term.set_reverse()?;
                }
                term.write_truncated(text, term.cols)?;
                term.reset_attr()?;
            }
        }

        let status = match (&state.error, state.loading) {
            (Some(err), _) => format!(" {}", err),
            (None, true) => " Loading... | q:quit".to_string(),
            (None, false) if state.rows.is_empty() => " q:quit r:reload ?:help".to_string(),
            (None, false) => format!(
                " {}/{} | RET:open t:body d:delete n/p:page s:size ?:help",
                self.cursor + 1,
                state.rows.len()
            ),
        };
        term.status_bar(&status)?;
        term.flush()
    }

    fn handle_key(&mut self, key: Key, term_rows: u16) -> ViewAction {
        if let Some(action) = global_key(&key) {
            return action;
        }
        let len = self.model.state().rows.len();
        let page_jump = (term_rows as usize).saturating_sub(5).max(1);
        match key {
            Key::Char('j') | Key::Down => {
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            Key::Char('k') | Key::Up => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            Key::PageDown => {
                self.cursor = (self.cursor + page_jump).min(len.saturating_sub(1));
            }
            Key::PageUp => {
                self.cursor = self.cursor.saturating_sub(page_jump);
            }
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = len.saturating_sub(1),
            Key::Enter | Key::Char(' ') => {
                self.model.show_hide(self.cursor);
            }
            Key::Char('t') => {
                self.model.show_text(self.cursor);
            }
            Key::Char('d') | Key::Delete => {
                self.model.delete_email(self.cursor);
                self.clamp_cursor();
            }
            Key::Char('n') | Key::Right => {
                let page = self.model.state().page.saturating_add(1);
                self.cursor = 0;
                self.model.get_page(page);
            }
            Key::Char('p') | Key::Left => {
                let page = self.model.state().page.saturating_sub(1);
                self.cursor = 0;
                self.model.get_page(page);
            }
            Key::Char('s') => {
                let size = Self::next_page_size(self.model.state().per_page);
                self.cursor = 0;
                self.model.update_per_page(Some(size));
            }
            Key::Char('r') => {
                let page = self.model.state().page;
                self.model.get_page(page);
            }
            _ => {}
        }
        ViewAction::Continue
    }

    fn on_response(&mut self, response: &BackendResponse) -> bool {
        self.model.on_response(response);
        self.clamp_cursor();
        self.dirty.replace(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BodyPolicy;
    use crate::resource::types::Email;
    use regex::Regex;
    use std::sync::mpsc;
    use url::Url;

    fn view() -> HomeView {
        let (tx, _rx) = mpsc::channel();
        let policy = BodyPolicy::new(
            Url::parse("http://localhost").unwrap(),
            Regex::new("^[0-9]+$").unwrap(),
            vec!["text/html".to_string()],
        );
        HomeView::new(HomeViewModel::new(tx, policy, 10, 10))
    }

    #[test]
    fn test_next_page_size_cycles() {
        assert_eq!(HomeView::next_page_size(Some(10)), 25);
        assert_eq!(HomeView::next_page_size(Some(30)), 50);
        assert_eq!(HomeView::next_page_size(Some(100)), 10);
        assert_eq!(HomeView::next_page_size(None), 10);
    }

    #[test]
    fn test_summary_line() {
        let mut email = Email::new(42);
        email.subject = Some("Quarterly report".to_string());
        email.from = Some("alice@example.com".to_string());
        email.date = Some("2024-05-01T10:00:00Z".to_string());
        let row = Row {
            email,
            show: false,
            show_body: false,
            body: BodyState::NotLoaded,
        };
        let line = HomeView::summary_line(&row);
        assert!(line.starts_with(" + "));
        assert!(line.contains("42"));
        assert!(line.contains("2024-05-01 "));
        assert!(line.contains("Quarterly report"));
    }

    #[test]
    fn test_body_lines_follow_show_body_only() {
        let v = view();
        let row = Row {
            email: Email::new(1),
            show: false,
            show_body: true,
            body: BodyState::Failed("nope".to_string()),
        };
        let lines = v.row_lines(&row, 80);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].0.contains("nope"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 5), "ab...");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
