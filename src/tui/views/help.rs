use crate::tui::input::Key;
use crate::tui::screen::Terminal;
use crate::tui::views::{View, ViewAction};
use std::io;

pub struct HelpView {
    lines: Vec<&'static str>,
    scroll: usize,
}

impl HelpView {
    pub fn new() -> Self {
        let lines = vec![
            "mailpage - terminal email browser",
            "=================================",
            "",
            "Global",
            "------",
            "  ?           Show this help",
            "  H           Go to /home",
            "  P           Go to /produce",
            "  D           Go to /dashboard",
            "  q, Ctrl-C   Quit",
            "",
            "Home",
            "----",
            "  j/Down      Next email",
            "  k/Up        Previous email",
            "  Enter       Expand/collapse the selected email",
            "  t           Show/hide the message body",
            "  d           Delete the selected email",
            "  n/Right     Next page",
            "  p/Left      Previous page",
            "  s           Cycle page size (10, 25, 50, 100)",
            "  r           Reload the current page",
            "",
            "Produce",
            "-------",
            "  j/k         Select friend",
            "  Enter       Publish the selected friend",
            "",
            "Dashboard",
            "---------",
            "  r           Refresh count and metrics",
            "",
            "Help",
            "----",
            "  q, Esc      Close help",
        ];
        HelpView { lines, scroll: 0 }
    }
}

impl View for HelpView {
    fn render(&self, term: &mut Terminal) -> io::Result<()> {
        term.clear()?;
        let visible = (term.rows as usize).saturating_sub(1);
        for (i, line) in self.lines.iter().skip(self.scroll).take(visible).enumerate() {
            term.move_to(1 + i as u16, 1)?;
            if i + self.scroll < 2 {
                term.set_bold()?;
            }
            term.write_truncated(line, term.cols)?;
            term.reset_attr()?;
        }
        term.status_bar(" q:close j/k:scroll")?;
        term.flush()
    }

    fn handle_key(&mut self, key: Key, term_rows: u16) -> ViewAction {
        let visible = (term_rows as usize).saturating_sub(1);
        let max_scroll = self.lines.len().saturating_sub(visible);
        match key {
            Key::Char('q') | Key::Escape => ViewAction::Pop,
            Key::Char('j') | Key::Down => {
                self.scroll = (self.scroll + 1).min(max_scroll);
                ViewAction::Continue
            }
            Key::Char('k') | Key::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                ViewAction::Continue
            }
            _ => ViewAction::Continue,
        }
    }
}
