use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{self, BufWriter, Stdout, Write};

/// Raw-mode alternate screen with 1-based row/column addressing.
pub struct Terminal {
    out: BufWriter<Stdout>,
    pub rows: u16,
    pub cols: u16,
}

impl Terminal {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = BufWriter::new(io::stdout());
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        let (cols, rows) = terminal::size()?;
        Ok(Terminal { out, rows, cols })
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    pub fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))
    }

    pub fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveTo(col.saturating_sub(1), row.saturating_sub(1))
        )
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        queue!(self.out, Print(s))
    }

    pub fn set_reverse(&mut self) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reverse))
    }

    pub fn set_bold(&mut self) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Bold))
    }

    pub fn reset_attr(&mut self) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reset))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Write a string truncated to fit within `max_width` columns.
    pub fn write_truncated(&mut self, s: &str, max_width: u16) -> io::Result<()> {
        let line = fit(s, max_width as usize);
        self.write_str(line)
    }

    /// Reverse-video bar across the whole bottom row.
    pub fn status_bar(&mut self, text: &str) -> io::Result<()> {
        self.move_to(self.rows, 1)?;
        self.set_reverse()?;
        let width = self.cols as usize;
        let line = fit(text, width);
        let padding = width.saturating_sub(line.chars().count());
        let padded = format!("{}{}", line, " ".repeat(padding));
        self.write_str(&padded)?;
        self.reset_attr()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Longest prefix of `s` that is at most `max` characters.
pub fn fit(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::fit;

    #[test]
    fn test_fit_counts_chars() {
        assert_eq!(fit("héllo", 2), "hé");
        assert_eq!(fit("abc", 10), "abc");
        assert_eq!(fit("abc", 0), "");
    }
}
