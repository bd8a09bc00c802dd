pub mod dashboard;
pub mod help;
pub mod home;
pub mod produce;

use super::input::Key;
use super::screen::Terminal;
use crate::backend::BackendResponse;
use std::io;

pub enum ViewAction {
    Continue,
    Push(Box<dyn View>),
    Pop,
    Quit,
    /// Switch to another route; the router resolves the path.
    Navigate(&'static str),
}

pub trait View {
    fn render(&self, term: &mut Terminal) -> io::Result<()>;
    fn handle_key(&mut self, key: Key, term_rows: u16) -> ViewAction;
    /// Handle a response from the backend thread.
    /// Returns true if the view consumed the response and should re-render.
    fn on_response(&mut self, _response: &BackendResponse) -> bool {
        false
    }
}

/// Keys shared by every routed screen.
pub fn global_key(key: &Key) -> Option<ViewAction> {
    match key {
        Key::Char('q') | Key::Ctrl('c') => Some(ViewAction::Quit),
        Key::Char('H') => Some(ViewAction::Navigate("/home")),
        Key::Char('P') => Some(ViewAction::Navigate("/produce")),
        Key::Char('D') => Some(ViewAction::Navigate("/dashboard")),
        Key::Char('?') => Some(ViewAction::Push(Box::new(help::HelpView::new()))),
        _ => None,
    }
}

pub struct ViewStack {
    views: Vec<Box<dyn View>>,
}

impl ViewStack {
    pub fn new(initial: Box<dyn View>) -> Self {
        ViewStack {
            views: vec![initial],
        }
    }

    pub fn render_current(&self, term: &mut Terminal) -> io::Result<()> {
        if let Some(view) = self.views.last() {
            view.render(term)?;
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: Key, term_rows: u16) -> Option<ViewAction> {
        self.views
            .last_mut()
            .map(|view| view.handle_key(key, term_rows))
    }

    /// Route a backend response to all views (top-most can trigger re-render).
    pub fn handle_response(&mut self, response: &BackendResponse) -> bool {
        let top = self.views.len().saturating_sub(1);
        let mut needs_render = false;
        for (idx, view) in self.views.iter_mut().enumerate() {
            if view.on_response(response) && idx == top {
                needs_render = true;
            }
        }
        needs_render
    }

    pub fn push(&mut self, view: Box<dyn View>) {
        self.views.push(view);
    }

    pub fn pop(&mut self) -> bool {
        if self.views.len() > 1 {
            self.views.pop();
            true
        } else {
            false
        }
    }

    /// Drop every view and start over from `root`.
    pub fn reset(&mut self, root: Box<dyn View>) {
        self.views.clear();
        self.views.push(root);
    }
}
