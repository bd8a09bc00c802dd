pub mod input;
pub mod screen;
pub mod views;

use crate::backend::{self, BackendCommand};
use crate::config::Config;
use crate::dashboard::DashboardModel;
use crate::home::HomeViewModel;
use crate::policy::BodyPolicy;
use crate::produce::ProducerModel;
use crate::resource::EmailResource;
use crate::router::{self, Route};
use input::{read_input, Input};
use screen::Terminal;
use std::io;
use std::sync::mpsc;
use std::time::Duration;
use views::dashboard::DashboardView;
use views::home::HomeView;
use views::produce::ProduceView;
use views::{View, ViewAction, ViewStack};

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Resolve `path` and build a fresh view for it. Each visit starts with a
/// new model, so leaving a screen discards its state.
fn open_route(path: &str, config: &Config, cmd_tx: &mpsc::Sender<BackendCommand>) -> Box<dyn View> {
    let resolution = router::resolve(path);
    if resolution.redirected {
        log::info!("Unknown route '{}', showing {}", path, resolution.route);
    } else {
        log::debug!("Opening {}", resolution.route);
    }
    match resolution.route {
        Route::Home => Box::new(HomeView::new(HomeViewModel::new(
            cmd_tx.clone(),
            BodyPolicy::from_config(config.server.base_url.clone(), &config.render),
            config.ui.page_size,
            config.ui.max_size,
        ))),
        Route::Produce => Box::new(ProduceView::new(ProducerModel::new(
            cmd_tx.clone(),
            config.produce.clone(),
        ))),
        Route::Dashboard => Box::new(DashboardView::new(DashboardModel::new(
            cmd_tx.clone(),
            config.ui.page_size,
        ))),
    }
}

pub fn run(config: Config, resource: Box<dyn EmailResource>, start_path: &str) -> io::Result<()> {
    let (cmd_tx, resp_rx) = backend::spawn(resource);
    let mut term = Terminal::new()?;

    let mut stack = ViewStack::new(open_route(start_path, &config, &cmd_tx));
    stack.render_current(&mut term)?;

    loop {
        // Poll backend responses (non-blocking)
        let mut needs_render = false;
        while let Ok(response) = resp_rx.try_recv() {
            if stack.handle_response(&response) {
                needs_render = true;
            }
        }
        if needs_render {
            stack.render_current(&mut term)?;
        }

        let key = match read_input(INPUT_POLL)? {
            Some(Input::Key(key)) => key,
            Some(Input::Resize { cols, rows }) => {
                term.resize(cols, rows);
                stack.render_current(&mut term)?;
                continue;
            }
            None => continue,
        };

        let action = match stack.handle_key(key, term.rows) {
            Some(action) => action,
            None => break,
        };

        match action {
            ViewAction::Continue => {}
            ViewAction::Push(view) => stack.push(view),
            ViewAction::Pop => {
                if !stack.pop() {
                    break;
                }
            }
            ViewAction::Quit => break,
            ViewAction::Navigate(path) => stack.reset(open_route(path, &config, &cmd_tx)),
        }
        stack.render_current(&mut term)?;
    }

    // Signal backend to shut down
    let _ = cmd_tx.send(BackendCommand::Shutdown);

    Ok(())
}
