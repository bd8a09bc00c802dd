use crate::backend::{self, BackendCommand, BackendResponse};
use crate::config::Config;
use crate::dashboard::DashboardModel;
use crate::home::{BodyState, HomeViewModel, Row};
use crate::policy::BodyPolicy;
use crate::produce::{self, ProduceOutcome, ProducerModel};
use crate::resource::types::ResponseList;
use crate::resource::EmailResource;
use crate::router::{self, Route};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::time::Duration;

/// Upper bound on the page list `get_number` writes out.
const MAX_LISTED_PAGES: usize = 10_000;

enum Screen {
    Home(HomeViewModel),
    Produce(ProducerModel),
    Dashboard(DashboardModel),
}

impl Screen {
    fn pending(&self) -> usize {
        match self {
            Screen::Home(m) => m.pending(),
            Screen::Produce(m) => m.pending(),
            Screen::Dashboard(m) => m.pending(),
        }
    }

    fn on_response(&mut self, response: &BackendResponse) -> bool {
        match self {
            Screen::Home(m) => m.on_response(response),
            Screen::Produce(m) => m.on_response(response),
            Screen::Dashboard(m) => m.on_response(response),
        }
    }
}

struct CliState {
    config: Config,
    cmd_tx: mpsc::Sender<BackendCommand>,
    resp_rx: mpsc::Receiver<BackendResponse>,
    route: Route,
    screen: Screen,
}

impl CliState {
    fn open(&mut self, route: Route) {
        self.route = route;
        self.screen = build_screen(route, &self.config, &self.cmd_tx);
    }

    /// Block until every request the current screen sent has been answered.
    fn settle(&mut self) -> Result<(), String> {
        let timeout = self.config.server.timeout + Duration::from_secs(5);
        while self.screen.pending() > 0 {
            let response = self
                .resp_rx
                .recv_timeout(timeout)
                .map_err(|e| format!("backend did not answer: {}", e))?;
            self.screen.on_response(&response);
        }
        Ok(())
    }

    fn home(&mut self) -> Result<&mut HomeViewModel, Value> {
        match &mut self.screen {
            Screen::Home(m) => Ok(m),
            _ => Err(err_response(&format!(
                "command needs {} (current route is {})",
                Route::Home,
                self.route
            ))),
        }
    }
}

fn build_screen(route: Route, config: &Config, cmd_tx: &mpsc::Sender<BackendCommand>) -> Screen {
    match route {
        Route::Home => Screen::Home(HomeViewModel::new(
            cmd_tx.clone(),
            BodyPolicy::from_config(config.server.base_url.clone(), &config.render),
            config.ui.page_size,
            config.ui.max_size,
        )),
        Route::Produce => Screen::Produce(ProducerModel::new(
            cmd_tx.clone(),
            config.produce.clone(),
        )),
        Route::Dashboard => {
            Screen::Dashboard(DashboardModel::new(cmd_tx.clone(), config.ui.page_size))
        }
    }
}

fn ok_response(data: Value) -> Value {
    let mut obj = match data {
        Value::Object(m) => m,
        _ => {
            let mut m = serde_json::Map::new();
            m.insert("data".to_string(), data);
            m
        }
    };
    obj.insert("ok".to_string(), Value::Bool(true));
    Value::Object(obj)
}

fn err_response(msg: &str) -> Value {
    json!({"ok": false, "error": msg})
}

fn body_state_name(body: &BodyState) -> &'static str {
    match body {
        BodyState::NotLoaded => "not_loaded",
        BodyState::Loading => "loading",
        BodyState::Loaded(_) => "loaded",
        BodyState::Failed(_) => "failed",
    }
}

fn serialize_row(index: usize, row: &Row) -> Value {
    let mut obj = json!({
        "index": index,
        "message_id": row.email.message_id,
        "email": row.email,
        "show": row.show,
        "show_body": row.show_body,
        "body": body_state_name(&row.body),
    });
    if let BodyState::Failed(ref e) = row.body {
        obj["body_error"] = json!(e);
    }
    obj
}

fn serialize_home(model: &HomeViewModel) -> Value {
    let state = model.state();
    json!({
        "page": state.page,
        "per_page": state.per_page,
        "total": state.total,
        "loading": state.loading,
        "error": state.error,
        "rows": state
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| serialize_row(i, row))
            .collect::<Vec<_>>(),
    })
}

fn serialize_response_list(list: &ResponseList) -> Value {
    serde_json::to_value(list).unwrap_or(Value::Null)
}

fn index_arg(input: &Value) -> Result<usize, Value> {
    input
        .get("index")
        .and_then(|v| v.as_u64())
        .map(|i| i as usize)
        .ok_or_else(|| err_response("missing 'index' field"))
}

fn u32_arg(name: &str, value: &Value) -> Result<u32, Value> {
    let n = value
        .as_u64()
        .ok_or_else(|| err_response(&format!("'{}' must be an integer", name)))?;
    u32::try_from(n).map_err(|_| err_response(&format!("'{}' is out of range: {}", name, n)))
}

fn total_arg(input: &Value, model: &HomeViewModel) -> Option<u64> {
    match input.get("total") {
        Some(v) => v.as_u64(),
        None => model.state().total,
    }
}

fn dispatch(state: &mut CliState, input: &Value) -> Value {
    let command = match input.get("command").and_then(|v| v.as_str()) {
        Some(c) => c,
        None => return err_response("missing 'command' field"),
    };

    let result = match command {
        "status" => cmd_status(state),
        "routes" => Ok(cmd_routes()),
        "navigate" => cmd_navigate(state, input),
        "list" => state.home().map(|m| ok_response(serialize_home(m))),
        "get_page" => cmd_get_page(state, input),
        "update_per_page" => cmd_update_per_page(state, input),
        "show_hide" => cmd_show_hide(state, input),
        "show_text" => cmd_show_text(state, input),
        "delete_email" => cmd_delete_email(state, input),
        "get_number" => cmd_get_number(state, input),
        "page_window" => cmd_page_window(state, input),
        "trust_src" => cmd_trust_src(state, input),
        "get_body" => cmd_get_body(state, input),
        "friends" => Ok(ok_response(json!({ "friends": produce::friends() }))),
        "produce" => cmd_produce(state, input),
        "metrics" => cmd_metrics(state),
        _ => Err(err_response(&format!("unknown command '{}'", command))),
    };

    result.unwrap_or_else(|err| err)
}

fn cmd_status(state: &mut CliState) -> Result<Value, Value> {
    let mut status = json!({
        "route": state.route.path(),
        "pending": state.screen.pending(),
    });
    if let Screen::Home(ref m) = state.screen {
        let s = m.state();
        status["page"] = json!(s.page);
        status["per_page"] = json!(s.per_page);
        status["total"] = json!(s.total);
        status["rows"] = json!(s.rows.len());
        status["error"] = json!(s.error);
    }
    Ok(ok_response(status))
}

fn cmd_routes() -> Value {
    let routes: Vec<Value> = router::routes()
        .iter()
        .map(|r| json!({"path": r.path, "template": r.template, "controller": r.controller}))
        .collect();
    ok_response(json!({ "routes": routes, "fallback": router::FALLBACK_PATH }))
}

fn cmd_navigate(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let path = input
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| err_response("missing 'path' field"))?;
    let resolution = router::resolve(path);
    state.open(resolution.route);
    state.settle().map_err(|e| err_response(&e))?;
    let entry = resolution.route.entry();
    Ok(ok_response(json!({
        "route": entry.path,
        "template": entry.template,
        "controller": entry.controller,
        "redirected": resolution.redirected,
    })))
}

fn cmd_get_page(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let page = input
        .get("page")
        .ok_or_else(|| err_response("missing 'page' field"))
        .and_then(|v| u32_arg("page", v))?;
    state.home()?.get_page(page);
    state.settle().map_err(|e| err_response(&e))?;
    Ok(ok_response(serialize_home(state.home()?)))
}

fn cmd_update_per_page(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let size = match input.get("size") {
        Some(Value::Null) => None,
        Some(v) => Some(u32_arg("size", v)?),
        None => return Err(err_response("missing 'size' field")),
    };
    state.home()?.update_per_page(size);
    state.settle().map_err(|e| err_response(&e))?;
    Ok(ok_response(serialize_home(state.home()?)))
}

fn cmd_show_hide(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let index = index_arg(input)?;
    let model = state.home()?;
    if !model.show_hide(index) {
        return Err(err_response(&format!("no row at index {}", index)));
    }
    Ok(ok_response(serialize_row(index, &model.state().rows[index])))
}

fn cmd_show_text(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let index = index_arg(input)?;
    if !state.home()?.show_text(index) {
        return Err(err_response(&format!("no row at index {}", index)));
    }
    state.settle().map_err(|e| err_response(&e))?;
    let model = state.home()?;
    Ok(ok_response(serialize_row(index, &model.state().rows[index])))
}

fn cmd_delete_email(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let index = index_arg(input)?;
    let removed = state
        .home()?
        .delete_email(index)
        .ok_or_else(|| err_response(&format!("no row at index {}", index)))?;
    state.settle().map_err(|e| err_response(&e))?;
    let model = state.home()?;
    Ok(ok_response(json!({
        "deleted": removed.message_id,
        "rows": model.state().rows.len(),
        "error": model.state().error,
    })))
}

fn cmd_get_number(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let model = state.home()?;
    let pages = model.get_number(total_arg(input, model));
    let count = pages.len();
    if count > MAX_LISTED_PAGES {
        return Err(err_response(&format!(
            "{} pages is too many to list; use page_window",
            count
        )));
    }
    Ok(ok_response(json!({ "count": count, "pages": pages.collect::<Vec<u32>>() })))
}

fn cmd_page_window(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let model = state.home()?;
    let pages = model.page_window(total_arg(input, model));
    Ok(ok_response(json!({ "pages": pages, "current": model.state().page })))
}

fn cmd_trust_src(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let index = index_arg(input)?;
    let model = state.home()?;
    let row = model
        .state()
        .rows
        .get(index)
        .ok_or_else(|| err_response(&format!("no row at index {}", index)))?;
    let locator = model
        .trust_src(&row.email)
        .map_err(|e| err_response(&e.to_string()))?;
    Ok(ok_response(json!({ "url": locator.as_str() })))
}

fn cmd_get_body(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let index = index_arg(input)?;
    let width = input.get("width").and_then(|v| v.as_u64()).unwrap_or(80) as usize;
    let model = state.home()?;
    let row = model
        .state()
        .rows
        .get(index)
        .ok_or_else(|| err_response(&format!("no row at index {}", index)))?;
    match &row.body {
        BodyState::Loaded(body) => {
            let lines = model
                .policy()
                .render(body, width)
                .map_err(|e| err_response(&e.to_string()))?;
            Ok(ok_response(json!({
                "message_id": row.email.message_id,
                "content_type": body.content_type,
                "lines": lines,
            })))
        }
        BodyState::Failed(e) => Err(err_response(e)),
        other => Err(err_response(&format!(
            "body is {}; use show_text first",
            body_state_name(other)
        ))),
    }
}

fn cmd_produce(state: &mut CliState, input: &Value) -> Result<Value, Value> {
    let index = input.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    let model = match &mut state.screen {
        Screen::Produce(m) => m,
        _ => {
            return Err(err_response(&format!(
                "command needs {} (current route is {})",
                Route::Produce,
                state.route
            )))
        }
    };
    if !model.produce(index) {
        return Err(err_response(&format!("no friend at index {}", index)));
    }
    state.settle().map_err(|e| err_response(&e))?;
    let Screen::Produce(ref model) = state.screen else {
        return Err(err_response("route changed while producing"));
    };
    match model.last() {
        Some(ProduceOutcome::Sent(list)) => Ok(ok_response(json!({
            "topic": model.topic(),
            "accepted": true,
            "result": serialize_response_list(list),
        }))),
        Some(ProduceOutcome::Rejected(list)) => Ok(ok_response(json!({
            "topic": model.topic(),
            "accepted": false,
            "result": serialize_response_list(list),
        }))),
        Some(ProduceOutcome::Failed(e)) => Err(err_response(e)),
        None => Err(err_response("no produce result")),
    }
}

fn cmd_metrics(state: &mut CliState) -> Result<Value, Value> {
    match &mut state.screen {
        Screen::Dashboard(m) => m.refresh(),
        _ => {
            return Err(err_response(&format!(
                "command needs {} (current route is {})",
                Route::Dashboard,
                state.route
            )))
        }
    }
    state.settle().map_err(|e| err_response(&e))?;
    let Screen::Dashboard(ref model) = state.screen else {
        return Err(err_response("route changed while loading metrics"));
    };
    let metrics = match model.metrics() {
        Some(Ok(v)) => v.clone(),
        Some(Err(e)) => return Err(err_response(e)),
        None => Value::Null,
    };
    Ok(ok_response(json!({
        "total": model.total(),
        "pages": model.pages(),
        "per_page": model.per_page(),
        "metrics": metrics,
        "error": model.error(),
    })))
}

pub fn run_cli(config: Config, resource: Box<dyn EmailResource>, start_path: &str) {
    let (cmd_tx, resp_rx) = backend::spawn(resource);
    let resolution = router::resolve(start_path);
    let screen = build_screen(resolution.route, &config, &cmd_tx);
    let mut state = CliState {
        config,
        cmd_tx,
        resp_rx,
        route: resolution.route,
        screen,
    };
    if let Err(e) = state.settle() {
        log::error!("Initial load failed: {}", e);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(input) => dispatch(&mut state, &input),
            Err(e) => err_response(&format!("JSON parse error: {}", e)),
        };
        let _ = serde_json::to_writer(&mut stdout, &response);
        let _ = stdout.write_all(b"\n");
        let _ = stdout.flush();
    }

    let _ = state.cmd_tx.send(BackendCommand::Shutdown);
}

pub fn print_help_cli() {
    print!(
        r#"mailpage --cli: JSON-over-stdin/stdout mode
===========================================

Protocol: Newline-Delimited JSON (NDJSON)
- Send one JSON object per line to stdin
- Receive one JSON response per line from stdout
- Responses have {{"ok": true, ...}} on success or {{"ok": false, "error": "..."}} on failure
- Commands that talk to the server reply once every request has been answered

Routing
-------
routes:    {{"command": "routes"}}
navigate:  {{"command": "navigate", "path": "/dashboard"}}
   < {{"ok": true, "route": "/dashboard", "template": "dashboard", "controller": "DashboardController", "redirected": false}}
   Unknown paths redirect to /home.
status:    {{"command": "status"}}

Home (/home)
------------
list:            {{"command": "list"}}
get_page:        {{"command": "get_page", "page": 2}}
update_per_page: {{"command": "update_per_page", "size": 25}}   (resets to page 1; null clears the size)
show_hide:       {{"command": "show_hide", "index": 0}}
show_text:       {{"command": "show_text", "index": 0}}   (fetches the body the first time)
get_body:        {{"command": "get_body", "index": 0, "width": 80}}
trust_src:       {{"command": "trust_src", "index": 0}}
delete_email:    {{"command": "delete_email", "index": 0}}
get_number:      {{"command": "get_number", "total": 250}}   (total defaults to the server count; at most 10000 pages)
page_window:     {{"command": "page_window"}}

Producer (/produce)
-------------------
friends:  {{"command": "friends"}}
produce:  {{"command": "produce", "index": 0}}

Dashboard (/dashboard)
----------------------
metrics:  {{"command": "metrics"}}
"#
    );
}
