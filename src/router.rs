use std::fmt;

/// Client-side screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Produce,
    Dashboard,
}

pub struct RouteEntry {
    pub path: &'static str,
    pub route: Route,
    pub template: &'static str,
    pub controller: &'static str,
}

const ROUTES: [RouteEntry; 3] = [
    RouteEntry {
        path: "/home",
        route: Route::Home,
        template: "home",
        controller: "HomeController",
    },
    RouteEntry {
        path: "/produce",
        route: Route::Produce,
        template: "produce",
        controller: "ProducerController",
    },
    RouteEntry {
        path: "/dashboard",
        route: Route::Dashboard,
        template: "dashboard",
        controller: "DashboardController",
    },
];

/// Where unmatched paths are redirected.
pub const FALLBACK_PATH: &str = "/home";

/// Outcome of resolving a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub route: Route,
    pub redirected: bool,
}

impl Route {
    pub fn entry(self) -> &'static RouteEntry {
        match self {
            Route::Home => &ROUTES[0],
            Route::Produce => &ROUTES[1],
            Route::Dashboard => &ROUTES[2],
        }
    }

    pub fn path(self) -> &'static str {
        self.entry().path
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

pub fn routes() -> &'static [RouteEntry] {
    &ROUTES
}

/// Exact-match lookup; anything else lands on the fallback.
pub fn resolve(path: &str) -> Resolution {
    match ROUTES.iter().find(|entry| entry.path == path) {
        Some(entry) => Resolution {
            route: entry.route,
            redirected: false,
        },
        None => {
            log::debug!("No route for '{}', redirecting to {}", path, FALLBACK_PATH);
            Resolution {
                route: resolve_fallback(),
                redirected: true,
            }
        }
    }
}

fn resolve_fallback() -> Route {
    ROUTES
        .iter()
        .find(|entry| entry.path == FALLBACK_PATH)
        .map(|entry| entry.route)
        .unwrap_or(Route::Home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_paths_resolve() {
        assert_eq!(
            resolve("/home"),
            Resolution {
                route: Route::Home,
                redirected: false
            }
        );
        assert_eq!(resolve("/produce").route, Route::Produce);
        assert_eq!(resolve("/dashboard").route, Route::Dashboard);
    }

    #[test]
    fn test_unknown_paths_redirect_home() {
        for path in ["/", "", "/inbox", "/home/", "/HOME", " /home"] {
            let resolution = resolve(path);
            assert_eq!(resolution.route, Route::Home, "path {:?}", path);
            assert!(resolution.redirected, "path {:?}", path);
        }
    }

    #[test]
    fn test_route_table() {
        let entry = Route::Produce.entry();
        assert_eq!(entry.template, "produce");
        assert_eq!(entry.controller, "ProducerController");
        assert_eq!(Route::Dashboard.entry().controller, "DashboardController");
        assert_eq!(routes().len(), 3);
        assert_eq!(Route::Home.to_string(), "/home");
    }
}
