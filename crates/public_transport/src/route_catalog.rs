use std::collections::HashMap;
use std::sync::Arc;

use model::route::Route;

/// Routes and the stop→lines index, loaded once at process start and shared
/// read-only across every feeder task (§4.5, §5: "load route & bus catalog
/// once"). Cloning is cheap: it's an `Arc` around the immutable data.
#[derive(Clone)]
pub struct RouteCatalog {
    inner: Arc<Inner>,
}

struct Inner {
    routes_by_line: HashMap<String, Route>,
    lines_by_stop: HashMap<String, Vec<String>>,
}

impl RouteCatalog {
    pub fn new(routes: Vec<Route>) -> Self {
        let lines_by_stop = Self::index_lines_by_stop(&routes);
        let routes_by_line = routes
            .into_iter()
            .map(|route| (route.line_id.clone(), route))
            .collect();
        Self {
            inner: Arc::new(Inner {
                routes_by_line,
                lines_by_stop,
            }),
        }
    }

    fn index_lines_by_stop(routes: &[Route]) -> HashMap<String, Vec<String>> {
        let mut index: HashMap<String, Vec<String>> = HashMap::new();
        for route in routes {
            for stop in &route.stops {
                index
                    .entry(stop.stop_id.clone())
                    .or_default()
                    .push(route.line_id.clone());
            }
        }
        index
    }

    pub fn route(&self, line_id: &str) -> Option<&Route> {
        self.inner.routes_by_line.get(line_id)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.inner.routes_by_line.values()
    }

    /// Lines serving `stop_id`, for the `PeopleCount.line_ids` field.
    pub fn lines_serving(&self, stop_id: &str) -> &[String] {
        self.inner
            .lines_by_stop
            .get(stop_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::stop::Stop;

    fn route(line_id: &str, stop_ids: &[&str]) -> Route {
        let stops = stop_ids
            .iter()
            .enumerate()
            .map(|(i, id)| Stop {
                stop_id: id.to_string(),
                name: id.to_string(),
                latitude: 40.0 + i as f64 * 0.01,
                longitude: -3.0,
                is_terminal: i == 0 || i == stop_ids.len() - 1,
                base_arrival_rate: 1.0,
            })
            .collect();
        Route::new(line_id.to_owned(), line_id.to_owned(), stops)
    }

    #[test]
    fn looks_up_route_by_line() {
        let catalog = RouteCatalog::new(vec![route("L1", &["A", "B"])]);
        assert!(catalog.route("L1").is_some());
        assert!(catalog.route("L9").is_none());
    }

    #[test]
    fn indexes_shared_stop_across_lines() {
        let catalog = RouteCatalog::new(vec![
            route("L1", &["A", "B"]),
            route("L2", &["B", "C"]),
        ]);
        let mut lines = catalog.lines_serving("B").to_vec();
        lines.sort();
        assert_eq!(lines, vec!["L1".to_owned(), "L2".to_owned()]);
        assert!(catalog.lines_serving("Z").is_empty());
    }
}
