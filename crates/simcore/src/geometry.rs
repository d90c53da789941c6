//! Route geometry and position model (C1): stops, segment distances,
//! position↔coordinate mapping, next-stop/distance, direction-aware
//! traversal. Pure functions over `model::Route` — no I/O.

use model::bus::Direction;
use model::route::Route;
use model::stop::Stop;

/// `p' = min(1.0, p + d_meters / total_distance(route))`.
///
/// Distance is always additive in `p`; `direction` changes the *meaning* of
/// `p`, not this arithmetic.
pub fn advance(route: &Route, p: f64, distance_m: f64, _direction: Direction) -> f64 {
    let total = route.total_distance();
    if total <= 0.0 {
        return p;
    }
    (p + distance_m / total).min(1.0)
}

/// Latitude/longitude for a position on the route, linearly interpolated
/// within the segment it falls in. Endpoints return exact stop coordinates.
pub fn coordinates(route: &Route, p: f64, direction: Direction) -> (f64, f64) {
    let oriented_p = match direction {
        Direction::Outbound => p,
        Direction::Inbound => 1.0 - p,
    };

    let stops = &route.stops;
    if oriented_p <= 0.0 {
        let first = &stops[0];
        return (first.latitude, first.longitude);
    }
    if oriented_p >= 1.0 {
        let last = &stops[stops.len() - 1];
        return (last.latitude, last.longitude);
    }

    let total = route.total_distance();
    let target = oriented_p * total;
    let mut accumulated = 0.0;
    for (i, segment) in route.segment_distances().iter().enumerate() {
        if accumulated + segment >= target {
            let into_segment = target - accumulated;
            let fraction = if *segment > 0.0 {
                into_segment / segment
            } else {
                0.0
            };
            let a = &stops[i];
            let b = &stops[i + 1];
            let lat = a.latitude + (b.latitude - a.latitude) * fraction;
            let lon = a.longitude + (b.longitude - a.longitude) * fraction;
            return (lat, lon);
        }
        accumulated += segment;
    }

    let last = &stops[stops.len() - 1];
    (last.latitude, last.longitude)
}

/// Stops whose cumulative distance *along the direction of travel* satisfies
/// `p_start·total < d ≤ p_end·total`, returned in the order the bus would
/// reach them. `p_start`/`p_end` are raw route-positions (the same additive
/// scale `advance` uses), not pre-oriented — for inbound travel, a stop's
/// distance from the direction-start is `total - distance_from_first_stop`,
/// mirroring the `oriented_p` flip in `coordinates`.
pub fn stops_between(route: &Route, p_start: f64, p_end: f64, direction: Direction) -> Vec<&Stop> {
    let total = route.total_distance();
    let start_distance = p_start * total;
    let end_distance = p_end * total;

    let mut accumulated = 0.0;
    let mut with_distance_from_first = Vec::with_capacity(route.stops.len());
    let segments = route.segment_distances();
    for (i, stop) in route.stops.iter().enumerate() {
        with_distance_from_first.push((stop, accumulated));
        if let Some(segment) = segments.get(i) {
            accumulated += segment;
        }
    }

    match direction {
        Direction::Outbound => with_distance_from_first
            .into_iter()
            .filter(|(_, distance)| start_distance < *distance && *distance <= end_distance)
            .map(|(stop, _)| stop)
            .collect(),
        Direction::Inbound => with_distance_from_first
            .into_iter()
            .rev()
            .filter_map(|(stop, distance_from_first)| {
                let distance_from_direction_start = total - distance_from_first;
                (start_distance < distance_from_direction_start
                    && distance_from_direction_start <= end_distance)
                    .then_some(stop)
            })
            .collect(),
    }
}

/// First stop whose cumulative distance strictly exceeds `p·total`, walking
/// forward in direction 0, backward in direction 1.
pub fn next_stop(route: &Route, p: f64, direction: Direction) -> Option<&Stop> {
    let total = route.total_distance();
    let current_distance = p * total;
    let segments = route.segment_distances();

    match direction {
        Direction::Outbound => {
            let mut accumulated = 0.0;
            for (i, stop) in route.stops.iter().enumerate() {
                if accumulated > current_distance {
                    return Some(stop);
                }
                if let Some(segment) = segments.get(i) {
                    accumulated += segment;
                }
            }
            None
        }
        Direction::Inbound => {
            let mut accumulated = 0.0;
            for i in (0..route.stops.len()).rev() {
                if accumulated > current_distance {
                    return Some(&route.stops[i]);
                }
                if i > 0 {
                    accumulated += segments[i - 1];
                }
            }
            None
        }
    }
}

/// Positive forward distance to `stop` in the current direction; `None` if
/// the stop is behind the current position or not on the route.
pub fn distance_to_stop(
    route: &Route,
    p: f64,
    stop_id: &str,
    direction: Direction,
) -> Option<f64> {
    let stop_index = route.stops.iter().position(|s| s.stop_id == stop_id)?;
    let total = route.total_distance();
    let current_distance = p * total;
    let segments = route.segment_distances();

    let stop_distance = match direction {
        Direction::Outbound => segments[..stop_index].iter().sum::<f64>(),
        Direction::Inbound => segments[stop_index..].iter().sum::<f64>(),
    };

    if stop_distance <= current_distance {
        return None;
    }
    Some(stop_distance - current_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::stop::Stop;

    fn three_stop_route() -> Route {
        Route::new(
            "L1".to_owned(),
            "Line 1".to_owned(),
            vec![
                Stop {
                    stop_id: "A".to_owned(),
                    name: "A".to_owned(),
                    latitude: 40.00,
                    longitude: -3.00,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
                Stop {
                    stop_id: "MID".to_owned(),
                    name: "Middle".to_owned(),
                    latitude: 40.05,
                    longitude: -3.05,
                    is_terminal: false,
                    base_arrival_rate: 1.0,
                },
                Stop {
                    stop_id: "B".to_owned(),
                    name: "B".to_owned(),
                    latitude: 40.10,
                    longitude: -3.10,
                    is_terminal: true,
                    base_arrival_rate: 1.0,
                },
            ],
        )
    }

    #[test]
    fn advance_is_capped_at_one() {
        let route = three_stop_route();
        let p = advance(&route, 0.99, route.total_distance() * 10.0, Direction::Outbound);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn advance_is_additive() {
        let route = three_stop_route();
        let total = route.total_distance();
        let combined = advance(&route, 0.0, total * 0.3, Direction::Outbound);
        let combined = advance(&route, combined, total * 0.2, Direction::Outbound);
        let direct = advance(&route, 0.0, total * 0.5, Direction::Outbound);
        assert!((combined - direct).abs() < 1e-9);
    }

    #[test]
    fn coordinates_at_endpoints_match_stops() {
        let route = three_stop_route();
        let (lat, lon) = coordinates(&route, 0.0, Direction::Outbound);
        assert_eq!((lat, lon), (40.00, -3.00));
        let (lat, lon) = coordinates(&route, 1.0, Direction::Outbound);
        assert_eq!((lat, lon), (40.10, -3.10));
    }

    #[test]
    fn inbound_inverse_mapping() {
        let route = three_stop_route();
        let outbound_zero = coordinates(&route, 0.0, Direction::Outbound);
        let inbound_one = coordinates(&route, 1.0, Direction::Inbound);
        assert_eq!(outbound_zero, inbound_one);
    }

    #[test]
    fn stops_between_finds_middle_stop() {
        let route = three_stop_route();
        let total = route.total_distance();
        let seg0 = route.segment_distances()[0];
        let p_start = (seg0 * 0.8) / total;
        let p_end = (seg0 * 1.2) / total;
        let passed = stops_between(&route, p_start, p_end, Direction::Outbound);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].stop_id, "MID");
    }

    #[test]
    fn stops_between_finds_middle_stop_inbound() {
        let route = three_stop_route();
        let total = route.total_distance();
        let seg0 = route.segment_distances()[0];
        // Inbound travel starts at B (distance_from_first = total) and moves
        // back towards A, so MID (at distance seg0 from A) is crossed once
        // the traveled distance from B exceeds `total - seg0`.
        let p_start = (total - seg0 * 1.2) / total;
        let p_end = (total - seg0 * 0.8) / total;
        let passed = stops_between(&route, p_start, p_end, Direction::Inbound);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].stop_id, "MID");
    }

    #[test]
    fn next_stop_outbound_is_first_ahead() {
        let route = three_stop_route();
        let next = next_stop(&route, 0.0, Direction::Outbound).unwrap();
        assert_eq!(next.stop_id, "MID");
    }

    #[test]
    fn next_stop_none_past_last_stop() {
        let route = three_stop_route();
        assert!(next_stop(&route, 1.0, Direction::Outbound).is_none());
    }

    #[test]
    fn distance_to_stop_behind_is_none() {
        let route = three_stop_route();
        assert!(distance_to_stop(&route, 0.9, "A", Direction::Outbound).is_none());
    }

    #[test]
    fn distance_to_stop_ahead_is_positive() {
        let route = three_stop_route();
        let distance = distance_to_stop(&route, 0.0, "B", Direction::Outbound).unwrap();
        assert!((distance - route.total_distance()).abs() < 1e-6);
    }
}
