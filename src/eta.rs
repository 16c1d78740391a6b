//! ETA Engine (EE): converts a vehicle's matched arc offset, the matched arc
//! offsets of a route's stops, and a smoothed speed into per-stop remaining
//! minutes.

/// A stop's identity plus its arc-length offset along the route polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct StopOffset {
    pub stop_id: String,
    pub name: String,
    pub offset_km: f64,
}

/// A computed ETA for one stop, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct StopEta {
    pub stop_id: String,
    pub name: String,
    pub eta_minutes: i64,
}

/// Computes `etaMinutes` for every stop, preserving input order (§4.4).
///
/// `avg_speed_kmh` is floored at `min_speed_floor_kmh` before use, so a
/// stationary vehicle (`avgSpeed == 0`) still yields finite ETAs instead of
/// dividing by zero.
pub fn compute_etas(
    vehicle_offset_km: f64,
    stops: &[StopOffset],
    avg_speed_kmh: f64,
    min_speed_floor_kmh: f64,
) -> Vec<StopEta> {
    let effective_speed = avg_speed_kmh.max(min_speed_floor_kmh);

    stops
        .iter()
        .map(|stop| {
            let remaining_km = (stop.offset_km - vehicle_offset_km).max(0.0);
            let eta_minutes = (remaining_km / effective_speed * 60.0).round() as i64;
            StopEta {
                stop_id: stop.stop_id.clone(),
                name: stop.name.clone(),
                eta_minutes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops() -> Vec<StopOffset> {
        vec![
            StopOffset {
                stop_id: "S1".to_string(),
                name: "Connaught Place".to_string(),
                offset_km: 0.0,
            },
            StopOffset {
                stop_id: "S2".to_string(),
                name: "Terminus".to_string(),
                offset_km: 7.1,
            },
        ]
    }

    #[test]
    fn passed_stop_has_zero_eta() {
        let etas = compute_etas(3.5, &stops(), 40.0, 1.0);
        assert_eq!(etas[0].eta_minutes, 0);
    }

    #[test]
    fn matches_scenario_s1_second_stop() {
        let etas = compute_etas(3.5, &stops(), 40.0, 1.0);
        // round((7.1 - 3.5) / 40 * 60) = round(5.4) = 5
        assert_eq!(etas[1].eta_minutes, 5);
    }

    #[test]
    fn stationary_vehicle_uses_speed_floor() {
        let etas = compute_etas(0.0, &stops(), 0.0, 1.0);
        // remaining 7.1km at 1 km/h floor = 426 minutes, finite
        assert!(etas[1].eta_minutes.is_positive());
        assert!(etas.iter().all(|e| e.eta_minutes >= 0));
    }

    #[test]
    fn vehicle_past_all_stops_has_all_zero_etas() {
        let etas = compute_etas(100.0, &stops(), 40.0, 1.0);
        assert!(etas.iter().all(|e| e.eta_minutes == 0));
    }

    #[test]
    fn eta_is_monotonic_with_offset() {
        // offset(Si) <= offset(Sj) implies eta(Si) <= eta(Sj) for fixed vehicle offset.
        let etas = compute_etas(1.0, &stops(), 30.0, 1.0);
        assert!(etas[0].eta_minutes <= etas[1].eta_minutes);
    }

    #[test]
    fn etas_are_never_negative() {
        let etas = compute_etas(-5.0, &stops(), 0.0, 1.0);
        assert!(etas.iter().all(|e| e.eta_minutes >= 0));
    }
}
