use orbwatch_common::{ProximityEvent, TrackedObject};

/// `NAME [Type NN%]` when annotated, plain `NAME` otherwise
pub fn decorated_name(object: &TrackedObject) -> String {
    match &object.annotation {
        Some(a) => format!(
            "{} [{} {:.0}%]",
            object.name,
            a.predicted_type,
            a.predicted_confidence * 100.0
        ),
        None => object.name.clone(),
    }
}

/// One human-readable line per event; time of day is UTC.
pub fn format_alert(event: &ProximityEvent, a: &TrackedObject, b: &TrackedObject) -> String {
    format!(
        "Close approach: {} <-> {}: {:.2} km at {}",
        decorated_name(a),
        decorated_name(b),
        event.min_distance_km,
        event.timestamp.format("%H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use orbwatch_common::{Annotation, ObjectType};

    fn event() -> ProximityEvent {
        ProximityEvent {
            object_a: 25544,
            object_b: 48274,
            min_distance_km: 4.0,
            time_index: 1,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 16, 9, 5, 7).unwrap(),
        }
    }

    #[test]
    fn test_plain_names() {
        let a = TrackedObject::new(25544, "ISS (ZARYA)", "", "");
        let b = TrackedObject::new(48274, "CSS (TIANHE)", "", "");
        assert_eq!(
            format_alert(&event(), &a, &b),
            "Close approach: ISS (ZARYA) <-> CSS (TIANHE): 4.00 km at 09:05:07"
        );
    }

    #[test]
    fn test_decorated_names() {
        let mut a = TrackedObject::new(25544, "ISS (ZARYA)", "", "");
        a.annotation = Some(Annotation::new(ObjectType::Payload, 0.874, "white"));
        let mut b = TrackedObject::new(48274, "FENGYUN 1C DEB", "", "");
        b.annotation = Some(Annotation::new(ObjectType::RocketBody, 0.5, "gold"));

        let mut e = event();
        e.min_distance_km = 9.876;
        let line = format_alert(&e, &a, &b);
        assert_eq!(
            line,
            "Close approach: ISS (ZARYA) [Payload 87%] <-> FENGYUN 1C DEB [Rocket Body 50%]: 9.88 km at 09:05:07"
        );
        assert!(!line.contains("None"));
    }
}
