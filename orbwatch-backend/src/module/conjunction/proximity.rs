///! Pairwise closest-approach search over sampled tracks
///!
///! Every unordered pair is compared index by index (O(N² · T)). Above
///! `MAX_BRUTE_FORCE_OBJECTS` tracks the run still completes, it only logs
///! that a spatial index would be the better tool.
use orbwatch_common::{ProximityEvent, Track};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Object count beyond which the all-pairs scan is considered out of scale
pub const MAX_BRUTE_FORCE_OBJECTS: usize = 500;

/// Smallest separation for one pair; ties keep the earliest index.
/// Non-finite separations are ignored.
fn closest_approach(a: &Track, b: &Track) -> Option<(f64, usize)> {
    let len = a.len().min(b.len());
    let mut best: Option<(f64, usize)> = None;
    for i in 0..len {
        let d = a.samples[i].distance_km(&b.samples[i]);
        if !d.is_finite() {
            continue;
        }
        if best.is_none_or(|(min, _)| d < min) {
            best = Some((d, i));
        }
    }
    best
}

/// One event per pair whose minimum separation is strictly below
/// `threshold_km`. Pairs come out in ascending `(object_a, object_b)` order.
///
/// Tracks shorter than two samples are skipped.
pub fn detect(tracks: &BTreeMap<u32, Track>, threshold_km: f64) -> Vec<ProximityEvent> {
    let usable: Vec<&Track> = tracks.values().filter(|t| t.len() >= 2).collect();
    if usable.len() < 2 {
        tracing::debug!("Fewer than two usable tracks; nothing to compare");
        return Vec::new();
    }
    if usable.len() > MAX_BRUTE_FORCE_OBJECTS {
        tracing::warn!(
            "{} tracks exceeds the all-pairs limit of {}; this run will be slow",
            usable.len(),
            MAX_BRUTE_FORCE_OBJECTS
        );
    }

    let pool: &[&Track] = &usable;
    let events: Vec<ProximityEvent> = (0..pool.len())
        .into_par_iter()
        .flat_map_iter(move |i| {
            let a = pool[i];
            pool[i + 1..].iter().filter_map(move |b| {
                let (min_distance_km, time_index) = closest_approach(a, b)?;
                (min_distance_km < threshold_km).then(|| ProximityEvent {
                    object_a: a.object_id,
                    object_b: b.object_id,
                    min_distance_km,
                    time_index,
                    timestamp: a.samples[time_index].at,
                })
            })
        })
        .collect();

    tracing::info!(
        "Compared {} pairs over {} tracks: {} below {:.2} km",
        usable.len() * (usable.len() - 1) / 2,
        usable.len(),
        events.len(),
        threshold_km
    );
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use orbwatch_common::PositionSample;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    fn track(id: u32, points: &[[f64; 3]]) -> Track {
        Track {
            object_id: id,
            samples: points
                .iter()
                .enumerate()
                .map(|(i, p)| PositionSample::new(t0() + Duration::seconds(30 * i as i64), *p))
                .collect(),
        }
    }

    fn tracks(list: Vec<Track>) -> BTreeMap<u32, Track> {
        list.into_iter().map(|t| (t.object_id, t)).collect()
    }

    #[test]
    fn test_single_close_approach() {
        let set = tracks(vec![
            track(1, &[[0.0; 3]; 3]),
            track(2, &[[100.0, 0.0, 0.0], [4.0, 0.0, 0.0], [50.0, 0.0, 0.0]]),
        ]);
        let events = detect(&set, 10.0);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!((event.object_a, event.object_b), (1, 2));
        assert!((event.min_distance_km - 4.0).abs() < 1e-12);
        assert_eq!(event.time_index, 1);
        assert_eq!(event.timestamp, t0() + Duration::seconds(30));
    }

    #[test]
    fn test_tie_reports_earliest_index() {
        let set = tracks(vec![
            track(1, &[[0.0; 3]; 4]),
            track(2, &[[9.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]]),
        ]);
        let events = detect(&set, 10.0);
        assert_eq!(events[0].time_index, 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        let set = tracks(vec![track(1, &[[0.0; 3]; 2]), track(2, &[[10.0, 0.0, 0.0]; 2])]);
        assert!(detect(&set, 10.0).is_empty());
        assert_eq!(detect(&set, 10.0 + 1e-9).len(), 1);
    }

    #[test]
    fn test_non_finite_sample_does_not_hide_approach() {
        let set = tracks(vec![
            track(1, &[[f64::NAN, 0.0, 0.0], [0.0; 3]]),
            track(2, &[[0.0; 3], [1.0, 0.0, 0.0]]),
        ]);
        let events = detect(&set, 10.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time_index, 1);
        assert!((events[0].min_distance_km - 1.0).abs() < 1e-12);

        let blind = tracks(vec![track(1, &[[f64::NAN, 0.0, 0.0]; 2]), track(2, &[[0.0; 3]; 2])]);
        assert!(detect(&blind, 10.0).is_empty());
    }

    #[test]
    fn test_too_few_tracks() {
        assert!(detect(&BTreeMap::new(), 10.0).is_empty());
        assert!(detect(&tracks(vec![track(1, &[[0.0; 3]; 5])]), 10.0).is_empty());
    }

    #[test]
    fn test_short_tracks_skipped() {
        let set = tracks(vec![
            track(1, &[[0.0; 3]; 3]),
            track(2, &[[1.0, 0.0, 0.0]]),
            track(3, &[[2.0, 0.0, 0.0]; 3]),
        ]);
        let events = detect(&set, 10.0);
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].object_a, events[0].object_b), (1, 3));
    }

    #[test]
    fn test_output_order_is_deterministic() {
        let list: Vec<Track> = (1..=40).rev().map(|id| track(id, &[[id as f64 * 0.1, 0.0, 0.0]; 2])).collect();
        let set = tracks(list);
        let first = detect(&set, 100.0);
        assert_eq!(first.len(), 40 * 39 / 2);
        for pair in first.windows(2) {
            assert!((pair[0].object_a, pair[0].object_b) < (pair[1].object_a, pair[1].object_b));
        }
        assert_eq!(first, detect(&set, 100.0));
    }
}
