///! Position tracks sampled on the shared time grid
///!
///! An object either gets a sample at every grid point or no track at all.
use chrono::{DateTime, Utc};
use orbwatch_common::{ObjectType, PositionSample, Track, TrackedObject};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::grid::TimeGrid;
use crate::error::PropagationError;

/// External ephemeris seam: one object, one instant
pub trait PositionProvider: Sync {
    fn position_at(&self, object: &TrackedObject, at: DateTime<Utc>) -> Result<PositionSample, PropagationError>;
}

struct Propagator {
    elements: sgp4::Elements,
    constants: sgp4::Constants,
}

impl Propagator {
    fn from_object(object: &TrackedObject) -> Result<Self, String> {
        let elements = sgp4::Elements::from_tle(
            Some(object.name.clone()),
            object.line1.as_bytes(),
            object.line2.as_bytes(),
        )
        .map_err(|e| format!("element parse: {}", e))?;
        let constants = sgp4::Constants::from_elements(&elements).map_err(|e| format!("element constants: {}", e))?;
        Ok(Self { elements, constants })
    }

    fn propagate(&self, at: DateTime<Utc>) -> Result<[f64; 3], String> {
        let epoch = self.elements.datetime.and_utc();
        let minutes = (at - epoch).num_milliseconds() as f64 / 60_000.0;
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| e.to_string())?;
        if prediction.position.iter().any(|v| !v.is_finite()) {
            return Err("non-finite position".to_string());
        }
        Ok(prediction.position)
    }
}

/// SGP4 propagation with element sets prepared once per object
pub struct Sgp4Provider {
    prepared: HashMap<u32, Result<Propagator, String>>,
}

impl Sgp4Provider {
    pub fn new(objects: &[TrackedObject]) -> Self {
        let prepared = objects
            .iter()
            .map(|o| (o.object_id, Propagator::from_object(o)))
            .collect();
        Self { prepared }
    }
}

impl PositionProvider for Sgp4Provider {
    fn position_at(&self, object: &TrackedObject, at: DateTime<Utc>) -> Result<PositionSample, PropagationError> {
        let position = match self.prepared.get(&object.object_id) {
            Some(Ok(propagator)) => propagator.propagate(at),
            Some(Err(reason)) => Err(reason.clone()),
            None => Propagator::from_object(object).and_then(|p| p.propagate(at)),
        }
        .map_err(|reason| PropagationError::new(object.object_id, reason))?;

        Ok(PositionSample::new(at, position))
    }
}

/// Which annotated objects take part in a run
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    /// `None` admits every type
    pub include_types: Option<HashSet<ObjectType>>,
    /// Applies only to annotated objects
    pub min_confidence: f64,
}

impl TrackFilter {
    pub fn admits(&self, object: &TrackedObject) -> bool {
        if let Some(types) = &self.include_types {
            if !types.contains(&object.effective_type()) {
                return false;
            }
        }
        object.confidence().is_none_or(|c| c >= self.min_confidence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackBuild {
    pub tracks: BTreeMap<u32, Track>,
    /// Excluded by the type/confidence filter
    pub filtered: usize,
    /// Excluded because some grid point failed to propagate
    pub dropped: usize,
}

pub struct TrackBuilder<'a, P: PositionProvider + ?Sized> {
    grid: &'a TimeGrid,
    provider: &'a P,
    filter: TrackFilter,
}

impl<'a, P: PositionProvider + ?Sized> TrackBuilder<'a, P> {
    pub fn new(grid: &'a TimeGrid, provider: &'a P) -> Self {
        Self {
            grid,
            provider,
            filter: TrackFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: TrackFilter) -> Self {
        self.filter = filter;
        self
    }

    fn sample(&self, object: &TrackedObject) -> Result<Track, PropagationError> {
        let samples = self
            .grid
            .timestamps()
            .map(|at| self.provider.position_at(object, at))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Track {
            object_id: object.object_id,
            samples,
        })
    }

    /// Sample every admitted object over the grid. Objects are sampled in
    /// parallel; the result does not depend on scheduling.
    pub fn build(&self, objects: &[TrackedObject]) -> TrackBuild {
        let admitted: Vec<&TrackedObject> = objects.iter().filter(|o| self.filter.admits(o)).collect();
        let mut build = TrackBuild {
            filtered: objects.len() - admitted.len(),
            ..Default::default()
        };

        let sampled: Vec<Result<Track, PropagationError>> = admitted.par_iter().map(|o| self.sample(o)).collect();

        for (object, result) in admitted.iter().zip(sampled) {
            match result {
                Ok(track) => {
                    build.tracks.entry(object.object_id).or_insert(track);
                }
                Err(e) => {
                    tracing::warn!("Dropping {} from this run: {}", object.name, e);
                    build.dropped += 1;
                }
            }
        }

        tracing::info!(
            "Built {} tracks of {} points ({} filtered, {} dropped)",
            build.tracks.len(),
            self.grid.len(),
            build.filtered,
            build.dropped
        );
        build
    }
}
