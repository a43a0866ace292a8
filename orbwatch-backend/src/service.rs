///! Detection pipeline: catalog fetch, annotation, tracks, proximity, alerts
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use orbwatch_common::{ElementSetRecord, ProximityEvent, TrackedObject};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, DetectConfig};
use crate::error::CatalogError;
use crate::module::catalog::{
    CacheEntry, CachePolicy, FeedSource, FetchOutcome, FreshnessCache, HttpFeedSource, NamedObjectSource, parse_records,
};
use crate::module::conjunction::{
    CentroidClassifier, ClassificationSummary, Classifier, DisplayPalette, GridStep, PositionProvider, TimeGrid,
    TrackBuilder, TrackFilter, annotate, detect, format_alert,
};

/// Cache group holding the name-resolved objects
pub const FAMOUS_GROUP: &str = "famous";

/// Minutes from config or the command line as a `Duration`.
pub fn minutes_to_duration(minutes: u64) -> Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .with_context(|| format!("{} minutes is out of range", minutes))
}

/// Parameters of one detection run
#[derive(Debug, Clone)]
pub struct DetectRequest {
    pub objects: Vec<TrackedObject>,
    pub start: DateTime<Utc>,
    pub threshold_km: f64,
    pub window: Duration,
    pub step: GridStep,
    pub filter: TrackFilter,
    pub max_objects: usize,
}

impl DetectRequest {
    pub fn new(objects: Vec<TrackedObject>, start: DateTime<Utc>, defaults: &DetectConfig) -> Result<Self> {
        Ok(Self {
            objects,
            start,
            threshold_km: defaults.threshold_km,
            window: minutes_to_duration(defaults.window_minutes)?,
            step: GridStep::from_seconds(defaults.step_seconds as f64),
            filter: TrackFilter::default(),
            max_objects: defaults.max_objects,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectReport {
    pub run_id: String,
    pub events: Vec<ProximityEvent>,
    pub alerts: Vec<String>,
    /// Objects that entered the run after the cap
    pub considered: usize,
    pub filtered: usize,
    pub dropped: usize,
    pub classification: ClassificationSummary,
}

pub struct OrbwatchService {
    elements: FreshnessCache,
    feeds: FreshnessCache,
    famous: Option<FreshnessCache>,
    classifier: Option<Box<dyn Classifier>>,
    palette: DisplayPalette,
    defaults: DetectConfig,
    default_group: String,
}

impl OrbwatchService {
    pub fn new(
        elements: FreshnessCache,
        feeds: FreshnessCache,
        classifier: Option<Box<dyn Classifier>>,
        palette: DisplayPalette,
        defaults: DetectConfig,
        default_group: impl Into<String>,
    ) -> Self {
        Self {
            elements,
            feeds,
            famous: None,
            classifier,
            palette,
            defaults,
            default_group: default_group.into(),
        }
    }

    /// Objects from `famous` are merged ahead of every group catalog.
    pub fn with_famous(mut self, famous: FreshnessCache) -> Self {
        self.famous = Some(famous);
        self
    }

    /// Wire HTTP sources, caches, palette and the optional classifier from config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = &config.source;
        let timeout = source.timeout_seconds;
        let element_max_age = minutes_to_duration(config.cache.element_max_age_minutes)?;
        let feed_max_age = minutes_to_duration(config.cache.feed_max_age_minutes)?;

        let element_source: Arc<dyn FeedSource> =
            Arc::new(HttpFeedSource::new(&source.element_url, &source.api_key, timeout)?);
        let feed_source: Arc<dyn FeedSource> =
            Arc::new(HttpFeedSource::with_feeds(source.feeds.clone(), &source.api_key, timeout)?);

        let elements = FreshnessCache::new(CachePolicy::elements(&config.cache.root, element_max_age), element_source);
        let feeds = FreshnessCache::new(CachePolicy::feed(&config.cache.root, feed_max_age), feed_source);

        let classifier: Option<Box<dyn Classifier>> = match &config.classifier.model_path {
            Some(path) => match CentroidClassifier::load(path) {
                Ok(model) => Some(Box::new(model)),
                Err(e) => {
                    warn!("Classifier unavailable, continuing without it: {:#}", e);
                    None
                }
            },
            None => None,
        };

        let service = Self::new(
            elements,
            feeds,
            classifier,
            DisplayPalette::from_config(&config.palette),
            config.detect.clone(),
            source.default_group.clone(),
        );
        if source.famous_names.is_empty() {
            return Ok(service);
        }

        let by_name = Arc::new(HttpFeedSource::new(&source.famous_url, &source.api_key, timeout)?);
        let famous_source = Arc::new(NamedObjectSource::new(by_name, source.famous_names.clone()));
        let famous = FreshnessCache::new(CachePolicy::named(&config.cache.root, element_max_age), famous_source);
        Ok(service.with_famous(famous))
    }

    pub fn palette(&self) -> &DisplayPalette {
        &self.palette
    }

    pub fn defaults(&self) -> &DetectConfig {
        &self.defaults
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    pub async fn fetch_elements(&self, group: &str, max_age: Option<Duration>) -> Result<FetchOutcome, CatalogError> {
        self.elements.fetch(group, max_age).await
    }

    pub async fn fetch_feed(&self, name: &str, max_age: Option<Duration>) -> Result<FetchOutcome, CatalogError> {
        self.feeds.fetch(name, max_age).await
    }

    /// Newest entry for `group`; `offline` ignores age and never touches
    /// the network.
    async fn load_entry(
        cache: &FreshnessCache,
        group: &str,
        max_age: Option<Duration>,
        offline: bool,
    ) -> Result<Option<CacheEntry>, CatalogError> {
        if offline {
            return cache.latest_entry(group).await;
        }
        let outcome = cache.fetch(group, max_age).await?;
        info!("[{}] '{}' from {}", cache.policy().name, group, outcome.origin);
        Ok(Some(outcome.entry))
    }

    /// Name-resolved objects, or nothing when they are unavailable.
    async fn famous_records(&self, max_age: Option<Duration>, offline: bool) -> Vec<ElementSetRecord> {
        let Some(famous) = &self.famous else {
            return Vec::new();
        };

        let entry = match Self::load_entry(famous, FAMOUS_GROUP, max_age, offline).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("No cached famous objects");
                return Vec::new();
            }
            Err(e) => {
                warn!("Famous objects unavailable, continuing without them: {}", e);
                return Vec::new();
            }
        };

        parse_records(&entry.raw_text, FAMOUS_GROUP, entry.created_at).unwrap_or_else(|e| {
            warn!("Ignoring cached famous objects {:?}: {}", entry.file_path, e);
            Vec::new()
        })
    }

    /// Element sets for `group` as trackable objects, one per object id.
    ///
    /// Famous objects come first so they survive the detection cap.
    /// `offline` reads the newest cached entries whatever their age and
    /// never touches the network.
    pub async fn load_objects(&self, group: &str, max_age: Option<Duration>, offline: bool) -> Result<Vec<TrackedObject>> {
        let entry = Self::load_entry(&self.elements, group, max_age, offline)
            .await?
            .with_context(|| format!("No cached element sets for group '{}'", group))?;

        let group_records = parse_records(&entry.raw_text, group, entry.created_at)
            .map_err(|source| CatalogError::Validation {
                group: group.to_string(),
                source,
            })?;

        let mut records = self.famous_records(max_age, offline).await;
        let famous_count = records.len();
        records.extend(group_records);

        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.object_id));
        let objects: Vec<TrackedObject> = records.iter().map(TrackedObject::from).collect();

        info!(
            "Loaded {} objects ({} famous) from {:?}",
            objects.len(),
            famous_count,
            entry.file_path
        );
        Ok(objects)
    }

    /// Annotate in place with the configured classifier, if any.
    pub fn annotate(&self, objects: &mut [TrackedObject]) -> ClassificationSummary {
        annotate(objects, self.classifier.as_deref(), &self.palette)
    }

    /// Run one detection pass over `request.objects`.
    pub fn detect<P: PositionProvider + ?Sized>(&self, request: DetectRequest, provider: &P) -> Result<DetectReport> {
        let run_id = uuid::Uuid::now_v7().to_string();
        let span = tracing::info_span!("detect", run_id = %run_id);
        let _enter = span.enter();

        let DetectRequest {
            mut objects,
            start,
            threshold_km,
            window,
            step,
            filter,
            max_objects,
        } = request;

        if objects.len() > max_objects {
            info!("Capping run at {} of {} objects", max_objects, objects.len());
            objects.truncate(max_objects);
        }

        let mut report = DetectReport {
            run_id,
            considered: objects.len(),
            ..Default::default()
        };
        if objects.len() < 2 {
            info!("Fewer than two objects; nothing to compare");
            return Ok(report);
        }

        // Caller-supplied annotations are kept
        report.classification = annotate(
            objects.iter_mut().filter(|o| o.annotation.is_none()),
            self.classifier.as_deref(),
            &self.palette,
        );

        let grid = TimeGrid::new(start, window, step).context("Invalid time grid")?;
        let build = TrackBuilder::new(&grid, provider).with_filter(filter).build(&objects);
        report.filtered = build.filtered;
        report.dropped = build.dropped;

        report.events = detect(&build.tracks, threshold_km);

        let by_id: HashMap<u32, &TrackedObject> = objects.iter().rev().map(|o| (o.object_id, o)).collect();
        report.alerts = report
            .events
            .iter()
            .filter_map(|event| {
                let a = by_id.get(&event.object_a)?;
                let b = by_id.get(&event.object_b)?;
                Some(format_alert(event, a, b))
            })
            .collect();

        info!(
            "Run finished: {} considered, {} filtered, {} dropped, {} events",
            report.considered,
            report.filtered,
            report.dropped,
            report.events.len()
        );
        Ok(report)
    }
}
