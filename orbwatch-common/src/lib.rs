//! Shared data model for orbwatch crates.

pub mod tle;
pub mod types;

pub use tle::{FeatureError, FeatureVector};
pub use types::{
    Annotation, ElementSetRecord, FetchOrigin, ObjectType, PositionSample, ProximityEvent, Track,
    TrackedObject,
};
