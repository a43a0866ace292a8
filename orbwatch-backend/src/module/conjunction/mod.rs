///! Close-approach analysis over a shared time grid
///!
///! ## Main Components
///! - `TimeGrid`: the one place sample times are generated
///! - `TrackBuilder`: samples every admitted object through a `PositionProvider`
///! - `detect`: all-pairs minimum separation below a threshold
///! - `annotate` / `DisplayPalette`: optional type predictions and colours
///! - `format_alert`: one readable line per event

mod grid;
pub use grid::{GridError, GridStep, MAX_GRID_POINTS, TimeGrid};

mod palette;
pub use palette::{DisplayPalette, OrbitTier};

mod classify;
pub use classify::{CentroidClass, CentroidClassifier, ClassificationSummary, Classifier, annotate};

mod tracks;
pub use tracks::{PositionProvider, Sgp4Provider, TrackBuild, TrackBuilder, TrackFilter};

mod proximity;
pub use proximity::{MAX_BRUTE_FORCE_OBJECTS, detect};

mod alert;
pub use alert::{decorated_name, format_alert};
