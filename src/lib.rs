//! # remaster
//!
//! Astrometric catalog cross-matching and polynomial re-registration.
//!
//! Given a *working* catalog of telescope-derived star positions and a
//! trusted *master* catalog, `remaster` finds nearest-neighbor
//! correspondences on the unit sphere, fits a quadratic correction surface
//! per angular axis, and iterates the match-fit-correct cycle across a
//! shrinking schedule of chord-distance thresholds until the working
//! positions are registered onto the master solution.
//!
//! ## Algorithm overview
//!
//! 1. **Projection** — both catalogs are mapped from (RA, Dec) degrees to
//!    Cartesian unit vectors; chord distance between vectors stands in for
//!    angular separation at small angles.
//! 2. **Matching** — a kd-tree built once over the master catalog answers a
//!    nearest-neighbor query per working point.
//! 3. **Filtering** — matches beyond the round's distance threshold are
//!    dropped; each round's threshold is tighter than the last, so outlier
//!    rejection sharpens as the correction improves.
//! 4. **Fitting** — the kept residuals are fitted, per axis, with a
//!    six-coefficient quadratic surface over z-scored coordinates
//!    (SVD least squares).
//! 5. **Correction** — the fitted surfaces are evaluated for *every* working
//!    record and added to its coordinates in place.
//!
//! ## Example
//!
//! ```no_run
//! use ::remaster::{remaster, Catalog, RemasterConfig};
//!
//! let mut working = Catalog::from_file("stars.txt", 0).unwrap();
//! let master = Catalog::from_file("master.txt", 0).unwrap();
//!
//! let result = remaster(&mut working, &master, &RemasterConfig::default()).unwrap();
//! println!(
//!     "{} rounds, {} matches kept in the final round",
//!     result.rounds.len(),
//!     result.deltas.len()
//! );
//! // `working.ra` / `working.dec` now hold the corrected positions.
//! ```

pub mod catalog;
pub mod error;
pub mod fit;
pub mod kdtree;
pub mod projection;
pub mod remaster;

pub use catalog::Catalog;
pub use error::{RemasterError, Result};
pub use fit::{Axis, QuadFit, QuadSurface};
pub use kdtree::{KdTree, Neighbor};
pub use remaster::{
    remaster, MatchDeltas, RemasterConfig, RemasterResult, RoundStats, DEFAULT_THRESHOLDS,
};
