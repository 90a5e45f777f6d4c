//! The iterative re-registration ("remaster") loop.
//!
//! Each round, at one threshold from a strictly decreasing schedule:
//!
//! 1. Project the current working coordinates to unit vectors.
//! 2. Query the master kd-tree for each working point's nearest neighbor.
//! 3. Keep matches with chord distance below the round's threshold.
//! 4. Z-score the kept working coordinates per axis (mean/std recomputed
//!    fresh each round from the kept subset only).
//! 5. Fit one quadratic surface per axis against the normalized
//!    master-minus-working residuals.
//! 6. Apply the fitted correction to *every* working record, kept or not,
//!    using the same round's normalization stats.
//!
//! As corrections improve, tighter thresholds reject progressively more
//! outliers. The only state carried between rounds is the corrected
//! coordinate arrays; fit coefficients and match sets are discarded. The
//! master catalog is immutable and indexed exactly once.

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{RemasterError, Result};
use crate::fit::{fit_quad, Axis, QuadFit};
use crate::kdtree::{KdTree, Neighbor};
use crate::projection::radec_slice_to_xyz;

/// Default chord-distance threshold schedule, one refinement round each.
pub const DEFAULT_THRESHOLDS: [f64; 5] = [8e-7, 4e-7, 2e-7, 1e-7, 0.5e-7];

/// Configuration for the refinement loop.
#[derive(Debug, Clone)]
pub struct RemasterConfig {
    /// Chord-distance cutoffs, strictly decreasing, one round per entry.
    pub thresholds: Vec<f64>,
    /// Minimum kept matches a round needs; below this the loop aborts with
    /// [`RemasterError::InsufficientMatches`]. Default 6, one per coefficient.
    pub min_matches: usize,
    /// Stop early once the largest correction a round applies (degrees)
    /// falls below this. `None` runs the full schedule.
    pub stop_tolerance: Option<f64>,
}

impl Default for RemasterConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            min_matches: 6,
            stop_tolerance: None,
        }
    }
}

/// Per-round diagnostics.
#[derive(Debug, Clone)]
pub struct RoundStats {
    pub threshold: f64,
    /// Matches within the threshold, i.e. the fit input size.
    pub kept: usize,
    /// Residual sum of squares per axis (NaN when that fit fell back).
    pub rss_ra: f64,
    pub rss_dec: f64,
    pub converged_ra: bool,
    pub converged_dec: bool,
    /// Largest |correction| applied to any coordinate this round, degrees.
    pub max_correction_deg: f64,
}

/// Final-round match diagnostics, one entry per kept point.
#[derive(Debug, Clone, Default)]
pub struct MatchDeltas {
    /// Matched master RA minus corrected working RA, degrees.
    pub delta_ra: Vec<f64>,
    /// Matched master Dec minus corrected working Dec, degrees.
    pub delta_dec: Vec<f64>,
    /// Chord distance at the final round's match step.
    pub distance: Vec<f64>,
    /// Corrected working RA, degrees.
    pub ra: Vec<f64>,
    /// Corrected working Dec, degrees.
    pub dec: Vec<f64>,
}

impl MatchDeltas {
    pub fn len(&self) -> usize {
        self.delta_ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta_ra.is_empty()
    }
}

/// Outcome of a full refinement run.
#[derive(Debug, Clone)]
pub struct RemasterResult {
    pub rounds: Vec<RoundStats>,
    pub deltas: MatchDeltas,
}

/// Run the refinement loop, correcting `working` in place against `master`.
///
/// The working catalog's auxiliary columns are untouched; only `ra`/`dec`
/// mutate. Returns per-round stats and the final round's match diagnostics.
///
/// The threshold schedule is validated before anything runs: it must be
/// non-empty, positive, and strictly decreasing
/// ([`RemasterError::InvalidSchedule`] otherwise).
pub fn remaster(
    working: &mut Catalog,
    master: &Catalog,
    config: &RemasterConfig,
) -> Result<RemasterResult> {
    validate_schedule(&config.thresholds)?;

    let master_xyz = radec_slice_to_xyz(&master.ra, &master.dec);
    let tree = KdTree::build(&master_xyz);
    info!(
        "remaster: {} working records against {} master records, {} rounds",
        working.len(),
        master.len(),
        config.thresholds.len()
    );

    let mut rounds = Vec::with_capacity(config.thresholds.len());
    let mut last_matches: Vec<Neighbor> = Vec::new();
    let mut last_kept: Vec<usize> = Vec::new();

    for (round, &dlimit) in config.thresholds.iter().enumerate() {
        let xyz = radec_slice_to_xyz(&working.ra, &working.dec);
        let matches: Vec<Neighbor> = xyz.iter().filter_map(|p| tree.nearest(p)).collect();

        let keep: Vec<usize> = matches
            .iter()
            .enumerate()
            .filter(|(_, m)| m.dist < dlimit)
            .map(|(i, _)| i)
            .collect();
        debug!(
            "round {round}: threshold {dlimit:.2e}, kept {} of {} matches",
            keep.len(),
            matches.len()
        );

        let kept_ra: Vec<f64> = keep.iter().map(|&i| working.ra[i]).collect();
        let kept_dec: Vec<f64> = keep.iter().map(|&i| working.dec[i]).collect();
        let (ra_mean, ra_std) = mean_std(&kept_ra);
        let (dec_mean, dec_std) = mean_std(&kept_dec);

        // A zero std means the kept set has no spread to normalize over,
        // which is as unusable as having too few matches.
        if keep.len() < config.min_matches || !(ra_std > 0.0) || !(dec_std > 0.0) {
            return Err(RemasterError::InsufficientMatches {
                round,
                threshold: dlimit,
                kept: keep.len(),
                needed: config.min_matches,
            });
        }

        let xnorm: Vec<f64> = kept_ra.iter().map(|r| (r - ra_mean) / ra_std).collect();
        let ynorm: Vec<f64> = kept_dec.iter().map(|d| (d - dec_mean) / dec_std).collect();
        let target_ra: Vec<f64> = keep
            .iter()
            .map(|&i| (master.ra[matches[i].index] - working.ra[i]) / ra_std)
            .collect();
        let target_dec: Vec<f64> = keep
            .iter()
            .map(|&i| (master.dec[matches[i].index] - working.dec[i]) / dec_std)
            .collect();

        let (fit_ra, ok_ra) = fit_or_fallback(round, &xnorm, &ynorm, &target_ra, Axis::Ra)?;
        let (fit_dec, ok_dec) = fit_or_fallback(round, &xnorm, &ynorm, &target_dec, Axis::Dec)?;
        debug!(
            "round {round}: fit rss ra={:.3e} dec={:.3e}",
            fit_ra.rss, fit_dec.rss
        );

        // Correct the full catalog, not just the kept subset, reusing this
        // round's normalization stats.
        let mut max_correction = 0.0f64;
        for i in 0..working.len() {
            let xn = (working.ra[i] - ra_mean) / ra_std;
            let yn = (working.dec[i] - dec_mean) / dec_std;
            let dra = fit_ra.surface.eval(xn, yn) * ra_std;
            let ddec = fit_dec.surface.eval(xn, yn) * dec_std;
            working.ra[i] += dra;
            working.dec[i] += ddec;
            max_correction = max_correction.max(dra.abs()).max(ddec.abs());
        }

        rounds.push(RoundStats {
            threshold: dlimit,
            kept: keep.len(),
            rss_ra: fit_ra.rss,
            rss_dec: fit_dec.rss,
            converged_ra: ok_ra,
            converged_dec: ok_dec,
            max_correction_deg: max_correction,
        });
        last_matches = matches;
        last_kept = keep;

        if let Some(tol) = config.stop_tolerance {
            if max_correction < tol {
                info!(
                    "round {round}: max correction {max_correction:.3e} deg below \
                     {tol:.3e}, stopping early"
                );
                break;
            }
        }
    }

    let mut deltas = MatchDeltas::default();
    for &i in &last_kept {
        let m = &last_matches[i];
        deltas.delta_ra.push(master.ra[m.index] - working.ra[i]);
        deltas.delta_dec.push(master.dec[m.index] - working.dec[i]);
        deltas.distance.push(m.dist);
        deltas.ra.push(working.ra[i]);
        deltas.dec.push(working.dec[i]);
    }

    Ok(RemasterResult { rounds, deltas })
}

/// The schedule must be non-empty, positive, and strictly decreasing so each
/// round tightens the match radius of the one before it.
fn validate_schedule(thresholds: &[f64]) -> Result<()> {
    let invalid = |reason: String| RemasterError::InvalidSchedule { reason };
    if thresholds.is_empty() {
        return Err(invalid("no thresholds given".to_string()));
    }
    for (i, &t) in thresholds.iter().enumerate() {
        if !(t > 0.0) {
            return Err(invalid(format!("threshold {i} is {t:e}, must be positive")));
        }
        if i > 0 && t >= thresholds[i - 1] {
            return Err(invalid(format!(
                "threshold {i} ({t:e}) does not decrease from {:e}",
                thresholds[i - 1]
            )));
        }
    }
    Ok(())
}

/// Run one axis fit; a non-convergence is logged and swallowed, yielding the
/// attached fallback surface so the round can proceed best-effort.
fn fit_or_fallback(
    round: usize,
    xnorm: &[f64],
    ynorm: &[f64],
    delta: &[f64],
    axis: Axis,
) -> Result<(QuadFit, bool)> {
    match fit_quad(xnorm, ynorm, delta, axis) {
        Ok(fit) => Ok((fit, true)),
        Err(RemasterError::FitNonConvergence { axis, fallback }) => {
            warn!("round {round}: {axis} fit did not converge, using fallback coefficients");
            Ok((
                QuadFit {
                    surface: fallback,
                    rss: f64::NAN,
                },
                false,
            ))
        }
        Err(e) => Err(e),
    }
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}
