//! The "Momentum" curve - growth intensity over the upload window.
//!
//! Discovery is modeled as a Gaussian bell over the window: slow right after
//! upload, peaking halfway through, tapering toward the end.
//!
//! ```text
//! factor(h) = exp(-(h - W/2)^2 / (2 * (W/4)^2))
//! ```
//!
//! For the default 12 hour window the peak is at hour 6 with a standard
//! deviation of 3 hours, so `factor(0) == factor(12) ≈ 0.135`.

/// Bell-curve intensity in `(0, 1]` at `hours_since_upload`.
pub fn bell_curve_factor(hours_since_upload: f64, window_hours: f64) -> f64 {
    let peak = window_hours / 2.0;
    let std_dev = window_hours / 4.0;
    let exponent = -(hours_since_upload - peak).powi(2) / (2.0 * std_dev.powi(2));
    exponent.exp()
}

/// Linear fraction of the window elapsed, clamped to `[0, 1]`.
pub fn progress(hours_since_upload: f64, window_hours: f64) -> f64 {
    (hours_since_upload / window_hours).clamp(0.0, 1.0)
}

/// Views the video "should" have by now.
pub fn expected_views(target_views: u64, progress: f64) -> u64 {
    (target_views as f64 * progress).floor() as u64
}

/// Size of one catch-up increment.
///
/// `jitter` is the organic noise sample, already drawn from `[0, max_jitter)`.
/// Always at least 1 so a lagging counter makes progress.
pub fn catch_up_amount(target_views: u64, window_hours: f64, curve_factor: f64, jitter: f64) -> u64 {
    let base_chunk = (target_views as f64 / window_hours) * curve_factor;
    ((base_chunk + jitter).ceil() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const WINDOW: f64 = 12.0;

    #[test]
    fn test_curve_peaks_mid_window() {
        assert_relative_eq!(bell_curve_factor(6.0, WINDOW), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_curve_edges_small_and_symmetric() {
        let start = bell_curve_factor(0.0, WINDOW);
        let end = bell_curve_factor(12.0, WINDOW);
        assert_relative_eq!(start, end, epsilon = 1e-12);
        assert_relative_eq!(start, (-2.0f64).exp(), epsilon = 1e-12);
        assert!(start < 0.14);
    }

    #[test]
    fn test_progress_clamps() {
        assert_eq!(progress(-1.0, WINDOW), 0.0);
        assert_relative_eq!(progress(3.0, WINDOW), 0.25);
        assert_eq!(progress(30.0, WINDOW), 1.0);
    }

    #[test]
    fn test_expected_views_at_peak() {
        assert_eq!(expected_views(1000, progress(6.0, WINDOW)), 500);
        assert_eq!(expected_views(1000, progress(0.0, WINDOW)), 0);
    }

    #[test]
    fn test_catch_up_at_peak() {
        // (1000 / 12) * 1.0 = 83.33..
        assert_eq!(catch_up_amount(1000, WINDOW, 1.0, 0.0), 84);
        assert_eq!(catch_up_amount(1000, WINDOW, 1.0, 4.999), 89);
    }

    #[test]
    fn test_catch_up_never_zero() {
        assert_eq!(catch_up_amount(0, WINDOW, 0.0, 0.0), 1);
    }

    proptest! {
        #[test]
        fn prop_curve_in_unit_interval(h in 0.0f64..12.0) {
            let factor = bell_curve_factor(h, WINDOW);
            prop_assert!(factor > 0.0 && factor <= 1.0);
        }

        #[test]
        fn prop_curve_symmetric_about_peak(offset in 0.0f64..6.0) {
            let before = bell_curve_factor(6.0 - offset, WINDOW);
            let after = bell_curve_factor(6.0 + offset, WINDOW);
            prop_assert!((before - after).abs() < 1e-12);
        }

        #[test]
        fn prop_expected_views_never_exceed_target(target in 0u64..5000, h in 0.0f64..48.0) {
            prop_assert!(expected_views(target, progress(h, WINDOW)) <= target);
        }
    }
}
