use hacktype::session::WpmSample;

/// Compute X (seconds) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(samples: &[WpmSample], elapsed_seconds: f64) -> (f64, f64) {
    let highest_wpm = samples.iter().map(|s| s.wpm).fold(0.0, f64::max);

    let last_sample = samples.last().map_or(0.0, |s| s.t);
    let overall_duration = elapsed_seconds.max(last_sample).ceil().max(1.0);

    // ~10% headroom above the peak
    let top = if highest_wpm > 0.0 {
        highest_wpm.ceil() + (highest_wpm / 10.0).ceil()
    } else {
        10.0
    };

    (overall_duration, top)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}
