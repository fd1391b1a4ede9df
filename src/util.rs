use itertools::Itertools;

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    let avg = mean(data)?;
    let variance = data.iter().map(|v| (avg - v).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// How steady the per-command times were, as a 0-100 percentage.
///
/// 100 means every command took equally long; the value drops with the
/// coefficient of variation.
pub fn consistency(durations: &[f64]) -> Option<f64> {
    let avg = mean(durations)?;
    if avg <= 0.0 {
        return Some(100.0);
    }
    let cv = std_dev(durations)? / avg;
    Some(((1.0 - cv) * 100.0).clamp(0.0, 100.0))
}

/// `1234567` -> `"1,234,567"`.
pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let groups = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned());
    Itertools::intersperse(groups, ",".to_string()).collect()
}

/// Seconds left on the clock as `m:ss`, rounding up so `0:00` means done.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.ceil() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
