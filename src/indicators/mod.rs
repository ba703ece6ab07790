// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators drawn on the
// dashboard. Each calculator returns only the defined part of its series; use
// [`align`] to lay it back onto the bar axis for charting.

pub mod rsi;
pub mod sma;

/// Right-align a warm-up-trimmed indicator series onto `len` bars.
///
/// Accepts plain values or `Option`s (gaps inside the series stay `None`).
/// The front of the output is padded with `None` for the bars where the
/// indicator is undefined. A series longer than `len` keeps its most recent
/// `len` values.
pub fn align<T>(series: &[T], len: usize) -> Vec<Option<f64>>
where
    T: Copy + Into<Option<f64>>,
{
    let take = series.len().min(len);
    let mut out = vec![None; len - take];
    out.extend(series[series.len() - take..].iter().map(|&v| v.into()));
    out
}
