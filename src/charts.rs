// =============================================================================
// Chart Figures: Plotly JSON
// =============================================================================
//
// The browser renders with Plotly.js; the server only assembles figure
// objects (`{ "data": [...traces], "layout": {...} }`). Undefined indicator
// points are emitted as `null` so Plotly leaves a gap.
// =============================================================================

use serde_json::{json, Value};

use crate::analysis::IndicatorFrame;
use crate::indicators::rsi::{OVERBOUGHT, OVERSOLD};
use crate::market_data::Bar;

const INCREASING_COLOR: &str = "#00ff00";
const DECREASING_COLOR: &str = "#ff0000";
const TEMPLATE: &str = "plotly_white";

fn dates(bars: &[Bar]) -> Vec<String> {
    bars.iter()
        .map(|b| b.timestamp.format("%Y-%m-%d").to_string())
        .collect()
}

fn line_trace(name: &str, x: &[String], y: &[Option<f64>], color: &str) -> Value {
    json!({
        "type": "scatter",
        "mode": "lines",
        "name": name,
        "x": x,
        "y": y,
        "line": { "color": color, "width": 1 },
    })
}

/// Candlestick with SMA 20 / SMA 50 overlays.
pub fn price_figure(company_name: &str, bars: &[Bar], frame: &IndicatorFrame) -> Value {
    let x = dates(bars);

    let candles = json!({
        "type": "candlestick",
        "name": "Price",
        "x": x,
        "open": bars.iter().map(|b| b.open).collect::<Vec<_>>(),
        "high": bars.iter().map(|b| b.high).collect::<Vec<_>>(),
        "low": bars.iter().map(|b| b.low).collect::<Vec<_>>(),
        "close": bars.iter().map(|b| b.close).collect::<Vec<_>>(),
        "increasing": { "line": { "color": INCREASING_COLOR } },
        "decreasing": { "line": { "color": DECREASING_COLOR } },
    });

    json!({
        "data": [
            candles,
            line_trace("SMA 20", &x, &frame.sma_20, "orange"),
            line_trace("SMA 50", &x, &frame.sma_50, "blue"),
        ],
        "layout": {
            "title": { "text": format!("{company_name} Stock Price") },
            "xaxis": { "title": { "text": "Date" }, "rangeslider": { "visible": false } },
            "yaxis": { "title": { "text": "Price (USD)" } },
            "template": TEMPLATE,
            "height": 600,
            "showlegend": true,
        },
    })
}

/// Volume bars coloured red on down days and green otherwise.
pub fn volume_figure(bars: &[Bar]) -> Value {
    let colors: Vec<&str> = bars
        .iter()
        .map(|b| if b.is_down() { "red" } else { "green" })
        .collect();

    json!({
        "data": [{
            "type": "bar",
            "name": "Volume",
            "x": dates(bars),
            "y": bars.iter().map(|b| b.volume).collect::<Vec<_>>(),
            "marker": { "color": colors },
            "opacity": 0.7,
        }],
        "layout": {
            "title": { "text": "Trading Volume" },
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": "Volume" } },
            "template": TEMPLATE,
            "height": 300,
            "showlegend": false,
        },
    })
}

/// RSI 14 line between fixed 0..100 bounds, with the 30 / 70 bands.
pub fn rsi_figure(bars: &[Bar], frame: &IndicatorFrame) -> Value {
    let x = dates(bars);
    let band = |level: f64, color: &str| {
        json!({
            "type": "line",
            "xref": "paper", "x0": 0, "x1": 1,
            "yref": "y", "y0": level, "y1": level,
            "line": { "color": color, "width": 1, "dash": "dash" },
        })
    };

    json!({
        "data": [line_trace("RSI 14", &x, &frame.rsi_14, "purple")],
        "layout": {
            "title": { "text": "RSI (14)" },
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": "RSI" }, "range": [0, 100] },
            "shapes": [band(OVERBOUGHT, "orange"), band(OVERSOLD, "red")],
            "template": TEMPLATE,
            "height": 250,
            "showlegend": false,
        },
    })
}
