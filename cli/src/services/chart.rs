//! Candlestick charts rendered as standalone SVG documents.

use crate::{
    error::Result,
    models::{Candle, StratPattern},
    utils::write_atomic,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const WIDTH: f64 = 1200.0;
const PANEL_HEIGHT: f64 = 360.0;
const HEADER_HEIGHT: f64 = 40.0;
const PANEL_GAP: f64 = 30.0;
const PLOT_MARGIN_LEFT: f64 = 20.0;
const PLOT_MARGIN_RIGHT: f64 = 80.0;
const PANEL_TITLE_HEIGHT: f64 = 24.0;
const GREEN: &str = "#26a69a";
const RED: &str = "#ef5350";

/// One candlestick panel of a chart
#[derive(Debug, Clone)]
pub struct ChartPanel<'a> {
    pub title: String,
    pub candles: &'a [Candle],
    pub pattern: StratPattern,
}

impl<'a> ChartPanel<'a> {
    /// Panel over the last `limit` candles
    pub fn tail(title: impl Into<String>, candles: &'a [Candle], limit: usize, pattern: StratPattern) -> Self {
        let start = candles.len().saturating_sub(limit);
        Self {
            title: title.into(),
            candles: &candles[start..],
            pattern,
        }
    }
}

/// `<output_dir>/_<coin>_<stable>_15m-strat.svg`, lowercased
pub fn strat_chart_path(output_dir: &Path, coin: &str, stable_coin: &str) -> PathBuf {
    let file_name = format!("_{}_{}_15m-strat.svg", coin, stable_coin).to_lowercase();
    output_dir.join(file_name)
}

/// Render `panels` stacked vertically under `title`
pub fn render_svg(title: &str, panels: &[ChartPanel<'_>]) -> String {
    let height = HEADER_HEIGHT + panels.len() as f64 * (PANEL_HEIGHT + PANEL_GAP);
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = height
    );
    let _ = writeln!(svg, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="26" font-size="18" font-weight="bold">{}</text>"#,
        PLOT_MARGIN_LEFT,
        escape(title)
    );

    for (idx, panel) in panels.iter().enumerate() {
        let top = HEADER_HEIGHT + idx as f64 * (PANEL_HEIGHT + PANEL_GAP);
        render_panel(&mut svg, panel, top);
    }

    svg.push_str("</svg>\n");
    svg
}

fn render_panel(svg: &mut String, panel: &ChartPanel<'_>, top: f64) {
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{:.1}" font-size="14">{} (strat {})</text>"#,
        PLOT_MARGIN_LEFT,
        top + 16.0,
        escape(&panel.title),
        panel.pattern
    );

    let plot_top = top + PANEL_TITLE_HEIGHT;
    let plot_height = PANEL_HEIGHT - PANEL_TITLE_HEIGHT;
    let plot_width = WIDTH - PLOT_MARGIN_LEFT - PLOT_MARGIN_RIGHT;
    let _ = writeln!(
        svg,
        r##"<rect x="{}" y="{:.1}" width="{}" height="{}" fill="none" stroke="#cccccc"/>"##,
        PLOT_MARGIN_LEFT, plot_top, plot_width, plot_height
    );

    if panel.candles.is_empty() {
        let _ = writeln!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" font-size="14" fill="#888888" text-anchor="middle">no data</text>"##,
            PLOT_MARGIN_LEFT + plot_width / 2.0,
            plot_top + plot_height / 2.0
        );
        return;
    }

    let low = panel.candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = panel.candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let range = if high > low { high - low } else { 1.0 };
    let y_of = |price: f64| plot_top + (high - price) / range * plot_height;

    let slot = plot_width / panel.candles.len() as f64;
    let body_width = (slot * 0.6).max(1.0);

    for (i, candle) in panel.candles.iter().enumerate() {
        let center = PLOT_MARGIN_LEFT + slot * (i as f64 + 0.5);
        let color = if candle.is_green() { GREEN } else { RED };
        let body_top = y_of(candle.open.max(candle.close));
        let body_bottom = y_of(candle.open.min(candle.close));

        let _ = writeln!(
            svg,
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{c}"/>"#,
            y_of(candle.high),
            y_of(candle.low),
            x = center,
            c = color
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{} O {} H {} L {} C {}</title></rect>"#,
            center - body_width / 2.0,
            body_top,
            body_width,
            (body_bottom - body_top).max(1.0),
            color,
            candle.open_time.format("%Y-%m-%d %H:%M"),
            candle.open,
            candle.high,
            candle.low,
            candle.close
        );
    }

    let axis_x = PLOT_MARGIN_LEFT + plot_width + 6.0;
    for price in [high, (high + low) / 2.0, low] {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
            axis_x,
            y_of(price) + 4.0,
            format_price(price)
        );
    }
}

fn format_price(price: f64) -> String {
    if price >= 100.0 {
        format!("{:.2}", price)
    } else if price >= 1.0 {
        format!("{:.4}", price)
    } else {
        format!("{:.8}", price)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render and write the chart atomically
pub fn write_chart(path: &Path, title: &str, panels: &[ChartPanel<'_>]) -> Result<()> {
    write_atomic(path, render_svg(title, panels).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StratNumber;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(count: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64;
                let (open, close) = if i % 2 == 0 { (base, base + 1.0) } else { (base + 1.0, base) };
                Candle::new(start + Duration::minutes(15 * i as i64), open, base + 2.0, base - 1.0, close, 10.0)
            })
            .collect()
    }

    #[test]
    fn test_chart_path_is_lowercased() {
        let path = strat_chart_path(Path::new("output"), "BTC", "USDT");
        assert_eq!(path, PathBuf::from("output/_btc_usdt_15m-strat.svg"));
    }

    #[test]
    fn test_tail_keeps_last_candles() {
        let data = candles(100);
        let panel = ChartPanel::tail("15m", &data, 80, StratPattern::unavailable());
        assert_eq!(panel.candles.len(), 80);
        assert_eq!(panel.candles[0].open_time, data[20].open_time);

        let short = ChartPanel::tail("60m", &data[..5], 20, StratPattern::unavailable());
        assert_eq!(short.candles.len(), 5);
    }

    #[test]
    fn test_render_svg_draws_every_candle() {
        let data = candles(10);
        let pattern = StratPattern::new(StratNumber::Outside, StratNumber::TwoDown, StratNumber::Inside);
        let panels = [
            ChartPanel::tail("BTC/USDT 15m", &data, 80, pattern),
            ChartPanel::tail("BTC/USDT 60m", &[], 20, StratPattern::unavailable()),
        ];
        let svg = render_svg("BTC <USDT>", &panels);

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<line").count(), 10);
        assert!(svg.contains(GREEN) && svg.contains(RED));
        assert!(svg.contains("strat 3-2d-1"));
        assert!(svg.contains("strat na"));
        assert!(svg.contains("no data"));
        assert!(svg.contains("BTC &lt;USDT&gt;"));
    }

    #[test]
    fn test_write_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = strat_chart_path(dir.path(), "ETH", "BUSD");
        let data = candles(3);
        write_chart(&path, "ETH/BUSD", &[ChartPanel::tail("15m", &data, 80, StratPattern::unavailable())]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("ETH/BUSD"));
    }
}
