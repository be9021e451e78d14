use crate::{
    error::{AppError, Result},
    models::{ScanReport, ScanRow, Setup},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PORT: u16 = 8050;

pub type SharedReport = Arc<ScanReport>;

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    pub setup: Option<String>,
    pub sort: Option<String>,
}

/// Read a report written by the weekend run
pub fn load_report(path: &Path) -> Result<ScanReport> {
    if !path.exists() {
        return Err(AppError::NotFound(format!("Report {} does not exist", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn router(report: SharedReport) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/results", get(results_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(report)
}

#[instrument(skip(report))]
async fn index_handler(State(report): State<SharedReport>) -> Html<String> {
    debug!("Rendering results page");
    Html(render_html(&report))
}

#[instrument(skip(report))]
async fn results_handler(
    State(report): State<SharedReport>,
    Query(query): Query<ResultsQuery>,
) -> impl IntoResponse {
    match select_rows(&report.rows, &query) {
        Ok(rows) => {
            debug!(count = rows.len(), "Returning scan rows");
            (StatusCode::OK, Json(rows)).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

fn parse_setup(value: &str) -> Result<Setup> {
    match value {
        "bullish-reversal" => Ok(Setup::BullishReversal),
        "bearish-reversal" => Ok(Setup::BearishReversal),
        "inside-week" => Ok(Setup::InsideWeek),
        "none" => Ok(Setup::None),
        other => Err(AppError::InvalidInput(format!("Unknown setup '{}'", other))),
    }
}

fn compare_numeric(a: Option<f64>, b: Option<f64>) -> Ordering {
    // Descending, missing values last
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Apply the `setup` filter and `sort` column of a results query
pub fn select_rows(rows: &[ScanRow], query: &ResultsQuery) -> Result<Vec<ScanRow>> {
    let setup = query.setup.as_deref().map(parse_setup).transpose()?;
    let mut selected: Vec<ScanRow> = rows
        .iter()
        .filter(|row| setup.map_or(true, |s| row.setup == s))
        .cloned()
        .collect();

    match query.sort.as_deref() {
        None | Some("symbol") => selected.sort_by(|a, b| a.symbol.cmp(&b.symbol)),
        Some("exchange") => selected.sort_by(|a, b| a.exchange.cmp(&b.exchange).then(a.symbol.cmp(&b.symbol))),
        Some("setup") => selected.sort_by(|a, b| a.setup.as_str().cmp(b.setup.as_str()).then(a.symbol.cmp(&b.symbol))),
        Some("close") => selected.sort_by(|a, b| compare_numeric(Some(a.close), Some(b.close))),
        Some("change_1w_pct") => selected.sort_by(|a, b| compare_numeric(a.change_1w_pct, b.change_1w_pct)),
        Some("change_1m_pct") => selected.sort_by(|a, b| compare_numeric(a.change_1m_pct, b.change_1m_pct)),
        Some(other) => return Err(AppError::InvalidInput(format!("Unknown sort column '{}'", other))),
    }

    Ok(selected)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn format_pct(value: Option<f64>) -> String {
    value.map(|v| format!("{:+.2}%", v)).unwrap_or_else(|| "-".to_string())
}

/// Results page: setup counts and the full table
pub fn render_html(report: &ScanReport) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Weekend scan {as_of}</title>\
         <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ddd;padding:4px 8px;text-align:right}}td:first-child,th:first-child{{text-align:left}}\
         .bullish-reversal{{background:#e8f5e9}}.bearish-reversal{{background:#ffebee}}.inside-week{{background:#fffde7}}</style>\
         </head><body><h1>Weekend scan {as_of}</h1>",
        as_of = report.as_of
    );

    let _ = write!(
        html,
        "<p>{} of {} symbols analyzed, generated {}</p><ul>",
        report.rows.len(),
        report.requested,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    for (setup, count) in report.setup_counts() {
        let _ = write!(html, "<li>{}: {}</li>", setup.as_str(), count);
    }
    html.push_str("</ul>");

    html.push_str(
        "<table><thead><tr><th>Symbol</th><th>Name</th><th>Exchange</th><th>Close</th>\
         <th>1W</th><th>1M</th><th>Daily</th><th>Weekly</th><th>Setup</th></tr></thead><tbody>",
    );
    for row in &report.rows {
        let _ = write!(
            html,
            "<tr class=\"{setup}\"><td>{symbol}</td><td>{name}</td><td>{exchange}</td><td>{close:.2}</td>\
             <td>{w}</td><td>{m}</td><td>{ds} {dd}</td><td>{ws} {wd}</td><td>{setup}</td></tr>",
            setup = row.setup.as_str(),
            symbol = escape(&row.symbol),
            name = escape(&row.name),
            exchange = row.exchange,
            close = row.close,
            w = format_pct(row.change_1w_pct),
            m = format_pct(row.change_1m_pct),
            ds = row.daily_strat,
            dd = row.daily_direction.as_str(),
            ws = row.weekly_strat,
            wd = row.weekly_direction.as_str(),
        );
    }
    html.push_str("</tbody></table>");

    if !report.failed.is_empty() {
        let _ = write!(
            html,
            "<p>Failed: {}</p>",
            escape(&report.failed.join(", "))
        );
    }
    html.push_str("<p><a href=\"/api/results\">JSON</a></p></body></html>");
    html
}

/// Open `url` with the platform's default handler. Failure is only logged.
pub fn open_browser(url: &str) -> bool {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = std::process::Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(url);
        c
    };

    match command.spawn() {
        Ok(_) => {
            info!("Opened browser at {}", url);
            true
        }
        Err(e) => {
            warn!("Could not open a browser ({}); visit {} manually", e, url);
            false
        }
    }
}

/// Serve `report` on 127.0.0.1:`port` until Ctrl+C
pub async fn serve(report: ScanReport, port: u16, launch_browser: bool) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("Failed to bind {}: {}", addr, e)))?;

    let url = format!("http://{}", addr);
    info!(
        rows = report.rows.len(),
        "Explorer listening on {} (press Ctrl+C to stop)", url
    );
    if launch_browser {
        open_browser(&url);
    }

    axum::serve(listener, router(Arc::new(report)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down explorer");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandleDirection, Exchange};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn row(symbol: &str, close: f64, change_1w: Option<f64>, setup: Setup) -> ScanRow {
        ScanRow {
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
            exchange: Exchange::Nasdaq,
            as_of: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            close,
            change_1w_pct: change_1w,
            change_1m_pct: None,
            daily_strat: "3-2d-2d".to_string(),
            daily_direction: CandleDirection::Green,
            weekly_strat: "2u-1-1".to_string(),
            weekly_direction: CandleDirection::Red,
            setup,
        }
    }

    fn report() -> ScanReport {
        ScanReport {
            as_of: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap(),
            requested: 4,
            failed: vec!["ZZZ".to_string()],
            rows: vec![
                row("MSFT", 400.0, Some(1.5), Setup::None),
                row("AAPL", 170.0, Some(-2.0), Setup::BullishReversal),
                row("A&B", 10.0, None, Setup::InsideWeek),
            ],
        }
    }

    #[test]
    fn test_select_rows_filter_and_sort() {
        let report = report();
        let all = select_rows(&report.rows, &ResultsQuery::default()).unwrap();
        let symbols: Vec<&str> = all.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A&B", "AAPL", "MSFT"]);

        let query = ResultsQuery {
            setup: None,
            sort: Some("change_1w_pct".to_string()),
        };
        let sorted = select_rows(&report.rows, &query).unwrap();
        let symbols: Vec<&str> = sorted.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "AAPL", "A&B"]);

        let query = ResultsQuery {
            setup: Some("bullish-reversal".to_string()),
            sort: None,
        };
        let filtered = select_rows(&report.rows, &query).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].symbol, "AAPL");
    }

    #[test]
    fn test_select_rows_rejects_unknown_parameters() {
        let report = report();
        let bad_sort = ResultsQuery {
            setup: None,
            sort: Some("volume".to_string()),
        };
        assert!(select_rows(&report.rows, &bad_sort).is_err());
        let bad_setup = ResultsQuery {
            setup: Some("breakout".to_string()),
            sort: None,
        };
        assert!(select_rows(&report.rows, &bad_setup).is_err());
    }

    #[test]
    fn test_render_html() {
        let html = render_html(&report());
        assert!(html.contains("Weekend scan 2024-03-08"));
        assert!(html.contains("3 of 4 symbols analyzed"));
        assert!(html.contains("<li>bullish-reversal: 1</li>"));
        assert!(html.contains("<td>A&amp;B</td>"));
        assert!(html.contains("+1.50%"));
        assert!(html.contains("Failed: ZZZ"));
    }

    #[test]
    fn test_load_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, serde_json::to_string(&report()).unwrap()).unwrap();
        assert_eq!(load_report(&path).unwrap(), report());
        assert!(matches!(
            load_report(&dir.path().join("missing.json")).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_router_serves_routes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(report()))).await.unwrap();
        });
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);
        assert_eq!(health.text().await.unwrap(), "ok");

        let page = client.get(&base).send().await.unwrap().text().await.unwrap();
        assert!(page.contains("Weekend scan 2024-03-08"));

        let filtered = client
            .get(format!("{}/api/results?setup=bullish-reversal", base))
            .send()
            .await
            .unwrap();
        assert_eq!(filtered.status(), reqwest::StatusCode::OK);
        let rows: Vec<ScanRow> = filtered.json().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");

        let bad_sort = client
            .get(format!("{}/api/results?sort=volume", base))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_sort.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(bad_sort.text().await.unwrap().contains("Unknown sort column"));
    }
}
