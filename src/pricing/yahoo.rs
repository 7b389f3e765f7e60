use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 500;

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Meta {
    /// Exchange offset from UTC in seconds; bars are stamped in exchange time
    gmtoffset: Option<i64>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// Daily closes of one symbol plus its display name, if Yahoo has one
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolHistory {
    pub symbol: String,
    pub name: Option<String>,
    pub closes: Vec<(NaiveDate, Decimal)>,
}

pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent("Mozilla/5.0 (compatible; ShadowBot/1.0)")
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch daily closes for `symbol` between `from` and `to`, inclusive
pub async fn fetch_history(
    client: &Client,
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<SymbolHistory> {
    info!("Fetching {} from {} to {}", symbol, from, to);

    let from_timestamp = from
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid from date"))?
        .and_utc()
        .timestamp();
    let to_timestamp = to
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("Invalid to date"))?
        .and_utc()
        .timestamp();

    let url = format!(
        "{}/{}?period1={}&period2={}&interval=1d",
        CHART_URL, symbol, from_timestamp, to_timestamp
    );
    let body = get_with_retry(client, &url).await?;
    parse_chart(symbol, &body)
}

async fn get_with_retry(client: &Client, url: &str) -> Result<String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                let body = resp
                    .text()
                    .await
                    .with_context(|| format!("failed reading response for {}", url))?;
                if status.is_success() {
                    return Ok(body);
                }
                if attempt >= MAX_RETRIES {
                    anyhow::bail!("Yahoo Finance returned error status {} for {}", status, url);
                }
                warn!("Yahoo Finance returned {} (attempt {})", status, attempt);
            }
            Err(err) => {
                if attempt >= MAX_RETRIES {
                    return Err(err).with_context(|| format!("request failed for {}", url));
                }
                warn!("Request failed (attempt {}): {}", attempt, err);
            }
        }

        let delay = BASE_DELAY_MS * attempt as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

/// Parse a chart response body. Days without a close are skipped.
fn parse_chart(symbol: &str, body: &str) -> Result<SymbolHistory> {
    let data: YahooChartResponse =
        serde_json::from_str(body).context("Failed to parse Yahoo Finance response")?;

    if let Some(error) = data.chart.error {
        return Err(anyhow!(
            "Yahoo Finance API error: {} - {}",
            error.code,
            error.description
        ));
    }

    let result = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("No data returned from Yahoo Finance"))?;

    let offset = result.meta.gmtoffset.unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(timestamp + offset, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp {}", timestamp))?
            .date_naive();
        let Some(close) = closes.get(i).copied().flatten().and_then(Decimal::from_f64_retain)
        else {
            continue;
        };
        // intraday bars of the current session share a date with the daily bar
        match points.last_mut() {
            Some((last_date, last_close)) if *last_date == date => *last_close = close,
            _ => points.push((date, close)),
        }
    }

    debug!("Fetched {} closes for {}", points.len(), symbol);
    Ok(SymbolHistory {
        symbol: symbol.to_string(),
        name: result.meta.short_name.or(result.meta.long_name),
        closes: points,
    })
}
