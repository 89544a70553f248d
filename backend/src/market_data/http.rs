// =============================================================================
// HTTP Market Data — public REST sources with ordered fallbacks
// =============================================================================
//
// Signal             primary                     fallback
// ---------------    -------------------------   -------------------------
// USD spot           Binance ticker              CoinGecko simple price
// KRW spot           Bithumb ticker              Upbit ticker
// USD/KRW            Dunamu forex quotation      (caller default)
// daily history      CoinGecko market_chart      (none)
// Fear & Greed       alternative.me /fng/        (none)
// search interest    Google Trends multiline     (none)
//
// Daily history is fetched once at the widest lookback and reused for
// `history_cache_secs`; narrower requests are served as tails of it.  A failed
// refetch falls back to the expired series.
//
// The rate gate is consulted once per signal.  Follow-up requests inside the
// same round (the Trends multiline call after explore) go straight out.
// =============================================================================

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::market_data::history_cache::HistoryCache;
use crate::market_data::rate_limit::MinIntervalGate;
use crate::market_data::{MarketDataProvider, PriceSeries};
use crate::runtime_config::RuntimeConfig;

/// Widest lookback any calculator needs.
pub const HISTORY_DAYS: usize = 365;

const BINANCE_TICKER: &str = "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT";
const COINGECKO_SIMPLE: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
const COINGECKO_CHART: &str = "https://api.coingecko.com/api/v3/coins/bitcoin/market_chart";
const BITHUMB_TICKER: &str = "https://api.bithumb.com/public/ticker/BTC_KRW";
const UPBIT_TICKER: &str = "https://api.upbit.com/v1/ticker?markets=KRW-BTC";
const DUNAMU_FOREX: &str =
    "https://quotation-api-cdn.dunamu.com/v1/forex/recent?codes=FRX.KRWUSD";
const FEAR_GREED: &str = "https://api.alternative.me/fng/";
const TRENDS_EXPLORE: &str = "https://trends.google.com/trends/api/explore";
const TRENDS_MULTILINE: &str = "https://trends.google.com/trends/api/widgetdata/multiline";

const TRENDS_KEYWORD: &str = "Bitcoin";
const TRENDS_TIMEFRAME: &str = "now 7-d";

/// Upstream URLs, one per request kind.
#[derive(Debug, Clone)]
struct Endpoints {
    binance_ticker: String,
    coingecko_simple: String,
    coingecko_chart: String,
    bithumb_ticker: String,
    upbit_ticker: String,
    dunamu_forex: String,
    fear_greed: String,
    trends_explore: String,
    trends_multiline: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            binance_ticker: BINANCE_TICKER.to_string(),
            coingecko_simple: COINGECKO_SIMPLE.to_string(),
            coingecko_chart: COINGECKO_CHART.to_string(),
            bithumb_ticker: BITHUMB_TICKER.to_string(),
            upbit_ticker: UPBIT_TICKER.to_string(),
            dunamu_forex: DUNAMU_FOREX.to_string(),
            fear_greed: FEAR_GREED.to_string(),
            trends_explore: TRENDS_EXPLORE.to_string(),
            trends_multiline: TRENDS_MULTILINE.to_string(),
        }
    }
}

pub struct HttpMarketData {
    client: reqwest::Client,
    gate: MinIntervalGate,
    endpoints: Endpoints,
    history: HistoryCache,
}

impl HttpMarketData {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("cycle-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build market data HTTP client")?;

        let provider = Self::from_parts(config, client, Endpoints::default());
        debug!(gate = ?provider.gate, "HttpMarketData initialised");
        Ok(provider)
    }

    fn from_parts(config: &RuntimeConfig, client: reqwest::Client, endpoints: Endpoints) -> Self {
        let gate = MinIntervalGate::new(
            config
                .source_min_interval_secs
                .iter()
                .map(|(name, secs)| (name.clone(), Duration::from_secs(*secs))),
        );

        Self {
            client,
            gate,
            endpoints,
            history: HistoryCache::new(Duration::from_secs(config.history_cache_secs)),
        }
    }

    // -------------------------------------------------------------------------
    // Request plumbing
    // -------------------------------------------------------------------------

    /// Wait for the source's rate slot, then send.
    async fn get_text(
        &self,
        source_name: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, FetchError> {
        self.gate.wait(source_name).await;
        self.send(source_name, request).await
    }

    /// Send without consulting the rate gate.
    async fn send(
        &self,
        source_name: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, FetchError> {
        let resp = request.send().await.map_err(|e| FetchError::Http {
            source_name,
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name,
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Http {
            source_name,
            message: e.to_string(),
        })
    }

    async fn get_json(&self, source_name: &'static str, url: &str) -> Result<Value, FetchError> {
        let body = self.get_text(source_name, self.client.get(url)).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::parse(source_name, e.to_string()))
    }

    // -------------------------------------------------------------------------
    // Individual sources
    // -------------------------------------------------------------------------

    async fn binance_usd(&self) -> Result<f64, FetchError> {
        parse_binance_price(&self.get_json("binance", &self.endpoints.binance_ticker).await?)
    }

    async fn coingecko_usd(&self) -> Result<f64, FetchError> {
        parse_coingecko_simple(&self.get_json("coingecko", &self.endpoints.coingecko_simple).await?)
    }

    async fn bithumb_krw(&self) -> Result<f64, FetchError> {
        parse_bithumb_price(&self.get_json("bithumb", &self.endpoints.bithumb_ticker).await?)
    }

    async fn upbit_krw(&self) -> Result<f64, FetchError> {
        parse_upbit_price(&self.get_json("upbit", &self.endpoints.upbit_ticker).await?)
    }

    async fn coingecko_history(&self, days: usize) -> Result<PriceSeries, FetchError> {
        let url = format!(
            "{}?vs_currency=usd&days={days}&interval=daily",
            self.endpoints.coingecko_chart
        );
        parse_market_chart(&self.get_json("coingecko", &url).await?)
    }

    async fn google_trends(&self) -> Result<Vec<f64>, FetchError> {
        const SOURCE: &str = "google_trends";

        let explore_req = serde_json::json!({
            "comparisonItem": [{ "keyword": TRENDS_KEYWORD, "geo": "", "time": TRENDS_TIMEFRAME }],
            "category": 0,
            "property": "",
        })
        .to_string();
        let explore = self
            .get_text(
                SOURCE,
                self.client
                    .get(&self.endpoints.trends_explore)
                    .query(&[("hl", "en-US"), ("tz", "0"), ("req", explore_req.as_str())]),
            )
            .await?;
        let (token, request) = parse_trends_widget(&explore)?;

        let timeline = self
            .send(
                SOURCE,
                self.client.get(&self.endpoints.trends_multiline).query(&[
                    ("hl", "en-US"),
                    ("tz", "0"),
                    ("req", request.as_str()),
                    ("token", token.as_str()),
                ]),
            )
            .await?;
        parse_trends_timeline(&timeline)
    }
}

/// Try `primary`; on failure log it and try `secondary`.
async fn with_fallback<T, F>(
    signal: &'static str,
    primary: Result<T, FetchError>,
    secondary: F,
) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match primary {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(signal, error = %e, "primary source failed, trying fallback");
            secondary.await.map_err(|last| FetchError::AllSourcesFailed {
                signal,
                last: Box::new(last),
            })
        }
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketData {
    #[instrument(skip(self), name = "market_data::spot_price_usd")]
    async fn spot_price_usd(&self) -> Result<f64, FetchError> {
        with_fallback("price_usd", self.binance_usd().await, self.coingecko_usd()).await
    }

    #[instrument(skip(self), name = "market_data::spot_price_krw")]
    async fn spot_price_krw(&self) -> Result<f64, FetchError> {
        with_fallback("price_krw", self.bithumb_krw().await, self.upbit_krw()).await
    }

    #[instrument(skip(self), name = "market_data::usd_krw_rate")]
    async fn usd_krw_rate(&self) -> Result<f64, FetchError> {
        parse_dunamu_rate(&self.get_json("dunamu", &self.endpoints.dunamu_forex).await?)
    }

    #[instrument(skip(self), name = "market_data::daily_prices")]
    async fn daily_prices(&self, days: usize) -> Result<PriceSeries, FetchError> {
        if let Some(cached) = self.history.fresh(days, Instant::now()) {
            return Ok(cached);
        }

        let width = days.max(HISTORY_DAYS);
        match self.coingecko_history(width).await {
            Ok(series) => {
                debug!(points = series.len(), width, "daily price history refreshed");
                Ok(self.history.store(width, series, days, Instant::now()))
            }
            Err(e) => match self.history.stale(days) {
                Some(cached) => {
                    warn!(error = %e, "history refresh failed, serving expired cache");
                    Ok(cached)
                }
                None => Err(e),
            },
        }
    }

    #[instrument(skip(self), name = "market_data::fear_greed_index")]
    async fn fear_greed_index(&self) -> Result<u8, FetchError> {
        parse_fear_greed(&self.get_json("alternative_me", &self.endpoints.fear_greed).await?)
    }

    #[instrument(skip(self), name = "market_data::search_interest")]
    async fn search_interest(&self) -> Result<Vec<f64>, FetchError> {
        self.google_trends().await
    }
}

impl std::fmt::Debug for HttpMarketData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMarketData")
            .field("gate", &self.gate)
            .field("history", &self.history)
            .finish()
    }
}

// =============================================================================
// Payload parsers
// =============================================================================

/// Numbers arrive either as JSON numbers or as decimal strings.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn positive(source_name: &'static str, value: Option<f64>) -> Result<f64, FetchError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(FetchError::parse(source_name, format!("non-positive value {v}"))),
        None => Err(FetchError::Empty { source_name }),
    }
}

fn parse_binance_price(body: &Value) -> Result<f64, FetchError> {
    positive("binance", body.get("price").and_then(as_f64))
}

fn parse_coingecko_simple(body: &Value) -> Result<f64, FetchError> {
    positive("coingecko", body.pointer("/bitcoin/usd").and_then(as_f64))
}

fn parse_bithumb_price(body: &Value) -> Result<f64, FetchError> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
    if status != "0000" {
        return Err(FetchError::parse("bithumb", format!("status code {status:?}")));
    }
    positive("bithumb", body.pointer("/data/closing_price").and_then(as_f64))
}

fn parse_upbit_price(body: &Value) -> Result<f64, FetchError> {
    positive("upbit", body.pointer("/0/trade_price").and_then(as_f64))
}

fn parse_dunamu_rate(body: &Value) -> Result<f64, FetchError> {
    positive("dunamu", body.pointer("/0/basePrice").and_then(as_f64))
}

fn parse_market_chart(body: &Value) -> Result<PriceSeries, FetchError> {
    let points = body
        .get("prices")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::parse("coingecko", "missing prices array"))?;

    // A bad point is rejected rather than skipped: calculators index days by
    // position from the end.
    let mut prices = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        match point.get(1).and_then(as_f64) {
            Some(price) if price.is_finite() && price >= 0.0 => prices.push(price),
            _ => {
                return Err(FetchError::parse(
                    "coingecko",
                    format!("invalid price at index {index}"),
                ))
            }
        }
    }
    if prices.is_empty() {
        return Err(FetchError::Empty {
            source_name: "coingecko",
        });
    }
    Ok(PriceSeries::new(prices))
}

fn parse_fear_greed(body: &Value) -> Result<u8, FetchError> {
    let value = body
        .pointer("/data/0/value")
        .and_then(as_f64)
        .ok_or(FetchError::Empty {
            source_name: "alternative_me",
        })?;
    if !(0.0..=100.0).contains(&value) {
        return Err(FetchError::parse("alternative_me", format!("index {value} out of range")));
    }
    Ok(value.round() as u8)
}

/// Google prefixes its JSON with an anti-XSSI guard such as `)]}'`.
fn strip_xssi(text: &str) -> &str {
    text.trim_start()
        .trim_start_matches(")]}'")
        .trim_start_matches(',')
        .trim_start()
}

/// Pull the TIMESERIES widget's `(token, request)` out of an explore reply.
fn parse_trends_widget(text: &str) -> Result<(String, String), FetchError> {
    let body: Value = serde_json::from_str(strip_xssi(text))
        .map_err(|e| FetchError::parse("google_trends", e.to_string()))?;

    let widget = body
        .get("widgets")
        .and_then(Value::as_array)
        .and_then(|ws| {
            ws.iter()
                .find(|w| w.get("id").and_then(Value::as_str) == Some("TIMESERIES"))
        })
        .ok_or_else(|| FetchError::parse("google_trends", "no TIMESERIES widget"))?;

    let token = widget
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::parse("google_trends", "widget without token"))?;
    let request = widget
        .get("request")
        .ok_or_else(|| FetchError::parse("google_trends", "widget without request"))?;

    Ok((token.to_string(), request.to_string()))
}

fn parse_trends_timeline(text: &str) -> Result<Vec<f64>, FetchError> {
    let body: Value = serde_json::from_str(strip_xssi(text))
        .map_err(|e| FetchError::parse("google_trends", e.to_string()))?;

    let values: Vec<f64> = body
        .pointer("/default/timelineData")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(|p| p.pointer("/value/0").and_then(as_f64))
                .collect()
        })
        .unwrap_or_default();

    if values.is_empty() {
        return Err(FetchError::Empty {
            source_name: "google_trends",
        });
    }
    Ok(values)
}
