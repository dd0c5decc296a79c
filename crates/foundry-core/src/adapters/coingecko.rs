use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::data_source::{MarketChartRequest, MarketDataSource, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{MarketSnapshotRow, MarketTable, SnapshotDate};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_COIN_ID: &str = "bitcoin";
pub const DEFAULT_VS_CURRENCY: &str = "usd";
const INTERVAL: &str = "daily";

/// CoinGecko `market_chart` adapter.
#[derive(Clone)]
pub struct CoinGeckoAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    coin_id: String,
    vs_currency: String,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl Default for CoinGeckoAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl CoinGeckoAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_BASE_URL),
            coin_id: String::from(DEFAULT_COIN_ID),
            vs_currency: String::from(DEFAULT_VS_CURRENCY),
            auth: HttpAuth::None,
            timeout_ms: 10_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_coin(mut self, coin_id: impl Into<String>) -> Self {
        self.coin_id = coin_id.into();
        self
    }

    pub fn with_vs_currency(mut self, vs_currency: impl Into<String>) -> Self {
        self.vs_currency = vs_currency.into();
        self
    }

    /// Send the demo API key header on every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth = HttpAuth::Header {
            name: String::from("x-cg-demo-api-key"),
            value: api_key.into(),
        };
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn build_request(&self, req: MarketChartRequest) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/coins/{}/market_chart",
            self.base_url,
            urlencoding::encode(&self.coin_id)
        ))
        .with_query("vs_currency", &self.vs_currency)
        .with_query("days", req.days())
        .with_query("interval", INTERVAL)
        .with_header("accept", "application/json")
        .with_auth(&self.auth)
        .with_timeout_ms(self.timeout_ms)
    }

    async fn fetch(&self, req: MarketChartRequest) -> Result<MarketTable, SourceError> {
        info!("[Fetch] Getting data from CoinGecko...");

        let response = self
            .http_client
            .execute(self.build_request(req))
            .await
            .map_err(|e| {
                SourceError::transport(format!("coingecko transport error: {}", e.message()))
            })?;

        if response.status == 429 {
            return Err(SourceError::rate_limited(
                "coingecko rate limit exceeded (status 429)",
            ));
        }
        if !response.is_success() {
            return Err(SourceError::upstream_status(response.status, &response.body));
        }

        let table = parse_market_chart(&response.body)?;
        info!("[Fetch] Loaded {} rows.", table.len());
        Ok(table)
    }
}

impl MarketDataSource for CoinGeckoAdapter {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    fn market_chart<'a>(
        &'a self,
        req: MarketChartRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketTable, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(req))
    }
}

/// Raw `market_chart` body: three parallel `[timestamp_ms, value]` series.
#[derive(Debug, Deserialize)]
struct MarketChartPayload {
    prices: Vec<(i64, Option<f64>)>,
    market_caps: Vec<(i64, Option<f64>)>,
    total_volumes: Vec<(i64, Option<f64>)>,
}

/// Reshape a `market_chart` JSON body into a table.
///
/// The three series must have equal length and agree on the timestamp at
/// every index. Values may be `null`.
pub fn parse_market_chart(body: &str) -> Result<MarketTable, SourceError> {
    let payload: MarketChartPayload = serde_json::from_str(body).map_err(|e| {
        SourceError::malformed(format!("failed to parse coingecko market chart: {e}"))
    })?;

    let MarketChartPayload {
        prices,
        market_caps,
        total_volumes,
    } = payload;

    if prices.len() != market_caps.len() || prices.len() != total_volumes.len() {
        return Err(SourceError::malformed(format!(
            "coingecko series lengths differ: prices={}, market_caps={}, total_volumes={}",
            prices.len(),
            market_caps.len(),
            total_volumes.len()
        )));
    }

    prices
        .into_iter()
        .zip(market_caps)
        .zip(total_volumes)
        .enumerate()
        .map(|(index, (((ts, price), (cap_ts, market_cap)), (vol_ts, volume)))| {
            if ts != cap_ts || ts != vol_ts {
                return Err(SourceError::malformed(format!(
                    "coingecko series misaligned at index {index}: {ts} / {cap_ts} / {vol_ts}"
                )));
            }
            let date = SnapshotDate::from_epoch_ms(ts)
                .map_err(|e| SourceError::malformed(e.to_string()))?;
            Ok(MarketSnapshotRow {
                date,
                price,
                market_cap,
                volume,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(MarketTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use std::sync::Mutex;

    const BODY: &str = r#"{
        "prices": [[1704067200000, 42280.23], [1704153600000, 44187.14]],
        "market_caps": [[1704067200000, 827000000000.0], [1704153600000, 865000000000.0]],
        "total_volumes": [[1704067200000, 13100000000.0], [1704153600000, 18200000000.0]]
    }"#;

    #[derive(Debug)]
    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn new(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn requests_daily_usd_series_for_window() {
        let client = Arc::new(RecordingHttpClient::new(Ok(HttpResponse::ok_json(BODY))));
        let adapter = CoinGeckoAdapter::with_http_client(client.clone())
            .with_base_url("https://api.example.test/v3/");

        let table = adapter
            .market_chart(MarketChartRequest::new(30).expect("valid"))
            .await
            .expect("fetch should succeed");
        assert_eq!(table.shape(), (2, 4));

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(
            request.url,
            "https://api.example.test/v3/coins/bitcoin/market_chart"
        );
        assert_eq!(request.query_param("vs_currency"), Some("usd"));
        assert_eq!(request.query_param("days"), Some("30"));
        assert_eq!(request.query_param("interval"), Some("daily"));
        assert!(!request.headers.contains_key("x-cg-demo-api-key"));
    }

    #[tokio::test]
    async fn api_key_is_sent_as_header() {
        let client = Arc::new(RecordingHttpClient::new(Ok(HttpResponse::ok_json(BODY))));
        let adapter = CoinGeckoAdapter::with_http_client(client.clone()).with_api_key("demo-key");

        adapter
            .market_chart(MarketChartRequest::default())
            .await
            .expect("fetch should succeed");

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].headers.get("x-cg-demo-api-key").map(String::as_str),
            Some("demo-key")
        );
        assert_eq!(requests[0].query_param("days"), Some("365"));
    }

    #[tokio::test]
    async fn transport_failure_is_a_fetch_error() {
        let client = Arc::new(RecordingHttpClient::new(Err(HttpError::new("connection reset"))));
        let adapter = CoinGeckoAdapter::with_http_client(client);

        let err = adapter
            .market_chart(MarketChartRequest::default())
            .await
            .expect_err("transport failure");
        assert_eq!(err.kind(), SourceErrorKind::Transport);
        assert!(err.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        for (status, kind) in [
            (429, SourceErrorKind::RateLimited),
            (401, SourceErrorKind::UpstreamStatus),
            (500, SourceErrorKind::UpstreamStatus),
        ] {
            let client = Arc::new(RecordingHttpClient::new(Ok(HttpResponse::with_status(
                status,
                r#"{"status":{"error_code":1}}"#,
            ))));
            let adapter = CoinGeckoAdapter::with_http_client(client);

            let err = adapter
                .market_chart(MarketChartRequest::default())
                .await
                .expect_err("non-success status");
            assert_eq!(err.kind(), kind, "status {status}");
        }
    }

    #[test]
    fn parses_aligned_series_into_rows() {
        let table = parse_market_chart(BODY).expect("valid body");
        let first = table.rows()[0];

        assert_eq!(first.date.format_rfc3339(), "2024-01-01T00:00:00Z");
        assert_eq!(first.price, Some(42280.23));
        assert_eq!(first.market_cap, Some(827_000_000_000.0));
        assert_eq!(first.volume, Some(13_100_000_000.0));
    }

    #[test]
    fn null_values_are_kept_for_validation() {
        let body = r#"{
            "prices": [[1704067200000, null]],
            "market_caps": [[1704067200000, 1.0]],
            "total_volumes": [[1704067200000, null]]
        }"#;

        let table = parse_market_chart(body).expect("nulls are not a parse error");
        assert_eq!(table.rows()[0].price, None);
        assert_eq!(table.rows()[0].volume, None);
    }

    #[test]
    fn unequal_series_lengths_are_rejected() {
        let body = r#"{
            "prices": [[1704067200000, 1.0], [1704153600000, 2.0]],
            "market_caps": [[1704067200000, 1.0]],
            "total_volumes": [[1704067200000, 1.0], [1704153600000, 2.0]]
        }"#;

        let err = parse_market_chart(body).expect_err("length mismatch");
        assert_eq!(err.kind(), SourceErrorKind::Malformed);
        assert!(err.message().contains("market_caps=1"));
    }

    #[test]
    fn misaligned_timestamps_are_rejected() {
        let body = r#"{
            "prices": [[1704067200000, 1.0]],
            "market_caps": [[1704153600000, 1.0]],
            "total_volumes": [[1704067200000, 1.0]]
        }"#;

        let err = parse_market_chart(body).expect_err("misaligned");
        assert!(err.message().contains("index 0"));
    }

    #[test]
    fn missing_series_or_bad_json_is_malformed() {
        for body in [
            r#"{"prices": [], "market_caps": []}"#,
            r#"{"status": {"error_code": 429}}"#,
            "<html>Too Many Requests</html>",
            r#"{"prices": [[1704067200000]], "market_caps": [], "total_volumes": []}"#,
        ] {
            let err = parse_market_chart(body).expect_err(body);
            assert_eq!(err.kind(), SourceErrorKind::Malformed, "{body}");
        }
    }

    #[test]
    fn empty_series_produce_empty_table() {
        let table = parse_market_chart(r#"{"prices": [], "market_caps": [], "total_volumes": []}"#)
            .expect("empty body");
        assert!(table.is_empty());
    }
}
