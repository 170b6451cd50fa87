use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dca_db::IdempotencyToken;
use dca_execution::{
    format_micros, ExchangeClient, ExchangeError, MarketBuyRequest, OrderLookup, SubmitOutcome,
};
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::debug;

use crate::auth::{auth_headers, CoinbaseCredentials};
use crate::response::{interpret_lookup_response, interpret_submit_response};

/// Wire body of `POST /orders`. Field order is the signed byte order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBody {
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub side: &'static str,
    pub product_id: String,
    /// Quote amount as an exact decimal string.
    pub funds: String,
    pub client_oid: String,
}

impl OrderBody {
    pub fn market_buy(request: &MarketBuyRequest) -> Self {
        Self {
            order_type: "market",
            side: request.side.as_str(),
            product_id: request.asset.as_str().to_string(),
            funds: format_micros(request.quote_micros),
            client_oid: request.idempotency_token.to_string(),
        }
    }
}

pub struct CoinbaseExchange {
    http: Client,
    base_url: String,
    credentials: CoinbaseCredentials,
}

impl CoinbaseExchange {
    pub fn new(
        base_url: impl Into<String>,
        credentials: CoinbaseCredentials,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a signed request and return `(status, body)`.
    async fn send(&self, method: Method, path: &str, body: String) -> Result<(u16, String), ExchangeError> {
        let timestamp = Utc::now().timestamp();
        let headers = auth_headers(&self.credentials, timestamp, method.as_str(), path, &body)?;

        let mut req = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .headers(headers);
        if !body.is_empty() {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ExchangeError::Timeout
            } else {
                ExchangeError::Transport(e.to_string())
            }
        })?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(format!("reading response body failed: {e}")))?;

        debug!(%method, path, status, "exchange response");
        Ok((status, text))
    }
}

#[async_trait]
impl ExchangeClient for CoinbaseExchange {
    async fn place_market_buy(
        &self,
        request: &MarketBuyRequest,
    ) -> Result<SubmitOutcome, ExchangeError> {
        let body = serde_json::to_string(&OrderBody::market_buy(request))
            .map_err(|e| ExchangeError::Decode(format!("order body encode failed: {e}")))?;
        let (status, text) = self.send(Method::POST, "/orders", body).await?;
        interpret_submit_response(status, &text)
    }

    async fn lookup_by_token(&self, token: &IdempotencyToken) -> Result<OrderLookup, ExchangeError> {
        let path = format!("/orders/client:{token}");
        let (status, text) = self.send(Method::GET, &path, String::new()).await?;
        interpret_lookup_response(status, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_db::AssetId;
    use uuid::Uuid;

    #[test]
    fn market_buy_body_serializes_in_signed_order() {
        let req = MarketBuyRequest::new(
            AssetId::new("BTC-USD"),
            25_000_000,
            IdempotencyToken(Uuid::nil()),
        );
        let body = serde_json::to_string(&OrderBody::market_buy(&req)).unwrap();
        assert_eq!(
            body,
            r#"{"type":"market","side":"buy","product_id":"BTC-USD","funds":"25.0","client_oid":"00000000-0000-0000-0000-000000000000"}"#
        );
    }

    #[test]
    fn funds_keep_one_decimal_precision() {
        let req = MarketBuyRequest::new(
            AssetId::new("ETH-USD"),
            33_300_000,
            IdempotencyToken(Uuid::nil()),
        );
        assert_eq!(OrderBody::market_buy(&req).funds, "33.3");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let ex = CoinbaseExchange::new(
            "https://api.example.test/",
            CoinbaseCredentials::new("k".into(), "c2VjcmV0".into(), "p".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(ex.base_url(), "https://api.example.test");
    }
}
