//! HTTP client for the remote commerce service.
//!
//! Uses `reqwest` with JSON bodies. Cart and wishlist state are never cached
//! here: every call goes to the service.

use std::sync::Arc;

use cartwheel_core::{Coupon, OrderConfirmation, OrderRequest, ProductId, WishlistEntry};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::wire::{
    AddItemBody, ApplyCouponBody, CouponLine, Envelope, ErrorBody, ProductBody, RemoveCouponBody,
};
use super::{ApiError, CartApi, OrderApi, WishlistApi};
use crate::config::ApiConfig;

/// Header carrying the checkout attempt id on order creation.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Client for the commerce service's cart, wishlist and order endpoints.
#[derive(Clone)]
pub struct HttpCommerceClient {
    inner: Arc<HttpCommerceClientInner>,
}

struct HttpCommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpCommerceClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCommerceClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            }),
        })
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Parse("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let builder = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json");
        Ok(match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Send a request and unwrap the payload from the envelope.
    async fn send_data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::send_raw(builder).await?;
        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse commerce service response"
            );
            ApiError::Parse(e.to_string())
        })?;
        envelope.into_data()
    }

    /// Send a request whose payload the service may omit.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let body = Self::send_raw(builder).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))?;
        envelope.into_optional()
    }

    /// Send a request whose payload is irrelevant. Empty bodies count as success.
    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let body = Self::send_raw(builder).await?;
        if body.trim().is_empty() {
            return Ok(());
        }
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))?;
        envelope.into_unit()
    }

    async fn send_raw(builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Commerce service returned non-success status"
            );
            return Err(classify_status(status.as_u16(), &body));
        }

        Ok(body)
    }
}

/// Map a non-success status and its body onto the error taxonomy.
fn classify_status(status: u16, body: &str) -> ApiError {
    let message = ErrorBody::message_from(body);
    match status {
        401 | 403 => ApiError::Unauthorized,
        404 => ApiError::NotFound(message),
        400 | 409 | 422 => ApiError::Rejected(message),
        _ => ApiError::Api { status, message },
    }
}

impl CartApi for HttpCommerceClient {
    #[instrument(skip_all, fields(product_id = %product_id, quantity = quantity))]
    async fn add_cart_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &["cart", "items"])?
            .json(&AddItemBody {
                product_id,
                quantity,
            });
        self.send_unit(builder).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &["cart"])?;
        self.send_unit(builder).await
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn apply_coupon(&self, code: &str, items: &[CouponLine]) -> Result<Coupon, ApiError> {
        let builder = self
            .request(Method::POST, &["cart", "coupon"])?
            .json(&ApplyCouponBody { code, items });
        self.send_data(builder).await
    }

    #[instrument(skip(self))]
    async fn remove_coupon(&self, code: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::DELETE, &["cart", "coupon"])?
            .json(&RemoveCouponBody { code });
        self.send_unit(builder).await
    }
}

impl WishlistApi for HttpCommerceClient {
    #[instrument(skip(self))]
    async fn get_wishlist(&self) -> Result<Vec<WishlistEntry>, ApiError> {
        let builder = self.request(Method::GET, &["wishlist"])?;
        self.send_data(builder).await
    }

    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn add_to_wishlist(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<WishlistEntry>, ApiError> {
        let builder = self
            .request(Method::POST, &["wishlist"])?
            .json(&ProductBody { product_id });
        self.send_optional(builder).await
    }

    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &["wishlist", product_id.as_str()])?;
        self.send_unit(builder).await
    }

    #[instrument(skip(self))]
    async fn clear_wishlist(&self) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &["wishlist"])?;
        self.send_unit(builder).await
    }

    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn move_to_cart(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let builder = self.request(
            Method::POST,
            &["wishlist", product_id.as_str(), "move-to-cart"],
        )?;
        self.send_unit(builder).await
    }
}

impl OrderApi for HttpCommerceClient {
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    async fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: &str,
    ) -> Result<OrderConfirmation, ApiError> {
        let builder = self
            .request(Method::POST, &["orders"])?
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(request);
        self.send_data(builder).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> HttpCommerceClient {
        HttpCommerceClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            token: None,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let v1 = client("https://shop.example.com/api/v1/");
        let url = v1.endpoint(&["cart", "items"]).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/api/v1/cart/items");

        let bare = client("https://shop.example.com/api");
        let url = bare.endpoint(&["wishlist"]).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/api/wishlist");
    }

    #[test]
    fn test_endpoint_encodes_product_ids() {
        let api = client("https://shop.example.com/api/");
        let url = api
            .endpoint(&["wishlist", "a/b c", "move-to-cart"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com/api/wishlist/a%2Fb%20c/move-to-cart"
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(401, ""), ApiError::Unauthorized));
        assert!(matches!(classify_status(403, ""), ApiError::Unauthorized));
        assert!(classify_status(404, r#"{"message":"Cart not found"}"#).is_not_found());
        match classify_status(422, r#"{"message":"Coupon expired"}"#) {
            ApiError::Rejected(msg) => assert_eq!(msg, "Coupon expired"),
            other => panic!("expected rejection, got {other:?}"),
        }
        match classify_status(503, "maintenance") {
            ApiError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
