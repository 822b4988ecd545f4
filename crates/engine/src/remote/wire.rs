//! Request and response bodies exchanged with the commerce service.

use cartwheel_core::{LineItem, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap a payload-carrying envelope.
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(self.rejection_message()));
        }
        self.data
            .ok_or_else(|| ApiError::Parse("response has no data".to_string()))
    }

    /// Unwrap an envelope whose payload may be omitted.
    pub fn into_optional(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected(self.rejection_message()))
        }
    }

    /// Accept an envelope whose payload is irrelevant.
    pub fn into_unit(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(self.rejection_message()))
        }
    }

    fn rejection_message(&self) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "request was rejected".to_string())
    }
}

/// Error body shape for non-2xx responses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message from a raw error body.
    pub fn message_from(raw: &str) -> String {
        serde_json::from_str::<Self>(raw)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| raw.chars().take(200).collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddItemBody<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductBody<'a> {
    pub product_id: &'a ProductId,
}

#[derive(Debug, Serialize)]
pub(super) struct ApplyCouponBody<'a> {
    pub code: &'a str,
    pub items: &'a [CouponLine],
}

#[derive(Debug, Serialize)]
pub(super) struct RemoveCouponBody<'a> {
    pub code: &'a str,
}

/// Cart snapshot line sent with a coupon validation request.
///
/// Discount rules may depend on cart contents (category restrictions,
/// minimum spend), so the service sees what the shopper currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&LineItem> for CouponLine {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.id.clone(),
            quantity: item.quantity,
            price: item.price,
            category: item.category.clone(),
        }
    }
}
