use serde_json::json;

use super::{format_price, PlatformStrategy};
use crate::models::{CreateListingPayload, HttpMethod, Platform, StepRequest, UploadImagePayload};
use crate::orchestration::step_generator::GenerationError;

const UPLOAD_PATH: &str = "/v3/application/uploads/images";

/// Etsy Open API v3
#[derive(Debug, Clone, Copy, Default)]
pub struct EtsyStrategy;

impl PlatformStrategy for EtsyStrategy {
    fn platform(&self) -> Platform {
        Platform::Etsy
    }

    fn upload_image_request(&self, upload: &UploadImagePayload) -> StepRequest {
        StepRequest {
            method: HttpMethod::Post,
            path: UPLOAD_PATH.to_string(),
            payload: json!({
                "image_url": upload.image_url,
                "rank": upload.position,
            }),
        }
    }

    fn create_listing_request(
        &self,
        listing: &CreateListingPayload,
    ) -> Result<StepRequest, GenerationError> {
        let shop_id =
            listing
                .account_ref
                .as_ref()
                .ok_or_else(|| GenerationError::UnresolvedAttribute {
                    attribute: "account_ref".to_string(),
                    reason: "Etsy listings are created under a shop id".to_string(),
                })?;

        Ok(StepRequest {
            method: HttpMethod::Post,
            path: format!("/v3/application/shops/{shop_id}/listings"),
            payload: json!({
                "quantity": 1,
                "title": listing.title,
                "description": listing.description,
                "price": format_price(listing.price_cents),
                "currency_code": listing.currency,
                "taxonomy_id": listing.category_id,
                "image_ids": listing.photo_ids,
                "who_made": "someone_else",
                "when_made": "made_to_order",
                "sku": [listing.reference],
            }),
        })
    }
}
