use serde_json::json;

use super::{format_price, PlatformStrategy};
use crate::models::{CreateListingPayload, HttpMethod, Platform, StepRequest, UploadImagePayload};
use crate::orchestration::step_generator::GenerationError;

const CREATE_IMAGE_PATH: &str = "/commerce/media/v1_beta/image/create_image_from_url";
const INVENTORY_ITEM_PATH: &str = "/sell/inventory/v1/inventory_item";

/// eBay Sell Inventory API
#[derive(Debug, Clone, Copy, Default)]
pub struct EbayStrategy;

impl PlatformStrategy for EbayStrategy {
    fn platform(&self) -> Platform {
        Platform::Ebay
    }

    fn upload_image_request(&self, upload: &UploadImagePayload) -> StepRequest {
        StepRequest {
            method: HttpMethod::Post,
            path: CREATE_IMAGE_PATH.to_string(),
            payload: json!({ "imageUrl": upload.image_url }),
        }
    }

    fn create_listing_request(
        &self,
        listing: &CreateListingPayload,
    ) -> Result<StepRequest, GenerationError> {
        // Inventory items cannot be created without an item condition
        let condition = listing
            .condition_id
            .as_ref()
            .ok_or_else(|| GenerationError::UnresolvedAttribute {
                attribute: "condition".to_string(),
                reason: "eBay inventory items require a condition".to_string(),
            })?;

        Ok(StepRequest {
            method: HttpMethod::Put,
            path: format!("{INVENTORY_ITEM_PATH}/{}", listing.reference),
            payload: json!({
                "condition": condition,
                "availability": {
                    "shipToLocationAvailability": { "quantity": 1 },
                },
                "product": {
                    "title": listing.title,
                    "description": listing.description,
                    "imageIds": listing.photo_ids,
                    "brand": listing.brand_id,
                    "aspects": {
                        "Color": listing.color_ids,
                        "Size": listing.size_id.iter().collect::<Vec<_>>(),
                    },
                },
                "categoryId": listing.category_id,
                "pricingSummary": {
                    "price": {
                        "value": format_price(listing.price_cents),
                        "currency": listing.currency,
                    },
                },
                "merchantLocationKey": listing.account_ref,
            }),
        })
    }
}
