use serde_json::{json, Value};

use super::{format_price, PlatformStrategy};
use crate::models::{CreateListingPayload, HttpMethod, Platform, StepRequest, UploadImagePayload};
use crate::orchestration::step_generator::GenerationError;

const PHOTOS_PATH: &str = "/api/v2/photos";
const ITEMS_PATH: &str = "/api/v2/item_upload/items";

/// Vinted item upload API as driven through the browser proxy
#[derive(Debug, Clone, Copy, Default)]
pub struct VintedStrategy;

impl PlatformStrategy for VintedStrategy {
    fn platform(&self) -> Platform {
        Platform::Vinted
    }

    fn upload_image_request(&self, upload: &UploadImagePayload) -> StepRequest {
        StepRequest {
            method: HttpMethod::Post,
            path: PHOTOS_PATH.to_string(),
            payload: json!({
                "photo": {
                    "type": "item",
                    "url": upload.image_url,
                },
            }),
        }
    }

    fn create_listing_request(
        &self,
        listing: &CreateListingPayload,
    ) -> Result<StepRequest, GenerationError> {
        let assigned_photos: Vec<Value> = listing
            .photo_ids
            .iter()
            .map(|id| json!({ "id": id, "orientation": 0 }))
            .collect();

        Ok(StepRequest {
            method: HttpMethod::Post,
            path: ITEMS_PATH.to_string(),
            payload: json!({
                "item": {
                    "title": listing.title,
                    "description": listing.description,
                    "price": format_price(listing.price_cents),
                    "currency": listing.currency,
                    "catalog_id": listing.category_id,
                    "brand_id": listing.brand_id,
                    "color_ids": listing.color_ids,
                    "size_id": listing.size_id,
                    "status_id": listing.condition_id,
                    "assigned_photos": assigned_photos,
                },
                "upload_session_id": listing.reference,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_listing_inlines_photos_in_order() {
        let listing = CreateListingPayload {
            reference: "sku-1".to_string(),
            title: "Jacket".to_string(),
            description: String::new(),
            price_cents: 1250,
            currency: "EUR".to_string(),
            photo_ids: vec![json!(101), json!(102)],
            category_id: "1907".to_string(),
            brand_id: None,
            color_ids: vec![],
            size_id: None,
            condition_id: None,
            account_ref: None,
        };

        let request = VintedStrategy.create_listing_request(&listing).unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, ITEMS_PATH);
        assert_eq!(request.payload["item"]["price"], "12.50");
        assert_eq!(request.payload["item"]["assigned_photos"][0]["id"], 101);
        assert_eq!(request.payload["item"]["assigned_photos"][1]["id"], 102);
    }
}
