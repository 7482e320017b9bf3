/// Property endpoints
///
/// Every route is scoped to the caller's own properties. A property owned by
/// someone else answers 404 exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /properties` - Owned properties with bookings and work orders
/// - `POST /properties` - Create a property owned by the caller
/// - `GET /properties/:id` - One property with bookings and work orders
/// - `PATCH /properties/:id` - Partial update
/// - `DELETE /properties/:id` - Delete (409 while bookings or work orders remain)
/// - `GET /properties/:id/bookings`
/// - `GET /properties/:id/work-orders`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{nullable, CurrentUser, ValidatedJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ownerpulse_shared::{
    auth::authorization::require_property_owner,
    models::{
        booking::Booking,
        property::{CreateProperty, Property, PropertyStatus, PropertyWithRelations, UpdateProperty},
        work_order::WorkOrder,
    },
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create property request
///
/// The owner is always the caller; an `ownerId` in the body is ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 255, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,

    #[validate(length(min = 1, max = 20, message = "Zip code is required"))]
    pub zip_code: String,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub bedrooms: i32,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub bathrooms: i32,

    pub description: Option<String>,

    #[serde(default)]
    pub amenities: Vec<String>,

    #[serde(default)]
    pub images: Vec<String>,

    pub status: Option<PropertyStatus>,
}

/// Partial property update; `null` clears optional fields
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Address must not be empty"))]
    pub address: Option<String>,

    #[validate(length(min = 1, max = 100, message = "City must not be empty"))]
    pub city: Option<String>,

    #[validate(length(min = 1, max = 100, message = "State must not be empty"))]
    pub state: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Zip code must not be empty"))]
    pub zip_code: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub latitude: Option<Option<f64>>,

    #[serde(default, deserialize_with = "nullable")]
    pub longitude: Option<Option<f64>>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub bedrooms: Option<i32>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub bathrooms: Option<i32>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<PropertyStatus>,
}

/// Latitude within ±90, longitude within ±180
fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> ApiResult<()> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::invalid("latitude", "Latitude must be between -90 and 90"));
        }
    }
    if let Some(lng) = longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ApiError::invalid(
                "longitude",
                "Longitude must be between -180 and 180",
            ));
        }
    }
    Ok(())
}

impl From<UpdatePropertyRequest> for UpdateProperty {
    fn from(req: UpdatePropertyRequest) -> Self {
        UpdateProperty {
            name: req.name,
            address: req.address,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
            latitude: req.latitude,
            longitude: req.longitude,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            description: req.description,
            amenities: req.amenities,
            images: req.images,
            status: req.status,
        }
    }
}

fn property_not_found() -> ApiError {
    ApiError::NotFound("Property not found".to_string())
}

/// Lists the caller's properties with their dependents
///
/// # Endpoint
///
/// ```text
/// GET /properties
/// ```
pub async fn list_properties(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<PropertyWithRelations>>> {
    let properties = Property::list_by_owner(&state.db, caller.id).await?;
    let properties = Property::with_relations(&state.db, properties).await?;

    Ok(Json(properties))
}

/// Creates a property owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /properties
/// ```
///
/// # Response
///
/// 201 with the property; `ownerId` is the caller's id.
///
/// # Errors
///
/// - 422: validation failed
pub async fn create_property(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreatePropertyRequest>,
) -> ApiResult<(StatusCode, Json<Property>)> {
    check_coordinates(req.latitude, req.longitude)?;

    let property = Property::create(
        &state.db,
        CreateProperty {
            name: req.name,
            address: req.address,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
            latitude: req.latitude,
            longitude: req.longitude,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            description: req.description,
            amenities: req.amenities,
            images: req.images,
            status: req.status.unwrap_or_default(),
            owner_id: caller.id,
        },
    )
    .await?;

    info!(property_id = %property.id, owner_id = %caller.id, "Property created");

    Ok((StatusCode::CREATED, Json(property)))
}

/// Fetches one owned property with its dependents
///
/// # Errors
///
/// - 404: missing or not the caller's
pub async fn get_property(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PropertyWithRelations>> {
    let property = require_property_owner(&state.db, &caller, id).await?;

    let property = Property::with_relations(&state.db, vec![property])
        .await?
        .pop()
        .ok_or_else(property_not_found)?;

    Ok(Json(property))
}

/// Partially updates an owned property
///
/// # Errors
///
/// - 404: missing or not the caller's
/// - 422: validation failed
pub async fn update_property(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePropertyRequest>,
) -> ApiResult<Json<Property>> {
    check_coordinates(req.latitude.flatten(), req.longitude.flatten())?;

    let property = Property::update_owned(&state.db, id, caller.id, req.into())
        .await?
        .ok_or_else(property_not_found)?;

    Ok(Json(property))
}

/// Deletes an owned property
///
/// # Errors
///
/// - 404: missing or not the caller's
/// - 409: bookings or work orders still reference it
pub async fn delete_property(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Property::delete_owned(&state.db, id, caller.id).await? {
        return Err(property_not_found());
    }

    info!(property_id = %id, owner_id = %caller.id, "Property deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Bookings on an owned property, ordered by check-in
pub async fn list_property_bookings(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Booking>>> {
    let property = require_property_owner(&state.db, &caller, id).await?;
    let bookings = Booking::list_by_property(&state.db, property.id).await?;

    Ok(Json(bookings))
}

/// Work orders on an owned property
pub async fn list_property_work_orders(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<WorkOrder>>> {
    let property = require_property_owner(&state.db, &caller, id).await?;
    let work_orders = WorkOrder::list_by_property(&state.db, property.id).await?;

    Ok(Json(work_orders))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_ignores_owner_id() {
        let req: CreatePropertyRequest = serde_json::from_str(
            r#"{"name":"Cabin","bedrooms":3,"bathrooms":2,"address":"1 Lake Rd",
                "city":"Tahoe","state":"CA","zipCode":"96150",
                "ownerId":"00000000-0000-0000-0000-000000000001"}"#,
        )
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(req.amenities.is_empty());
        assert!(req.status.is_none());
    }

    #[test]
    fn test_create_request_rejects_negative_rooms() {
        let req: CreatePropertyRequest = serde_json::from_str(
            r#"{"name":"","bedrooms":-1,"bathrooms":2,"address":"1 Lake Rd",
                "city":"Tahoe","state":"CA","zipCode":"96150"}"#,
        )
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("bedrooms"));
        assert!(fields.contains_key("name"));
        assert!(!fields.contains_key("bathrooms"));
    }

    #[test]
    fn test_update_request_clears_coordinates() {
        let req: UpdatePropertyRequest =
            serde_json::from_str(r#"{"latitude":null,"name":"Lodge"}"#).unwrap();
        assert!(check_coordinates(req.latitude.flatten(), req.longitude.flatten()).is_ok());

        let update: UpdateProperty = req.into();
        assert_eq!(update.latitude, Some(None));
        assert_eq!(update.longitude, None);
        assert_eq!(update.name.as_deref(), Some("Lodge"));
    }

    #[test]
    fn test_check_coordinates() {
        assert!(check_coordinates(Some(39.09), Some(-120.03)).is_ok());
        assert!(check_coordinates(None, None).is_ok());
        assert!(matches!(
            check_coordinates(Some(91.5), None),
            Err(ApiError::ValidationError(ref details)) if details[0].field == "latitude"
        ));
        assert!(matches!(
            check_coordinates(None, Some(200.0)),
            Err(ApiError::ValidationError(ref details)) if details[0].field == "longitude"
        ));
    }
}
