/// Work order endpoints
///
/// Scoped like bookings: only work orders on the caller's properties are
/// visible.
///
/// # Endpoints
///
/// - `GET /work-orders` - Most urgent first, then newest
/// - `POST /work-orders`
/// - `GET /work-orders/:id`
/// - `PATCH /work-orders/:id`
/// - `DELETE /work-orders/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{nullable, CurrentUser, ValidatedJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use ownerpulse_shared::{
    auth::authorization::require_property_owner,
    models::{
        money_problem,
        work_order::{
            CreateWorkOrder, UpdateWorkOrder, WorkOrder, WorkOrderPriority, WorkOrderStatus,
        },
    },
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create work order request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    pub property_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,

    /// maintenance, cleaning, repair, inspection
    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,

    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,

    pub contractor_name: Option<String>,
    pub contractor_phone: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub contractor_email: Option<String>,

    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,

    #[serde(default)]
    pub images: Vec<String>,

    pub notes: Option<String>,
}

/// Partial work order update; `null` clears optional fields
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrderRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: Option<String>,

    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,

    #[validate(length(min = 1, max = 50, message = "Category must not be empty"))]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub estimated_cost: Option<Option<Decimal>>,

    #[serde(default, deserialize_with = "nullable")]
    pub actual_cost: Option<Option<Decimal>>,

    #[serde(default, deserialize_with = "nullable")]
    pub contractor_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub contractor_phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub contractor_email: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub scheduled_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "nullable")]
    pub completed_date: Option<Option<NaiveDate>>,

    pub images: Option<Vec<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl From<UpdateWorkOrderRequest> for UpdateWorkOrder {
    fn from(req: UpdateWorkOrderRequest) -> Self {
        UpdateWorkOrder {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            category: req.category,
            estimated_cost: req.estimated_cost,
            actual_cost: req.actual_cost,
            contractor_name: req.contractor_name,
            contractor_phone: req.contractor_phone,
            contractor_email: req.contractor_email,
            scheduled_date: req.scheduled_date,
            completed_date: req.completed_date,
            images: req.images,
            notes: req.notes,
        }
    }
}

fn check_costs(estimated: Option<Decimal>, actual: Option<Decimal>) -> ApiResult<()> {
    let details: Vec<ValidationErrorDetail> = [("estimatedCost", estimated), ("actualCost", actual)]
        .into_iter()
        .filter_map(|(field, cost)| {
            cost.as_ref()
                .and_then(money_problem)
                .map(|problem| ValidationErrorDetail::new(field, problem))
        })
        .collect();

    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(details))
    }
}

fn work_order_not_found() -> ApiError {
    ApiError::NotFound("Work order not found".to_string())
}

/// Lists work orders across the caller's properties
pub async fn list_work_orders(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<WorkOrder>>> {
    let work_orders = WorkOrder::list_by_owner(&state.db, caller.id).await?;
    Ok(Json(work_orders))
}

/// Creates a work order
///
/// # Endpoint
///
/// ```text
/// POST /work-orders
/// ```
///
/// # Errors
///
/// - 404: property missing or not the caller's
/// - 422: validation failed
pub async fn create_work_order(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateWorkOrderRequest>,
) -> ApiResult<(StatusCode, Json<WorkOrder>)> {
    check_costs(req.estimated_cost, req.actual_cost)?;

    let property = require_property_owner(&state.db, &caller, req.property_id).await?;

    let work_order = WorkOrder::create(
        &state.db,
        CreateWorkOrder {
            property_id: property.id,
            title: req.title,
            description: req.description,
            status: req.status.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            category: req.category,
            estimated_cost: req.estimated_cost,
            actual_cost: req.actual_cost,
            contractor_name: req.contractor_name,
            contractor_phone: req.contractor_phone,
            contractor_email: req.contractor_email,
            scheduled_date: req.scheduled_date,
            completed_date: req.completed_date,
            images: req.images,
            notes: req.notes,
        },
    )
    .await?;

    info!(
        work_order_id = %work_order.id,
        property_id = %property.id,
        priority = ?work_order.priority,
        "Work order created"
    );

    Ok((StatusCode::CREATED, Json(work_order)))
}

pub async fn get_work_order(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkOrder>> {
    let work_order = WorkOrder::find_owned(&state.db, id, caller.id)
        .await?
        .ok_or_else(work_order_not_found)?;

    Ok(Json(work_order))
}

/// Partially updates a work order
///
/// # Errors
///
/// - 404: missing or on someone else's property
/// - 422: validation failed
pub async fn update_work_order(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateWorkOrderRequest>,
) -> ApiResult<Json<WorkOrder>> {
    check_costs(req.estimated_cost.flatten(), req.actual_cost.flatten())?;

    let work_order = WorkOrder::update_owned(&state.db, id, caller.id, req.into())
        .await?
        .ok_or_else(work_order_not_found)?;

    Ok(Json(work_order))
}

pub async fn delete_work_order(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !WorkOrder::delete_owned(&state.db, id, caller.id).await? {
        return Err(work_order_not_found());
    }

    info!(work_order_id = %id, "Work order deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateWorkOrderRequest = serde_json::from_str(
            r#"{"propertyId":"6a1f7f4e-3a53-4c3e-9d0e-0a4bb1c3e2a1","title":"Fix leak",
                "description":"Kitchen sink drips","category":"repair"}"#,
        )
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(req.status.is_none());
        assert!(req.priority.is_none());
        assert!(req.images.is_empty());
    }

    #[test]
    fn test_wire_values() {
        let req: UpdateWorkOrderRequest =
            serde_json::from_str(r#"{"status":"in-progress","priority":"urgent"}"#).unwrap();
        assert_eq!(req.status, Some(WorkOrderStatus::InProgress));
        assert_eq!(req.priority, Some(WorkOrderPriority::Urgent));

        assert!(serde_json::from_str::<UpdateWorkOrderRequest>(r#"{"status":"in_progress"}"#)
            .is_err());
    }

    #[test]
    fn test_update_request_clears_contractor() {
        let req: UpdateWorkOrderRequest =
            serde_json::from_str(r#"{"contractorName":null,"contractorEmail":null}"#).unwrap();

        let update: UpdateWorkOrder = req.into();
        assert_eq!(update.contractor_name, Some(None));
        assert_eq!(update.contractor_email, Some(None));
        assert_eq!(update.contractor_phone, None);
    }

    #[test]
    fn test_check_costs() {
        assert!(check_costs(Some(Decimal::new(12500, 2)), None).is_ok());

        match check_costs(Some(Decimal::ONE), Some(Decimal::new(-1, 0))) {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "actualCost");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        match check_costs(Some(Decimal::new(100_000_000, 0)), Some(Decimal::new(1001, 3))) {
            Err(ApiError::ValidationError(details)) => {
                let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["estimatedCost", "actualCost"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
