/// Booking endpoints
///
/// Bookings are reached through their property's owner; a booking on
/// someone else's property answers 404.
///
/// # Endpoints
///
/// - `GET /bookings` - All bookings on the caller's properties, by check-in
/// - `POST /bookings` - Create a booking on an owned property
/// - `GET /bookings/:id`
/// - `PATCH /bookings/:id`
/// - `DELETE /bookings/:id`
///
/// A stay must be at least one night: check-in strictly before check-out.
/// PATCH checks the dates the booking would end up with.

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
        booking::{is_valid_stay, Booking, BookingStatus, CreateBooking, UpdateBooking},
        money_problem,
    },
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create booking request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub property_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Guest name is required"))]
    pub guest_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub guest_email: String,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub guest_phone: Option<String>,

    /// `YYYY-MM-DD`
    pub check_in_date: NaiveDate,

    /// `YYYY-MM-DD`, after `checkInDate`
    pub check_out_date: NaiveDate,

    #[validate(range(min = 1, message = "At least one guest is required"))]
    pub number_of_guests: i32,

    /// Decimal with two places, sent as a string or number
    pub total_amount: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub service_fee: Option<Decimal>,

    pub status: Option<BookingStatus>,

    /// e.g. `airbnb`, `vrbo`
    pub platform: Option<String>,
    pub platform_booking_id: Option<String>,

    pub notes: Option<String>,
}

/// Partial booking update; `null` clears optional fields
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    #[validate(length(min = 1, max = 255, message = "Guest name must not be empty"))]
    pub guest_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub guest_email: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub guest_phone: Option<Option<String>>,

    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,

    #[validate(range(min = 1, message = "At least one guest is required"))]
    pub number_of_guests: Option<i32>,

    pub total_amount: Option<Decimal>,

    #[serde(default, deserialize_with = "nullable")]
    pub cleaning_fee: Option<Option<Decimal>>,

    #[serde(default, deserialize_with = "nullable")]
    pub service_fee: Option<Option<Decimal>>,

    pub status: Option<BookingStatus>,

    #[serde(default, deserialize_with = "nullable")]
    pub platform: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub platform_booking_id: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl From<UpdateBookingRequest> for UpdateBooking {
    fn from(req: UpdateBookingRequest) -> Self {
        UpdateBooking {
            guest_name: req.guest_name,
            guest_email: req.guest_email,
            guest_phone: req.guest_phone,
            check_in_date: req.check_in_date,
            check_out_date: req.check_out_date,
            number_of_guests: req.number_of_guests,
            total_amount: req.total_amount,
            cleaning_fee: req.cleaning_fee,
            service_fee: req.service_fee,
            status: req.status,
            platform: req.platform,
            platform_booking_id: req.platform_booking_id,
            notes: req.notes,
        }
    }
}

/// Collects stay and money problems into one validation error
fn check_booking(
    stay: Option<(NaiveDate, NaiveDate)>,
    amounts: &[(&str, Option<Decimal>)],
) -> ApiResult<()> {
    let mut details = Vec::new();

    if let Some((check_in, check_out)) = stay {
        if !is_valid_stay(check_in, check_out) {
            details.push(ValidationErrorDetail::new(
                "checkOutDate",
                "Check-out must be after check-in",
            ));
        }
    }

    for (field, amount) in amounts {
        if let Some(problem) = amount.as_ref().and_then(money_problem) {
            details.push(ValidationErrorDetail::new(*field, problem));
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(details))
    }
}

fn booking_not_found() -> ApiError {
    ApiError::NotFound("Booking not found".to_string())
}

/// Lists bookings across the caller's properties
///
/// # Endpoint
///
/// ```text
/// GET /bookings
/// ```
pub async fn list_bookings(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> ApiResult<Json<Vec<Booking>>> {
    let bookings = Booking::list_by_owner(&state.db, caller.id).await?;
    Ok(Json(bookings))
}

/// Creates a booking
///
/// # Endpoint
///
/// ```text
/// POST /bookings
/// ```
///
/// # Errors
///
/// - 404: property missing or not the caller's
/// - 409: platform reservation already recorded
/// - 422: validation failed, including an empty or inverted stay
pub async fn create_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    check_booking(
        Some((req.check_in_date, req.check_out_date)),
        &[
            ("totalAmount", Some(req.total_amount)),
            ("cleaningFee", req.cleaning_fee),
            ("serviceFee", req.service_fee),
        ],
    )?;

    let property = require_property_owner(&state.db, &caller, req.property_id).await?;

    let booking = Booking::create(
        &state.db,
        CreateBooking {
            property_id: property.id,
            guest_name: req.guest_name,
            guest_email: req.guest_email,
            guest_phone: req.guest_phone,
            check_in_date: req.check_in_date,
            check_out_date: req.check_out_date,
            number_of_guests: req.number_of_guests,
            total_amount: req.total_amount,
            cleaning_fee: req.cleaning_fee,
            service_fee: req.service_fee,
            status: req.status.unwrap_or_default(),
            platform: req.platform,
            platform_booking_id: req.platform_booking_id,
            notes: req.notes,
        },
    )
    .await?;

    info!(booking_id = %booking.id, property_id = %property.id, "Booking created");

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Fetches one booking
///
/// # Errors
///
/// - 404: missing or on someone else's property
pub async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Booking>> {
    let booking = Booking::find_owned(&state.db, id, caller.id)
        .await?
        .ok_or_else(booking_not_found)?;

    Ok(Json(booking))
}

/// Partially updates a booking
///
/// # Errors
///
/// - 404: missing or on someone else's property
/// - 422: validation failed, including a stay that would become inverted
pub async fn update_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBookingRequest>,
) -> ApiResult<Json<Booking>> {
    let update: UpdateBooking = req.into();

    let stay = if update.check_in_date.is_some() || update.check_out_date.is_some() {
        let current = Booking::find_owned(&state.db, id, caller.id)
            .await?
            .ok_or_else(booking_not_found)?;
        Some(update.merged_dates(&current))
    } else {
        None
    };

    check_booking(
        stay,
        &[
            ("totalAmount", update.total_amount),
            ("cleaningFee", update.cleaning_fee.flatten()),
            ("serviceFee", update.service_fee.flatten()),
        ],
    )?;

    let booking = Booking::update_owned(&state.db, id, caller.id, update)
        .await?
        .ok_or_else(booking_not_found)?;

    Ok(Json(booking))
}

/// Deletes a booking
///
/// # Errors
///
/// - 404: missing or on someone else's property
pub async fn delete_booking(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Booking::delete_owned(&state.db, id, caller.id).await? {
        return Err(booking_not_found());
    }

    info!(booking_id = %id, "Booking deleted");

    Ok(StatusCode::NO_CONTENT)
}
