/// Booking model and database operations
///
/// Bookings belong to exactly one property and are only reachable through it:
/// every owner-scoped query joins `properties` and filters on `owner_id`.
///
/// Monetary fields are `NUMERIC(10, 2)` mapped to [`rust_decimal::Decimal`].
/// The table enforces `check_in_date < check_out_date`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status")]
pub enum BookingStatus {
    #[default]
    #[sqlx(rename = "confirmed")]
    #[serde(rename = "confirmed")]
    Confirmed,

    #[sqlx(rename = "cancelled")]
    #[serde(rename = "cancelled")]
    Cancelled,

    #[sqlx(rename = "completed")]
    #[serde(rename = "completed")]
    Completed,

    #[sqlx(rename = "in-progress")]
    #[serde(rename = "in-progress")]
    InProgress,
}

/// Guest reservation on a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: i32,
    pub total_amount: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub service_fee: Option<Decimal>,
    pub status: BookingStatus,

    /// External channel (airbnb, vrbo, booking.com, direct)
    pub platform: Option<String>,

    /// Reservation id on the external channel
    pub platform_booking_id: Option<String>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a stay is at least one night long
pub fn is_valid_stay(check_in: NaiveDate, check_out: NaiveDate) -> bool {
    check_in < check_out
}

/// Input for creating a booking
#[derive(Debug, Clone, PartialEq)]
pub struct CreateBooking {
    pub property_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: i32,
    pub total_amount: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub service_fee: Option<Decimal>,
    pub status: BookingStatus,
    pub platform: Option<String>,
    pub platform_booking_id: Option<String>,
    pub notes: Option<String>,
}

/// Partial booking update; the parent property cannot be changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBooking {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<Option<String>>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub number_of_guests: Option<i32>,
    pub total_amount: Option<Decimal>,
    pub cleaning_fee: Option<Option<Decimal>>,
    pub service_fee: Option<Option<Decimal>>,
    pub status: Option<BookingStatus>,
    pub platform: Option<Option<String>>,
    pub platform_booking_id: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl UpdateBooking {
    /// The date range the booking would have after this update
    pub fn merged_dates(&self, current: &Booking) -> (NaiveDate, NaiveDate) {
        (
            self.check_in_date.unwrap_or(current.check_in_date),
            self.check_out_date.unwrap_or(current.check_out_date),
        )
    }
}

impl Booking {
    /// Inserts a new booking
    ///
    /// # Errors
    ///
    /// Check violation for an empty or inverted stay; unique violation when the
    /// platform reservation is already recorded.
    pub async fn create(pool: &PgPool, data: CreateBooking) -> Result<Self, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (property_id, guest_name, guest_email, guest_phone,
                                  check_in_date, check_out_date, number_of_guests,
                                  total_amount, cleaning_fee, service_fee, status,
                                  platform, platform_booking_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, property_id, guest_name, guest_email, guest_phone,
                      check_in_date, check_out_date, number_of_guests, total_amount,
                      cleaning_fee, service_fee, status, platform, platform_booking_id,
                      notes, created_at, updated_at
            "#,
        )
        .bind(data.property_id)
        .bind(data.guest_name)
        .bind(data.guest_email)
        .bind(data.guest_phone)
        .bind(data.check_in_date)
        .bind(data.check_out_date)
        .bind(data.number_of_guests)
        .bind(data.total_amount)
        .bind(data.cleaning_fee)
        .bind(data.service_fee)
        .bind(data.status)
        .bind(data.platform)
        .bind(data.platform_booking_id)
        .bind(data.notes)
        .fetch_one(pool)
        .await?;

        Ok(booking)
    }

    /// Finds a booking whose property is owned by `owner_id`
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.id, b.property_id, b.guest_name, b.guest_email, b.guest_phone,
                   b.check_in_date, b.check_out_date, b.number_of_guests, b.total_amount,
                   b.cleaning_fee, b.service_fee, b.status, b.platform,
                   b.platform_booking_id, b.notes, b.created_at, b.updated_at
            FROM bookings b
            JOIN properties p ON p.id = b.property_id
            WHERE b.id = $1 AND p.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    /// Lists bookings across every property owned by `owner_id`
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.id, b.property_id, b.guest_name, b.guest_email, b.guest_phone,
                   b.check_in_date, b.check_out_date, b.number_of_guests, b.total_amount,
                   b.cleaning_fee, b.service_fee, b.status, b.platform,
                   b.platform_booking_id, b.notes, b.created_at, b.updated_at
            FROM bookings b
            JOIN properties p ON p.id = b.property_id
            WHERE p.owner_id = $1
            ORDER BY b.check_in_date ASC, b.id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(bookings)
    }

    /// Lists bookings for a single property (callers check ownership first)
    pub async fn list_by_property(
        pool: &PgPool,
        property_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_by_properties(pool, &[property_id]).await
    }

    /// Lists bookings for a batch of properties
    pub async fn list_by_properties(
        pool: &PgPool,
        property_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, property_id, guest_name, guest_email, guest_phone,
                   check_in_date, check_out_date, number_of_guests, total_amount,
                   cleaning_fee, service_fee, status, platform, platform_booking_id,
                   notes, created_at, updated_at
            FROM bookings
            WHERE property_id = ANY($1)
            ORDER BY check_in_date ASC, id ASC
            "#,
        )
        .bind(property_ids)
        .fetch_all(pool)
        .await?;

        Ok(bookings)
    }

    /// Applies a partial update to a booking whose property `owner_id` owns
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateBooking,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE bookings SET updated_at = NOW()");

        if let Some(guest_name) = data.guest_name {
            query.push(", guest_name = ").push_bind(guest_name);
        }
        if let Some(guest_email) = data.guest_email {
            query.push(", guest_email = ").push_bind(guest_email);
        }
        if let Some(guest_phone) = data.guest_phone {
            query.push(", guest_phone = ").push_bind(guest_phone);
        }
        if let Some(check_in_date) = data.check_in_date {
            query.push(", check_in_date = ").push_bind(check_in_date);
        }
        if let Some(check_out_date) = data.check_out_date {
            query.push(", check_out_date = ").push_bind(check_out_date);
        }
        if let Some(number_of_guests) = data.number_of_guests {
            query.push(", number_of_guests = ").push_bind(number_of_guests);
        }
        if let Some(total_amount) = data.total_amount {
            query.push(", total_amount = ").push_bind(total_amount);
        }
        if let Some(cleaning_fee) = data.cleaning_fee {
            query.push(", cleaning_fee = ").push_bind(cleaning_fee);
        }
        if let Some(service_fee) = data.service_fee {
            query.push(", service_fee = ").push_bind(service_fee);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(platform) = data.platform {
            query.push(", platform = ").push_bind(platform);
        }
        if let Some(platform_booking_id) = data.platform_booking_id {
            query.push(", platform_booking_id = ").push_bind(platform_booking_id);
        }
        if let Some(notes) = data.notes {
            query.push(", notes = ").push_bind(notes);
        }

        query.push(" WHERE id = ").push_bind(id);
        query
            .push(" AND property_id IN (SELECT id FROM properties WHERE owner_id = ")
            .push_bind(owner_id)
            .push(")");
        query.push(
            " RETURNING id, property_id, guest_name, guest_email, guest_phone, \
             check_in_date, check_out_date, number_of_guests, total_amount, \
             cleaning_fee, service_fee, status, platform, platform_booking_id, \
             notes, created_at, updated_at",
        );

        let booking = query.build_query_as::<Booking>().fetch_optional(pool).await?;

        Ok(booking)
    }

    /// Deletes a booking whose property `owner_id` owns
    pub async fn delete_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM bookings
            WHERE id = $1
              AND property_id IN (SELECT id FROM properties WHERE owner_id = $2)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_valid_stay() {
        assert!(is_valid_stay(date(2025, 7, 1), date(2025, 7, 2)));
        assert!(!is_valid_stay(date(2025, 7, 2), date(2025, 7, 2)));
        assert!(!is_valid_stay(date(2025, 7, 3), date(2025, 7, 2)));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(BookingStatus::InProgress).unwrap(),
            "in-progress"
        );
        let parsed: BookingStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, BookingStatus::Cancelled);
        assert_eq!(BookingStatus::default(), BookingStatus::Confirmed);
    }

    #[test]
    fn test_merged_dates_prefers_update() {
        let booking = Booking {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            guest_name: "Guest".to_string(),
            guest_email: "guest@example.com".to_string(),
            guest_phone: None,
            check_in_date: date(2025, 7, 1),
            check_out_date: date(2025, 7, 5),
            number_of_guests: 2,
            total_amount: Decimal::new(50000, 2),
            cleaning_fee: None,
            service_fee: None,
            status: BookingStatus::Confirmed,
            platform: None,
            platform_booking_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let update = UpdateBooking {
            check_in_date: Some(date(2025, 7, 6)),
            ..Default::default()
        };
        let (check_in, check_out) = update.merged_dates(&booking);
        assert_eq!(check_in, date(2025, 7, 6));
        assert_eq!(check_out, date(2025, 7, 5));
        assert!(!is_valid_stay(check_in, check_out));
    }
}
