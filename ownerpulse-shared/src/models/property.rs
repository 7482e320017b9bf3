/// Property model and database operations
///
/// Every property has exactly one owner. Reads and writes that act on behalf
/// of a caller go through the `*_owned` methods, which filter on `owner_id` in
/// SQL so another owner's row is indistinguishable from a missing one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE properties (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     address TEXT NOT NULL,
///     city TEXT NOT NULL,
///     state TEXT NOT NULL,
///     zip_code TEXT NOT NULL,
///     latitude DOUBLE PRECISION,
///     longitude DOUBLE PRECISION,
///     bedrooms INTEGER NOT NULL,
///     bathrooms INTEGER NOT NULL,
///     description TEXT,
///     amenities TEXT[] NOT NULL DEFAULT '{}',
///     images TEXT[] NOT NULL DEFAULT '{}',
///     status property_status NOT NULL DEFAULT 'active',
///     owner_id UUID NOT NULL REFERENCES users (id) ON DELETE RESTRICT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::booking::Booking;
use super::work_order::WorkOrder;

/// Listing status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "property_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Active,
    Inactive,
}

/// Rental property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub description: Option<String>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub status: PropertyStatus,

    /// Owning user (required)
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A property together with its dependent collections
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyWithRelations {
    #[serde(flatten)]
    pub property: Property,
    pub bookings: Vec<Booking>,
    pub work_orders: Vec<WorkOrder>,
}

/// Input for creating a property
///
/// `owner_id` is always set by the server from the resolved caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProperty {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub description: Option<String>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub status: PropertyStatus,
    pub owner_id: Uuid,
}

/// Partial property update; the owner cannot be changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateProperty {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub description: Option<Option<String>>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<PropertyStatus>,
}

impl Property {
    /// Inserts a new property
    pub async fn create(pool: &PgPool, data: CreateProperty) -> Result<Self, sqlx::Error> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (name, address, city, state, zip_code, latitude, longitude,
                                    bedrooms, bathrooms, description, amenities, images,
                                    status, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, name, address, city, state, zip_code, latitude, longitude,
                      bedrooms, bathrooms, description, amenities, images, status,
                      owner_id, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.address)
        .bind(data.city)
        .bind(data.state)
        .bind(data.zip_code)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.bedrooms)
        .bind(data.bathrooms)
        .bind(data.description)
        .bind(data.amenities)
        .bind(data.images)
        .bind(data.status)
        .bind(data.owner_id)
        .fetch_one(pool)
        .await?;

        Ok(property)
    }

    /// Finds a property by ID regardless of owner
    ///
    /// Not for request handling: anything on behalf of a caller goes through
    /// [`Property::find_owned`]. Kept for test assertions on stored rows.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, name, address, city, state, zip_code, latitude, longitude,
                   bedrooms, bathrooms, description, amenities, images, status,
                   owner_id, created_at, updated_at
            FROM properties
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(property)
    }

    /// Finds a property only if `owner_id` owns it
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, name, address, city, state, zip_code, latitude, longitude,
                   bedrooms, bathrooms, description, amenities, images, status,
                   owner_id, created_at, updated_at
            FROM properties
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(property)
    }

    /// Lists the properties owned by `owner_id`, oldest first
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let properties = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, name, address, city, state, zip_code, latitude, longitude,
                   bedrooms, bathrooms, description, amenities, images, status,
                   owner_id, created_at, updated_at
            FROM properties
            WHERE owner_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(properties)
    }

    /// Applies a partial update to a property owned by `owner_id`
    ///
    /// Returns `None` if the property doesn't exist or isn't owned by `owner_id`.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateProperty,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE properties SET updated_at = NOW()");

        if let Some(name) = data.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(address) = data.address {
            query.push(", address = ").push_bind(address);
        }
        if let Some(city) = data.city {
            query.push(", city = ").push_bind(city);
        }
        if let Some(state) = data.state {
            query.push(", state = ").push_bind(state);
        }
        if let Some(zip_code) = data.zip_code {
            query.push(", zip_code = ").push_bind(zip_code);
        }
        if let Some(latitude) = data.latitude {
            query.push(", latitude = ").push_bind(latitude);
        }
        if let Some(longitude) = data.longitude {
            query.push(", longitude = ").push_bind(longitude);
        }
        if let Some(bedrooms) = data.bedrooms {
            query.push(", bedrooms = ").push_bind(bedrooms);
        }
        if let Some(bathrooms) = data.bathrooms {
            query.push(", bathrooms = ").push_bind(bathrooms);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(amenities) = data.amenities {
            query.push(", amenities = ").push_bind(amenities);
        }
        if let Some(images) = data.images {
            query.push(", images = ").push_bind(images);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" AND owner_id = ").push_bind(owner_id);
        query.push(
            " RETURNING id, name, address, city, state, zip_code, latitude, longitude, \
             bedrooms, bathrooms, description, amenities, images, status, \
             owner_id, created_at, updated_at",
        );

        let property = query
            .build_query_as::<Property>()
            .fetch_optional(pool)
            .await?;

        Ok(property)
    }

    /// Deletes a property owned by `owner_id`
    ///
    /// Returns false if nothing matched.
    ///
    /// # Errors
    ///
    /// Fails with a foreign-key violation while bookings or work orders still
    /// reference the property.
    pub async fn delete_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads bookings and work orders for a batch of properties
    ///
    /// Two queries regardless of batch size. Input order is preserved.
    pub async fn with_relations(
        pool: &PgPool,
        properties: Vec<Property>,
    ) -> Result<Vec<PropertyWithRelations>, sqlx::Error> {
        if properties.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = properties.iter().map(|p| p.id).collect();
        let bookings = Booking::list_by_properties(pool, &ids).await?;
        let work_orders = WorkOrder::list_by_properties(pool, &ids).await?;

        Ok(attach_relations(properties, bookings, work_orders))
    }
}

/// Groups dependents under their parent property
pub fn attach_relations(
    properties: Vec<Property>,
    bookings: Vec<Booking>,
    work_orders: Vec<WorkOrder>,
) -> Vec<PropertyWithRelations> {
    let mut bookings_by_property: HashMap<Uuid, Vec<Booking>> = HashMap::new();
    for booking in bookings {
        bookings_by_property
            .entry(booking.property_id)
            .or_default()
            .push(booking);
    }

    let mut work_orders_by_property: HashMap<Uuid, Vec<WorkOrder>> = HashMap::new();
    for work_order in work_orders {
        work_orders_by_property
            .entry(work_order.property_id)
            .or_default()
            .push(work_order);
    }

    properties
        .into_iter()
        .map(|property| PropertyWithRelations {
            bookings: bookings_by_property.remove(&property.id).unwrap_or_default(),
            work_orders: work_orders_by_property
                .remove(&property.id)
                .unwrap_or_default(),
            property,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::booking::BookingStatus;
    use crate::models::work_order::{WorkOrderPriority, WorkOrderStatus};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    pub(crate) fn sample_property(owner_id: Uuid) -> Property {
        Property {
            id: Uuid::new_v4(),
            name: "Cabin".to_string(),
            address: "1 Lake Rd".to_string(),
            city: "Tahoe".to_string(),
            state: "CA".to_string(),
            zip_code: "96150".to_string(),
            latitude: None,
            longitude: None,
            bedrooms: 3,
            bathrooms: 2,
            description: None,
            amenities: vec!["WiFi".to_string()],
            images: Vec::new(),
            status: PropertyStatus::Active,
            owner_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_booking(property_id: Uuid) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            property_id,
            guest_name: "Guest".to_string(),
            guest_email: "guest@example.com".to_string(),
            guest_phone: None,
            check_in_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(),
            number_of_guests: 2,
            total_amount: Decimal::new(45000, 2),
            cleaning_fee: None,
            service_fee: None,
            status: BookingStatus::Confirmed,
            platform: None,
            platform_booking_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_work_order(property_id: Uuid) -> WorkOrder {
        WorkOrder {
            id: Uuid::new_v4(),
            property_id,
            title: "Fix sink".to_string(),
            description: "Leaking under the counter".to_string(),
            status: WorkOrderStatus::Pending,
            priority: WorkOrderPriority::Low,
            category: "repair".to_string(),
            estimated_cost: None,
            actual_cost: None,
            contractor_name: None,
            contractor_phone: None,
            contractor_email: None,
            scheduled_date: None,
            completed_date: None,
            images: Vec::new(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_attach_relations_groups_by_property() {
        let owner = Uuid::new_v4();
        let first = sample_property(owner);
        let second = sample_property(owner);

        let bookings = vec![
            sample_booking(first.id),
            sample_booking(second.id),
            sample_booking(first.id),
        ];
        let work_orders = vec![sample_work_order(second.id)];

        let grouped = attach_relations(
            vec![first.clone(), second.clone()],
            bookings,
            work_orders,
        );

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].property.id, first.id);
        assert_eq!(grouped[0].bookings.len(), 2);
        assert!(grouped[0].work_orders.is_empty());
        assert_eq!(grouped[1].bookings.len(), 1);
        assert_eq!(grouped[1].work_orders.len(), 1);
    }

    #[test]
    fn test_property_with_relations_serializes_flat() {
        let property = sample_property(Uuid::new_v4());
        let with_relations = attach_relations(vec![property.clone()], Vec::new(), Vec::new());

        let json = serde_json::to_value(&with_relations[0]).unwrap();
        assert_eq!(json["ownerId"], property.owner_id.to_string());
        assert_eq!(json["zipCode"], "96150");
        assert_eq!(json["status"], "active");
        assert!(json["bookings"].as_array().unwrap().is_empty());
        assert!(json["workOrders"].as_array().unwrap().is_empty());
    }
}
