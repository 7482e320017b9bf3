/// Work order model and database operations
///
/// Maintenance, cleaning, repair and inspection jobs attached to a property.
/// Like bookings, owner-scoped access goes through the parent property.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Work order lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_order_status")]
pub enum WorkOrderStatus {
    #[default]
    #[sqlx(rename = "pending")]
    #[serde(rename = "pending")]
    Pending,

    #[sqlx(rename = "in-progress")]
    #[serde(rename = "in-progress")]
    InProgress,

    #[sqlx(rename = "completed")]
    #[serde(rename = "completed")]
    Completed,

    #[sqlx(rename = "cancelled")]
    #[serde(rename = "cancelled")]
    Cancelled,
}

/// Work order urgency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_order_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkOrderPriority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

/// Job on a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: Uuid,
    pub property_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkOrderStatus,
    pub priority: WorkOrderPriority,

    /// maintenance, cleaning, repair, inspection
    pub category: String,

    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub contractor_name: Option<String>,
    pub contractor_phone: Option<String>,
    pub contractor_email: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub images: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a work order
#[derive(Debug, Clone, PartialEq)]
pub struct CreateWorkOrder {
    pub property_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkOrderStatus,
    pub priority: WorkOrderPriority,
    pub category: String,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub contractor_name: Option<String>,
    pub contractor_phone: Option<String>,
    pub contractor_email: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub images: Vec<String>,
    pub notes: Option<String>,
}

/// Partial work order update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateWorkOrder {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,
    pub category: Option<String>,
    pub estimated_cost: Option<Option<Decimal>>,
    pub actual_cost: Option<Option<Decimal>>,
    pub contractor_name: Option<Option<String>>,
    pub contractor_phone: Option<Option<String>>,
    pub contractor_email: Option<Option<String>>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub completed_date: Option<Option<NaiveDate>>,
    pub images: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
}

impl WorkOrder {
    /// Inserts a new work order
    pub async fn create(pool: &PgPool, data: CreateWorkOrder) -> Result<Self, sqlx::Error> {
        let work_order = sqlx::query_as::<_, WorkOrder>(
            r#"
            INSERT INTO work_orders (property_id, title, description, status, priority,
                                     category, estimated_cost, actual_cost, contractor_name,
                                     contractor_phone, contractor_email, scheduled_date,
                                     completed_date, images, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id, property_id, title, description, status, priority, category,
                      estimated_cost, actual_cost, contractor_name, contractor_phone,
                      contractor_email, scheduled_date, completed_date, images, notes,
                      created_at, updated_at
            "#,
        )
        .bind(data.property_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.category)
        .bind(data.estimated_cost)
        .bind(data.actual_cost)
        .bind(data.contractor_name)
        .bind(data.contractor_phone)
        .bind(data.contractor_email)
        .bind(data.scheduled_date)
        .bind(data.completed_date)
        .bind(data.images)
        .bind(data.notes)
        .fetch_one(pool)
        .await?;

        Ok(work_order)
    }

    /// Finds a work order whose property is owned by `owner_id`
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let work_order = sqlx::query_as::<_, WorkOrder>(
            r#"
            SELECT w.id, w.property_id, w.title, w.description, w.status, w.priority,
                   w.category, w.estimated_cost, w.actual_cost, w.contractor_name,
                   w.contractor_phone, w.contractor_email, w.scheduled_date,
                   w.completed_date, w.images, w.notes, w.created_at, w.updated_at
            FROM work_orders w
            JOIN properties p ON p.id = w.property_id
            WHERE w.id = $1 AND p.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(work_order)
    }

    /// Lists work orders across every property owned by `owner_id`
    ///
    /// Most urgent first, then newest.
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let work_orders = sqlx::query_as::<_, WorkOrder>(
            r#"
            SELECT w.id, w.property_id, w.title, w.description, w.status, w.priority,
                   w.category, w.estimated_cost, w.actual_cost, w.contractor_name,
                   w.contractor_phone, w.contractor_email, w.scheduled_date,
                   w.completed_date, w.images, w.notes, w.created_at, w.updated_at
            FROM work_orders w
            JOIN properties p ON p.id = w.property_id
            WHERE p.owner_id = $1
            ORDER BY w.priority DESC, w.created_at DESC, w.id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(work_orders)
    }

    /// Lists work orders for a single property (callers check ownership first)
    pub async fn list_by_property(
        pool: &PgPool,
        property_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_by_properties(pool, &[property_id]).await
    }

    /// Lists work orders for a batch of properties
    pub async fn list_by_properties(
        pool: &PgPool,
        property_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let work_orders = sqlx::query_as::<_, WorkOrder>(
            r#"
            SELECT id, property_id, title, description, status, priority, category,
                   estimated_cost, actual_cost, contractor_name, contractor_phone,
                   contractor_email, scheduled_date, completed_date, images, notes,
                   created_at, updated_at
            FROM work_orders
            WHERE property_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(property_ids)
        .fetch_all(pool)
        .await?;

        Ok(work_orders)
    }

    /// Applies a partial update to a work order whose property `owner_id` owns
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateWorkOrder,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE work_orders SET updated_at = NOW()");

        if let Some(title) = data.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(category) = data.category {
            query.push(", category = ").push_bind(category);
        }
        if let Some(estimated_cost) = data.estimated_cost {
            query.push(", estimated_cost = ").push_bind(estimated_cost);
        }
        if let Some(actual_cost) = data.actual_cost {
            query.push(", actual_cost = ").push_bind(actual_cost);
        }
        if let Some(contractor_name) = data.contractor_name {
            query.push(", contractor_name = ").push_bind(contractor_name);
        }
        if let Some(contractor_phone) = data.contractor_phone {
            query.push(", contractor_phone = ").push_bind(contractor_phone);
        }
        if let Some(contractor_email) = data.contractor_email {
            query.push(", contractor_email = ").push_bind(contractor_email);
        }
        if let Some(scheduled_date) = data.scheduled_date {
            query.push(", scheduled_date = ").push_bind(scheduled_date);
        }
        if let Some(completed_date) = data.completed_date {
            query.push(", completed_date = ").push_bind(completed_date);
        }
        if let Some(images) = data.images {
            query.push(", images = ").push_bind(images);
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
            " RETURNING id, property_id, title, description, status, priority, category, \
             estimated_cost, actual_cost, contractor_name, contractor_phone, \
             contractor_email, scheduled_date, completed_date, images, notes, \
             created_at, updated_at",
        );

        let work_order = query
            .build_query_as::<WorkOrder>()
            .fetch_optional(pool)
            .await?;

        Ok(work_order)
    }

    /// Deletes a work order whose property `owner_id` owns
    pub async fn delete_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM work_orders
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

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(WorkOrderStatus::InProgress).unwrap(),
            "in-progress"
        );
        assert_eq!(WorkOrderStatus::default(), WorkOrderStatus::Pending);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(WorkOrderPriority::Urgent > WorkOrderPriority::High);
        assert!(WorkOrderPriority::Medium > WorkOrderPriority::Low);
        assert_eq!(WorkOrderPriority::default(), WorkOrderPriority::Low);

        let parsed: WorkOrderPriority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(parsed, WorkOrderPriority::Urgent);
    }
}
