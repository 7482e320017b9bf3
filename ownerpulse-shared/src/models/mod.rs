/// Database models for OwnerPulse
///
/// Each model owns its table's queries. Anything acting on behalf of a caller
/// uses the `*_owned` variants, which push the ownership filter into SQL.
///
/// # Models
///
/// - `user`: Local accounts keyed by identity-provider subject
/// - `property`: Rental properties, each with one owner
/// - `booking`: Guest reservations on a property
/// - `work_order`: Maintenance and cleaning jobs on a property
///
/// # Example
///
/// ```no_run
/// use ownerpulse_shared::models::property::Property;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let properties = Property::list_by_owner(&pool, owner_id).await?;
/// let with_relations = Property::with_relations(&pool, properties).await?;
/// # Ok(())
/// # }
/// ```

pub mod booking;
pub mod property;
pub mod user;
pub mod work_order;

use rust_decimal::Decimal;

/// Exclusive upper bound of a `NUMERIC(10,2)` money column
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Explains why an amount can't be stored in a money column, if it can't
///
/// Trailing zeros past the cents are accepted; real sub-cent precision is not.
pub fn money_problem(amount: &Decimal) -> Option<&'static str> {
    if *amount < Decimal::ZERO {
        Some("Must not be negative")
    } else if *amount >= MONEY_LIMIT {
        Some("Must be less than 100000000")
    } else if amount.normalize().scale() > 2 {
        Some("Must have at most two decimal places")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_money_problem() {
        assert_eq!(money_problem(&dec("0")), None);
        assert_eq!(money_problem(&dec("850.00")), None);
        assert_eq!(money_problem(&dec("850.500")), None);
        assert_eq!(money_problem(&dec("99999999.99")), None);

        assert_eq!(money_problem(&dec("-0.01")), Some("Must not be negative"));
        assert_eq!(money_problem(&dec("100000000")), Some("Must be less than 100000000"));
        assert_eq!(
            money_problem(&dec("123456789012.00")),
            Some("Must be less than 100000000")
        );
        assert_eq!(
            money_problem(&dec("10.005")),
            Some("Must have at most two decimal places")
        );
    }
}
