// Core services
pub mod audit;
pub mod chemicals;
pub mod ledger;
pub mod locations;
pub mod users;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::TransactionError;

use crate::errors::ServiceError;

/// Flattens sea-orm transaction errors back into the service taxonomy.
pub(crate) fn unwrap_txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

// Canonical text forms for audit old/new values. One form per type:
// RFC 3339 for datetimes, normalized decimal strings for quantities,
// empty string for NULL.

pub(crate) fn decimal_text(value: &Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn datetime_text(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn opt_datetime_text(value: &Option<DateTime<Utc>>) -> String {
    value.as_ref().map(datetime_text).unwrap_or_default()
}

pub(crate) fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_text_drops_trailing_zeros() {
        assert_eq!(decimal_text(&dec!(100.0000)), "100");
        assert_eq!(decimal_text(&dec!(0.2500)), "0.25");
        assert_eq!(decimal_text(&dec!(-30)), "-30");
    }

    #[test]
    fn optional_values_serialize_to_empty_string() {
        assert_eq!(opt_text(&None), "");
        assert_eq!(opt_datetime_text(&None), "");
    }
}
