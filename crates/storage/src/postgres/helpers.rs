//! Shared helper functions for PostgreSQL queries and row conversion.

use quizhub_core::error::StorageError;

/// Map a sqlx error onto the storage taxonomy.
///
/// Pool exhaustion surfaces as a timeout; unique and foreign-key violations
/// as constraint violations. Everything else is a query error.
pub fn query_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(e.to_string()),
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            StorageError::ConstraintViolation(db.message().to_string())
        }
        _ => StorageError::QueryError(e.to_string()),
    }
}

pub fn transaction_error(e: sqlx::Error) -> StorageError {
    StorageError::TransactionError(e.to_string())
}

/// Convert a row limit into a `LIMIT` parameter.
pub fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: un pool saturé est signalé comme timeout
    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err = query_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StorageError::Timeout(_)));
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let err = query_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::QueryError(_)));
    }

    #[test]
    fn test_limit_param_saturates() {
        assert_eq!(limit_param(21), 21);
        assert_eq!(limit_param(usize::MAX), i64::MAX);
    }
}
