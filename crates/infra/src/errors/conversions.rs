//! Conversions from external infrastructure errors into domain errors.

use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use slotline_common::CommonError;
use slotline_domain::SlotlineError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SlotlineError);

impl From<InfraError> for SlotlineError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SlotlineError> for InfraError {
    fn from(value: SlotlineError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSlotlineError {
    fn into_slotline(self) -> SlotlineError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SlotlineError */
/* -------------------------------------------------------------------------- */

impl IntoSlotlineError for SqlError {
    fn into_slotline(self) -> SlotlineError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        SlotlineError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        SlotlineError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        SlotlineError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::NotADatabase, _) => {
                        SlotlineError::Database("file is not a SQLite database".into())
                    }
                    _ => SlotlineError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SlotlineError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SlotlineError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                SlotlineError::Database(format!("invalid column type for {name}: {ty}"))
            }
            other => SlotlineError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_slotline())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SlotlineError */
/* -------------------------------------------------------------------------- */

impl IntoSlotlineError for PoolError {
    fn into_slotline(self) -> SlotlineError {
        SlotlineError::Database(format!("connection pool unavailable: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_slotline())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SlotlineError */
/* -------------------------------------------------------------------------- */

impl IntoSlotlineError for HttpError {
    fn into_slotline(self) -> SlotlineError {
        if self.is_timeout() {
            return SlotlineError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SlotlineError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return SlotlineError::Network(format!("malformed provider response: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => SlotlineError::Auth(message),
                404 => SlotlineError::NotFound(message),
                429 => SlotlineError::Network(message),
                400..=499 => SlotlineError::InvalidInput(message),
                _ => SlotlineError::Network(message),
            };
        }

        SlotlineError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_slotline())
    }
}

/* -------------------------------------------------------------------------- */
/* CommonError → SlotlineError */
/* -------------------------------------------------------------------------- */

impl IntoSlotlineError for CommonError {
    fn into_slotline(self) -> SlotlineError {
        match self {
            CommonError::Config { message, field: Some(field) } => {
                SlotlineError::Config(format!("{field}: {message}"))
            }
            CommonError::Config { message, field: None } => SlotlineError::Config(message),
            CommonError::Crypto { message } => SlotlineError::Security(message),
            CommonError::Serialization { message, format } => {
                SlotlineError::Internal(format!("{format} serialization failed: {message}"))
            }
            CommonError::Internal { message, .. } => SlotlineError::Internal(message),
        }
    }
}

impl From<CommonError> for InfraError {
    fn from(value: CommonError) -> Self {
        InfraError(value.into_slotline())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
