use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::driver::ParamKind;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error reported by the database itself, e.g. a rejected logon.
///
/// Drivers raise it from their operations; the reauthentication layer hands
/// it back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    message: String,
    sql_state: Option<String>,
    vendor_code: i32,
}

impl DatabaseError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: 0,
        }
    }

    pub fn with_sql_state<S: Into<String>>(mut self, sql_state: S) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn with_vendor_code(mut self, vendor_code: i32) -> Self {
        self.vendor_code = vendor_code;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn vendor_code(&self) -> i32 {
        self.vendor_code
    }

    /// SQL state class `28`: invalid authorization.
    pub fn is_invalid_authorization(&self) -> bool {
        self.sql_state
            .as_deref()
            .map(|s| s.starts_with("28"))
            .unwrap_or(false)
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.sql_state {
            Some(state) => write!(
                f,
                "database error {} (sql state {}): {}",
                self.vendor_code, state, self.message
            ),
            None => write!(f, "database error {}: {}", self.vendor_code, self.message),
        }
    }
}

impl std::error::Error for DatabaseError {}

/// Failure to find or use a driver member by name.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DriverError {
    #[error("driver type `{name}` not found")]
    TypeNotFound { name: String },
    #[error("no operation matching {signature} on `{type_name}`")]
    OperationNotFound {
        type_name: String,
        signature: String,
    },
    #[error("{count} operations matching {signature} on `{type_name}`")]
    AmbiguousOperation {
        type_name: String,
        signature: String,
        count: usize,
    },
    #[error("field `{field}` not found on `{type_name}`")]
    FieldNotFound { type_name: String, field: String },
    #[error("field `{field}` on `{type_name}` is {actual:?}, expected one of {expected:?}")]
    FieldType {
        type_name: String,
        field: String,
        expected: Vec<ParamKind>,
        actual: ParamKind,
    },
    #[error("receiver `{actual}` is not an instance of `{expected}`")]
    WrongReceiver { expected: String, actual: String },
    #[error("arguments {actual:?} do not match parameters {expected:?} of `{operation}`")]
    ArgumentMismatch {
        operation: String,
        expected: Vec<ParamKind>,
        actual: Vec<ParamKind>,
    },
    #[error("driver loader failed: {0}")]
    Loader(#[source] BoxError),
}

/// Failure while calling a driver operation.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The call never reached the operation, or its inputs could not be read.
    #[error(transparent)]
    Binding(#[from] DriverError),
    /// The operation ran and failed.
    #[error("operation raised an error: {0}")]
    Raised(#[source] BoxError),
}

impl InvocationError {
    pub fn raised<E: Into<BoxError>>(err: E) -> Self {
        Self::Raised(err.into())
    }
}

/// The driver capability could not be bound. Fatal for the plugin instance.
#[derive(Error, Debug)]
#[error("cannot resolve {connection_type} {operation} operation")]
pub struct InitializationError {
    pub connection_type: String,
    pub operation: String,
    #[source]
    pub cause: DriverError,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReauthError {
    /// The database rejected the identity change. Carries the driver's error
    /// unchanged.
    #[error("{0}")]
    Database(#[source] DatabaseError),
    /// The binding to the driver misbehaved; the state of the session is
    /// unknown.
    #[error("unexpected error in {operation}")]
    Internal {
        operation: String,
        #[source]
        cause: InvocationError,
    },
    #[error("reauthentication plugin used before initialize")]
    Uninitialized,
}

impl ReauthError {
    pub fn is_database(&self) -> bool {
        matches!(self, ReauthError::Database(_))
    }

    pub fn database_error(&self) -> Option<&DatabaseError> {
        match self {
            ReauthError::Database(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the pool should drop the physical connection after this error.
    pub fn should_discard_connection(&self) -> bool {
        !self.is_database()
    }
}

impl From<DatabaseError> for ReauthError {
    fn from(err: DatabaseError) -> Self {
        ReauthError::Database(err)
    }
}
