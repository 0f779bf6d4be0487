//! Name-based access to driver internals.
//!
//! A driver publishes its connection types here so that plugins can find
//! capabilities that are not part of the pool's `Manager` contract, without
//! linking against the driver at compile time.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::error::{DriverError, InvocationError};

mod registry;
mod resolve;

pub use registry::{DriverRegistry, TypeBuilder};
pub use resolve::{BoundField, BoundOperation, Resolver, Signature};

/// Key of a driver property. Drivers key by number or by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    Int(i32),
    Str(String),
}

impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKey::Int(v) => write!(f, "{}", v),
            PropertyKey::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for PropertyKey {
    fn from(v: i32) -> Self {
        PropertyKey::Int(v)
    }
}

impl From<&str> for PropertyKey {
    fn from(v: &str) -> Self {
        PropertyKey::Str(v.to_string())
    }
}

pub type Properties = BTreeMap<PropertyKey, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Null,
    Int,
    Str,
    Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Str(String),
    Properties(Properties),
}

impl Value {
    pub fn kind(&self) -> ParamKind {
        match self {
            Value::Null => ParamKind::Null,
            Value::Int(_) => ParamKind::Int,
            Value::Str(_) => ParamKind::Str,
            Value::Properties(_) => ParamKind::Properties,
        }
    }
}

/// A live driver object (usually a connection) handed to an operation.
pub trait DriverObject: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Rust type name, for diagnostics only.
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> DriverObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

pub trait Operation: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &[ParamKind];

    fn invoke(&self, receiver: &dyn DriverObject, args: &[Value])
        -> Result<Value, InvocationError>;
}

/// A field stored on each instance of a driver type.
pub trait Field: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ParamKind;

    fn read(&self, receiver: &dyn DriverObject) -> Result<Value, DriverError>;
}

pub trait DriverType: Send + Sync {
    fn name(&self) -> &str;

    /// All operations, overloads included.
    fn operations(&self) -> Vec<Arc<dyn Operation>>;

    fn field(&self, name: &str) -> Option<Arc<dyn Field>>;

    fn is_instance(&self, receiver: &dyn DriverObject) -> bool;
}

/// Locates driver types by name. Plays the part of the driver's class path.
pub trait DriverLoader: Send + Sync {
    fn load_type(&self, name: &str) -> Result<Arc<dyn DriverType>, DriverError>;
}

impl<L: DriverLoader + ?Sized> DriverLoader for Arc<L> {
    fn load_type(&self, name: &str) -> Result<Arc<dyn DriverType>, DriverError> {
        (**self).load_type(name)
    }
}
