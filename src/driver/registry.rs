use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use super::{DriverLoader, DriverObject, DriverType, Field, Operation, ParamKind, Value};
use crate::error::{BoxError, DriverError, InvocationError};

type OperationFn<T> = dyn Fn(&T, &[Value]) -> Result<Value, BoxError> + Send + Sync;
type FieldFn<T> = dyn Fn(&T) -> Value + Send + Sync;

/// In-memory [`DriverLoader`]: a driver registers its connection types here
/// under the names plugins look them up by.
///
/// # Example
/// ```
/// use reauth_pool::driver::{DriverLoader, DriverRegistry, ParamKind, TypeBuilder, Value};
///
/// struct Conn {
///     proxy_type: i32,
/// }
///
/// let mut registry = DriverRegistry::new();
/// registry.register(
///     TypeBuilder::<Conn>::new("vendor.Connection")
///         .operation("openProxySession", &[ParamKind::Int, ParamKind::Properties], |_conn, _args| {
///             Ok(Value::Null)
///         })
///         .field("PROXYTYPE_USER_NAME", ParamKind::Int, |conn| Value::Int(conn.proxy_type)),
/// );
/// assert!(registry.load_type("vendor.Connection").is_ok());
/// assert!(registry.load_type("vendor.Other").is_err());
/// ```
#[derive(Default)]
pub struct DriverRegistry {
    types: HashMap<String, Arc<dyn DriverType>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type, replacing any type of the same name.
    pub fn register<T: Any + Send + Sync>(&mut self, builder: TypeBuilder<T>) -> &mut Self {
        let ty = builder.build();
        self.types.insert(ty.name().to_string(), ty);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Debug for DriverRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();
        f.debug_struct("DriverRegistry")
            .field("types", &names)
            .finish()
    }
}

impl DriverLoader for DriverRegistry {
    fn load_type(&self, name: &str) -> Result<Arc<dyn DriverType>, DriverError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| DriverError::TypeNotFound {
                name: name.to_string(),
            })
    }
}

/// Describes one driver type backed by the Rust type `T`.
pub struct TypeBuilder<T> {
    name: String,
    operations: Vec<Arc<dyn Operation>>,
    fields: HashMap<String, Arc<dyn Field>>,
    _type: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> TypeBuilder<T> {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            operations: vec![],
            fields: HashMap::new(),
            _type: PhantomData,
        }
    }

    /// Adds an operation. Several operations may share a name.
    ///
    /// Arguments are checked against `params` before `f` runs; an error
    /// returned by `f` surfaces as [`InvocationError::Raised`].
    pub fn operation<F>(mut self, name: &str, params: &[ParamKind], f: F) -> Self
    where
        F: Fn(&T, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.operations.push(Arc::new(RegisteredOperation::<T> {
            type_name: self.name.clone(),
            name: name.to_string(),
            params: params.to_vec(),
            f: Box::new(f),
        }));
        self
    }

    pub fn field<F>(mut self, name: &str, kind: ParamKind, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.fields.insert(
            name.to_string(),
            Arc::new(RegisteredField::<T> {
                type_name: self.name.clone(),
                name: name.to_string(),
                kind,
                getter: Box::new(getter),
            }),
        );
        self
    }

    pub fn build(self) -> Arc<dyn DriverType> {
        Arc::new(RegisteredType::<T> {
            name: self.name,
            operations: self.operations,
            fields: self.fields,
            _type: PhantomData,
        })
    }
}

struct RegisteredType<T> {
    name: String,
    operations: Vec<Arc<dyn Operation>>,
    fields: HashMap<String, Arc<dyn Field>>,
    _type: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> DriverType for RegisteredType<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<Arc<dyn Operation>> {
        self.operations.clone()
    }

    fn field(&self, name: &str) -> Option<Arc<dyn Field>> {
        self.fields.get(name).cloned()
    }

    fn is_instance(&self, receiver: &dyn DriverObject) -> bool {
        receiver.as_any().is::<T>()
    }
}

fn downcast<'a, T: Any>(
    type_name: &str,
    receiver: &'a dyn DriverObject,
) -> Result<&'a T, DriverError> {
    receiver
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DriverError::WrongReceiver {
            expected: type_name.to_string(),
            actual: receiver.type_name().to_string(),
        })
}

struct RegisteredOperation<T> {
    type_name: String,
    name: String,
    params: Vec<ParamKind>,
    f: Box<OperationFn<T>>,
}

impl<T: Any + Send + Sync> Operation for RegisteredOperation<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[ParamKind] {
        &self.params
    }

    fn invoke(
        &self,
        receiver: &dyn DriverObject,
        args: &[Value],
    ) -> Result<Value, InvocationError> {
        let receiver = downcast::<T>(&self.type_name, receiver)?;
        let kinds: Vec<ParamKind> = args.iter().map(Value::kind).collect();
        if kinds != self.params {
            return Err(DriverError::ArgumentMismatch {
                operation: self.name.clone(),
                expected: self.params.clone(),
                actual: kinds,
            }
            .into());
        }
        (self.f)(receiver, args).map_err(InvocationError::Raised)
    }
}

struct RegisteredField<T> {
    type_name: String,
    name: String,
    kind: ParamKind,
    getter: Box<FieldFn<T>>,
}

impl<T: Any + Send + Sync> Field for RegisteredField<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ParamKind {
        self.kind
    }

    fn read(&self, receiver: &dyn DriverObject) -> Result<Value, DriverError> {
        let receiver = downcast::<T>(&self.type_name, receiver)?;
        Ok((self.getter)(receiver))
    }
}
