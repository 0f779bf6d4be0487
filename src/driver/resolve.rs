use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use super::{DriverLoader, DriverObject, DriverType, Field, Operation, ParamKind, PropertyKey, Value};
use crate::error::{DriverError, InvocationError};

/// Exact operation shape: name plus parameter kinds, no overload resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<ParamKind>,
}

impl Signature {
    pub fn new<S: Into<String>>(name: S, params: &[ParamKind]) -> Self {
        Self {
            name: name.into(),
            params: params.to_vec(),
        }
    }

    pub fn matches(&self, op: &dyn Operation) -> bool {
        op.name() == self.name && op.params() == self.params.as_slice()
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", p)?;
        }
        write!(f, ")")
    }
}

/// Looks up driver members once so that later calls go straight through.
pub struct Resolver<'a> {
    loader: &'a dyn DriverLoader,
}

impl<'a> Resolver<'a> {
    pub fn new(loader: &'a dyn DriverLoader) -> Self {
        Self { loader }
    }

    pub fn load(&self, type_name: &str) -> Result<Arc<dyn DriverType>, DriverError> {
        self.loader.load_type(type_name)
    }

    /// Binds the one operation of `ty` accepted by `select`.
    ///
    /// `description` only feeds error messages.
    pub fn bind_operation<F>(
        &self,
        ty: &Arc<dyn DriverType>,
        description: &str,
        select: F,
    ) -> Result<BoundOperation, DriverError>
    where
        F: Fn(&dyn Operation) -> bool,
    {
        let mut found: Vec<Arc<dyn Operation>> = ty
            .operations()
            .into_iter()
            .filter(|op| select(op.as_ref()))
            .collect();
        match found.len() {
            0 => Err(DriverError::OperationNotFound {
                type_name: ty.name().to_string(),
                signature: description.to_string(),
            }),
            1 => Ok(BoundOperation {
                ty: ty.clone(),
                op: found.remove(0),
            }),
            count => Err(DriverError::AmbiguousOperation {
                type_name: ty.name().to_string(),
                signature: description.to_string(),
                count,
            }),
        }
    }

    pub fn bind_signature(
        &self,
        ty: &Arc<dyn DriverType>,
        signature: &Signature,
    ) -> Result<BoundOperation, DriverError> {
        self.bind_operation(ty, &signature.to_string(), |op| signature.matches(op))
    }

    /// Binds a field whose declared kind is one of `accepted`.
    pub fn bind_field(
        &self,
        ty: &Arc<dyn DriverType>,
        name: &str,
        accepted: &[ParamKind],
    ) -> Result<BoundField, DriverError> {
        let field = ty.field(name).ok_or_else(|| DriverError::FieldNotFound {
            type_name: ty.name().to_string(),
            field: name.to_string(),
        })?;
        if !accepted.contains(&field.kind()) {
            return Err(DriverError::FieldType {
                type_name: ty.name().to_string(),
                field: name.to_string(),
                expected: accepted.to_vec(),
                actual: field.kind(),
            });
        }
        Ok(BoundField {
            ty: ty.clone(),
            field,
        })
    }
}

/// An operation resolved on a driver type. Cheap to call, safe to share.
#[derive(Clone)]
pub struct BoundOperation {
    ty: Arc<dyn DriverType>,
    op: Arc<dyn Operation>,
}

impl BoundOperation {
    pub fn name(&self) -> &str {
        self.op.name()
    }

    pub fn invoke(
        &self,
        receiver: &dyn DriverObject,
        args: &[Value],
    ) -> Result<Value, InvocationError> {
        if !self.ty.is_instance(receiver) {
            return Err(DriverError::WrongReceiver {
                expected: self.ty.name().to_string(),
                actual: receiver.type_name().to_string(),
            }
            .into());
        }
        self.op.invoke(receiver, args)
    }
}

impl Debug for BoundOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundOperation")
            .field("type", &self.ty.name())
            .field("name", &self.op.name())
            .field("params", &self.op.params())
            .finish()
    }
}

/// A field resolved on a driver type. Only the member is bound; its value is
/// read from the receiver on every call.
#[derive(Clone)]
pub struct BoundField {
    ty: Arc<dyn DriverType>,
    field: Arc<dyn Field>,
}

impl BoundField {
    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn read(&self, receiver: &dyn DriverObject) -> Result<Value, DriverError> {
        if !self.ty.is_instance(receiver) {
            return Err(DriverError::WrongReceiver {
                expected: self.ty.name().to_string(),
                actual: receiver.type_name().to_string(),
            });
        }
        self.field.read(receiver)
    }

    pub fn read_int(&self, receiver: &dyn DriverObject) -> Result<i32, DriverError> {
        match self.read(receiver)? {
            Value::Int(v) => Ok(v),
            other => Err(self.type_error(&[ParamKind::Int], other.kind())),
        }
    }

    pub fn read_key(&self, receiver: &dyn DriverObject) -> Result<PropertyKey, DriverError> {
        match self.read(receiver)? {
            Value::Int(v) => Ok(PropertyKey::Int(v)),
            Value::Str(v) => Ok(PropertyKey::Str(v)),
            other => Err(self.type_error(&[ParamKind::Int, ParamKind::Str], other.kind())),
        }
    }

    fn type_error(&self, expected: &[ParamKind], actual: ParamKind) -> DriverError {
        DriverError::FieldType {
            type_name: self.ty.name().to_string(),
            field: self.field.name().to_string(),
            expected: expected.to_vec(),
            actual,
        }
    }
}

impl Debug for BoundField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundField")
            .field("type", &self.ty.name())
            .field("name", &self.field.name())
            .field("kind", &self.field.kind())
            .finish()
    }
}
