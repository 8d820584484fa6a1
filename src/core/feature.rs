//! Features: the named members attached to a type
//!
//! A feature is either plain data or a routine. Routines receive the
//! instance they are invoked on together with the call arguments.

use crate::core::value::Value;
use crate::errors::Result;
use crate::registry::Instance;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub type RoutineBody = dyn Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync;

/// Callable feature with a declared arity
#[derive(Clone)]
pub struct Routine {
    arity: usize,
    body: Arc<RoutineBody>,
}

impl Routine {
    pub fn new<F>(arity: usize, body: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            arity,
            body: Arc::new(body),
        }
    }

    /// Routine giving `value` as result whatever the receiver and arguments
    pub fn stable(value: Value) -> Self {
        Self::new(0, move |_, _| Ok(value.clone()))
    }

    /// Routine running `routine` on its first call only.
    ///
    /// Later calls, on any receiver, return the first result.
    pub fn once(routine: Routine) -> Self {
        let cell: Arc<OnceCell<Value>> = Arc::new(OnceCell::new());
        let arity = routine.arity;
        Self::new(arity, move |this, args| {
            cell.get_or_try_init(|| routine.invoke(this, args)).cloned()
        })
    }

    /// Same body, different declared arity
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Run the body on `this`; arity is not checked here
    pub fn invoke(&self, this: &Instance, args: &[Value]) -> Result<Value> {
        (self.body)(this, args)
    }

    pub fn ptr_eq(&self, other: &Routine) -> bool {
        Arc::as_ptr(&self.body) as *const () == Arc::as_ptr(&other.body) as *const ()
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("arity", &self.arity)
            .field("body", &(Arc::as_ptr(&self.body) as *const ()))
            .finish()
    }
}

/// Entry of a type's feature table
#[derive(Debug, Clone)]
pub enum Feature {
    Data(Value),
    Routine(Routine),
}

impl Feature {
    pub fn data(value: impl Into<Value>) -> Self {
        Feature::Data(value.into())
    }

    pub fn routine<F>(arity: usize, body: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Feature::Routine(Routine::new(arity, body))
    }

    pub fn is_routine(&self) -> bool {
        matches!(self, Feature::Routine(_))
    }

    pub fn as_routine(&self) -> Option<&Routine> {
        match self {
            Feature::Routine(r) => Some(r),
            Feature::Data(_) => None,
        }
    }

    pub fn arity(&self) -> Option<usize> {
        self.as_routine().map(Routine::arity)
    }

    /// Same routine, or identical data
    pub fn identical(&self, other: &Feature) -> bool {
        match (self, other) {
            (Feature::Routine(a), Feature::Routine(b)) => a.ptr_eq(b),
            (Feature::Data(a), Feature::Data(b)) => a.identical(b),
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Feature::Data(v) => v.clone(),
            Feature::Routine(r) => Value::Routine(r.clone()),
        }
    }
}

impl From<Routine> for Feature {
    fn from(r: Routine) -> Self {
        Feature::Routine(r)
    }
}

impl From<Value> for Feature {
    fn from(v: Value) -> Self {
        match v {
            Value::Routine(r) => Feature::Routine(r),
            other => Feature::Data(other),
        }
    }
}
