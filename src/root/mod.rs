//! The root type `Any`
//!
//! `Any` is deferred: it is never instantiated, only inherited. It gives
//! every heir structural comparison, duplication and conformance services
//! as ordinary features.

pub mod structure;

pub use structure::{conform, copy, deep_copy, deep_equal, deep_twin_of, do_nothing, equal, twin_of, type_of};

use crate::core::{Feature, Value};
use crate::errors::{ContractError, Result};
use crate::registry::{Instance, TypeDescriptor};
use once_cell::sync::Lazy;

static ANY: Lazy<TypeDescriptor> = Lazy::new(declare_any);

/// The process-wide root type
pub fn any() -> TypeDescriptor {
    ANY.clone()
}

const FINAL_FEATURES: [&str; 7] = ["type", "conform", "equal", "deep_equal", "twin_of", "deep_twin_of", "do_nothing"];

fn instance_argument<'a>(args: &'a [Value], routine: &str) -> Result<&'a Instance> {
    args.first()
        .and_then(Value::as_instance)
        .ok_or_else(|| ContractError::shape(format!("require: '{}' argument as instance", routine)))
}

fn argument(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn declare_any() -> TypeDescriptor {
    let ty = TypeDescriptor::deferred("Any");

    let features: Vec<(&str, Feature)> = vec![
        // Service
        ("type", Feature::routine(1, |_, args| Ok(type_of(&argument(args, 0)).into()))),
        // Duplication
        ("twin_of", Feature::routine(1, |_, args| twin_of(&argument(args, 0)))),
        ("deep_twin_of", Feature::routine(1, |_, args| deep_twin_of(&argument(args, 0)))),
        // Comparison
        (
            "equal",
            Feature::routine(2, |_, args| Ok(Value::Bool(equal(&argument(args, 0), &argument(args, 1))))),
        ),
        (
            "deep_equal",
            Feature::routine(2, |_, args| Ok(Value::Bool(deep_equal(&argument(args, 0), &argument(args, 1))))),
        ),
        // Status
        (
            "conform",
            Feature::routine(1, |this, args| {
                let ty = args
                    .first()
                    .and_then(Value::as_type)
                    .ok_or_else(|| ContractError::shape("require: 'conform' argument as type"))?;
                Ok(Value::Bool(this.conform(ty)))
            }),
        ),
        (
            "is_equal",
            Feature::routine(1, |this, args| {
                Ok(Value::Bool(equal(&Value::Object(this.clone()), &argument(args, 0))))
            }),
        ),
        (
            "is_deep_equal",
            Feature::routine(1, |this, args| {
                Ok(Value::Bool(deep_equal(&Value::Object(this.clone()), &argument(args, 0))))
            }),
        ),
        // Change
        (
            "copy",
            Feature::routine(1, |this, args| {
                copy(this, instance_argument(args, "copy")?);
                Ok(Value::Null)
            }),
        ),
        (
            "deep_copy",
            Feature::routine(1, |this, args| {
                deep_copy(this, instance_argument(args, "deep_copy")?)?;
                Ok(Value::Null)
            }),
        ),
        // Default
        (
            "do_nothing",
            Feature::routine(0, |_, _| {
                do_nothing();
                Ok(Value::Null)
            }),
        ),
    ];

    {
        let mut data = ty.0.write();
        for (key, feature) in features {
            data.features.insert(key.to_string(), feature);
        }
        for key in FINAL_FEATURES {
            data.finalized.insert(key.to_string());
        }
    }

    ty
}
