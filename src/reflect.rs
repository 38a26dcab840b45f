//! Helpers for inspecting encodable values at runtime.

use crate::encode::{Encode, Shape};
use std::any::Any;

/// Access to the concrete value behind a trait object.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Unwrap optional and boxed layers.
///
/// Returns `None` when a layer is empty, which callers treat as nil.
pub fn value_elem(value: &dyn Encode) -> Option<&dyn Encode> {
    let mut current = value;
    loop {
        match current.shape() {
            Shape::Nil => return None,
            Shape::Indirect(inner) => current = inner,
            _ => return Some(current),
        }
    }
}

/// Whether the value is nil or the zero value of its type once unwrapped.
pub fn is_zero(value: &dyn Encode) -> bool {
    match value_elem(value) {
        None => true,
        Some(inner) => inner.is_zero(),
    }
}

/// Whether the value is nil.
pub fn is_nil(value: &dyn Encode) -> bool {
    value_elem(value).is_none()
}

/// Downcast a value, looking through optional and boxed layers.
pub fn downcast_elem<T: Any>(value: &dyn Encode) -> Option<&T> {
    value_elem(value).and_then(|inner| inner.as_any().downcast_ref::<T>())
}
