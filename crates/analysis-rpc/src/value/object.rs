//! Open-ended native objects.
//!
//! Beans, datasets and user types travel through the pipeline as [`Object`],
//! a shared handle to a [`NativeObject`]. Helpers recover the concrete type
//! with [`Object::downcast_ref`].

use crate::flatten::SelfFlattening;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A native type that can flow through the flattening engine and dispatcher.
///
/// Most implementations come from [`native_object!`](crate::native_object).
pub trait NativeObject: Any + fmt::Debug + Send + Sync {
    /// Canonical type name, used as the wire discriminant and for dispatch.
    fn type_name(&self) -> &str;

    /// Names of supertypes and interfaces this type is assignable to.
    fn supertypes(&self) -> &[&'static str] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;

    /// Equality against another object of possibly different type.
    fn equals(&self, other: &dyn NativeObject) -> bool;

    /// Objects that own their wire conversion return themselves here.
    fn as_self_flattening(&self) -> Option<&dyn SelfFlattening> {
        None
    }
}

/// Implement [`NativeObject`] for a `PartialEq` type.
///
/// ```rust,ignore
/// native_object!(CircularRoi, "uk.ac.diamond.scisoft.analysis.roi.CircularROI",
///                ["uk.ac.diamond.scisoft.analysis.roi.ROIBase"]);
/// ```
#[macro_export]
macro_rules! native_object {
    ($ty:ty, $name:expr) => {
        $crate::native_object!($ty, $name, []);
    };
    ($ty:ty, $name:expr, [$($super:expr),* $(,)?]) => {
        impl $crate::value::NativeObject for $ty {
            fn type_name(&self) -> &str {
                $name
            }

            fn supertypes(&self) -> &[&'static str] {
                &[$($super),*]
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn equals(&self, other: &dyn $crate::value::NativeObject) -> bool {
                other
                    .as_any()
                    .downcast_ref::<$ty>()
                    .map_or(false, |other| self == other)
            }
        }
    };
}

/// Shared handle to a native object.
#[derive(Clone)]
pub struct Object(Arc<dyn NativeObject>);

impl Object {
    pub fn new<T: NativeObject>(inner: T) -> Self {
        Object(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<dyn NativeObject>) -> Self {
        Object(inner)
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    /// Whether this object's type is `name` or declares it as a supertype.
    pub fn is_instance_of(&self, name: &str) -> bool {
        self.type_name() == name || self.0.supertypes().iter().any(|s| *s == name)
    }

    pub fn downcast_ref<T: NativeObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: NativeObject>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    pub fn as_self_flattening(&self) -> Option<&dyn SelfFlattening> {
        self.0.as_self_flattening()
    }

    pub fn inner(&self) -> &dyn NativeObject {
        &*self.0
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.equals(&*other.0)
    }
}
