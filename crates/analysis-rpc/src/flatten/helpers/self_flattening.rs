use crate::flatten::{Flattener, RootFlattener};
use crate::value::Value;
use crate::wire::WireValue;
use crate::{Result, RpcError};

/// Delegates to objects that implement
/// [`SelfFlattening`](crate::flatten::SelfFlattening). Flatten only.
pub struct SelfFlatteningHelper;

impl Flattener for SelfFlatteningHelper {
    fn name(&self) -> &str {
        "self-flattening"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        value
            .as_object()
            .and_then(|o| o.as_self_flattening())
            .is_some()
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        value
            .as_object()
            .and_then(|o| o.as_self_flattening())
            .ok_or_else(|| RpcError::unsupported(format!("{} is not self-flattening", value.type_label())))?
            .flatten_self(root)
    }

    fn can_unflatten(&self, _wire: &WireValue) -> bool {
        false
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        Err(RpcError::unsupported(format!(
            "self-flattening helper cannot unflatten {}",
            wire.describe()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::SelfFlattening;
    use crate::value::{NativeObject, Object};
    use std::any::Any;

    #[derive(Debug, PartialEq)]
    struct Point(i32, i32);

    impl NativeObject for Point {
        fn type_name(&self) -> &str {
            "test.Point"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn equals(&self, other: &dyn NativeObject) -> bool {
            other.as_any().downcast_ref::<Point>() == Some(self)
        }

        fn as_self_flattening(&self) -> Option<&dyn SelfFlattening> {
            Some(self)
        }
    }

    impl SelfFlattening for Point {
        fn flatten_self(&self, root: &RootFlattener) -> Result<WireValue> {
            let mut record = WireValue::typed_record("test.Point");
            record.insert("x".into(), root.flatten(&Value::Int(self.0))?);
            record.insert("y".into(), root.flatten(&Value::Int(self.1))?);
            Ok(WireValue::Record(record))
        }
    }

    #[test]
    fn test_self_flattening_object_writes_its_own_record() {
        let root = RootFlattener::new();
        let wire = root.flatten(&Value::Object(Object::new(Point(1, 2)))).unwrap();
        let record = wire.as_record().unwrap();
        assert_eq!(wire.type_name(), Some("test.Point"));
        assert_eq!(record.get("x"), Some(&WireValue::I32(1)));
        // No helper knows how to bring it back.
        assert!(!root.can_unflatten(&wire));
    }
}
