use crate::flatten::{Flattener, RootFlattener};
use crate::value::{ObjectArray, Prim, PrimArray, Type, Value};
use crate::wire::{required, WireValue, CONTENT};
use crate::{Result, RpcError};

/// One primitive element kind, as `{__type__: "<prim>[]", content: [...]}`.
///
/// Byte arrays flatten as binary blobs through the pass-through helper; the
/// byte helper only reads the record form. Char elements are one-character
/// strings.
pub struct PrimitiveArrayHelper {
    prim: Prim,
    type_name: String,
}

impl PrimitiveArrayHelper {
    pub fn new(prim: Prim) -> Self {
        Self {
            prim,
            type_name: Type::array_of(Type::Primitive(prim)).canonical_name(),
        }
    }

    fn bad_element(&self, wire: &WireValue) -> RpcError {
        RpcError::malformed(format!(
            "{} element cannot hold {}",
            self.type_name,
            wire.describe()
        ))
    }

    fn int<T: TryFrom<i64>>(&self, wire: &WireValue) -> Result<T> {
        wire_i64(wire)
            .and_then(|i| T::try_from(i).ok())
            .ok_or_else(|| self.bad_element(wire))
    }

    fn float(&self, wire: &WireValue) -> Result<f64> {
        match wire {
            WireValue::F32(f) => Ok(f64::from(*f)),
            WireValue::F64(f) => Ok(*f),
            other => wire_i64(other)
                .map(|i| i as f64)
                .ok_or_else(|| self.bad_element(other)),
        }
    }

    fn collect<T>(
        &self,
        items: &[WireValue],
        convert: impl Fn(&Self, &WireValue) -> Result<T>,
    ) -> Result<Vec<T>> {
        items.iter().map(|item| convert(self, item)).collect()
    }
}

fn wire_i64(wire: &WireValue) -> Option<i64> {
    match wire {
        WireValue::I8(i) => Some(i64::from(*i)),
        WireValue::I16(i) => Some(i64::from(*i)),
        WireValue::I32(i) => Some(i64::from(*i)),
        WireValue::I64(i) => Some(*i),
        _ => None,
    }
}

impl Flattener for PrimitiveArrayHelper {
    fn name(&self) -> &str {
        &self.type_name
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(value, Value::PrimArray(a) if a.prim() == self.prim)
    }

    fn flatten(&self, value: &Value, _root: &RootFlattener) -> Result<WireValue> {
        let content: Vec<WireValue> = match value {
            Value::PrimArray(PrimArray::Bool(v)) => v.iter().map(|x| WireValue::Bool(*x)).collect(),
            Value::PrimArray(PrimArray::Char(v)) => {
                v.iter().map(|x| WireValue::Text(x.to_string())).collect()
            }
            Value::PrimArray(PrimArray::Short(v)) => v.iter().map(|x| WireValue::I16(*x)).collect(),
            Value::PrimArray(PrimArray::Int(v)) => v.iter().map(|x| WireValue::I32(*x)).collect(),
            Value::PrimArray(PrimArray::Long(v)) => v.iter().map(|x| WireValue::I64(*x)).collect(),
            Value::PrimArray(PrimArray::Float(v)) => v.iter().map(|x| WireValue::F32(*x)).collect(),
            Value::PrimArray(PrimArray::Double(v)) => {
                v.iter().map(|x| WireValue::F64(*x)).collect()
            }
            other => {
                return Err(RpcError::unsupported(format!(
                    "expected {}, got {}",
                    self.type_name,
                    other.type_label()
                )))
            }
        };
        let mut record = WireValue::typed_record(&self.type_name);
        record.insert(CONTENT.to_string(), WireValue::Sequence(content));
        Ok(WireValue::Record(record))
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        wire.type_name() == Some(self.type_name.as_str())
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        let record = wire
            .as_record()
            .ok_or_else(|| RpcError::malformed(format!("expected {} record", self.type_name)))?;
        let content = required(record, CONTENT)?;
        if let (Prim::Byte, WireValue::Bytes(bytes)) = (self.prim, content) {
            return Ok(Value::Binary(bytes.clone()));
        }
        let items = content.as_sequence().ok_or_else(|| {
            RpcError::malformed(format!("{} content must be an array", self.type_name))
        })?;

        let value = match self.prim {
            Prim::Bool => Value::PrimArray(PrimArray::Bool(self.collect(items, |h, w| match w {
                WireValue::Bool(b) => Ok(*b),
                other => Err(h.bad_element(other)),
            })?)),
            Prim::Char => Value::PrimArray(PrimArray::Char(self.collect(items, |h, w| {
                let mut chars = w.as_str().map(str::chars).ok_or_else(|| h.bad_element(w))?;
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(h.bad_element(w)),
                }
            })?)),
            Prim::Byte => {
                let bytes: Vec<i8> = self.collect(items, Self::int)?;
                Value::Binary(bytes.into_iter().map(|b| b as u8).collect())
            }
            Prim::Short => Value::PrimArray(PrimArray::Short(self.collect(items, Self::int)?)),
            Prim::Int => Value::PrimArray(PrimArray::Int(self.collect(items, Self::int)?)),
            Prim::Long => Value::PrimArray(PrimArray::Long(self.collect(items, Self::int)?)),
            Prim::Float => Value::PrimArray(PrimArray::Float(
                self.collect(items, |h, w| h.float(w).map(|f| f as f32))?,
            )),
            Prim::Double => Value::PrimArray(PrimArray::Double(self.collect(items, Self::float)?)),
        };
        Ok(value)
    }
}

/// Reference arrays flatten to plain sequences; any sequence unflattens to
/// an array typed by its elements' common runtime type. The declared element
/// type is not sent, since peers read sequences as untyped lists.
pub struct ObjectArrayHelper;

impl Flattener for ObjectArrayHelper {
    fn name(&self) -> &str {
        "object array"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(value, Value::Array(_))
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        match value {
            Value::Array(array) => Ok(WireValue::Sequence(root.flatten_all(&array.items)?)),
            other => Err(RpcError::unsupported(format!(
                "expected array, got {}",
                other.type_label()
            ))),
        }
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        matches!(wire, WireValue::Sequence(_))
    }

    fn unflatten(&self, wire: &WireValue, root: &RootFlattener) -> Result<Value> {
        let items = wire
            .as_sequence()
            .ok_or_else(|| RpcError::malformed(format!("expected array, got {}", wire.describe())))?;
        Ok(Value::Array(ObjectArray::infer(root.unflatten_all(items)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_arrays_keep_element_width() {
        let root = RootFlattener::new();
        for value in [
            Value::from(vec![true, false]),
            Value::from(vec!['a', '\u{e9}']),
            Value::from(vec![1i16, -2]),
            Value::from(vec![1i32, 2, 3]),
            Value::from(vec![1i64 << 40]),
            Value::from(vec![0.5f32]),
            Value::from(vec![0.25f64, 1e10]),
        ] {
            let wire = root.flatten(&value).unwrap();
            assert_eq!(root.unflatten(&wire).unwrap(), value);
        }
        let wire = root.flatten(&Value::from(vec![7i32])).unwrap();
        assert_eq!(wire.type_name(), Some("int[]"));
        assert_eq!(
            wire.as_record().unwrap().get(CONTENT),
            Some(&WireValue::Sequence(vec![WireValue::I32(7)]))
        );
    }

    #[test]
    fn test_double_array_accepts_integer_elements() {
        let root = RootFlattener::new();
        let mut record = WireValue::typed_record("double[]");
        record.insert(
            CONTENT.into(),
            WireValue::Sequence(vec![WireValue::I32(1), WireValue::F64(2.5)]),
        );
        assert_eq!(
            root.unflatten(&WireValue::Record(record)).unwrap(),
            Value::from(vec![1.0f64, 2.5])
        );
    }

    #[test]
    fn test_out_of_range_element_rejected() {
        let root = RootFlattener::new();
        let mut record = WireValue::typed_record("short[]");
        record.insert(
            CONTENT.into(),
            WireValue::Sequence(vec![WireValue::I32(70_000)]),
        );
        assert!(root.unflatten(&WireValue::Record(record)).is_err());
    }

    #[test]
    fn test_char_element_must_be_one_character() {
        let root = RootFlattener::new();
        let mut record = WireValue::typed_record("char[]");
        record.insert(
            CONTENT.into(),
            WireValue::Sequence(vec![WireValue::Text("ab".into())]),
        );
        assert!(root.unflatten(&WireValue::Record(record)).is_err());
    }

    #[test]
    fn test_byte_record_reads_as_binary() {
        let root = RootFlattener::new();
        let mut record = WireValue::typed_record("byte[]");
        record.insert(
            CONTENT.into(),
            WireValue::Sequence(vec![WireValue::I8(-1), WireValue::I8(2)]),
        );
        assert_eq!(
            root.unflatten(&WireValue::Record(record)).unwrap(),
            Value::Binary(vec![255, 2])
        );
        assert_eq!(
            root.flatten(&Value::Binary(vec![1])).unwrap(),
            WireValue::Bytes(vec![1])
        );
    }

    #[test]
    fn test_object_array_roundtrip() {
        let root = RootFlattener::new();
        let array = Value::Array(ObjectArray::new(
            Type::String,
            vec![Value::from("a"), Value::from("b")],
        ));
        let wire = root.flatten(&array).unwrap();
        assert_eq!(root.unflatten(&wire).unwrap(), array);

        let nested = Value::Array(ObjectArray::new(
            Type::Object,
            vec![Value::Int(1), Value::Null, Value::from(vec![1.0f64])],
        ));
        let wire = root.flatten(&nested).unwrap();
        assert_eq!(root.unflatten(&wire).unwrap(), nested);
    }

    #[test]
    fn test_declared_element_type_is_reinferred() {
        let root = RootFlattener::new();
        let empty = Value::Array(ObjectArray::new(Type::String, vec![]));
        assert_eq!(root.flatten(&empty).unwrap(), WireValue::Sequence(vec![]));
        match root.unflatten(&root.flatten(&empty).unwrap()).unwrap() {
            Value::Array(array) => assert_eq!(array.elem, Type::Object),
            other => panic!("Expected Array, got: {:?}", other),
        }

        let numbers = Value::Array(ObjectArray::new(Type::Number, vec![Value::Int(1)]));
        match root.unflatten(&root.flatten(&numbers).unwrap()).unwrap() {
            Value::Array(array) => assert_eq!(array.elem, Type::Boxed(Prim::Int)),
            other => panic!("Expected Array, got: {:?}", other),
        }
    }
}
