use crate::flatten::{Flattener, RootFlattener};
use crate::value::{Type, Value};
use crate::wire::{record_type, required, Record, WireValue, TYPE_KEY};
use crate::{Result, RpcError};
use std::collections::BTreeMap;

const KEYS: &str = "keys";
const VALUES: &str = "values";

/// Lists flatten to sequences. Sequences come back as object arrays, so
/// this helper never unflattens.
pub struct ListHelper;

impl Flattener for ListHelper {
    fn name(&self) -> &str {
        "java.util.List"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(value, Value::List(_))
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        match value {
            Value::List(items) => Ok(WireValue::Sequence(root.flatten_all(items)?)),
            other => Err(RpcError::unsupported(format!(
                "expected list, got {}",
                other.type_label()
            ))),
        }
    }

    fn can_unflatten(&self, _wire: &WireValue) -> bool {
        false
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        Err(RpcError::unsupported(format!(
            "list helper cannot unflatten {}",
            wire.describe()
        )))
    }
}

/// String-keyed maps.
///
/// Flattened as `{__type__: "java.util.Map", keys: [...], values: [...]}`.
/// A record with no `__type__` also unflattens as a map, field by field.
pub struct MapHelper;

impl MapHelper {
    fn type_name() -> String {
        Type::Map.canonical_name()
    }

    fn from_parallel(record: &Record, root: &RootFlattener) -> Result<BTreeMap<String, Value>> {
        let keys = required(record, KEYS)?
            .as_sequence()
            .ok_or_else(|| RpcError::malformed("map keys must be an array"))?;
        let values = required(record, VALUES)?
            .as_sequence()
            .ok_or_else(|| RpcError::malformed("map values must be an array"))?;
        if keys.len() != values.len() {
            return Err(RpcError::malformed(format!(
                "map has {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        keys.iter()
            .zip(values)
            .map(|(key, value)| {
                let key = match root.unflatten(key)? {
                    Value::Str(key) => key,
                    other => {
                        return Err(RpcError::unsupported(format!(
                            "map keys must be strings, got {}",
                            other.type_label()
                        )))
                    }
                };
                Ok((key, root.unflatten(value)?))
            })
            .collect()
    }
}

impl Flattener for MapHelper {
    fn name(&self) -> &str {
        "java.util.Map"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        let map = match value {
            Value::Map(map) => map,
            other => {
                return Err(RpcError::unsupported(format!(
                    "expected map, got {}",
                    other.type_label()
                )))
            }
        };
        let mut record = WireValue::typed_record(&Self::type_name());
        let keys = map.keys().map(|k| WireValue::Text(k.clone())).collect();
        let values = map
            .values()
            .map(|v| root.flatten(v))
            .collect::<Result<Vec<_>>>()?;
        record.insert(KEYS.to_string(), WireValue::Sequence(keys));
        record.insert(VALUES.to_string(), WireValue::Sequence(values));
        Ok(WireValue::Record(record))
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        match wire.as_record() {
            Some(record) => match record_type(record) {
                Some(name) => name == Self::type_name(),
                None => !record.contains_key(TYPE_KEY),
            },
            None => false,
        }
    }

    fn unflatten(&self, wire: &WireValue, root: &RootFlattener) -> Result<Value> {
        let record = wire
            .as_record()
            .ok_or_else(|| RpcError::malformed(format!("expected map, got {}", wire.describe())))?;
        let map = if record_type(record).is_some() {
            Self::from_parallel(record, root)?
        } else {
            record
                .iter()
                .map(|(key, value)| Ok((key.clone(), root.unflatten(value)?)))
                .collect::<Result<_>>()?
        };
        Ok(Value::Map(map))
    }
}
