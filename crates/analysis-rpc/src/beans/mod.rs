//! Domain beans exchanged with plotting and analysis clients.
//!
//! Each bean knows its record layout through [`Bean`]; the flattening engine
//! registers one [`BeanHelper`](crate::flatten::helpers::BeanHelper) per bean
//! type. Field values are flattened through the root flattener, so nested
//! beans, arrays and datasets take their own wire forms.

pub mod dataset;
pub mod gui;
pub mod roi;

pub use dataset::{Dataset, DatasetData, DatasetDescriptor};
pub use gui::{
    AxisMapBean, DataBean, DataSetWithAxisInformation, GuiBean, GuiParameters, GuiPlotMode,
};
pub use roi::{
    CircularRoi, LinearRoi, LinearRoiList, RectangularRoi, RectangularRoiList, RoiBase, SectorRoi,
    SectorRoiList,
};

use crate::flatten::RootFlattener;
use crate::value::{NativeObject, Value};
use crate::wire::{record_type, required, Record};
use crate::{Result, RpcError};

/// A native type with a fixed record layout under a canonical type name.
pub trait Bean: NativeObject + Sized {
    /// `__type__` discriminant of the record.
    const TYPE_NAME: &'static str;

    /// Write this bean's fields into a record already tagged with
    /// [`Bean::TYPE_NAME`].
    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()>;

    /// Rebuild the bean from its record.
    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self>;
}

pub(crate) fn put(
    record: &mut Record,
    key: &str,
    value: impl Into<Value>,
    root: &RootFlattener,
) -> Result<()> {
    record.insert(key.to_string(), root.flatten(&value.into())?);
    Ok(())
}

pub(crate) fn field(record: &Record, key: &str, root: &RootFlattener) -> Result<Value> {
    root.unflatten(required(record, key)?)
}

/// Like [`field`], but a missing key reads as null.
pub(crate) fn optional_field(record: &Record, key: &str, root: &RootFlattener) -> Result<Value> {
    match record.get(key) {
        Some(wire) => root.unflatten(wire),
        None => Ok(Value::Null),
    }
}

pub(crate) fn wrong_field(record: &Record, key: &str, expected: &str, got: &Value) -> RpcError {
    RpcError::malformed(format!(
        "field '{}' of {} must be {}, got {}",
        key,
        record_type(record).unwrap_or("<untyped>"),
        expected,
        got.type_label()
    ))
}

pub(crate) fn f64_field(record: &Record, key: &str, root: &RootFlattener) -> Result<f64> {
    let value = field(record, key, root)?;
    value
        .as_f64()
        .ok_or_else(|| wrong_field(record, key, "a number", &value))
}

pub(crate) fn i32_field(record: &Record, key: &str, root: &RootFlattener) -> Result<i32> {
    let value = field(record, key, root)?;
    value
        .as_i64()
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(|| wrong_field(record, key, "an int", &value))
}

pub(crate) fn bool_field(record: &Record, key: &str, root: &RootFlattener) -> Result<bool> {
    let value = field(record, key, root)?;
    match value {
        Value::Bool(b) => Ok(b),
        ref other => other
            .as_i64()
            .map(|i| i != 0)
            .ok_or_else(|| wrong_field(record, key, "a boolean", other)),
    }
}

/// Numeric vector from a `double[]` or a numeric sequence.
pub(crate) fn f64_vec_field(record: &Record, key: &str, root: &RootFlattener) -> Result<Vec<f64>> {
    let value = field(record, key, root)?;
    value
        .to_f64_vec()
        .ok_or_else(|| wrong_field(record, key, "a numeric array", &value))
}

pub(crate) fn pair_field(record: &Record, key: &str, root: &RootFlattener) -> Result<[f64; 2]> {
    let values = f64_vec_field(record, key, root)?;
    match values.as_slice() {
        [a, b] => Ok([*a, *b]),
        _ => Err(RpcError::malformed(format!(
            "field '{}' of {} must hold 2 numbers, got {}",
            key,
            record_type(record).unwrap_or("<untyped>"),
            values.len()
        ))),
    }
}

pub(crate) fn opt_string_field(
    record: &Record,
    key: &str,
    root: &RootFlattener,
) -> Result<Option<String>> {
    match optional_field(record, key, root)? {
        Value::Null | Value::TypedNone(_) => Ok(None),
        Value::Str(s) => Ok(Some(s)),
        other => Err(wrong_field(record, key, "a string", &other)),
    }
}
