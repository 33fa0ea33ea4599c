//! Canonical wire value model.
//!
//! [`WireValue`] is the only shape that crosses the transport. It mirrors the
//! XML-RPC value set (booleans, sized integers and floats, strings, base64
//! blobs, arrays and structs) plus explicit absent markers. Records use the
//! reserved [`TYPE_KEY`] to name the native type they were flattened from.

pub mod json;

use crate::{Result, RpcError};
use std::collections::BTreeMap;

/// Reserved record key holding the canonical type name.
pub const TYPE_KEY: &str = "__type__";
/// Record key used by helpers that carry a single payload.
pub const CONTENT: &str = "content";
/// Type name of the none record.
pub const NONE_TYPE: &str = "__None__";
/// Field of the none record naming the intended type.
pub const TYPED_NONE_TYPE: &str = "typedNoneType";
/// `typedNoneType` value of a plain null.
pub const NULL_TYPE: &str = "null";

/// String-keyed record. Key order carries no meaning.
pub type Record = BTreeMap<String, WireValue>;

/// Transport-safe value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Explicit null.
    Absent,
    /// Null annotated with the type it stands in for.
    TypedAbsent(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Sequence(Vec<WireValue>),
    Record(Record),
}

impl WireValue {
    /// Start a record tagged with `type_name`.
    pub fn typed_record(type_name: &str) -> Record {
        let mut record = Record::new();
        record.insert(TYPE_KEY.to_string(), WireValue::Text(type_name.to_string()));
        record
    }

    /// The `__type__` discriminant, if this is a tagged record.
    pub fn type_name(&self) -> Option<&str> {
        self.as_record().and_then(record_type)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            WireValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[WireValue]> {
        match self {
            WireValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Absent => "absent",
            WireValue::TypedAbsent(_) => "typed absent",
            WireValue::Bool(_) => "boolean",
            WireValue::I8(_) => "i1",
            WireValue::I16(_) => "i2",
            WireValue::I32(_) => "i4",
            WireValue::I64(_) => "i8",
            WireValue::F32(_) => "float",
            WireValue::F64(_) => "double",
            WireValue::Text(_) => "string",
            WireValue::Bytes(_) => "base64",
            WireValue::Sequence(_) => "array",
            WireValue::Record(_) => "struct",
        }
    }

    /// Describe this value for diagnostics without dumping large payloads.
    pub fn describe(&self) -> String {
        match self.type_name() {
            Some(name) => format!("struct of type {}", name),
            None => self.kind().to_string(),
        }
    }
}

/// The `__type__` discriminant of a record.
pub fn record_type(record: &Record) -> Option<&str> {
    record.get(TYPE_KEY).and_then(WireValue::as_str)
}

/// Fetch a mandatory field of a typed record.
pub fn required<'a>(record: &'a Record, key: &str) -> Result<&'a WireValue> {
    record.get(key).ok_or_else(|| {
        RpcError::malformed(format!(
            "record of type {} is missing field '{}'",
            record_type(record).unwrap_or("<untyped>"),
            key
        ))
    })
}

/// Build the none record used where the transport has no null.
pub fn none_record(typed_none_type: Option<&str>) -> Record {
    let mut record = WireValue::typed_record(NONE_TYPE);
    record.insert(
        TYPED_NONE_TYPE.to_string(),
        WireValue::Text(typed_none_type.unwrap_or(NULL_TYPE).to_string()),
    );
    record
}

/// Interpret a none record: `Some(None)` for a plain null, `Some(Some(t))`
/// for a typed none, `None` if the record is something else.
pub fn parse_none_record(record: &Record) -> Option<Option<&str>> {
    if record_type(record) != Some(NONE_TYPE) {
        return None;
    }
    match record.get(TYPED_NONE_TYPE).and_then(WireValue::as_str) {
        None | Some(NULL_TYPE) => Some(None),
        Some(type_name) => Some(Some(type_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_record_carries_type() {
        let record = WireValue::Record(WireValue::typed_record("java.util.UUID"));
        assert_eq!(record.type_name(), Some("java.util.UUID"));
        assert_eq!(WireValue::Sequence(vec![]).type_name(), None);
    }

    #[test]
    fn test_none_record_forms() {
        assert_eq!(parse_none_record(&none_record(None)), Some(None));
        assert_eq!(
            parse_none_record(&none_record(Some("java.lang.Integer"))),
            Some(Some("java.lang.Integer"))
        );
        assert_eq!(parse_none_record(&WireValue::typed_record("x")), None);
    }

    #[test]
    fn test_required_field_error_names_record_type() {
        let record = WireValue::typed_record("uk.ac.diamond.scisoft.analysis.roi.ROIBase");
        let err = required(&record, "spt").unwrap_err();
        assert!(err.to_string().contains("ROIBase"));
        assert!(err.to_string().contains("spt"));
    }
}
