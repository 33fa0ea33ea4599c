use crate::beans::Bean;
use crate::flatten::{Flattener, RootFlattener};
use crate::value::Value;
use crate::wire::WireValue;
use crate::{Result, RpcError};
use std::marker::PhantomData;

/// Flattens one [`Bean`] type to and from its tagged record.
pub struct BeanHelper<B> {
    _bean: PhantomData<fn() -> B>,
}

impl<B: Bean> BeanHelper<B> {
    pub fn new() -> Self {
        Self { _bean: PhantomData }
    }
}

impl<B: Bean> Default for BeanHelper<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Bean> Flattener for BeanHelper<B> {
    fn name(&self) -> &str {
        B::TYPE_NAME
    }

    fn can_flatten(&self, value: &Value) -> bool {
        value.downcast_ref::<B>().is_some()
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        let bean = value.downcast_ref::<B>().ok_or_else(|| {
            RpcError::unsupported(format!("expected {}, got {}", B::TYPE_NAME, value.type_label()))
        })?;
        let mut record = WireValue::typed_record(B::TYPE_NAME);
        bean.write_fields(&mut record, root)?;
        Ok(WireValue::Record(record))
    }

    fn can_unflatten(&self, wire: &WireValue) -> bool {
        wire.type_name() == Some(B::TYPE_NAME)
    }

    fn unflatten(&self, wire: &WireValue, root: &RootFlattener) -> Result<Value> {
        let record = wire.as_record().ok_or_else(|| {
            RpcError::malformed(format!("expected {} record, got {}", B::TYPE_NAME, wire.kind()))
        })?;
        B::read_fields(record, root).map(Value::object)
    }
}
