use crate::beans::{Bean, Dataset, DatasetDescriptor};
use crate::flatten::{Flattener, RootFlattener};
use crate::value::Value;
use crate::wire::WireValue;
use crate::{Result, RpcError};

/// Dataset file references. Flatten only: the record they produce is a
/// dataset record and unflattens as a [`Dataset`].
pub struct DatasetDescriptorHelper;

impl Flattener for DatasetDescriptorHelper {
    fn name(&self) -> &str {
        "dataset descriptor"
    }

    fn can_flatten(&self, value: &Value) -> bool {
        value.downcast_ref::<DatasetDescriptor>().is_some()
    }

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue> {
        let descriptor = value.downcast_ref::<DatasetDescriptor>().ok_or_else(|| {
            RpcError::unsupported(format!(
                "expected dataset descriptor, got {}",
                value.type_label()
            ))
        })?;
        let mut record = WireValue::typed_record(Dataset::TYPE_NAME);
        descriptor.write_fields(&mut record, root)?;
        Ok(WireValue::Record(record))
    }

    fn can_unflatten(&self, _wire: &WireValue) -> bool {
        false
    }

    fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
        Err(RpcError::unsupported(format!(
            "dataset descriptors are never unflattened, got {}",
            wire.describe()
        )))
    }
}
