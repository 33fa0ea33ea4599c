//! Flattening engine.
//!
//! Converts native [`Value`]s to and from [`WireValue`] trees through an
//! ordered chain of [`Flattener`] helpers. The first helper that claims a
//! value wins; nested values are routed back through the [`RootFlattener`]
//! so every helper sees the full chain, including helpers added at runtime.
//!
//! The helper list is copy-on-write: readers clone the `Arc` under a short
//! read lock and iterate without holding it, so a helper may recurse into
//! the root while another thread calls [`RootFlattener::add_helper`].

pub mod helpers;
mod spool;

pub use spool::Spool;

use crate::value::Value;
use crate::wire::WireValue;
use crate::{Result, RpcError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

/// Converter for one native type or family of types.
pub trait Flattener: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn can_flatten(&self, value: &Value) -> bool;

    fn flatten(&self, value: &Value, root: &RootFlattener) -> Result<WireValue>;

    fn can_unflatten(&self, wire: &WireValue) -> bool;

    fn unflatten(&self, wire: &WireValue, root: &RootFlattener) -> Result<Value>;
}

/// Native objects that produce their own wire form.
///
/// Self-flattening objects are flatten-only: the receiving side needs a
/// helper for the record they produce.
pub trait SelfFlattening: Send + Sync {
    fn flatten_self(&self, root: &RootFlattener) -> Result<WireValue>;
}

type HelperList = Arc<Vec<Arc<dyn Flattener>>>;

/// Ordered helper chain plus spooling policy.
pub struct RootFlattener {
    helpers: RwLock<HelperList>,
    temp_location: RwLock<Option<PathBuf>>,
    spool: Spool,
}

impl Default for RootFlattener {
    fn default() -> Self {
        Self::new()
    }
}

impl RootFlattener {
    /// Root flattener with the built-in helpers.
    pub fn new() -> Self {
        Self::with_helpers(helpers::builtin())
    }

    /// Root flattener with no helpers at all.
    pub fn empty() -> Self {
        Self::with_helpers(Vec::new())
    }

    pub fn with_helpers(helpers: Vec<Arc<dyn Flattener>>) -> Self {
        Self {
            helpers: RwLock::new(Arc::new(helpers)),
            temp_location: RwLock::new(None),
            spool: Spool::default(),
        }
    }

    fn snapshot(&self) -> HelperList {
        self.helpers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Insert `helper` ahead of every existing helper.
    pub fn add_helper(&self, helper: Arc<dyn Flattener>) {
        let mut guard = self.helpers.write().unwrap_or_else(PoisonError::into_inner);
        let mut list = Vec::with_capacity(guard.len() + 1);
        list.push(helper);
        list.extend(guard.iter().cloned());
        debug!("Added flattening helper {}", list[0].name());
        *guard = Arc::new(list);
    }

    /// Names of the registered helpers, in lookup order.
    pub fn helper_names(&self) -> Vec<String> {
        self.snapshot().iter().map(|h| h.name().to_string()).collect()
    }

    pub fn can_flatten(&self, value: &Value) -> bool {
        self.snapshot().iter().any(|h| h.can_flatten(value))
    }

    pub fn flatten(&self, value: &Value) -> Result<WireValue> {
        let helpers = self.snapshot();
        let helper = helpers
            .iter()
            .find(|h| h.can_flatten(value))
            .ok_or_else(|| {
                RpcError::unsupported(format!("cannot flatten value of type {}", value.type_label()))
            })?;
        debug!("Flattening {} with {}", value.type_label(), helper.name());
        helper.flatten(value, self)
    }

    pub fn can_unflatten(&self, wire: &WireValue) -> bool {
        self.snapshot().iter().any(|h| h.can_unflatten(wire))
    }

    pub fn unflatten(&self, wire: &WireValue) -> Result<Value> {
        let helpers = self.snapshot();
        let helper = helpers
            .iter()
            .find(|h| h.can_unflatten(wire))
            .ok_or_else(|| {
                RpcError::unsupported(format!("cannot unflatten {}", wire.describe()))
            })?;
        debug!("Unflattening {} with {}", wire.describe(), helper.name());
        helper.unflatten(wire, self)
    }

    pub fn flatten_all(&self, values: &[Value]) -> Result<Vec<WireValue>> {
        values.iter().map(|v| self.flatten(v)).collect()
    }

    pub fn unflatten_all(&self, wires: &[WireValue]) -> Result<Vec<Value>> {
        wires.iter().map(|w| self.unflatten(w)).collect()
    }

    /// Directory for spooled payloads. `None` restores the system temp dir.
    pub fn set_temp_location(&self, location: Option<PathBuf>) {
        *self
            .temp_location
            .write()
            .unwrap_or_else(PoisonError::into_inner) = location;
    }

    pub fn temp_location(&self) -> PathBuf {
        self.temp_location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Write a payload to a new spool file in the temp location.
    pub fn spool(&self, bytes: &[u8]) -> Result<PathBuf> {
        self.spool.write(&self.temp_location(), bytes)
    }

    /// Whether `path` is a spool file in the temp location, and so may be
    /// deleted once loaded.
    pub fn is_spooled(&self, path: &Path) -> bool {
        self.spool.owns(&self.temp_location(), path)
    }
}

/// Process-wide root flattener with the built-in helpers.
pub fn flattener() -> Arc<RootFlattener> {
    static ROOT: OnceLock<Arc<RootFlattener>> = OnceLock::new();
    ROOT.get_or_init(|| Arc::new(RootFlattener::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout;

    impl Flattener for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn can_flatten(&self, value: &Value) -> bool {
            matches!(value, Value::Str(_))
        }

        fn flatten(&self, value: &Value, _root: &RootFlattener) -> Result<WireValue> {
            Ok(WireValue::Text(value.as_str().unwrap_or_default().to_uppercase()))
        }

        fn can_unflatten(&self, _wire: &WireValue) -> bool {
            false
        }

        fn unflatten(&self, wire: &WireValue, _root: &RootFlattener) -> Result<Value> {
            Err(RpcError::unsupported(wire.describe()))
        }
    }

    #[test]
    fn test_empty_root_rejects_everything() {
        let root = RootFlattener::empty();
        assert!(!root.can_flatten(&Value::Int(1)));
        assert!(matches!(
            root.flatten(&Value::Int(1)),
            Err(RpcError::Unsupported { .. })
        ));
        assert!(matches!(
            root.unflatten(&WireValue::I32(1)),
            Err(RpcError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_added_helper_takes_precedence() {
        let root = RootFlattener::new();
        assert_eq!(root.flatten(&Value::from("a")).unwrap(), WireValue::Text("a".into()));
        root.add_helper(Arc::new(Shout));
        assert_eq!(root.helper_names()[0], "shout");
        assert_eq!(root.flatten(&Value::from("a")).unwrap(), WireValue::Text("A".into()));
        // Unflattening still falls through to the built-ins.
        assert_eq!(root.unflatten(&WireValue::Text("a".into())).unwrap(), Value::from("a"));
    }

    #[test]
    fn test_temp_location_defaults_to_system_temp() {
        let root = RootFlattener::new();
        assert_eq!(root.temp_location(), std::env::temp_dir());
        root.set_temp_location(Some(PathBuf::from("/tmp/elsewhere")));
        assert_eq!(root.temp_location(), PathBuf::from("/tmp/elsewhere"));
        root.set_temp_location(None);
        assert_eq!(root.temp_location(), std::env::temp_dir());
    }

    #[test]
    fn test_singleton_is_shared() {
        assert!(Arc::ptr_eq(&flattener(), &flattener()));
    }
}
