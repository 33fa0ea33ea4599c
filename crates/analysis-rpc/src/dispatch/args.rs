//! Positional argument access for method bodies.
//!
//! Resolution has already checked every argument against the declared
//! parameter types, so accessors only fail when a body asks for something
//! its own signature did not declare.

use crate::value::{Exception, NativeObject, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    pub fn get(&self, index: usize) -> Result<&Value, Exception> {
        self.0.get(index).ok_or_else(|| {
            Exception::illegal_argument(format!(
                "argument {} requested but only {} supplied",
                index,
                self.0.len()
            ))
        })
    }

    fn mismatch(&self, index: usize, expected: &str) -> Exception {
        let got = self
            .0
            .get(index)
            .map(Value::type_label)
            .unwrap_or_else(|| "nothing".to_string());
        Exception::illegal_argument(format!(
            "argument {} should be {}, got {}",
            index, expected, got
        ))
    }

    /// Clone of argument `index`.
    pub fn value(&self, index: usize) -> Result<Value, Exception> {
        self.get(index).cloned()
    }

    pub fn is_null(&self, index: usize) -> Result<bool, Exception> {
        self.get(index).map(Value::is_null)
    }

    pub fn bool(&self, index: usize) -> Result<bool, Exception> {
        self.get(index)?
            .as_bool()
            .ok_or_else(|| self.mismatch(index, "a boolean"))
    }

    pub fn char(&self, index: usize) -> Result<char, Exception> {
        match self.get(index)? {
            Value::Char(c) => Ok(*c),
            _ => Err(self.mismatch(index, "a char")),
        }
    }

    pub fn int(&self, index: usize) -> Result<i32, Exception> {
        self.get(index)?
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| self.mismatch(index, "an int"))
    }

    pub fn long(&self, index: usize) -> Result<i64, Exception> {
        self.get(index)?
            .as_i64()
            .ok_or_else(|| self.mismatch(index, "a long"))
    }

    pub fn double(&self, index: usize) -> Result<f64, Exception> {
        self.get(index)?
            .as_f64()
            .ok_or_else(|| self.mismatch(index, "a number"))
    }

    pub fn str(&self, index: usize) -> Result<&str, Exception> {
        self.get(index)?
            .as_str()
            .ok_or_else(|| self.mismatch(index, "a string"))
    }

    /// A string argument that may be null.
    pub fn opt_str(&self, index: usize) -> Result<Option<&str>, Exception> {
        match self.get(index)? {
            v if v.is_null() => Ok(None),
            Value::Str(s) => Ok(Some(s)),
            _ => Err(self.mismatch(index, "a string or null")),
        }
    }

    pub fn doubles(&self, index: usize) -> Result<Vec<f64>, Exception> {
        self.get(index)?
            .to_f64_vec()
            .ok_or_else(|| self.mismatch(index, "a numeric array"))
    }

    pub fn object<T: NativeObject>(&self, index: usize) -> Result<&T, Exception> {
        self.get(index)?
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch(index, std::any::type_name::<T>()))
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
