//! Typed access to command reply documents.

use bson::{Bson, Document};
use serde::de::DeserializeOwned;

use crate::error::{OdmError, OdmResult};

/// Extension trait for reading server replies.
///
/// The `expect_*` getters fail with [`OdmError::Reply`] when a field is
/// missing or has the wrong type; the numeric getters are lenient about
/// the integer width the server chose.
pub trait DocumentExt {
    /// Get a required string field.
    fn expect_str(&self, key: &str) -> OdmResult<&str>;

    /// Get a required i32 field, accepting any integral numeric encoding.
    fn expect_i32(&self, key: &str) -> OdmResult<i32>;

    /// Get a required i64 field, accepting any integral numeric encoding.
    fn expect_i64(&self, key: &str) -> OdmResult<i64>;

    /// Get a required f64 field, accepting any numeric encoding.
    fn expect_f64(&self, key: &str) -> OdmResult<f64>;

    /// Get a required embedded document.
    fn expect_document(&self, key: &str) -> OdmResult<&Document>;

    /// Get any numeric field as f64, if present.
    fn numeric(&self, key: &str) -> Option<f64>;

    /// Decode the document into a typed struct.
    fn to_struct<T: DeserializeOwned>(&self) -> OdmResult<T>;
}

impl DocumentExt for Document {
    fn expect_str(&self, key: &str) -> OdmResult<&str> {
        match self.get(key) {
            Some(Bson::String(s)) => Ok(s),
            Some(_) => Err(OdmError::reply(format!("field '{}' is not a string", key))),
            None => Err(OdmError::reply(format!("field '{}' is missing", key))),
        }
    }

    fn expect_i32(&self, key: &str) -> OdmResult<i32> {
        let value = self.expect_i64(key)?;
        i32::try_from(value)
            .map_err(|_| OdmError::reply(format!("field '{}' does not fit in an i32", key)))
    }

    fn expect_i64(&self, key: &str) -> OdmResult<i64> {
        match self.get(key) {
            Some(Bson::Int32(n)) => Ok(i64::from(*n)),
            Some(Bson::Int64(n)) => Ok(*n),
            Some(Bson::Double(f)) if f.fract() == 0.0 => Ok(*f as i64),
            Some(_) => Err(OdmError::reply(format!("field '{}' is not an integer", key))),
            None => Err(OdmError::reply(format!("field '{}' is missing", key))),
        }
    }

    fn expect_f64(&self, key: &str) -> OdmResult<f64> {
        self.numeric(key)
            .ok_or_else(|| OdmError::reply(format!("field '{}' is not numeric", key)))
    }

    fn expect_document(&self, key: &str) -> OdmResult<&Document> {
        match self.get(key) {
            Some(Bson::Document(doc)) => Ok(doc),
            Some(_) => Err(OdmError::reply(format!("field '{}' is not a document", key))),
            None => Err(OdmError::reply(format!("field '{}' is missing", key))),
        }
    }

    fn numeric(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(Bson::Int32(n)) => Some(f64::from(*n)),
            Some(Bson::Int64(n)) => Some(*n as f64),
            Some(Bson::Double(f)) => Some(*f),
            _ => None,
        }
    }

    fn to_struct<T: DeserializeOwned>(&self) -> OdmResult<T> {
        bson::from_document(self.clone()).map_err(|e| OdmError::reply(e.to_string()))
    }
}
