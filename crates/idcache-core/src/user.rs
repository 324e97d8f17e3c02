//! The authenticated user record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::rights::decode_permissions;
use crate::types::{PermissionMap, RawPermissions, RawRights};

/// The currently authenticated user, as returned by the identity service.
///
/// Only `_id` and `permissions` are interpreted; every other field is kept in
/// [`User::fields`] and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Service-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,

    /// Raw permission data in wire form.
    #[serde(default)]
    pub permissions: RawPermissions,

    /// Consumer-defined fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl User {
    /// Create a user with no permissions and no extra fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            permissions: RawPermissions::new(),
            fields: Map::new(),
        }
    }

    /// Add raw rights for a permission name.
    pub fn with_permission(mut self, name: impl Into<String>, rights: RawRights) -> Self {
        self.permissions.insert(name.into(), rights);
        self
    }

    /// Add a pass-through field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a pass-through field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Parse a user from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Decode this user's raw permissions.
    pub fn decoded_permissions(&self) -> PermissionMap {
        decode_permissions(&self.permissions)
    }
}
