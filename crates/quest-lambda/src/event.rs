//! Wire types exchanged with the hosting platform

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One inbound request, as delivered by the platform.
///
/// Every field is optional and an explicit `null` reads the same as an
/// absent field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default, alias = "method")]
    pub http_method: Option<String>,

    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default, alias = "queryParameters")]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
}

/// The only object handed back to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl InvocationResponse {
    /// Header value by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
