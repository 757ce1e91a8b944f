use crate::error::{Error, Result};
use crate::value::{ClassRef, ClassTable};
use serde::{Deserialize, Serialize};

/// Parser settings as they appear in configuration.
///
/// ```json
/// { "depth_limit": 4, "caller_class": "App\\Controller" }
/// ```
///
/// Both fields are optional. `depth_limit` 0 means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub depth_limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_class: Option<String>,
}

impl ParserConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look the caller class up in `classes`.
    pub fn resolve_caller(&self, classes: &ClassTable) -> Result<Option<ClassRef>> {
        match &self.caller_class {
            None => Ok(None),
            Some(name) => classes
                .get(name)
                .map(Some)
                .ok_or_else(|| Error::UnknownClass(name.clone())),
        }
    }
}
