use serde_json::Value;

use crate::errors::ValidationError;

/// A form field holding a JSON document.
#[derive(Clone, Copy, Debug)]
pub struct JsonField {
    pub name: &'static str,
    pub required: bool,
}

impl Default for JsonField {
    fn default() -> Self {
        Self {
            name: "json",
            required: true,
        }
    }
}

impl JsonField {
    pub fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }

    /// Parses `text`; blank input is `None` unless the field is required.
    pub fn clean_optional(&self, text: &str) -> Result<Option<Value>, ValidationError> {
        if text.trim().is_empty() {
            if self.required {
                return Err(ValidationError::field(self.name, "This field is required."));
            }
            return Ok(None);
        }

        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| ValidationError::field(self.name, format!("Invalid JSON: {}", e)))
    }

    pub fn clean(&self, text: &str) -> Result<Value, ValidationError> {
        match self.clean_optional(text)? {
            Some(value) => Ok(value),
            None => Ok(Value::Null),
        }
    }
}
