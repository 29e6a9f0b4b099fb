//! Fluent builders for option payloads.

use serde_json::{Value, json};

/// Builds enum option arrays.
#[derive(Debug, Default)]
pub struct EnumOptionBuilder {
    choices: Vec<Value>,
}

impl EnumOptionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choice(mut self, id: &str, name: &str) -> Self {
        self.choices.push(json!({"id": id, "name": name, "type": "text", "is_default": false}));
        self
    }

    pub fn default_choice(mut self, id: &str, name: &str) -> Self {
        self.choices.push(json!({"id": id, "name": name, "type": "text", "is_default": true}));
        self
    }

    pub fn build(self) -> Value {
        Value::Array(self.choices)
    }
}

/// Builds enum-quote option arrays.
#[derive(Debug)]
pub struct QuoteOptionBuilder {
    object_id: String,
    instance_ids: Vec<i64>,
}

impl QuoteOptionBuilder {
    pub fn new(object_id: &str) -> Self {
        Self {
            object_id: object_id.to_string(),
            instance_ids: Vec::new(),
        }
    }

    pub fn instance(mut self, instance_id: i64) -> Self {
        self.instance_ids.push(instance_id);
        self
    }

    pub fn build(self) -> Value {
        Value::Array(
            self.instance_ids
                .into_iter()
                .map(|id| json!({"bk_obj_id": self.object_id, "bk_inst_id": id, "type": "int"}))
                .collect(),
        )
    }
}
