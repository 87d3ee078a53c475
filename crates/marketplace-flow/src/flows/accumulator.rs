use serde_json::Value;

use super::domain::FieldMap;

/// Partial entity grown step by step through shallow merges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataAccumulator {
    fields: FieldMap,
}

impl DataAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// Overwrites every key present in `partial`; other keys are left alone.
    /// Returns how many keys actually changed.
    pub fn merge(&mut self, partial: FieldMap) -> usize {
        let mut changed = 0;
        for (key, value) in partial {
            if self.fields.get(&key) != Some(&value) {
                changed += 1;
                self.fields.insert(key, value);
            }
        }
        changed
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn snapshot(&self) -> FieldMap {
        self.fields.clone()
    }
}
