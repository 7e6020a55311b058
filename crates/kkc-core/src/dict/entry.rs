use serde::{Deserialize, Serialize};

/// One dictionary entry: a reading (`key`) mapped to a surface (`value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictEntry {
    pub key: String,
    pub value: String,
    pub cost: u16,
    pub lid: u16,
    pub rid: u16,
}

impl DictEntry {
    pub fn new(key: &str, value: &str, cost: u16, lid: u16, rid: u16) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            cost,
            lid,
            rid,
        }
    }
}
