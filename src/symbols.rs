use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AsmError;

/// Label addresses collected during the first pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    labels: BTreeMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, address: u32) -> Result<(), AsmError> {
        if self.labels.contains_key(name) {
            return Err(AsmError::DuplicateLabel(name.to_string()));
        }
        self.labels.insert(name.to_string(), address);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<u32, AsmError> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| AsmError::UndefinedLabel(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.labels.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_definition_wins() {
        let mut t = SymbolTable::new();
        t.define("loop", 4).unwrap();
        assert_eq!(t.define("loop", 9), Err(AsmError::DuplicateLabel("loop".into())));
        assert_eq!(t.lookup("loop"), Ok(4));
        assert_eq!(t.lookup("exit"), Err(AsmError::UndefinedLabel("exit".into())));
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut t = SymbolTable::new();
        t.define("start", 0).unwrap();
        t.define("end", 0x1c).unwrap();
        assert_eq!(
            serde_json::to_string(&t).unwrap(),
            r#"{"end":28,"start":0}"#
        );
    }
}
