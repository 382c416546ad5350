use serde::Deserialize;
use serde::Serialize;

use crate::catalog::name::TableName;
use crate::error::Result;
use crate::value_err;

/// A sequence generator, typically bound to an identity column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: TableName,
    pub start_with: i64,
    pub increment: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cycle: bool,
    /// Storage tree, assigned when the sequence is merged into a schema.
    pub tree_name: Option<String>,
}

impl Sequence {
    pub fn new(
        name: TableName,
        start_with: i64,
        increment: i64,
        min_value: i64,
        max_value: i64,
        cycle: bool,
    ) -> Sequence {
        Sequence { name, start_with, increment, min_value, max_value, cycle, tree_name: None }
    }

    pub fn default_tree_name(&self) -> String {
        format!("sequence:{}", self.name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.increment == 0 {
            return Err(value_err!("Sequence {} increment can't be zero", self.name));
        }
        if self.min_value >= self.max_value {
            return Err(value_err!(
                "Sequence {} min value {} must be below max value {}",
                self.name,
                self.min_value,
                self.max_value
            ));
        }
        if self.start_with < self.min_value || self.start_with > self.max_value {
            return Err(value_err!(
                "Sequence {} starts at {} outside [{}, {}]",
                self.name,
                self.start_with,
                self.min_value,
                self.max_value
            ));
        }
        Ok(())
    }
}
