use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Add,
    Drop,
    Modify,
}

/// One column or index change of an ALTER.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub change_type: ChangeType,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
}

impl Display for TableChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let old = self.old_name.as_deref().unwrap_or("");
        let new = self.new_name.as_deref().unwrap_or("");
        match self.change_type {
            ChangeType::Add => write!(f, "ADD:{}", new),
            ChangeType::Drop => write!(f, "DROP:{}", old),
            ChangeType::Modify => write!(f, "MODIFY:{}->{}", old, new),
        }
    }
}

/// Attached to a table being rebuilt by an online schema change. The
/// recorded changes are applied to `original_name` once the copy is
/// renamed over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOsc {
    pub original_name: String,
    pub current_name: Option<String>,
    pub column_changes: Vec<TableChange>,
    pub index_changes: Vec<TableChange>,
}

impl PendingOsc {
    pub fn new(
        original_name: impl Into<String>,
        column_changes: Vec<TableChange>,
        index_changes: Vec<TableChange>,
    ) -> PendingOsc {
        PendingOsc { original_name: original_name.into(), current_name: None, column_changes, index_changes }
    }
}

impl Display for PendingOsc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.original_name)?;
        if let Some(current) = &self.current_name {
            write!(f, "={}", current)?;
        }
        let join = |changes: &[TableChange]| {
            changes.iter().map(|it| it.to_string()).collect::<Vec<_>>().join(", ")
        };
        write!(f, "[{}][{}]", join(&self.column_changes), join(&self.index_changes))
    }
}
