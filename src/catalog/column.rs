use std::fmt::Display;
use std::fmt::Formatter;

use serde::{Deserialize, Serialize};

use crate::catalog::name::TableName;
use crate::catalog::r#type::DataType;
use crate::error::Result;
use crate::value_err;

/// Name of the column materialized for tables that declare no primary key.
pub const HIDDEN_PK_NAME: &str = "__hkey_pk";

/// Binds a column to the sequence that generates its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub sequence: TableName,
    /// `GENERATED BY DEFAULT` when true, `GENERATED ALWAYS` otherwise.
    pub default_identity: bool,
}

/// A table column schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Zero based position within the table, internal columns included
    pub position: usize,
    /// Column data type
    pub datatype: DataType,
    /// Whether a column is nullable
    pub nullable: bool,
    /// The identity generator binding, if any
    pub identity: Option<Identity>,
    /// Internal columns are not visible to users
    pub internal: bool,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        position: usize,
        datatype: DataType,
        nullable: bool,
    ) -> Column {
        Column { name: name.into(), position, datatype, nullable, identity: None, internal: false }
    }

    /// The internal primary key column placed at `position`, i.e. right
    /// after the user columns.
    pub fn hidden_pk(position: usize) -> Column {
        Column {
            name: HIDDEN_PK_NAME.to_string(),
            position,
            datatype: DataType::BigInt,
            nullable: false,
            identity: None,
            internal: true,
        }
    }

    pub fn is_hidden_pk(&self) -> bool {
        self.internal && self.name == HIDDEN_PK_NAME
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(value_err!("Column name can't be empty"));
        }
        if self.identity.is_some() && !self.datatype.is_numeric() {
            return Err(value_err!(
                "Identity column {} must be numeric, found {}",
                self.name,
                self.datatype
            ));
        }
        Ok(())
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.datatype)?;
        if self.nullable {
            write!(f, " NULL")?;
        }
        if let Some(identity) = &self.identity {
            let how = if identity.default_identity { "BY DEFAULT" } else { "ALWAYS" };
            write!(f, " GENERATED {} AS IDENTITY", how)?;
        }
        Ok(())
    }
}
