use std::fmt::{Display, Formatter};

use config::ConfigError;

use crate::catalog::name::TableName;
use crate::catalog::r#type::DataType;
use crate::catalog::{GroupId, TableId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Internal(String),
    Value(String),
    /// A join names a parent table that the merge target does not have.
    InvalidParentReference { join: String, child: TableName, parent: TableName },
    /// A join or index refers to a column the table does not have.
    NoSuchColumn { table: TableName, column: String },
    /// A join column pair whose types belong to different families.
    IncompatibleJoinColumnTypes {
        join: String,
        parent: TableName,
        parent_column: String,
        parent_type: DataType,
        child: TableName,
        child_column: String,
        child_type: DataType,
    },
    DuplicateTableId { id: TableId, existing: TableName, duplicate: TableName },
    DuplicateGroupId { id: GroupId, existing: TableName, duplicate: TableName },
    /// kind is one of "table", "group", "join", "sequence", "index", "column".
    DuplicateName { kind: &'static str, name: String },
    /// A grouping dependent lookup made before grouping completed.
    PrematureAccess(String),
    ColumnAlreadyGenerated { table: TableName, column: String, sequence: TableName },
    /// Every ID of the space the named table or group draws from is used.
    IdsExhausted { kind: &'static str, name: TableName },
}

impl Error {
    pub fn value(msg: impl Into<String>) -> Error {
        Error::Value(msg.into())
    }
}

#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        $crate::error::Error::Value(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! internal_err {
    ($($arg:tt)*) => {
        $crate::error::Error::Internal(format!($($arg)*))
    };
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(s) | Error::Value(s) => {
                write!(f, "{}", s)
            }
            Error::InvalidParentReference { join, child, parent } => {
                write!(f, "Join {} from {} refers to unknown parent table {}", join, child, parent)
            }
            Error::NoSuchColumn { table, column } => {
                write!(f, "Column {} does not exist in table {}", column, table)
            }
            Error::IncompatibleJoinColumnTypes {
                join,
                parent,
                parent_column,
                parent_type,
                child,
                child_column,
                child_type,
            } => write!(
                f,
                "Join {} to incompatible column type: {}.{} ({}) cannot join {}.{} ({})",
                join, child, child_column, child_type, parent, parent_column, parent_type
            ),
            Error::DuplicateTableId { id, existing, duplicate } => {
                write!(f, "Table ID {} of {} is already used by {}", id, duplicate, existing)
            }
            Error::DuplicateGroupId { id, existing, duplicate } => {
                write!(f, "Group ID {} of {} is already used by {}", id, duplicate, existing)
            }
            Error::DuplicateName { kind, name } => {
                write!(f, "Duplicate {} name {}", kind, name)
            }
            Error::PrematureAccess(what) => {
                write!(f, "Grouping is not complete, can't {}", what)
            }
            Error::ColumnAlreadyGenerated { table, column, sequence } => {
                write!(f, "Column {}.{} is already generated by sequence {}", table, column, sequence)
            }
            Error::IdsExhausted { kind, name } => {
                write!(f, "No {} ID left to allocate for {}", kind, name)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
