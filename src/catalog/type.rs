use serde::Deserialize;
use serde::Serialize;

/// A column datatype
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal(u8, u8),
    Float,
    Double,
    Char(u32),
    Varchar(u32),
    Text,
    Date,
    Timestamp,
}

/// Types within one family can be converted into each other by implicit
/// widening, types of different families never can.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TypeFamily {
    Boolean,
    Numeric,
    Character,
    Temporal,
}

impl DataType {
    pub fn family(&self) -> TypeFamily {
        match self {
            DataType::Boolean => TypeFamily::Boolean,
            DataType::TinyInt
            | DataType::SmallInt
            | DataType::Int
            | DataType::BigInt
            | DataType::Decimal(_, _)
            | DataType::Float
            | DataType::Double => TypeFamily::Numeric,
            DataType::Char(_) | DataType::Varchar(_) | DataType::Text => TypeFamily::Character,
            DataType::Date | DataType::Timestamp => TypeFamily::Temporal,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.family() == TypeFamily::Numeric
    }

    /// Whether a child column of this type may reference a parent column
    /// of type `parent` in a grouping join.
    pub fn is_join_compatible(&self, parent: &DataType) -> bool {
        self.family() == parent.family()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::TinyInt => f.write_str("TINYINT"),
            Self::SmallInt => f.write_str("SMALLINT"),
            Self::Int => f.write_str("INT"),
            Self::BigInt => f.write_str("BIGINT"),
            Self::Decimal(p, s) => write!(f, "DECIMAL({}, {})", p, s),
            Self::Float => f.write_str("FLOAT"),
            Self::Double => f.write_str("DOUBLE"),
            Self::Char(n) => write!(f, "CHAR({})", n),
            Self::Varchar(n) => write!(f, "VARCHAR({})", n),
            Self::Text => f.write_str("TEXT"),
            Self::Date => f.write_str("DATE"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
        }
    }
}

/// A literal value appearing in plan expressions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ans = match self {
            Value::Null => "NULL".to_string(),
            Value::Boolean(b) if *b => "TRUE".to_string(),
            Value::Boolean(_) => "FALSE".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format!("{:.2}", f),
            Value::String(s) => format!("'{}'", s),
        };
        // Use pad to work with formatting flags.
        f.pad(&ans)
    }
}
