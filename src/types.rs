//! Type-code dispatch tables.
//!
//! Drivers describe each column with an integer type code. A [`TypeMap`]
//! maps those codes onto the [`SemanticType`] that decides how a column's
//! values are read and coerced. Maps are constant per [`Dialect`] and are
//! handed to the materializer explicitly, never looked up globally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// Standard SQL type codes, as numbered by `java.sql.Types`.
pub mod code {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const SMALLINT: i32 = 5;
    pub const INTEGER: i32 = 4;
    pub const BIGINT: i32 = -5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const CHAR: i32 = 1;
    pub const VARCHAR: i32 = 12;
    pub const LONGVARCHAR: i32 = -1;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const BINARY: i32 = -2;
    pub const VARBINARY: i32 = -3;
    pub const LONGVARBINARY: i32 = -4;
    pub const BOOLEAN: i32 = 16;
    pub const NCHAR: i32 = -15;
    pub const NVARCHAR: i32 = -9;
    pub const LONGNVARCHAR: i32 = -16;
    pub const BLOB: i32 = 2004;
    pub const CLOB: i32 = 2005;
}

/// The portable category a column's values are coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Bit,
    Short,
    Int,
    BigString,
    Float,
    Double,
    BigDecimal,
    String,
    Date,
    Time,
    Timestamp,
    Boolean,
    Bytes,
    /// Known to the dialect but without an accessor of its own; read as `String`.
    Unsupported,
}

impl SemanticType {
    pub const ALL: [SemanticType; 14] = [
        SemanticType::Bit,
        SemanticType::Short,
        SemanticType::Int,
        SemanticType::BigString,
        SemanticType::Float,
        SemanticType::Double,
        SemanticType::BigDecimal,
        SemanticType::String,
        SemanticType::Date,
        SemanticType::Time,
        SemanticType::Timestamp,
        SemanticType::Boolean,
        SemanticType::Bytes,
        SemanticType::Unsupported,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Bit => "bit",
            SemanticType::Short => "short",
            SemanticType::Int => "int",
            SemanticType::BigString => "big_string",
            SemanticType::Float => "float",
            SemanticType::Double => "double",
            SemanticType::BigDecimal => "big_decimal",
            SemanticType::String => "string",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::Timestamp => "timestamp",
            SemanticType::Boolean => "boolean",
            SemanticType::Bytes => "bytes",
            SemanticType::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        SemanticType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| BridgeError::Config(format!("Unknown semantic type: '{}'", s)))
    }
}

/// A driver dialect, selecting one of the built-in type tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Standard,
    /// Progress OpenEdge, which adds its own literal codes on top of the standard ones.
    OpenEdge,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Standard => "standard",
            Dialect::OpenEdge => "openedge",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "jdbc" => Ok(Dialect::Standard),
            "openedge" | "progress" => Ok(Dialect::OpenEdge),
            other => Err(BridgeError::Config(format!("Unknown dialect: '{}'", other))),
        }
    }
}

const STANDARD_VERSION: u32 = 1;

const STANDARD_TYPES: &[(i32, SemanticType)] = &[
    (code::BIT, SemanticType::Bit),
    (code::TINYINT, SemanticType::Short),
    (code::SMALLINT, SemanticType::Short),
    (code::INTEGER, SemanticType::Int),
    // BIGINT is read as text so values beyond 2^53 survive JSON consumers.
    (code::BIGINT, SemanticType::String),
    (code::FLOAT, SemanticType::Float),
    (code::REAL, SemanticType::Float),
    (code::DOUBLE, SemanticType::Double),
    (code::NUMERIC, SemanticType::BigDecimal),
    (code::DECIMAL, SemanticType::BigDecimal),
    (code::CHAR, SemanticType::String),
    (code::VARCHAR, SemanticType::String),
    (code::LONGVARCHAR, SemanticType::String),
    (code::DATE, SemanticType::Date),
    (code::TIME, SemanticType::Time),
    (code::TIMESTAMP, SemanticType::Timestamp),
    (code::BOOLEAN, SemanticType::Boolean),
    (code::NCHAR, SemanticType::String),
    (code::NVARCHAR, SemanticType::String),
    (code::LONGNVARCHAR, SemanticType::String),
    (code::BINARY, SemanticType::Bytes),
    (code::VARBINARY, SemanticType::Bytes),
    (code::LONGVARBINARY, SemanticType::Bytes),
    (code::BLOB, SemanticType::Bytes),
];

const OPENEDGE_VERSION: u32 = 1;

// Applied on top of the standard table.
//
//  code | SQL       | OpenEdge    | values
// ------|-----------|-------------|------------------------------
//   -7  | BIT       | logical     | true, false, null
//    2  | NUMERIC   | decimal     | 99.99, precision set by schema
//    4  | INTEGER   | int         |
//   12  | VARCHAR   | character   | format X(length)
//   91  | DATE      | date        |
//   93  | TIMESTAMP | datetime    | '99/99/9999 HH:MM:SS.SSS'
//   -5  | BIGINT    | int64/recid |
// 2004  | BLOB      | blob        |
// 2005  | CLOB      | clob        | no accessor of its own
//   -3  | VARBINARY | raw         |
//    1  | CHAR      | datetime-tz | '99/99/9999 HH:MM:SS.SSS+HH:MM' as text
const OPENEDGE_OVERRIDES: &[(i32, SemanticType)] = &[
    (code::BIT, SemanticType::Bit),
    (code::NUMERIC, SemanticType::BigDecimal),
    (code::INTEGER, SemanticType::Int),
    (code::VARCHAR, SemanticType::String),
    (code::DATE, SemanticType::Date),
    (code::TIMESTAMP, SemanticType::Timestamp),
    (code::BIGINT, SemanticType::String),
    (code::BLOB, SemanticType::Bytes),
    (code::CLOB, SemanticType::Unsupported),
    (code::VARBINARY, SemanticType::Bytes),
    (code::CHAR, SemanticType::String),
];

/// A versioned type-code table.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMap {
    dialect: Dialect,
    version: u32,
    entries: HashMap<i32, SemanticType>,
    overridden: Vec<i32>,
}

impl TypeMap {
    /// The table for plain `java.sql.Types` drivers.
    pub fn standard() -> Self {
        Self {
            dialect: Dialect::Standard,
            version: STANDARD_VERSION,
            entries: STANDARD_TYPES.iter().copied().collect(),
            overridden: Vec::new(),
        }
    }

    /// The standard table with the OpenEdge literal codes applied.
    pub fn openedge() -> Self {
        let mut entries: HashMap<i32, SemanticType> = STANDARD_TYPES.iter().copied().collect();
        entries.extend(OPENEDGE_OVERRIDES.iter().copied());
        Self {
            dialect: Dialect::OpenEdge,
            version: OPENEDGE_VERSION,
            entries,
            overridden: Vec::new(),
        }
    }

    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Standard => Self::standard(),
            Dialect::OpenEdge => Self::openedge(),
        }
    }

    /// Replace the mapping for one code.
    pub fn with_override(mut self, code: i32, semantic: SemanticType) -> Self {
        self.set(code, semantic);
        self
    }

    pub fn set(&mut self, code: i32, semantic: SemanticType) {
        self.entries.insert(code, semantic);
        if !self.overridden.contains(&code) {
            self.overridden.push(code);
        }
    }

    /// The mapping for `code`, if the table has one.
    pub fn get(&self, code: i32) -> Option<SemanticType> {
        self.entries.get(&code).copied()
    }

    /// The semantic type for `code`, falling back to `String` for unknown codes.
    pub fn resolve(&self, code: i32) -> SemanticType {
        self.get(code).unwrap_or(SemanticType::String)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Codes replaced after the built-in table was loaded, in override order.
    pub fn overridden(&self) -> &[i32] {
        &self.overridden
    }

    /// All entries, sorted by code.
    pub fn entries(&self) -> Vec<(i32, SemanticType)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(c, t)| (*c, *t)).collect();
        entries.sort_by_key(|(c, _)| *c);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::standard()
    }
}
