use crate::value::Literal;
use std::fmt::{self, Display};

///
/// ColumnModel
/// Runtime column metadata used by coercion and index maintenance.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnModel {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Declared default, applied when the column is omitted from an INSERT.
    pub default: Option<Literal>,
}

impl ColumnModel {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
        }
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }
}

///
/// IntWidth
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntWidth {
    Tiny,
    Small,
    Medium,
    Int,
    Big,
}

impl IntWidth {
    /// Inclusive signed range.
    #[must_use]
    pub const fn signed_bounds(self) -> (i64, i64) {
        match self {
            Self::Tiny => (i8::MIN as i64, i8::MAX as i64),
            Self::Small => (i16::MIN as i64, i16::MAX as i64),
            Self::Medium => (-(1 << 23), (1 << 23) - 1),
            Self::Int => (i32::MIN as i64, i32::MAX as i64),
            Self::Big => (i64::MIN, i64::MAX),
        }
    }

    /// Inclusive unsigned upper bound.
    #[must_use]
    pub const fn unsigned_max(self) -> u64 {
        match self {
            Self::Tiny => u8::MAX as u64,
            Self::Small => u16::MAX as u64,
            Self::Medium => (1 << 24) - 1,
            Self::Int => u32::MAX as u64,
            Self::Big => u64::MAX,
        }
    }

    const fn sql_name(self) -> &'static str {
        match self {
            Self::Tiny => "TINYINT",
            Self::Small => "SMALLINT",
            Self::Medium => "MEDIUMINT",
            Self::Int => "INT",
            Self::Big => "BIGINT",
        }
    }
}

///
/// ColumnType
///
/// Closed set of declared column types. Each family maps onto exactly one
/// coercion routine and one `Value` variant.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Int { width: IntWidth, unsigned: bool },
    /// Fixed-length text, length in characters.
    Char(u32),
    /// Variable-length text, max length in characters.
    VarChar(u32),
    /// TEXT: at most 65 535 bytes.
    Text,
    /// LONGTEXT: no ceiling enforced by coercion.
    LongText,
    Timestamp,
    DateTime,
}

impl ColumnType {
    pub const TEXT_MAX_BYTES: usize = 65_535;

    #[must_use]
    pub const fn int() -> Self {
        Self::Int {
            width: IntWidth::Int,
            unsigned: false,
        }
    }

    #[must_use]
    pub const fn bigint() -> Self {
        Self::Int {
            width: IntWidth::Big,
            unsigned: false,
        }
    }

    #[must_use]
    pub const fn unsigned(width: IntWidth) -> Self {
        Self::Int {
            width,
            unsigned: true,
        }
    }

    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Char(_) | Self::VarChar(_) | Self::Text | Self::LongText
        )
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { width, unsigned } => {
                f.write_str(width.sql_name())?;
                if *unsigned {
                    f.write_str(" UNSIGNED")?;
                }
                Ok(())
            }
            Self::Char(n) => write!(f, "CHAR({n})"),
            Self::VarChar(n) => write!(f, "VARCHAR({n})"),
            Self::Text => f.write_str("TEXT"),
            Self::LongText => f.write_str("LONGTEXT"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
            Self::DateTime => f.write_str("DATETIME"),
        }
    }
}
