//! MySQL data type classification
//!
//! Parses raw column type text (`varchar(255)`, `int(10) unsigned`,
//! `enum('a','b')`) and decides whether changing a column from one type to
//! another can lose data.

/// A parsed data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    /// Upper-cased base type name, e.g. `VARCHAR`
    pub base_type: String,
    /// Raw parameters inside the parentheses
    pub params: Vec<String>,
    pub unsigned: bool,
}

impl ParsedType {
    /// Parses raw type text; never fails, unrecognised types classify as unknown
    pub fn parse(type_str: &str) -> Self {
        let type_str = type_str.trim();

        let (base, params, modifiers) = match (type_str.find('('), type_str.rfind(')')) {
            (Some(open), Some(close)) if close > open => (
                type_str[..open].trim().to_string(),
                split_params(&type_str[open + 1..close]),
                type_str[close + 1..].to_string(),
            ),
            _ => {
                let mut tokens = type_str.split_whitespace();
                let first = tokens.next().unwrap_or_default().to_string();
                let rest: Vec<&str> = tokens.collect();
                (first, Vec::new(), rest.join(" "))
            }
        };

        let mut base_type = base.to_uppercase();
        let modifiers = modifiers.to_uppercase();
        if base_type == "DOUBLE PRECISION" {
            base_type = "DOUBLE".to_string();
        }

        Self {
            unsigned: modifiers.split_whitespace().any(|m| m == "UNSIGNED")
                || base_type == "SERIAL",
            base_type,
            params,
        }
    }

    fn numeric_param(&self, index: usize) -> Option<u64> {
        self.params.get(index).and_then(|p| p.trim().parse().ok())
    }

    /// Returns the coarse family this type belongs to
    pub fn family(&self) -> TypeFamily {
        self.class().family()
    }

    fn class(&self) -> TypeClass {
        let unsigned = self.unsigned;
        match self.base_type.as_str() {
            "TINYINT" | "BOOL" | "BOOLEAN" => TypeClass::Integer { bits: 8, unsigned },
            "SMALLINT" => TypeClass::Integer { bits: 16, unsigned },
            "MEDIUMINT" => TypeClass::Integer { bits: 24, unsigned },
            "INT" | "INTEGER" => TypeClass::Integer { bits: 32, unsigned },
            "BIGINT" | "SERIAL" => TypeClass::Integer { bits: 64, unsigned },
            "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => TypeClass::Decimal {
                precision: self.numeric_param(0).unwrap_or(10),
                scale: self.numeric_param(1).unwrap_or(0),
            },
            "FLOAT" => match (self.params.len(), self.numeric_param(0)) {
                (1, Some(p)) if p > 24 => TypeClass::Double,
                _ => TypeClass::Float,
            },
            "DOUBLE" | "REAL" => TypeClass::Double,
            "CHAR" | "NCHAR" | "CHARACTER" => TypeClass::Char {
                length: self.numeric_param(0).unwrap_or(1),
            },
            "VARCHAR" | "NVARCHAR" => TypeClass::Char {
                length: self.numeric_param(0).unwrap_or(0),
            },
            "TINYTEXT" => TypeClass::Text { capacity: 255 },
            "TEXT" => TypeClass::Text { capacity: 65_535 },
            "MEDIUMTEXT" => TypeClass::Text {
                capacity: 16_777_215,
            },
            "LONGTEXT" => TypeClass::Text {
                capacity: 4_294_967_295,
            },
            "BINARY" => TypeClass::Binary {
                length: self.numeric_param(0).unwrap_or(1),
            },
            "VARBINARY" => TypeClass::Binary {
                length: self.numeric_param(0).unwrap_or(0),
            },
            "TINYBLOB" => TypeClass::Blob { capacity: 255 },
            "BLOB" => TypeClass::Blob { capacity: 65_535 },
            "MEDIUMBLOB" => TypeClass::Blob {
                capacity: 16_777_215,
            },
            "LONGBLOB" => TypeClass::Blob {
                capacity: 4_294_967_295,
            },
            "DATE" => TypeClass::Date,
            "TIME" => TypeClass::Time {
                fsp: self.numeric_param(0).unwrap_or(0),
            },
            "DATETIME" => TypeClass::DateTime {
                fsp: self.numeric_param(0).unwrap_or(0),
            },
            "TIMESTAMP" => TypeClass::Timestamp {
                fsp: self.numeric_param(0).unwrap_or(0),
            },
            "YEAR" => TypeClass::Year,
            "JSON" => TypeClass::Json,
            "ENUM" => TypeClass::Enum,
            "SET" => TypeClass::Set,
            "GEOMETRY" | "POINT" | "LINESTRING" | "POLYGON" | "MULTIPOINT"
            | "MULTILINESTRING" | "MULTIPOLYGON" | "GEOMETRYCOLLECTION" | "GEOMCOLLECTION" => {
                TypeClass::Spatial
            }
            "BIT" => TypeClass::Bit {
                width: self.numeric_param(0).unwrap_or(1),
            },
            _ => TypeClass::Unknown,
        }
    }
}

/// Splits a parameter list on commas that are not inside quotes
fn split_params(inner: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quote && chars.peek() == Some(&'\'') => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ',' if !in_quote => {
                params.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        params.push(current.trim().to_string());
    }
    params
}

/// Coarse type families; a change across families is always narrowing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Numeric,
    String,
    Binary,
    Temporal,
    Json,
    Enumeration,
    Spatial,
    Bit,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeClass {
    Integer { bits: u32, unsigned: bool },
    Decimal { precision: u64, scale: u64 },
    Float,
    Double,
    Char { length: u64 },
    Text { capacity: u64 },
    Binary { length: u64 },
    Blob { capacity: u64 },
    Date,
    Time { fsp: u64 },
    DateTime { fsp: u64 },
    Timestamp { fsp: u64 },
    Year,
    Json,
    Enum,
    Set,
    Spatial,
    Bit { width: u64 },
    Unknown,
}

impl TypeClass {
    fn family(&self) -> TypeFamily {
        match self {
            TypeClass::Integer { .. }
            | TypeClass::Decimal { .. }
            | TypeClass::Float
            | TypeClass::Double => TypeFamily::Numeric,
            TypeClass::Char { .. } | TypeClass::Text { .. } => TypeFamily::String,
            TypeClass::Binary { .. } | TypeClass::Blob { .. } => TypeFamily::Binary,
            TypeClass::Date
            | TypeClass::Time { .. }
            | TypeClass::DateTime { .. }
            | TypeClass::Timestamp { .. }
            | TypeClass::Year => TypeFamily::Temporal,
            TypeClass::Json => TypeFamily::Json,
            TypeClass::Enum | TypeClass::Set => TypeFamily::Enumeration,
            TypeClass::Spatial => TypeFamily::Spatial,
            TypeClass::Bit { .. } => TypeFamily::Bit,
            TypeClass::Unknown => TypeFamily::Unknown,
        }
    }
}

/// Data loss risk of changing a column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeChangeRisk {
    /// Same kind of type with a smaller declared size, precision or width
    SizeReduction(String),
    /// Incompatible family or a conversion known to drop values
    Narrowing(String),
}

fn integer_range(bits: u32, unsigned: bool) -> (i128, i128) {
    if unsigned {
        (0, (1i128 << bits) - 1)
    } else {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    }
}

fn integer_digits(bits: u32, unsigned: bool) -> u64 {
    let (min, max) = integer_range(bits, unsigned);
    max.max(-min).to_string().len() as u64
}

/// Assesses a change of column type from `old` to `new`
///
/// Returns `None` when every value of `old` is representable in `new`.
pub fn assess_type_change(old: &str, new: &str) -> Option<TypeChangeRisk> {
    if old.trim().eq_ignore_ascii_case(new.trim()) {
        return None;
    }

    let old_type = ParsedType::parse(old);
    let new_type = ParsedType::parse(new);
    let narrowing = |detail: &str| Some(TypeChangeRisk::Narrowing(detail.to_string()));
    let reduction = |detail: &str| Some(TypeChangeRisk::SizeReduction(detail.to_string()));

    match (old_type.class(), new_type.class()) {
        (
            TypeClass::Integer { bits: ob, unsigned: ou },
            TypeClass::Integer { bits: nb, unsigned: nu },
        ) => {
            let (old_min, old_max) = integer_range(ob, ou);
            let (new_min, new_max) = integer_range(nb, nu);
            if new_min > old_min || new_max < old_max {
                narrowing("the new integer range does not cover the old one")
            } else {
                None
            }
        }
        (TypeClass::Integer { bits, unsigned }, TypeClass::Decimal { precision, scale }) => {
            if precision.saturating_sub(scale) < integer_digits(bits, unsigned) {
                narrowing("the decimal has too few integer digits for the old integer range")
            } else {
                None
            }
        }
        (TypeClass::Integer { bits, .. }, TypeClass::Float) if bits > 24 => {
            narrowing("single precision cannot represent every integer of the old range")
        }
        (TypeClass::Integer { bits, .. }, TypeClass::Double) if bits > 53 => {
            narrowing("double precision cannot represent every integer of the old range")
        }
        (TypeClass::Integer { .. }, TypeClass::Float | TypeClass::Double) => None,
        (TypeClass::Decimal { precision, scale: 0 }, TypeClass::Integer { bits, unsigned }) => {
            if precision > integer_digits(bits, unsigned) - 1 {
                narrowing("the integer range does not cover the old decimal")
            } else {
                None
            }
        }
        (
            TypeClass::Decimal { .. } | TypeClass::Float | TypeClass::Double,
            TypeClass::Integer { .. },
        ) => narrowing("fractional values are truncated"),
        (
            TypeClass::Decimal {
                precision: op,
                scale: os,
            },
            TypeClass::Decimal {
                precision: np,
                scale: ns,
            },
        ) => {
            if np < op || ns < os || np.saturating_sub(ns) < op.saturating_sub(os) {
                reduction("decimal precision or scale decreases")
            } else {
                None
            }
        }
        (TypeClass::Decimal { .. }, TypeClass::Float) => {
            narrowing("exact decimal values become approximate")
        }
        (TypeClass::Decimal { precision, .. }, TypeClass::Double) if precision > 15 => {
            narrowing("exact decimal values become approximate")
        }
        (TypeClass::Decimal { .. }, TypeClass::Double) => None,
        (TypeClass::Float | TypeClass::Double, TypeClass::Decimal { .. }) => {
            narrowing("floating point values may not fit the decimal")
        }
        (TypeClass::Double, TypeClass::Float) => narrowing("double precision becomes single"),
        (TypeClass::Float | TypeClass::Double, TypeClass::Float | TypeClass::Double) => None,
        (TypeClass::Char { length: ol }, TypeClass::Char { length: nl })
        | (TypeClass::Binary { length: ol }, TypeClass::Binary { length: nl }) => {
            if nl < ol {
                reduction("declared length decreases")
            } else {
                None
            }
        }
        (TypeClass::Char { length }, TypeClass::Text { capacity })
        | (TypeClass::Binary { length }, TypeClass::Blob { capacity }) => {
            if capacity < length {
                reduction("declared length exceeds the new capacity")
            } else {
                None
            }
        }
        (TypeClass::Text { capacity: oc }, TypeClass::Text { capacity: nc })
        | (TypeClass::Blob { capacity: oc }, TypeClass::Blob { capacity: nc }) => {
            if nc < oc {
                reduction("storage capacity decreases")
            } else {
                None
            }
        }
        (TypeClass::Text { .. }, TypeClass::Char { .. })
        | (TypeClass::Blob { .. }, TypeClass::Binary { .. }) => {
            narrowing("long values are truncated to a fixed length")
        }
        (TypeClass::Date, TypeClass::Date)
        | (TypeClass::Year, TypeClass::Year)
        | (TypeClass::Date, TypeClass::DateTime { .. }) => None,
        (TypeClass::Time { fsp: of }, TypeClass::Time { fsp: nf })
        | (TypeClass::DateTime { fsp: of }, TypeClass::DateTime { fsp: nf })
        | (TypeClass::Timestamp { fsp: of }, TypeClass::Timestamp { fsp: nf })
        | (TypeClass::Timestamp { fsp: of }, TypeClass::DateTime { fsp: nf }) => {
            if nf < of {
                reduction("fractional seconds precision decreases")
            } else {
                None
            }
        }
        (TypeClass::Date | TypeClass::DateTime { .. }, TypeClass::Timestamp { .. }) => {
            narrowing("TIMESTAMP has a smaller range")
        }
        (TypeClass::DateTime { .. } | TypeClass::Timestamp { .. }, TypeClass::Date) => {
            narrowing("the time of day is dropped")
        }
        (TypeClass::DateTime { .. } | TypeClass::Timestamp { .. }, TypeClass::Time { .. }) => {
            narrowing("the date part is dropped")
        }
        (TypeClass::Date, TypeClass::Time { .. }) | (TypeClass::Time { .. }, TypeClass::Date) => {
            narrowing("date and time of day are not convertible")
        }
        (TypeClass::Enum, TypeClass::Enum) | (TypeClass::Set, TypeClass::Set) => {
            let dropped = old_type
                .params
                .iter()
                .any(|value| !new_type.params.contains(value));
            if dropped {
                narrowing("allowed values are removed")
            } else {
                None
            }
        }
        (TypeClass::Bit { width: ow }, TypeClass::Bit { width: nw }) => {
            if nw < ow {
                reduction("bit width decreases")
            } else {
                None
            }
        }
        (TypeClass::Json, TypeClass::Json) => None,
        (TypeClass::Spatial, TypeClass::Spatial) => {
            if new_type.base_type == "GEOMETRY" || new_type.base_type == old_type.base_type {
                None
            } else {
                narrowing("the geometry subtype is more specific")
            }
        }
        (TypeClass::Unknown, TypeClass::Unknown) if old_type.base_type == new_type.base_type => {
            match (old_type.numeric_param(0), new_type.numeric_param(0)) {
                (Some(o), Some(n)) if n < o => reduction("declared size decreases"),
                _ => None,
            }
        }
        (old_class, new_class) if old_class.family() != new_class.family() => {
            narrowing("the types belong to different families")
        }
        _ => narrowing("the conversion can drop values"),
    }
}
