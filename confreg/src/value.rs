//! Typed setting values and string coercion.
//!
//! Every setting declares one of six value types. This module converts
//! raw string tokens (from override files, environment sources, or
//! administrative requests) into typed values and back.

use std::fmt;

use serde::Serialize;

/// The declared type of a setting.
///
/// # Examples
///
/// ```
/// use confreg::{SettingType, SettingValue};
///
/// let value = SettingValue::parse(SettingType::Int, "42").unwrap();
/// assert_eq!(value, SettingValue::Int(42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    /// Free-form string.
    String,
    /// Comma-separated list of strings.
    StringList,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float. Non-finite values are rejected.
    Double,
    /// Boolean; accepts exactly `true`/`false`, case-insensitive.
    Bool,
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::StringList => write!(f, "string_list"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Double => write!(f, "double"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

/// A typed setting value.
///
/// Values format to a canonical string via [`fmt::Display`], and the
/// canonical form parses back to an equal value:
/// `parse(ty, format(v)) == v`.
///
/// # Examples
///
/// ```
/// use confreg::{SettingType, SettingValue};
///
/// let v = SettingValue::StringList(vec!["slow_query".to_string(), "query".to_string()]);
/// assert_eq!(v.to_string(), "slow_query,query");
/// assert_eq!(SettingValue::parse(SettingType::StringList, &v.to_string()).unwrap(), v);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Free-form string.
    String(String),
    /// List of strings.
    StringList(Vec<String>),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// Finite 64-bit float.
    Double(f64),
    /// Boolean.
    Bool(bool),
}

impl SettingValue {
    /// The type of this value.
    #[must_use]
    pub fn setting_type(&self) -> SettingType {
        match self {
            Self::String(_) => SettingType::String,
            Self::StringList(_) => SettingType::StringList,
            Self::Int(_) => SettingType::Int,
            Self::Long(_) => SettingType::Long,
            Self::Double(_) => SettingType::Double,
            Self::Bool(_) => SettingType::Bool,
        }
    }

    /// Parse a raw string token into a value of the given type.
    ///
    /// Numeric parsing rejects non-numeric input and values out of range
    /// for the target width. Booleans accept exactly `true`/`false`
    /// (case-insensitive). Lists split on commas with empty tokens
    /// trimmed away; an empty raw string is an empty list, not a list of
    /// one empty string.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] if the raw string does not represent
    /// a value of the requested type.
    ///
    /// # Examples
    ///
    /// ```
    /// use confreg::{SettingType, SettingValue};
    ///
    /// assert!(SettingValue::parse(SettingType::Bool, "TRUE").is_ok());
    /// assert!(SettingValue::parse(SettingType::Bool, "yes").is_err());
    /// assert!(SettingValue::parse(SettingType::Int, "2147483648").is_err());
    /// ```
    pub fn parse(ty: SettingType, raw: &str) -> Result<Self, CoercionError> {
        match ty {
            SettingType::String => Ok(Self::String(raw.to_string())),
            SettingType::StringList => Ok(Self::StringList(split_list(raw))),
            SettingType::Int => raw
                .trim()
                .parse::<i32>()
                .map(Self::Int)
                .map_err(|_| CoercionError::new(raw, ty)),
            SettingType::Long => raw
                .trim()
                .parse::<i64>()
                .map(Self::Long)
                .map_err(|_| CoercionError::new(raw, ty)),
            SettingType::Double => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Self::Double(v)),
                _ => Err(CoercionError::new(raw, ty)),
            },
            SettingType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(CoercionError::new(raw, ty)),
            },
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::StringList(items) => write!(f, "{}", items.join(",")),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Split a comma-delimited list, trimming tokens and dropping empties.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// A raw string could not be coerced to the requested type.
///
/// Carries no setting name; callers that know the name wrap this into
/// [`crate::Error::TypeMismatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    /// The rejected raw string.
    pub raw: String,
    /// The type that was requested.
    pub expected: SettingType,
}

impl CoercionError {
    fn new(raw: &str, expected: SettingType) -> Self {
        Self {
            raw: raw.to_string(),
            expected,
        }
    }

    /// Attach a setting name, producing a library error.
    #[must_use]
    pub fn for_setting(self, name: &str) -> crate::Error {
        crate::Error::TypeMismatch {
            name: name.to_string(),
            raw: self.raw,
            expected: self.expected,
        }
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse '{}' as {}", self.raw, self.expected)
    }
}

impl std::error::Error for CoercionError {}
