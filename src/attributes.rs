//! Organization attribute values and the fill-only merge primitive
//!
//! Every attribute starts at the `"unknown"` sentinel. A merge writes a key
//! only while the target still holds the sentinel, so whichever source
//! resolves a field first owns it for the rest of the run.

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// Sentinel for an unresolved attribute.
pub const UNKNOWN: &str = "unknown";

/// A loosely-typed attribute value as reported by the research oracle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    #[default]
    Unknown,
    Number(Number),
    Text(String),
}

impl AttributeValue {
    /// Convert an oracle JSON value, returning `None` for anything that should
    /// not fill a field: null, false, zero, empty strings/containers and the
    /// `"unknown"` sentinel itself.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::Bool(true) => Some(AttributeValue::Text("true".to_string())),
            Value::Number(n) => {
                if n.as_f64() == Some(0.0) {
                    None
                } else {
                    Some(AttributeValue::Number(n.clone()))
                }
            }
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() || s.eq_ignore_ascii_case(UNKNOWN) {
                    None
                } else {
                    Some(AttributeValue::Text(s.to_string()))
                }
            }
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            other => Some(AttributeValue::Text(other.to_string())),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AttributeValue::Unknown)
    }

    /// Text content, or `None` for numbers and the sentinel.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content as `f64` when the value is a JSON number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Unknown => write!(f, "{}", UNKNOWN),
            AttributeValue::Text(s) => write!(f, "{}", s),
            AttributeValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    write!(f, "{}", i)
                } else if let Some(u) = n.as_u64() {
                    write!(f, "{}", u)
                } else {
                    let v = n.as_f64().unwrap_or_default();
                    if v.fract() == 0.0 && v.abs() < 1e15 {
                        write!(f, "{}", v as i64)
                    } else {
                        write!(f, "{}", v)
                    }
                }
            }
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Unknown => serializer.serialize_str(UNKNOWN),
            AttributeValue::Number(n) => n.serialize(serializer),
            AttributeValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// The organization categories the research oracle may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrgType {
    Enterprise,
    Corporation,
    Business,
    MidSized,
    Company,
    Education,
    University,
    HigherEd,
    Agency,
    Startup,
    NonProfit,
    BusinessInfluencer,
    Journalist,
    Individual,
    Political,
}

impl OrgType {
    pub const ALL: [OrgType; 15] = [
        OrgType::Enterprise,
        OrgType::Corporation,
        OrgType::Business,
        OrgType::MidSized,
        OrgType::Company,
        OrgType::Education,
        OrgType::University,
        OrgType::HigherEd,
        OrgType::Agency,
        OrgType::Startup,
        OrgType::NonProfit,
        OrgType::BusinessInfluencer,
        OrgType::Journalist,
        OrgType::Individual,
        OrgType::Political,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgType::Enterprise => "enterprise",
            OrgType::Corporation => "corporation",
            OrgType::Business => "business",
            OrgType::MidSized => "mid-sized",
            OrgType::Company => "company",
            OrgType::Education => "education",
            OrgType::University => "university",
            OrgType::HigherEd => "higher_ed",
            OrgType::Agency => "agency",
            OrgType::Startup => "startup",
            OrgType::NonProfit => "non-profit",
            OrgType::BusinessInfluencer => "business_influencer",
            OrgType::Journalist => "journalist",
            OrgType::Individual => "individual",
            OrgType::Political => "political",
        }
    }

    /// Comma-separated list used in prompts.
    pub fn prompt_list() -> String {
        Self::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for OrgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrgType {
    type Err = ();

    /// Exact match only; the oracle is asked for these literal values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s).ok_or(())
    }
}

/// Organization attribute keys, named as they appear in oracle JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Revenue,
    EmployeeCount,
    OrgType,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 3] = [
        AttributeKey::Revenue,
        AttributeKey::EmployeeCount,
        AttributeKey::OrgType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::Revenue => "revenue",
            AttributeKey::EmployeeCount => "employee_count",
            AttributeKey::OrgType => "type_of_organization",
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Revenue, headcount and category for one organization.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OrganizationAttributes {
    pub revenue: AttributeValue,
    pub employee_count: AttributeValue,
    #[serde(rename = "type_of_organization")]
    pub org_type: AttributeValue,
}

impl OrganizationAttributes {
    pub fn get(&self, key: AttributeKey) -> &AttributeValue {
        match key {
            AttributeKey::Revenue => &self.revenue,
            AttributeKey::EmployeeCount => &self.employee_count,
            AttributeKey::OrgType => &self.org_type,
        }
    }

    /// Keys still holding the sentinel, in canonical order.
    pub fn missing(&self) -> Vec<AttributeKey> {
        AttributeKey::ALL
            .iter()
            .copied()
            .filter(|k| self.get(*k).is_unknown())
            .collect()
    }

    /// Organization type string as reported, `"unknown"` when unresolved.
    pub fn org_type_label(&self) -> String {
        self.org_type.to_string()
    }
}

/// A record whose fields may be filled at most once from oracle JSON.
pub trait FillOnly {
    type Key: Copy;

    /// JSON key the field is read from.
    fn json_key(key: Self::Key) -> &'static str;

    fn is_missing(&self, key: Self::Key) -> bool;

    fn fill(&mut self, key: Self::Key, value: AttributeValue);

    /// Turn a raw JSON value into a fill candidate. `None` leaves the field
    /// missing.
    fn read_value(value: &Value) -> Option<AttributeValue> {
        AttributeValue::from_json(value)
    }
}

impl FillOnly for OrganizationAttributes {
    type Key = AttributeKey;

    fn json_key(key: AttributeKey) -> &'static str {
        key.as_str()
    }

    fn is_missing(&self, key: AttributeKey) -> bool {
        self.get(key).is_unknown()
    }

    fn fill(&mut self, key: AttributeKey, value: AttributeValue) {
        match key {
            AttributeKey::Revenue => self.revenue = value,
            AttributeKey::EmployeeCount => self.employee_count = value,
            AttributeKey::OrgType => self.org_type = value,
        }
    }
}

/// Copy `keys` from `source` into `target`, touching only fields that are
/// still missing and only with usable values. Returns the keys written.
pub fn merge_missing<T: FillOnly>(
    target: &mut T,
    source: &Map<String, Value>,
    keys: &[T::Key],
) -> Vec<T::Key> {
    let mut filled = Vec::new();
    for &key in keys {
        if !target.is_missing(key) {
            continue;
        }
        let Some(value) = source.get(T::json_key(key)).and_then(T::read_value) else {
            continue;
        };
        target.fill(key, value);
        filled.push(key);
    }
    filled
}
