//! Entity classification
//!
//! Maps (organization type, revenue, employee count) onto a fixed label set.
//! Thresholds overlap between branches; within a type the first matching
//! branch wins, so the branch order below is part of the behaviour.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::attributes::{AttributeValue, OrgType, UNKNOWN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityClass {
    Enterprise,
    MidSizedBusiness,
    EducationUniversity,
    EducationK12EdTech,
    AgencyHoldingCompany,
    AgencyMidTier,
    Agency,
    Startup,
    GrowthStageStartup,
    NonProfitLocal,
    NonProfitNationalGlobal,
    NonProfit,
    BusinessInfluencer,
    Journalist,
    Individual,
    PoliticalPacCommittee,
    PoliticalConsultingFirm,
    PoliticalThinkTank,
    Political,
    Unclassified,
}

impl EntityClass {
    pub fn label(&self) -> &'static str {
        match self {
            EntityClass::Enterprise => "Enterprise",
            EntityClass::MidSizedBusiness => "Mid-Sized Business",
            EntityClass::EducationUniversity => "Education - University",
            EntityClass::EducationK12EdTech => "Education - K-12/Ed-tech",
            EntityClass::AgencyHoldingCompany => "Agency - Holding Company",
            EntityClass::AgencyMidTier => "Agency - Mid-Tier",
            EntityClass::Agency => "Agency",
            EntityClass::Startup => "Startup",
            EntityClass::GrowthStageStartup => "Growth Stage Startup",
            EntityClass::NonProfitLocal => "Non-Profit - Local",
            EntityClass::NonProfitNationalGlobal => "Non-Profit - National/Global",
            EntityClass::NonProfit => "Non-Profit",
            EntityClass::BusinessInfluencer => "Business Influencer",
            EntityClass::Journalist => "Journalist",
            EntityClass::Individual => "Individual",
            EntityClass::PoliticalPacCommittee => "Political - PAC/Committee",
            EntityClass::PoliticalConsultingFirm => "Political Consulting Firm",
            EntityClass::PoliticalThinkTank => "Political Think Tank",
            EntityClass::Political => "Political",
            EntityClass::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for EntityClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Revenue as `f64`; the sentinel and anything unparseable count as zero.
pub fn coerce_revenue(value: &AttributeValue) -> f64 {
    match value {
        AttributeValue::Unknown => 0.0,
        AttributeValue::Number(n) => n.as_f64().unwrap_or(0.0),
        AttributeValue::Text(s) => coerce_float_text(s),
    }
}

/// Employee count as an integer; the sentinel and anything unparseable count
/// as zero. Fractional JSON numbers are truncated, fractional text is not an
/// integer and falls back to zero.
pub fn coerce_employee_count(value: &AttributeValue) -> i64 {
    match value {
        AttributeValue::Unknown => 0,
        AttributeValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            .unwrap_or(0),
        AttributeValue::Text(s) => coerce_int_text(s),
    }
}

fn coerce_float_text(s: &str) -> f64 {
    let s = s.trim();
    if s == UNKNOWN {
        return 0.0;
    }
    s.parse::<f64>().unwrap_or(0.0)
}

fn coerce_int_text(s: &str) -> i64 {
    let s = s.trim();
    if s == UNKNOWN {
        return 0;
    }
    s.parse::<i64>().unwrap_or(0)
}

/// Classify from already-resolved attribute values.
pub fn classify_entity(
    org_type: &AttributeValue,
    revenue: &AttributeValue,
    employee_count: &AttributeValue,
) -> EntityClass {
    let org_type = match org_type {
        AttributeValue::Text(s) => s.parse::<OrgType>().ok(),
        _ => None,
    };
    classify(org_type, coerce_revenue(revenue), coerce_employee_count(employee_count))
}

/// Classify from raw strings, the form the values take in exported tables.
pub fn classify_raw(org_type: &str, revenue: &str, employee_count: &str) -> EntityClass {
    classify(
        org_type.parse::<OrgType>().ok(),
        coerce_float_text(revenue),
        coerce_int_text(employee_count),
    )
}

/// The decision tree. `None` covers `"unknown"` and any unrecognised type.
pub fn classify(org_type: Option<OrgType>, revenue: f64, employees: i64) -> EntityClass {
    use OrgType::*;

    let Some(org_type) = org_type else {
        return EntityClass::Unclassified;
    };

    match org_type {
        Enterprise | Corporation => {
            if revenue > 1e9 && employees >= 5000 {
                EntityClass::Enterprise
            } else {
                EntityClass::Unclassified
            }
        }
        Business | MidSized | Company => {
            if (5e7..=1e9).contains(&revenue) && (100..5000).contains(&employees) {
                EntityClass::MidSizedBusiness
            } else {
                EntityClass::Unclassified
            }
        }
        Education | University | HigherEd => {
            if revenue >= 1e7 {
                EntityClass::EducationUniversity
            } else {
                EntityClass::EducationK12EdTech
            }
        }
        Agency => {
            if revenue > 5e8 {
                EntityClass::AgencyHoldingCompany
            } else if (2.5e7..=1e8).contains(&revenue) {
                EntityClass::AgencyMidTier
            } else {
                EntityClass::Agency
            }
        }
        Startup => {
            if revenue <= 5e7 {
                EntityClass::Startup
            } else {
                EntityClass::GrowthStageStartup
            }
        }
        NonProfit => {
            if revenue < 1e6 {
                EntityClass::NonProfitLocal
            } else if revenue >= 5e8 {
                EntityClass::NonProfitNationalGlobal
            } else {
                EntityClass::NonProfit
            }
        }
        BusinessInfluencer => EntityClass::BusinessInfluencer,
        Journalist => EntityClass::Journalist,
        Individual => EntityClass::Individual,
        Political => {
            // The PAC branch shadows the two after it for any revenue >= 1e6.
            if revenue >= 1e6 {
                EntityClass::PoliticalPacCommittee
            } else if (1e7..=5e8).contains(&revenue) && employees >= 50 {
                EntityClass::PoliticalConsultingFirm
            } else if (5e6..=3e8).contains(&revenue) && employees >= 30 {
                EntityClass::PoliticalThinkTank
            } else {
                EntityClass::Political
            }
        }
    }
}
