//! Backend wire types and route construction.
//!
//! The analytics backend is loose about types: counts sometimes arrive as
//! `null`, rule flags as `0`/`1`, identifiers as numbers. Every payload field
//! therefore decodes leniently to a zero or empty value instead of failing
//! the whole response.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigError;
use crate::filter::RegionFilter;

pub const MAX_BASE_URL_LENGTH: usize = 2048;

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            Value::Bool(b) => f64::from(u8::from(b)),
            Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = number(deserializer)?;
        Ok(if value.is_finite() && value > 0.0 {
            value.round() as u64
        } else {
            0
        })
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
            Value::Null | Value::Array(_) | Value::Object(_) => false,
        })
    }

    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineStats {
    #[serde(deserialize_with = "lenient::count")]
    pub total_claims: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub suspicious_claims: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_hospitals: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub total_fraud_amount: f64,
}

impl HeadlineStats {
    /// Share of suspicious claims, as a percentage of all claims.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn risk_rate_percent(&self) -> f64 {
        self.suspicious_claims as f64 / self.total_claims.max(1) as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyTrend {
    #[serde(deserialize_with = "lenient::text")]
    pub month: String,
    #[serde(deserialize_with = "lenient::count")]
    pub is_suspicious: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBucket {
    #[serde(deserialize_with = "lenient::text")]
    pub category: String,
    #[serde(deserialize_with = "lenient::count")]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityTypeRisk {
    #[serde(rename = "hospital_type", deserialize_with = "lenient::text")]
    pub facility_type: String,
    #[serde(deserialize_with = "lenient::number")]
    pub avg_risk_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyTypeCount {
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::count")]
    pub count: u64,
}

/// Payload of `/get-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryStats {
    pub stats: HeadlineStats,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub risk_distribution: Vec<RiskBucket>,
    #[serde(rename = "hosp_type_risk")]
    pub facility_type_risk: Vec<FacilityTypeRisk>,
    pub anomaly_type_counts: Vec<AnomalyTypeCount>,
}

/// One row of `/get-all-hospitals`. The same shape backs both the scoped
/// facility list and the unscoped master index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    #[serde(rename = "hospital_id", deserialize_with = "lenient::text")]
    pub facility_id: String,
    #[serde(rename = "hospital_name", deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub state: String,
    #[serde(deserialize_with = "lenient::text")]
    pub district: String,
    #[serde(rename = "hospital_type", deserialize_with = "lenient::text")]
    pub facility_type: String,
    #[serde(deserialize_with = "lenient::count")]
    pub total_claims: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub avg_risk_score: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub high_risk_claims: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub suspicious_claims: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub any_rule_flags: u64,
    #[serde(rename = "risk_category_overall", deserialize_with = "lenient::text")]
    pub risk_category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimAnomaly {
    #[serde(deserialize_with = "lenient::text")]
    pub claim_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub patient_id: String,
    #[serde(rename = "hospital_id", deserialize_with = "lenient::text")]
    pub facility_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub state: String,
    #[serde(deserialize_with = "lenient::text")]
    pub district: String,
    #[serde(deserialize_with = "lenient::text")]
    pub procedure_code: String,
    #[serde(deserialize_with = "lenient::number")]
    pub claim_amount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub risk_score: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub anomaly_score: f64,
    #[serde(deserialize_with = "lenient::flag")]
    pub rule_upcoding: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub rule_ghost_billing: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub rule_claim_surge: bool,
}

impl ClaimAnomaly {
    #[must_use]
    pub fn rule_labels(&self) -> Vec<&'static str> {
        [
            (self.rule_upcoding, "Upcoding"),
            (self.rule_ghost_billing, "Ghost Billing"),
            (self.rule_claim_surge, "Claim Surge"),
        ]
        .into_iter()
        .filter_map(|(hit, label)| hit.then_some(label))
        .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginReply {
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(deserialize_with = "lenient::text")]
    pub username: String,
    pub detail: Option<String>,
}

impl LoginReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Payload of `/generate-report`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditReport {
    #[serde(deserialize_with = "lenient::text")]
    pub report_text: String,
    pub report_path: Option<String>,
    pub blockchain_tx_id: Option<String>,
    pub wallet_address: Option<String>,
    pub quantum_seal: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Summary,
    Facilities,
    ClaimAnomalies,
    ClaimSearch,
    Login,
    Report,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Summary => "get-summary",
            Self::Facilities => "get-all-hospitals",
            Self::ClaimAnomalies => "get-claim-anomalies",
            Self::ClaimSearch => "get-claims-search",
            Self::Login => "login",
            Self::Report => "generate-report",
        }
    }
}

/// Builds backend URLs under a validated base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    base: Url,
}

impl ApiRoutes {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: base_url.chars().take(100).collect(),
            reason,
        };

        if base_url.len() > MAX_BASE_URL_LENGTH {
            return Err(invalid(format!(
                "exceeds maximum length of {MAX_BASE_URL_LENGTH} bytes"
            )));
        }

        let mut base = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "scheme '{}' is not http or https",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(invalid("missing host".into()));
        }
        if !base.username().is_empty() || base.password().is_some() {
            return Err(invalid("credentials in URL are not allowed".into()));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(invalid("query or fragment is not allowed".into()));
        }

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base })
    }

    #[must_use]
    pub fn summary(&self, filter: &RegionFilter) -> Url {
        self.scoped(Route::Summary, &[], filter)
    }

    #[must_use]
    pub fn facilities(&self, filter: &RegionFilter) -> Url {
        self.scoped(Route::Facilities, &[], filter)
    }

    #[must_use]
    pub fn claim_anomalies(&self, limit: u32, filter: &RegionFilter) -> Url {
        let limit = limit.to_string();
        self.scoped(Route::ClaimAnomalies, &[("limit", limit.as_str())], filter)
    }

    #[must_use]
    pub fn claim_search(&self, query: &str, filter: &RegionFilter) -> Url {
        self.scoped(Route::ClaimSearch, &[("query", query)], filter)
    }

    #[must_use]
    pub fn report(&self, filter: &RegionFilter) -> Url {
        self.scoped(Route::Report, &[], filter)
    }

    #[must_use]
    pub fn login(&self) -> Url {
        self.endpoint(Route::Login)
    }

    fn endpoint(&self, route: Route) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", self.base.path(), route.path()));
        url
    }

    fn scoped(&self, route: Route, leading: &[(&str, &str)], filter: &RegionFilter) -> Url {
        let mut url = self.endpoint(route);
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in leading {
                query.append_pair(key, value);
            }
            query
                .append_pair("state", filter.state().as_str())
                .append_pair("district", filter.district().as_str());
        }
        url
    }
}
