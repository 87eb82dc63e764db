//! Audit event domain model.
//!
//! An `AuditEvent` is immutable once committed. The only code allowed to
//! mutate one is the ingest path, before the ledger append (to assign ids,
//! timestamps, the signature, and the key version).

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Action vocabulary. Closed for validation purposes, but unknown upstream
/// values are preserved verbatim in `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionType {
    Create,
    Read,
    Update,
    Delete,
    Login,
    Logout,
    Transfer,
    Approve,
    Reject,
    Freeze,
    Unfreeze,
    Export,
    Consent,
    Revoke,
    Escalate,
    Investigate,
    /// Upstream value outside the registry, preserved verbatim.
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Transfer => "TRANSFER",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Freeze => "FREEZE",
            Self::Unfreeze => "UNFREEZE",
            Self::Export => "EXPORT",
            Self::Consent => "CONSENT",
            Self::Revoke => "REVOKE",
            Self::Escalate => "ESCALATE",
            Self::Investigate => "INVESTIGATE",
            Self::Other(s) => s,
        }
    }

    /// Whether the value belongs to the registered vocabulary.
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        match s {
            "CREATE" => Self::Create,
            "READ" => Self::Read,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "LOGIN" => Self::Login,
            "LOGOUT" => Self::Logout,
            "TRANSFER" => Self::Transfer,
            "APPROVE" => Self::Approve,
            "REJECT" => Self::Reject,
            "FREEZE" => Self::Freeze,
            "UNFREEZE" => Self::Unfreeze,
            "EXPORT" => Self::Export,
            "CONSENT" => Self::Consent,
            "REVOKE" => Self::Revoke,
            "ESCALATE" => Self::Escalate,
            "INVESTIGATE" => Self::Investigate,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Resource namespace vocabulary, same openness policy as [`ActionType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Account,
    User,
    Transfer,
    Transaction,
    Kyc,
    AmlFlag,
    Report,
    Consent,
    Session,
    Device,
    Address,
    Document,
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Account => "ACCOUNT",
            Self::User => "USER",
            Self::Transfer => "TRANSFER",
            Self::Transaction => "TRANSACTION",
            Self::Kyc => "KYC",
            Self::AmlFlag => "AML_FLAG",
            Self::Report => "REPORT",
            Self::Consent => "CONSENT",
            Self::Session => "SESSION",
            Self::Device => "DEVICE",
            Self::Address => "ADDRESS",
            Self::Document => "DOCUMENT",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        match s {
            "ACCOUNT" => Self::Account,
            "USER" => Self::User,
            "TRANSFER" => Self::Transfer,
            "TRANSACTION" => Self::Transaction,
            "KYC" => Self::Kyc,
            "AML_FLAG" => Self::AmlFlag,
            "REPORT" => Self::Report,
            "CONSENT" => Self::Consent,
            "SESSION" => Self::Session,
            "DEVICE" => Self::Device,
            "ADDRESS" => Self::Address,
            "DOCUMENT" => Self::Document,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Outcome of the audited action. Strictly closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditResult {
    Success,
    Failure,
    Pending,
    Denied,
}

impl AuditResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Pending => "PENDING",
            Self::Denied => "DENIED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "FAILURE" => Some(Self::Failure),
            "PENDING" => Some(Self::Pending),
            "DENIED" => Some(Self::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuditResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| D::Error::custom(format!("unknown audit result: {s}")))
    }
}

/// Retention policy class. Drives the retention horizon; never alters
/// immutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetentionCategory {
    #[default]
    Standard,
    Transaction,
    Kyc,
    Login,
    Report,
    DeletedGrace,
}

impl RetentionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Transaction => "TRANSACTION",
            Self::Kyc => "KYC",
            Self::Login => "LOGIN",
            Self::Report => "REPORT",
            Self::DeletedGrace => "DELETED_GRACE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STANDARD" => Some(Self::Standard),
            "TRANSACTION" => Some(Self::Transaction),
            "KYC" => Some(Self::Kyc),
            "LOGIN" => Some(Self::Login),
            "REPORT" => Some(Self::Report),
            "DELETED_GRACE" => Some(Self::DeletedGrace),
            _ => None,
        }
    }
}

impl fmt::Display for RetentionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RetentionCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RetentionCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| D::Error::custom(format!("unknown retention category: {s}")))
    }
}

/// An immutable audit ledger record.
///
/// Committed records can never be modified or deleted; that is the core
/// regulatory requirement the whole system exists to uphold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    pub user_id: Uuid,
    /// System/admin agent when distinct from the subject user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    pub action_type: ActionType,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub service_source: String,
    pub timestamp: DateTime<Utc>,
    pub result: AuditResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Hex-encoded HMAC over [`AuditEvent::binding_string`]. Required on
    /// persistence.
    pub digital_signature: String,
    /// Full upstream payload, kept verbatim for forensic fidelity.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// State snapshot before the change, already encrypted by the producer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_before: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_after: Option<Vec<u8>>,
    #[serde(default)]
    pub compliance_flags: Vec<String>,
    pub retention_category: RetentionCategory,
    /// Key registry version used to produce `digital_signature`.
    pub encryption_key_id: u32,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// New event with generated id, current UTC timestamps, and the
    /// regulatory defaults (`PENDING` result, `STANDARD` retention).
    pub fn new(
        user_id: Uuid,
        action_type: ActionType,
        resource_type: ResourceType,
        resource_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            event_id: Uuid::new_v4(),
            transaction_id: None,
            user_id,
            actor_id: None,
            action_type,
            resource_type,
            resource_id: resource_id.into(),
            service_source: String::new(),
            timestamp: now,
            result: AuditResult::Pending,
            failure_reason: None,
            ip_address: None,
            geolocation: None,
            user_agent: None,
            request_id: String::new(),
            session_id: None,
            digital_signature: String::new(),
            metadata: serde_json::Value::Object(Default::default()),
            data_before: None,
            data_after: None,
            compliance_flags: Vec::new(),
            retention_category: RetentionCategory::Standard,
            encryption_key_id: 0,
            created_at: now,
        }
    }

    /// Canonical binding string the digital signature attests to:
    /// `event_id | user_id | action_type | timestamp | result`, with the
    /// timestamp rendered as RFC 3339 at seconds precision in `Z` form.
    ///
    /// The binding deliberately excludes `metadata` so signatures stay
    /// stable across downstream decoration of search documents. Anything
    /// that alters `metadata` as persisted in the ledger is still a
    /// violation of immutability.
    pub fn binding_string(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.event_id,
            self.user_id,
            self.action_type,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.result,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn action_type_roundtrip_known_and_unknown() {
        assert_eq!(ActionType::from("LOGIN"), ActionType::Login);
        assert_eq!(ActionType::Login.as_str(), "LOGIN");

        let odd = ActionType::from("PASSWORD_RESET");
        assert_eq!(odd, ActionType::Other("PASSWORD_RESET".into()));
        assert_eq!(odd.as_str(), "PASSWORD_RESET");
        assert!(!odd.is_registered());
    }

    #[test]
    fn action_type_serde_preserves_unknown_verbatim() {
        let json = serde_json::to_string(&ActionType::Other("WIRE_RECALL".into())).unwrap();
        assert_eq!(json, "\"WIRE_RECALL\"");
        let back: ActionType = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "WIRE_RECALL");
    }

    #[test]
    fn result_rejects_unknown_values() {
        assert!(serde_json::from_str::<AuditResult>("\"MAYBE\"").is_err());
        assert_eq!(
            serde_json::from_str::<AuditResult>("\"DENIED\"").unwrap(),
            AuditResult::Denied
        );
    }

    #[test]
    fn new_event_defaults() {
        let user = Uuid::new_v4();
        let event = AuditEvent::new(user, ActionType::Login, ResourceType::User, user.to_string());
        assert!(!event.event_id.is_nil());
        assert_eq!(event.result, AuditResult::Pending);
        assert_eq!(event.retention_category, RetentionCategory::Standard);
        assert!(event.digital_signature.is_empty());
    }

    #[test]
    fn binding_string_is_pipe_separated_seconds_precision() {
        let mut event = AuditEvent::new(
            Uuid::nil(),
            ActionType::Transfer,
            ResourceType::Transaction,
            "tx-1",
        );
        event.event_id = Uuid::nil();
        event.timestamp = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 45).unwrap();
        event.result = AuditResult::Success;

        assert_eq!(
            event.binding_string(),
            "00000000-0000-0000-0000-000000000000|\
             00000000-0000-0000-0000-000000000000|\
             TRANSFER|2024-03-09T12:30:45Z|SUCCESS"
        );
    }

    #[test]
    fn binding_string_ignores_metadata() {
        let mut event = AuditEvent::new(
            Uuid::new_v4(),
            ActionType::Read,
            ResourceType::Account,
            "acct-9",
        );
        let before = event.binding_string();
        event.metadata = serde_json::json!({"decorated": true});
        assert_eq!(event.binding_string(), before);
    }
}
