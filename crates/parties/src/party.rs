use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::{normalize_email, normalize_optional};
use billforge_core::{Document, DocumentId, DomainError, DomainResult, FieldErrors, Timestamps, UserId};
use billforge_gst::{Gstin, validate_state_code};

billforge_core::document_id!(
    /// Party identifier (customer or supplier).
    PartyId
);

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    #[default]
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

impl core::str::FromStr for PartyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "customer" => Ok(PartyKind::Customer),
            "supplier" => Ok(PartyKind::Supplier),
            other => Err(DomainError::validation(format!(
                "invalid party kind '{other}'; expected one of customer, supplier"
            ))),
        }
    }
}

/// Party status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyStatus {
    #[default]
    Active,
    Suspended,
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Create/update form for a party. Updates are full replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInput {
    #[serde(default)]
    pub kind: Option<PartyKind>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub status: Option<PartyStatus>,
}

struct ValidParty {
    name: String,
    contact: ContactInfo,
    gstin: Option<Gstin>,
    state_code: Option<String>,
}

impl PartyInput {
    fn validate(&self) -> DomainResult<ValidParty> {
        let mut errors = FieldErrors::new();
        errors.require_text("name", &self.name);

        let email = normalize_optional(self.email.clone())
            .and_then(|e| errors.check("email", normalize_email(&e)));
        let gstin = normalize_optional(self.gstin.clone())
            .and_then(|g| errors.check("gstin", Gstin::parse(&g)));
        let state_code = normalize_optional(self.state_code.clone())
            .and_then(|s| errors.check("state_code", validate_state_code(&s)));

        if let (Some(g), Some(s)) = (&gstin, &state_code) {
            if g.state_code() != s {
                errors.invalid("state_code", "does not match the GSTIN state code");
            }
        }
        errors.finish()?;

        Ok(ValidParty {
            name: self.name.trim().to_string(),
            contact: ContactInfo {
                email,
                phone: normalize_optional(self.phone.clone()),
                address: normalize_optional(self.address.clone()),
            },
            gstin,
            state_code,
        })
    }
}

/// Document: Party (customer or supplier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    owner: UserId,
    kind: PartyKind,
    name: String,
    #[serde(flatten)]
    contact: ContactInfo,
    gstin: Option<Gstin>,
    state_code: Option<String>,
    status: PartyStatus,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl Party {
    pub fn register(owner: UserId, id: PartyId, input: &PartyInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let valid = input.validate()?;
        Ok(Self {
            id,
            owner,
            kind: input.kind.unwrap_or_default(),
            name: valid.name,
            contact: valid.contact,
            gstin: valid.gstin,
            state_code: valid.state_code,
            status: input.status.unwrap_or_default(),
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    /// Replace the editable fields. Kind and status are kept unless given.
    pub fn update(&mut self, input: &PartyInput, now: DateTime<Utc>) -> DomainResult<()> {
        let valid = input.validate()?;
        if let Some(kind) = input.kind {
            self.kind = kind;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.name = valid.name;
        self.contact = valid.contact;
        self.gstin = valid.gstin;
        self.state_code = valid.state_code;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn suspend(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == PartyStatus::Suspended {
            return Err(DomainError::conflict("party is already suspended"));
        }
        self.status = PartyStatus::Suspended;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn gstin(&self) -> Option<&Gstin> {
        self.gstin.as_ref()
    }

    /// Buyer state for place-of-supply: the GSTIN state, else the explicit code.
    pub fn state_code(&self) -> Option<&str> {
        self.gstin
            .as_ref()
            .map(Gstin::state_code)
            .or(self.state_code.as_deref())
    }

    pub fn status(&self) -> PartyStatus {
        self.status
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    /// Invariant helper: suspended parties cannot be put on new documents.
    pub fn can_transact(&self) -> bool {
        self.status == PartyStatus::Active
    }

    pub fn ensure_can_transact(&self) -> DomainResult<()> {
        if self.can_transact() {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "{} '{}' is suspended",
                self.kind.as_str(),
                self.name
            )))
        }
    }

    /// Case-insensitive substring match on name, email or phone.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
        hit(Some(&self.name))
            || hit(self.contact.email.as_deref())
            || hit(self.contact.phone.as_deref())
            || hit(self.gstin.as_ref().map(Gstin::as_str))
    }
}

impl Document for Party {
    const COLLECTION: &'static str = "parties";

    fn document_id(&self) -> DocumentId {
        self.id.0
    }

    fn owner(&self) -> UserId {
        self.owner
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_owner() -> UserId {
        UserId::new()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn input(name: &str) -> PartyInput {
        PartyInput {
            name: name.into(),
            email: Some("Billing@Acme.IN".into()),
            phone: Some("+91 98200 00000".into()),
            gstin: Some("29AAACC1206D1ZC".into()),
            ..Default::default()
        }
    }

    #[test]
    fn kind_parses_from_query_values() {
        assert_eq!("supplier".parse::<PartyKind>().unwrap(), PartyKind::Supplier);
        assert!(matches!("vendor".parse::<PartyKind>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn register_defaults_to_active_customer() {
        let party = Party::register(test_owner(), PartyId::generate(), &input("Acme"), now()).unwrap();
        assert_eq!(party.kind(), PartyKind::Customer);
        assert_eq!(party.status(), PartyStatus::Active);
        assert_eq!(party.contact().email.as_deref(), Some("billing@acme.in"));
        assert_eq!(party.state_code(), Some("29"));
    }

    #[test]
    fn register_requires_name() {
        let err = Party::register(test_owner(), PartyId::generate(), &input(" "), now()).unwrap_err();
        assert_eq!(err, DomainError::validation("missing required fields: name"));
    }

    #[test]
    fn invalid_gstin_is_rejected() {
        let mut bad = input("Acme");
        bad.gstin = Some("29AAACC1206D1ZX".into());
        let err = Party::register(test_owner(), PartyId::generate(), &bad, now()).unwrap_err();
        assert_eq!(err, DomainError::validation("gstin: GSTIN checksum mismatch"));
    }

    #[test]
    fn state_code_must_agree_with_gstin() {
        let mut bad = input("Acme");
        bad.state_code = Some("27".into());
        assert!(Party::register(test_owner(), PartyId::generate(), &bad, now()).is_err());
    }

    #[test]
    fn suspended_party_cannot_transact() {
        let mut party = Party::register(test_owner(), PartyId::generate(), &input("Acme"), now()).unwrap();
        party.suspend(now()).unwrap();
        assert!(!party.can_transact());
        assert!(matches!(party.ensure_can_transact(), Err(DomainError::InvariantViolation(_))));
        assert!(matches!(party.suspend(now()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn update_replaces_contact_and_keeps_kind() {
        let mut party = Party::register(
            test_owner(),
            PartyId::generate(),
            &PartyInput { kind: Some(PartyKind::Supplier), ..input("Acme") },
            now(),
        )
        .unwrap();
        party
            .update(&PartyInput { name: "Acme Supplies".into(), ..Default::default() }, now())
            .unwrap();
        assert_eq!(party.kind(), PartyKind::Supplier);
        assert_eq!(party.name(), "Acme Supplies");
        assert_eq!(party.contact(), &ContactInfo::default());
        assert_eq!(party.gstin(), None);
    }

    #[test]
    fn search_matches_name_email_and_phone() {
        let party = Party::register(test_owner(), PartyId::generate(), &input("Acme Traders"), now()).unwrap();
        assert!(party.matches_query("traders"));
        assert!(party.matches_query("ACME.IN"));
        assert!(party.matches_query("98200"));
        assert!(party.matches_query(""));
        assert!(!party.matches_query("globex"));
    }

    #[test]
    fn serializes_flat_contact_fields() {
        let party = Party::register(test_owner(), PartyId::generate(), &input("Acme"), now()).unwrap();
        let json = serde_json::to_value(&party).unwrap();
        assert_eq!(json["email"], "billing@acme.in");
        assert_eq!(json["kind"], "customer");
        assert_eq!(json["gstin"], "29AAACC1206D1ZC");
        let back: Party = serde_json::from_value(json).unwrap();
        assert_eq!(back, party);
    }
}
