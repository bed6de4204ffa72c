//! Party details frozen onto billing documents.

use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{DomainResult, FieldErrors};
use billforge_gst::{Gstin, validate_state_code};

use crate::party::{Party, PartyId, PartyKind};

/// Buyer or supplier details as they were when a document was written.
///
/// Later edits to the party record do not change issued documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
    pub name: String,
    #[serde(default)]
    pub gstin: Option<Gstin>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
}

/// Party details typed directly on a form instead of picking a stored party.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdHocParty {
    pub name: Option<String>,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub state_code: Option<String>,
}

struct FieldNames {
    name: &'static str,
    gstin: &'static str,
    state: &'static str,
}

fn field_names(role: PartyKind) -> FieldNames {
    match role {
        PartyKind::Customer => FieldNames {
            name: "customer_name",
            gstin: "customer_gstin",
            state: "customer_state",
        },
        PartyKind::Supplier => FieldNames {
            name: "supplier_name",
            gstin: "supplier_gstin",
            state: "supplier_state",
        },
    }
}

impl PartySnapshot {
    /// Snapshot of a stored party. The caller checks it may transact.
    pub fn from_party(party: &Party) -> Self {
        Self {
            party_id: Some(party.id_typed()),
            name: party.name().to_string(),
            gstin: party.gstin().cloned(),
            email: party.contact().email.clone(),
            address: party.contact().address.clone(),
            state_code: party.state_code().map(str::to_string),
        }
    }

    /// Validate ad-hoc details, recording problems under role-specific field names.
    pub fn ad_hoc(role: PartyKind, details: AdHocParty, errors: &mut FieldErrors) -> Self {
        let fields = field_names(role);
        let name = normalize_optional(details.name);
        errors.require(fields.name, name.as_ref());
        let gstin = normalize_optional(details.gstin).and_then(|g| errors.check(fields.gstin, Gstin::parse(&g)));
        let state_code =
            normalize_optional(details.state_code).and_then(|s| errors.check(fields.state, validate_state_code(&s)));
        Self {
            party_id: None,
            name: name.unwrap_or_default(),
            state_code: state_code.or_else(|| gstin.as_ref().map(|g| g.state_code().to_string())),
            gstin,
            email: None,
            address: normalize_optional(details.address),
        }
    }

    /// Stored party when given (must be active), ad-hoc details otherwise.
    pub fn resolve(
        role: PartyKind,
        party: Option<&Party>,
        details: AdHocParty,
        errors: &mut FieldErrors,
    ) -> DomainResult<Self> {
        match party {
            Some(p) => {
                p.ensure_can_transact()?;
                Ok(Self::from_party(p))
            }
            None => Ok(Self::ad_hoc(role, details, errors)),
        }
    }

    pub fn state(&self) -> Option<&str> {
        self.state_code.as_deref()
    }
}
