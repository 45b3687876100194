use serde::{Deserialize, Serialize};

use foodflow_core::AggregateId;

/// Enterprise fee identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeId(pub AggregateId);

impl FeeId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for FeeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Closed set of fee kinds an enterprise may charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    Packing,
    Transport,
    Admin,
    Sales,
    Fundraising,
}

impl FeeType {
    pub const ALL: [FeeType; 5] = [
        FeeType::Packing,
        FeeType::Transport,
        FeeType::Admin,
        FeeType::Sales,
        FeeType::Fundraising,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeeType::Packing => "packing",
            FeeType::Transport => "transport",
            FeeType::Admin => "admin",
            FeeType::Sales => "sales",
            FeeType::Fundraising => "fundraising",
        }
    }
}

/// A fee an enterprise charges, referenced by exchanges that apply it.
///
/// `amount_per_item` is in smallest currency unit (e.g. cents) and is applied
/// per item flowing through the exchange; richer calculators are downstream
/// concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDefinition {
    pub fee_id: FeeId,
    pub fee_type: FeeType,
    pub name: String,
    pub amount_per_item: u64,
}
