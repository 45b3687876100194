use serde::{Deserialize, Serialize};

use foodflow_core::DomainError;

/// Closed set of permissions a parent enterprise can grant a child.
///
/// The admin UI shows human-readable labels; keys are what the API and
/// storage speak. Both mappings live here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AddToOrderCycle,
    ManageProducts,
    EditProfile,
    CreateVariantOverrides,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::AddToOrderCycle,
        Permission::ManageProducts,
        Permission::EditProfile,
        Permission::CreateVariantOverrides,
    ];

    /// Stable key (storage / API representation).
    pub fn name(self) -> &'static str {
        match self {
            Permission::AddToOrderCycle => "add_to_order_cycle",
            Permission::ManageProducts => "manage_products",
            Permission::EditProfile => "edit_profile",
            Permission::CreateVariantOverrides => "create_variant_overrides",
        }
    }

    /// Human-readable form label.
    pub fn label(self) -> &'static str {
        match self {
            Permission::AddToOrderCycle => "to add to order cycle",
            Permission::ManageProducts => "to manage products",
            Permission::EditProfile => "to edit profile",
            Permission::CreateVariantOverrides => "to add products to inventory",
        }
    }

    /// Parse a stable key, rejecting anything outside the closed set.
    pub fn from_name(name: &str) -> Result<Self, DomainError> {
        Permission::ALL
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| DomainError::validation(format!("unknown permission: {name}")))
    }

    /// Parse a form label, rejecting anything outside the closed set.
    pub fn from_label(label: &str) -> Result<Self, DomainError> {
        Permission::ALL
            .into_iter()
            .find(|p| p.label() == label)
            .ok_or_else(|| DomainError::validation(format!("unknown permission label: {label}")))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_label_round_trip_for_every_permission() {
        for permission in Permission::ALL {
            assert_eq!(Permission::from_name(permission.name()), Ok(permission));
            assert_eq!(Permission::from_label(permission.label()), Ok(permission));
        }
    }

    #[test]
    fn inventory_label_maps_to_variant_override_key() {
        // The form says "inventory", storage says "create_variant_overrides".
        let p = Permission::from_label("to add products to inventory").unwrap();
        assert_eq!(p, Permission::CreateVariantOverrides);
        assert_eq!(p.name(), "create_variant_overrides");
    }

    #[test]
    fn rejects_keys_outside_the_closed_set() {
        assert!(Permission::from_name("delete_everything").is_err());
        assert!(Permission::from_label("to delete everything").is_err());
    }
}
