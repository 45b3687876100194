//! `foodflow-inventory` — per-hub stock policy and listing control.
//!
//! A variant override lets a hub reprice or re-stock someone else's variant
//! for its own shopfront; an inventory item toggles whether a variant shows
//! up in the hub's inventory at all.

pub mod inventory_item;
pub mod variant_override;

pub use inventory_item::{
    CreateInventoryItem, InventoryItem, InventoryItemCommand, InventoryItemCreated,
    InventoryItemEvent, InventoryItemId, InventoryItemVisibilityChanged, SetVisibility,
};
pub use variant_override::{
    CreateVariantOverride, RecordSale, ResetStock, SetOverridePrice, SetStockPolicy, StockPolicy,
    StockPolicySet, StockReduced, StockReset, VariantOverride, VariantOverrideCommand,
    VariantOverrideCreated, VariantOverrideEvent, VariantOverrideId, OverridePriceSet,
};
