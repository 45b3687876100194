//! `foodflow-catalog` — products and their sellable variants.
//!
//! A variant is the unit everything else trades in: exchanges carry variants,
//! subscriptions order variants, overrides reprice variants.

pub mod product;

pub use product::{
    AddVariant, CreateProduct, Product, ProductCommand, ProductCreated, ProductEvent, ProductId,
    SetVariantStock, Variant, VariantAdded, VariantId, VariantSpec, VariantStock, VariantStockSet,
};
