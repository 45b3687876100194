//! `foodflow-enterprises` — enterprise registry module.
//!
//! An enterprise is a producer, a hub, or both: the parties that supply,
//! coordinate and distribute goods. Enterprises also own the fee definitions
//! that order-cycle exchanges reference.

pub mod enterprise;
pub mod fee;

pub use enterprise::{
    ContactInfo, DefineFee, Enterprise, EnterpriseCommand, EnterpriseEvent, EnterpriseFeeDefined,
    EnterpriseId, EnterpriseProfileUpdated, EnterpriseRegistered, RegisterEnterprise, SellsScope,
    UpdateProfile,
};
pub use fee::{FeeDefinition, FeeId, FeeType};
