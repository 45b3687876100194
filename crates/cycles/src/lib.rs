//! `foodflow-cycles` — order cycles and their exchange network.
//!
//! An order cycle is one scheduled round of supply and distribution run by a
//! coordinator enterprise. Goods flow along directed exchanges: suppliers send
//! variants *in* to the coordinator, distributors take variants *out* to
//! shoppers. This crate models that bipartite flow and the cycle's ordering
//! window.

pub mod order_cycle;
pub mod window;

pub use order_cycle::{
    AddIncomingExchange, AddOutgoingExchange, AttachExchangeFee, AttachExchangeVariant,
    CreateOrderCycle, CycleError, Exchange, ExchangeDetail, ExchangeFeeAttached, ExchangeId,
    ExchangeVariantAttached, IncomingExchangeAdded, OrderCycle, OrderCycleCommand,
    OrderCycleCreated, OrderCycleEvent, OrderCycleId, OutgoingExchangeAdded,
};
pub use window::{OrderWindow, WindowState};
