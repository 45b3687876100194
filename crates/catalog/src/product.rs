use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use foodflow_enterprises::EnterpriseId;
use foodflow_events::Event;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Variant identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub AggregateId);

impl VariantId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VariantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Stock handling for a variant: made to order, or a counted level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantStock {
    OnDemand,
    OnHand(u64),
}

/// Variant shape supplied when creating/extending a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub variant_id: VariantId,
    /// Display name for the option (e.g. "1 kg bag"); empty means the
    /// product name stands alone.
    pub unit_name: String,
    /// Price in smallest currency unit (e.g. cents).
    pub price: u64,
    pub stock: VariantStock,
}

/// A sellable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: VariantId,
    pub unit_name: String,
    pub price: u64,
    pub stock: VariantStock,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    supplier: Option<EnterpriseId>,
    name: String,
    variants: Vec<Variant>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            supplier: None,
            name: String::new(),
            variants: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn supplier(&self) -> Option<EnterpriseId> {
        self.supplier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, variant_id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.variant_id == variant_id)
    }

    /// The first variant created with the product.
    pub fn master_variant(&self) -> Option<&Variant> {
        self.variants.first()
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub supplier: EnterpriseId,
    pub name: String,
    /// The master variant, created together with the product.
    pub master: VariantSpec,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddVariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddVariant {
    pub product_id: ProductId,
    pub variant: VariantSpec,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetVariantStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVariantStock {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub stock: VariantStock,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    AddVariant(AddVariant),
    SetVariantStock(SetVariantStock),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub supplier: EnterpriseId,
    pub name: String,
    pub master: VariantSpec,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VariantAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAdded {
    pub product_id: ProductId,
    pub variant: VariantSpec,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VariantStockSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStockSet {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub stock: VariantStock,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    VariantAdded(VariantAdded),
    VariantStockSet(VariantStockSet),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "catalog.product.created",
            ProductEvent::VariantAdded(_) => "catalog.product.variant_added",
            ProductEvent::VariantStockSet(_) => "catalog.product.variant_stock_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::VariantAdded(e) => e.occurred_at,
            ProductEvent::VariantStockSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.supplier = Some(e.supplier);
                self.name = e.name.clone();
                self.variants = vec![Variant {
                    variant_id: e.master.variant_id,
                    unit_name: e.master.unit_name.clone(),
                    price: e.master.price,
                    stock: e.master.stock,
                }];
                self.created = true;
            }
            ProductEvent::VariantAdded(e) => {
                self.variants.push(Variant {
                    variant_id: e.variant.variant_id,
                    unit_name: e.variant.unit_name.clone(),
                    price: e.variant.price,
                    stock: e.variant.stock,
                });
            }
            ProductEvent::VariantStockSet(e) => {
                if let Some(v) = self.variants.iter_mut().find(|v| v.variant_id == e.variant_id) {
                    v.stock = e.stock;
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::AddVariant(cmd) => self.handle_add_variant(cmd),
            ProductCommand::SetVariantStock(cmd) => self.handle_set_stock(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            supplier: cmd.supplier,
            name: cmd.name.clone(),
            master: cmd.master.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_variant(&self, cmd: &AddVariant) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_product_id(cmd.product_id)?;

        if self.variant(cmd.variant.variant_id).is_some() {
            return Err(DomainError::conflict("variant already exists"));
        }

        Ok(vec![ProductEvent::VariantAdded(VariantAdded {
            product_id: cmd.product_id,
            variant: cmd.variant.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_stock(&self, cmd: &SetVariantStock) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_product_id(cmd.product_id)?;

        if self.variant(cmd.variant_id).is_none() {
            return Err(DomainError::not_found());
        }

        Ok(vec![ProductEvent::VariantStockSet(VariantStockSet {
            product_id: cmd.product_id,
            variant_id: cmd.variant_id,
            stock: cmd.stock,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodflow_events::execute;

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn spec(price: u64, stock: VariantStock) -> VariantSpec {
        VariantSpec {
            variant_id: VariantId::new(AggregateId::new()),
            unit_name: "1 kg".to_string(),
            price,
            stock,
        }
    }

    /// Explicit builder: a created product for the given supplier.
    fn created_product(id: ProductId, supplier: EnterpriseId) -> Product {
        let mut product = Product::empty(id);
        execute(
            &mut product,
            &ProductCommand::CreateProduct(CreateProduct {
                product_id: id,
                supplier,
                name: "Carrots".to_string(),
                master: spec(250, VariantStock::OnHand(5)),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        product
    }

    #[test]
    fn create_product_creates_master_variant() {
        let id = test_product_id();
        let supplier = EnterpriseId::new(AggregateId::new());
        let product = created_product(id, supplier);

        assert_eq!(product.supplier(), Some(supplier));
        assert_eq!(product.variants().len(), 1);
        assert_eq!(product.master_variant().unwrap().price, 250);
        assert_eq!(product.master_variant().unwrap().stock, VariantStock::OnHand(5));
    }

    #[test]
    fn create_rejects_empty_name() {
        let id = test_product_id();
        let product = Product::empty(id);
        let err = product
            .handle(&ProductCommand::CreateProduct(CreateProduct {
                product_id: id,
                supplier: EnterpriseId::new(AggregateId::new()),
                name: "".to_string(),
                master: spec(100, VariantStock::OnDemand),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn add_variant_rejects_duplicate_id() {
        let id = test_product_id();
        let mut product = created_product(id, EnterpriseId::new(AggregateId::new()));

        let variant = spec(300, VariantStock::OnDemand);
        execute(
            &mut product,
            &ProductCommand::AddVariant(AddVariant {
                product_id: id,
                variant: variant.clone(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(product.variants().len(), 2);

        let err = product
            .handle(&ProductCommand::AddVariant(AddVariant {
                product_id: id,
                variant,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn set_stock_requires_known_variant() {
        let id = test_product_id();
        let mut product = created_product(id, EnterpriseId::new(AggregateId::new()));

        let err = product
            .handle(&ProductCommand::SetVariantStock(SetVariantStock {
                product_id: id,
                variant_id: VariantId::new(AggregateId::new()),
                stock: VariantStock::OnHand(1),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);

        let master = product.master_variant().unwrap().variant_id;
        execute(
            &mut product,
            &ProductCommand::SetVariantStock(SetVariantStock {
                product_id: id,
                variant_id: master,
                stock: VariantStock::OnDemand,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(product.variant(master).unwrap().stock, VariantStock::OnDemand);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let id = test_product_id();
        let product = created_product(id, EnterpriseId::new(AggregateId::new()));
        let before = product.clone();

        let _ = product
            .handle(&ProductCommand::AddVariant(AddVariant {
                product_id: id,
                variant: spec(500, VariantStock::OnHand(2)),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(product, before);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: handle is deterministic (same state + command = same events).
            #[test]
            fn handle_is_deterministic(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                price in 0u64..1_000_000,
                on_hand in 0u64..10_000
            ) {
                let id = test_product_id();
                let product = Product::empty(id);
                let cmd = ProductCommand::CreateProduct(CreateProduct {
                    product_id: id,
                    supplier: EnterpriseId::new(AggregateId::new()),
                    name,
                    master: VariantSpec {
                        variant_id: VariantId::new(AggregateId::new()),
                        unit_name: "unit".to_string(),
                        price,
                        stock: VariantStock::OnHand(on_hand),
                    },
                    occurred_at: test_time(),
                });

                let first = product.handle(&cmd);
                let second = product.handle(&cmd);
                prop_assert_eq!(first, second);
            }
        }
    }
}
