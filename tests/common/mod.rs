//! Fixture records: customer → address, contact, merchant → product.
#![allow(dead_code)]

use resource_sdk::{
    nullable, AppState, ChildRecord, ChildSet, ColumnDescriptor, Gateway, MemoryGateway, Record, RecordDescriptor,
    RelationDescriptor,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub static CUSTOMER: RecordDescriptor = RecordDescriptor {
    name: "customer",
    schema: None,
    table: "customer",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("name"),
        ColumnDescriptor::new("tax_id").unique(),
        ColumnDescriptor::new("note"),
        ColumnDescriptor::new("external_ref").typed("uuid"),
    ],
    relations: &[
        RelationDescriptor {
            name: "address",
            foreign_key: "customer_id",
            child: address_descriptor,
        },
        RelationDescriptor {
            name: "contact",
            foreign_key: "customer_id",
            child: contact_descriptor,
        },
        RelationDescriptor {
            name: "merchant",
            foreign_key: "customer_id",
            child: merchant_descriptor,
        },
    ],
};

pub static ADDRESS: RecordDescriptor = RecordDescriptor {
    name: "address",
    schema: None,
    table: "address",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("customer_id"),
        ColumnDescriptor::new("street"),
        ColumnDescriptor::new("city"),
    ],
    relations: &[],
};

pub static CONTACT: RecordDescriptor = RecordDescriptor {
    name: "contact",
    schema: None,
    table: "contact",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("customer_id"),
        ColumnDescriptor::new("email").unique(),
    ],
    relations: &[],
};

pub static MERCHANT: RecordDescriptor = RecordDescriptor {
    name: "merchant",
    schema: None,
    table: "merchant",
    id_column: "id",
    columns: &[ColumnDescriptor::new("customer_id"), ColumnDescriptor::new("label")],
    relations: &[RelationDescriptor {
        name: "product",
        foreign_key: "merchant_id",
        child: product_descriptor,
    }],
};

pub static PRODUCT: RecordDescriptor = RecordDescriptor {
    name: "product",
    schema: None,
    table: "product",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("merchant_id"),
        ColumnDescriptor::new("sku").unique(),
        ColumnDescriptor::new("price"),
    ],
    relations: &[],
};

fn address_descriptor() -> &'static RecordDescriptor {
    &ADDRESS
}

fn contact_descriptor() -> &'static RecordDescriptor {
    &CONTACT
}

fn merchant_descriptor() -> &'static RecordDescriptor {
    &MERCHANT
}

fn product_descriptor() -> &'static RecordDescriptor {
    &PRODUCT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub address: Vec<Address>,
    #[serde(default)]
    pub contact: Vec<Contact>,
    #[serde(default)]
    pub merchant: Vec<Merchant>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<Option<String>>,
}

impl Record for Customer {
    type Patch = CustomerPatch;

    fn descriptor() -> &'static RecordDescriptor {
        &CUSTOMER
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn children(&mut self) -> Vec<ChildSet<'_>> {
        vec![
            ChildSet::new("address", &mut self.address),
            ChildSet::new("contact", &mut self.contact),
            ChildSet::new("merchant", &mut self.merchant),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub customer_id: Option<u64>,
    pub street: String,
    pub city: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AddressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Record for Address {
    type Patch = AddressPatch;

    fn descriptor() -> &'static RecordDescriptor {
        &ADDRESS
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

impl ChildRecord for Address {
    fn set_parent_key(&mut self, parent_id: u64) {
        self.customer_id = Some(parent_id);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub customer_id: Option<u64>,
    pub email: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Record for Contact {
    type Patch = ContactPatch;

    fn descriptor() -> &'static RecordDescriptor {
        &CONTACT
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

impl ChildRecord for Contact {
    fn set_parent_key(&mut self, parent_id: u64) {
        self.customer_id = Some(parent_id);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Merchant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub customer_id: Option<u64>,
    pub label: String,
    #[serde(default)]
    pub product: Vec<Product>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MerchantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Record for Merchant {
    type Patch = MerchantPatch;

    fn descriptor() -> &'static RecordDescriptor {
        &MERCHANT
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn children(&mut self) -> Vec<ChildSet<'_>> {
        vec![ChildSet::new("product", &mut self.product)]
    }
}

impl ChildRecord for Merchant {
    fn set_parent_key(&mut self, parent_id: u64) {
        self.customer_id = Some(parent_id);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub merchant_id: Option<u64>,
    pub sku: String,
    pub price: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Record for Product {
    type Patch = ProductPatch;

    fn descriptor() -> &'static RecordDescriptor {
        &PRODUCT
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

impl ChildRecord for Product {
    fn set_parent_key(&mut self, parent_id: u64) {
        self.merchant_id = Some(parent_id);
    }
}

/// A fresh in-memory store plus app state sharing it.
pub fn memory_state() -> (MemoryGateway, AppState) {
    let store = MemoryGateway::new();
    let gateway: Arc<dyn Gateway> = Arc::new(store.clone());
    (store, AppState::new(gateway))
}
