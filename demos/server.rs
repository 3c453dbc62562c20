//! Demo server: customers (with addresses, contacts, merchants) and merchants (with products)
//! over PostgreSQL. Create the tables with `demos/schema.sql` first.
//!
//! `STORE=memory` runs against the in-memory gateway instead.

use axum::Router;
use chrono::NaiveDate;
use resource_sdk::{
    common_routes, cors_layer, init_tracing, nullable, resource_routes, AppState, ChildRecord, ChildSet,
    ColumnDescriptor, Gateway, MemoryGateway, PgGateway, Record, RecordDescriptor, RelationDescriptor, ServerConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer, map_response_body::MapResponseBodyLayer, trace::TraceLayer,
};

const MAX_BODY_BYTES: usize = 1024 * 1024;

static CUSTOMER: RecordDescriptor = RecordDescriptor {
    name: "customer",
    schema: Some("demo"),
    table: "customer",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("name"),
        ColumnDescriptor::new("tax_id").unique(),
        ColumnDescriptor::new("since").typed("date"),
        ColumnDescriptor::new("note"),
    ],
    relations: &[
        RelationDescriptor {
            name: "address",
            foreign_key: "customer_id",
            child: address,
        },
        RelationDescriptor {
            name: "contact",
            foreign_key: "customer_id",
            child: contact,
        },
        RelationDescriptor {
            name: "merchant",
            foreign_key: "customer_id",
            child: merchant,
        },
    ],
};

static ADDRESS: RecordDescriptor = RecordDescriptor {
    name: "address",
    schema: Some("demo"),
    table: "address",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("customer_id"),
        ColumnDescriptor::new("street"),
        ColumnDescriptor::new("city"),
        ColumnDescriptor::new("postal_code"),
    ],
    relations: &[],
};

static CONTACT: RecordDescriptor = RecordDescriptor {
    name: "contact",
    schema: Some("demo"),
    table: "contact",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("customer_id"),
        ColumnDescriptor::new("email").unique(),
        ColumnDescriptor::new("phone"),
    ],
    relations: &[],
};

static MERCHANT: RecordDescriptor = RecordDescriptor {
    name: "merchant",
    schema: Some("demo"),
    table: "merchant",
    id_column: "id",
    columns: &[ColumnDescriptor::new("customer_id"), ColumnDescriptor::new("label")],
    relations: &[RelationDescriptor {
        name: "product",
        foreign_key: "merchant_id",
        child: product,
    }],
};

static PRODUCT: RecordDescriptor = RecordDescriptor {
    name: "product",
    schema: Some("demo"),
    table: "product",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("merchant_id"),
        ColumnDescriptor::new("sku").unique(),
        ColumnDescriptor::new("price").typed("numeric"),
        ColumnDescriptor::new("attributes").typed("jsonb"),
    ],
    relations: &[],
};

fn address() -> &'static RecordDescriptor {
    &ADDRESS
}

fn contact() -> &'static RecordDescriptor {
    &CONTACT
}

fn merchant() -> &'static RecordDescriptor {
    &MERCHANT
}

fn product() -> &'static RecordDescriptor {
    &PRODUCT
}

#[derive(Debug, Serialize, Deserialize)]
struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    name: String,
    tax_id: Option<String>,
    since: Option<NaiveDate>,
    note: Option<String>,
    #[serde(default)]
    address: Vec<Address>,
    #[serde(default)]
    contact: Vec<Contact>,
    #[serde(default)]
    merchant: Vec<Merchant>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    tax_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    since: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    note: Option<Option<String>>,
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

#[derive(Debug, Serialize, Deserialize)]
struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    customer_id: Option<u64>,
    street: String,
    city: String,
    postal_code: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AddressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    postal_code: Option<Option<String>>,
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

#[derive(Debug, Serialize, Deserialize)]
struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    customer_id: Option<u64>,
    email: String,
    phone: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    phone: Option<Option<String>>,
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

#[derive(Debug, Serialize, Deserialize)]
struct Merchant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    customer_id: Option<u64>,
    label: String,
    #[serde(default)]
    product: Vec<Product>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MerchantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
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

#[derive(Debug, Serialize, Deserialize)]
struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    merchant_id: Option<u64>,
    sku: String,
    price: f64,
    #[serde(default)]
    attributes: serde_json::Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<serde_json::Value>,
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("resource_sdk=info,tower_http=info");

    let config = ServerConfig::from_env()?;
    let gateway: Arc<dyn Gateway> = match std::env::var("STORE").as_deref() {
        Ok("memory") => {
            tracing::info!("using in-memory store");
            Arc::new(MemoryGateway::new())
        }
        _ => Arc::new(PgGateway::connect(&config).await?),
    };
    let state = AppState::new(gateway);

    let api = Router::new()
        .merge(resource_routes::<Customer>(&state, "/customers", &["address", "contact"])?)
        .merge(resource_routes::<Merchant>(&state, "/merchants", &["product"])?);

    let app = Router::new()
        .merge(common_routes(state))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        );

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
