//! Typed, blocking client for the FinTablo bookkeeping API.
//!
//! # Overview
//! Repositories expose CRUD and filter helpers per entity (categories,
//! moneybags, transactions, partners, deals and their supporting records)
//! and translate between the API's camelCase JSON and typed records.
//!
//! # Design
//! - `http` describes requests and responses as plain data; an `Exchange`
//!   performs one round trip (`UreqExchange` in production).
//! - `transport` adds base URL, headers, retries for idempotent reads,
//!   status-to-error mapping and JSON decoding.
//! - `codec` and `models` define the wire format: absent fields are never
//!   sent, the `date` field accepts three formats and writes one.
//! - `query` builds list/count parameters; `repository` binds an entity to
//!   its endpoint; `Fintablo` owns one transport and every repository.
//! - Every call blocks the calling thread for one logical round trip.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod query;
pub mod repository;
pub mod transport;

pub use client::{ConnectionStatus, Fintablo};
pub use codec::WireDate;
pub use config::ClientConfig;
pub use error::{ApiError, Result, StatusError, StatusKind};
pub use http::{Exchange, ExchangeError, HttpMethod, HttpRequest, HttpResponse, UreqExchange};
pub use models::{
    Category, CategoryType, Deal, DealStatus, Direction, Employee, Goods, Group, Job, Model, Moneybag,
    MoneybagGroup, MoneybagType, Obligation, ObligationStatus, Partner, PartnerGroup, Transaction,
};
pub use query::{QueryBuilder, QueryParams, QueryValue};
pub use repository::Repository;
pub use transport::{RetryPolicy, Transport};
