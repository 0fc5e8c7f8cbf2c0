//! Client facade: one transport, one repository per entity.
//!
//! # Design
//! `Fintablo` validates its configuration before touching the network,
//! builds a single `Transport` and hands a shared handle of it to every
//! repository. Closing the client (explicitly or on drop) releases the
//! connection pool; repositories obtained earlier then fail with
//! "client is closed".

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::Exchange;
use crate::models::{
    Category, Deal, DealStatus, Direction, Employee, Goods, Job, Moneybag, MoneybagGroup, Obligation,
    ObligationStatus, Model, Partner, PartnerGroup, Transaction,
};
use crate::repository::{endpoints, Repository};
use crate::transport::Transport;

/// Outcome of `Fintablo::test_connection`.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    /// Raw payload of the probe request, on success.
    pub data: Option<Value>,
    pub error: Option<ApiError>,
}

/// Client for the bookkeeping API.
#[derive(Debug)]
pub struct Fintablo {
    transport: Arc<Transport>,
    categories: Repository<Category>,
    moneybags: Repository<Moneybag>,
    transactions: Repository<Transaction>,
    partners: Repository<Partner>,
    deals: Repository<Deal>,
    directions: Repository<Direction>,
    employees: Repository<Employee>,
    goods: Repository<Goods>,
    jobs: Repository<Job>,
    obligations: Repository<Obligation>,
    moneybag_groups: Repository<MoneybagGroup>,
    partner_groups: Repository<PartnerGroup>,
    deal_statuses: Repository<DealStatus>,
    obligation_statuses: Repository<ObligationStatus>,
}

impl Fintablo {
    /// Client with default settings against the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self::from_transport(Arc::new(transport)))
    }

    /// Client that performs I/O through a caller-provided exchange.
    pub fn with_exchange(config: ClientConfig, exchange: Arc<dyn Exchange>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_transport(Arc::new(Transport::with_exchange(&config, exchange))))
    }

    fn from_transport(transport: Arc<Transport>) -> Self {
        info!(base_url = %transport.base_url(), "client initialized");
        fn repo<M: Model>(transport: &Arc<Transport>, endpoint: &str) -> Repository<M> {
            Repository::new(Arc::clone(transport), endpoint)
        }
        Self {
            categories: repo(&transport, endpoints::CATEGORY),
            moneybags: repo(&transport, endpoints::MONEYBAG),
            transactions: repo(&transport, endpoints::TRANSACTION),
            partners: repo(&transport, endpoints::PARTNER),
            deals: repo(&transport, endpoints::DEAL),
            directions: repo(&transport, endpoints::DIRECTION),
            employees: repo(&transport, endpoints::EMPLOYEE),
            goods: repo(&transport, endpoints::GOODS),
            jobs: repo(&transport, endpoints::JOB),
            obligations: repo(&transport, endpoints::OBLIGATION),
            moneybag_groups: repo(&transport, endpoints::MONEYBAG_GROUP),
            partner_groups: repo(&transport, endpoints::PARTNER_GROUP),
            deal_statuses: repo(&transport, endpoints::DEAL_STATUS),
            obligation_statuses: repo(&transport, endpoints::OBLIGATION_STATUS),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn categories(&self) -> &Repository<Category> {
        &self.categories
    }

    pub fn moneybags(&self) -> &Repository<Moneybag> {
        &self.moneybags
    }

    /// Alias of `moneybags`.
    pub fn accounts(&self) -> &Repository<Moneybag> {
        &self.moneybags
    }

    pub fn transactions(&self) -> &Repository<Transaction> {
        &self.transactions
    }

    pub fn partners(&self) -> &Repository<Partner> {
        &self.partners
    }

    pub fn deals(&self) -> &Repository<Deal> {
        &self.deals
    }

    pub fn directions(&self) -> &Repository<Direction> {
        &self.directions
    }

    pub fn employees(&self) -> &Repository<Employee> {
        &self.employees
    }

    pub fn goods(&self) -> &Repository<Goods> {
        &self.goods
    }

    pub fn jobs(&self) -> &Repository<Job> {
        &self.jobs
    }

    pub fn obligations(&self) -> &Repository<Obligation> {
        &self.obligations
    }

    pub fn moneybag_groups(&self) -> &Repository<MoneybagGroup> {
        &self.moneybag_groups
    }

    pub fn partner_groups(&self) -> &Repository<PartnerGroup> {
        &self.partner_groups
    }

    pub fn deal_statuses(&self) -> &Repository<DealStatus> {
        &self.deal_statuses
    }

    pub fn obligation_statuses(&self) -> &Repository<ObligationStatus> {
        &self.obligation_statuses
    }

    /// Probe reachability and credentials with a categories listing.
    pub fn test_connection(&self) -> ConnectionStatus {
        let path = format!("/{}", endpoints::CATEGORY);
        match self.transport.get(&path, &[]) {
            Ok(data) => ConnectionStatus {
                success: true,
                message: "Connection successful".to_string(),
                data: Some(data),
                error: None,
            },
            Err(err) => ConnectionStatus {
                success: false,
                message: format!("Connection failed: {err}"),
                data: None,
                error: Some(err),
            },
        }
    }

    /// Release the connection pool. Later calls are no-ops.
    pub fn close(&self) {
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}

impl Drop for Fintablo {
    fn drop(&mut self) {
        self.close();
    }
}
