use super::Repository;
use crate::error::Result;
use crate::models::{Moneybag, MoneybagType};

impl Repository<Moneybag> {
    pub fn get_by_type(&self, kind: MoneybagType) -> Result<Vec<Moneybag>> {
        self.list_by("type", kind)
    }

    pub fn get_by_currency(&self, currency: &str) -> Result<Vec<Moneybag>> {
        self.list_by("currency", currency)
    }

    pub fn get_by_group(&self, group_id: i64) -> Result<Vec<Moneybag>> {
        self.list_by("groupId", group_id)
    }

    /// Accounts that are not archived.
    pub fn get_active_accounts(&self) -> Result<Vec<Moneybag>> {
        self.list_by("archived", false)
    }

    pub fn get_archived_accounts(&self) -> Result<Vec<Moneybag>> {
        self.list_by("archived", true)
    }

    pub fn get_cash_accounts(&self) -> Result<Vec<Moneybag>> {
        self.get_by_type(MoneybagType::Cash)
    }

    pub fn get_bank_accounts(&self) -> Result<Vec<Moneybag>> {
        self.get_by_type(MoneybagType::Bank)
    }

    pub fn get_card_accounts(&self) -> Result<Vec<Moneybag>> {
        self.get_by_type(MoneybagType::Card)
    }

    pub fn search_by_name(&self, name: &str) -> Result<Vec<Moneybag>> {
        self.list_by("name", name)
    }
}
