use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::Repository;
use crate::error::Result;
use crate::models::{Group, Transaction};
use crate::query::{QueryParams, QueryValue};

impl Repository<Transaction> {
    /// Transactions of one account (moneybag).
    pub fn get_by_account(&self, moneybag_id: i64) -> Result<Vec<Transaction>> {
        self.list_by("moneybagId", moneybag_id)
    }

    pub fn get_by_category(&self, category_id: i64) -> Result<Vec<Transaction>> {
        self.list_by("categoryId", category_id)
    }

    pub fn get_by_partner(&self, partner_id: i64) -> Result<Vec<Transaction>> {
        self.list_by("partnerId", partner_id)
    }

    pub fn get_by_direction(&self, direction_id: i64) -> Result<Vec<Transaction>> {
        self.list_by("directionId", direction_id)
    }

    pub fn get_by_deal(&self, deal_id: i64) -> Result<Vec<Transaction>> {
        self.list_by("dealId", deal_id)
    }

    /// Transactions dated within `[from, to]`.
    pub fn get_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
        let params: QueryParams = [
            ("dateFrom".to_string(), QueryValue::Date(from)),
            ("dateTo".to_string(), QueryValue::Date(to)),
        ]
        .into_iter()
        .collect();
        self.list(&params)
    }

    pub fn get_by_group(&self, group: Group) -> Result<Vec<Transaction>> {
        self.list_by("group", group)
    }

    pub fn get_income_transactions(&self) -> Result<Vec<Transaction>> {
        self.get_by_group(Group::Income)
    }

    pub fn get_outcome_transactions(&self) -> Result<Vec<Transaction>> {
        self.get_by_group(Group::Outcome)
    }

    pub fn get_transfer_transactions(&self) -> Result<Vec<Transaction>> {
        self.get_by_group(Group::Transfer)
    }

    pub fn get_planned_transactions(&self) -> Result<Vec<Transaction>> {
        self.list_by("isPlan", true)
    }

    pub fn get_actual_transactions(&self) -> Result<Vec<Transaction>> {
        self.list_by("isPlan", false)
    }

    pub fn split_transaction(&self, id: i64, split: Map<String, Value>) -> Result<Value> {
        self.action(id, "split", Some(split))
    }

    pub fn unsplit_transaction(&self, id: i64) -> Result<Value> {
        self.action(id, "unsplit", None)
    }

    /// Merge `other` into `id`.
    pub fn merge_transactions(&self, id: i64, other: i64) -> Result<Value> {
        self.action(id, &format!("merge/{other}"), None)
    }

    pub fn convert_to_transfer(&self, id: i64, transfer: Map<String, Value>) -> Result<Value> {
        self.action(id, "to-transfer", Some(transfer))
    }

    pub fn split_transfer(&self, id: i64, split: Map<String, Value>) -> Result<Value> {
        self.action(id, "split-transfer", Some(split))
    }

    pub fn confirm_transaction(&self, id: i64) -> Result<Value> {
        self.action(id, "confirm", None)
    }
}
