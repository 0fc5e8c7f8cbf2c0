use serde_json::{Map, Value};

use super::Repository;
use crate::error::Result;
use crate::models::Deal;

impl Repository<Deal> {
    pub fn get_by_partner(&self, partner_id: i64) -> Result<Vec<Deal>> {
        self.list_by("partnerId", partner_id)
    }

    pub fn get_by_status(&self, status_id: i64) -> Result<Vec<Deal>> {
        self.list_by("statusId", status_id)
    }

    pub fn get_by_direction(&self, direction_id: i64) -> Result<Vec<Deal>> {
        self.list_by("directionId", direction_id)
    }

    /// Deals owned by one employee.
    pub fn get_by_responsible(&self, responsible_id: i64) -> Result<Vec<Deal>> {
        self.list_by("responsibleId", responsible_id)
    }

    pub fn add_stage(&self, id: i64, stage: Map<String, Value>) -> Result<Value> {
        self.action(id, "add-stage", Some(stage))
    }
}
