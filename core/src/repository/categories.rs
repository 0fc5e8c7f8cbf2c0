use super::Repository;
use crate::error::Result;
use crate::models::{Category, CategoryType, Group};

impl Repository<Category> {
    pub fn get_by_parent(&self, parent_id: i64) -> Result<Vec<Category>> {
        self.list_by("parentId", parent_id)
    }

    pub fn get_by_group(&self, group: Group) -> Result<Vec<Category>> {
        self.list_by("group", group)
    }

    pub fn get_by_type(&self, kind: CategoryType) -> Result<Vec<Category>> {
        self.list_by("type", kind)
    }

    pub fn get_by_pnl_type(&self, pnl_type: &str) -> Result<Vec<Category>> {
        self.list_by("pnlType", pnl_type)
    }

    pub fn get_income_categories(&self) -> Result<Vec<Category>> {
        self.get_by_group(Group::Income)
    }

    pub fn get_outcome_categories(&self) -> Result<Vec<Category>> {
        self.get_by_group(Group::Outcome)
    }

    pub fn get_transfer_categories(&self) -> Result<Vec<Category>> {
        self.get_by_group(Group::Transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::endpoints::CATEGORY;
    use crate::transport::testing::{reply, transport};

    #[test]
    fn group_shortcuts_filter_by_token() {
        let (transport, exchange) = transport(vec![
            reply(200, r#"{"items": [{"id": 1, "name": "Sales", "group": "income"}]}"#),
            reply(200, r#"{"items": []}"#),
            reply(200, r#"{"items": []}"#),
        ]);
        let repo: Repository<Category> = Repository::new(transport, CATEGORY);

        let income = repo.get_income_categories().unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].group, Some(Group::Income));
        repo.get_outcome_categories().unwrap();
        repo.get_transfer_categories().unwrap();

        let groups: Vec<_> = exchange
            .requests()
            .iter()
            .map(|r| r.query_param("group").unwrap().to_string())
            .collect();
        assert_eq!(groups, ["income", "outcome", "transfer"]);
    }

    #[test]
    fn type_and_parent_filters() {
        let (transport, exchange) = transport(vec![reply(200, "[]"), reply(200, "[]"), reply(200, "[]")]);
        let repo: Repository<Category> = Repository::new(transport, CATEGORY);
        repo.get_by_type(CategoryType::Financial).unwrap();
        repo.get_by_parent(17).unwrap();
        repo.get_by_pnl_type("revenue").unwrap();

        let requests = exchange.requests();
        assert_eq!(requests[0].query_param("type"), Some("financial"));
        assert_eq!(requests[1].query_param("parentId"), Some("17"));
        assert_eq!(requests[2].query_param("pnlType"), Some("revenue"));
    }
}
