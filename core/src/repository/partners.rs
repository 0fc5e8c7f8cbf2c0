use super::Repository;
use crate::error::Result;
use crate::models::Partner;

impl Repository<Partner> {
    pub fn search_by_name(&self, name: &str) -> Result<Vec<Partner>> {
        self.list_by("name", name)
    }

    /// Partners registered under a taxpayer number.
    pub fn get_by_inn(&self, inn: &str) -> Result<Vec<Partner>> {
        self.list_by("inn", inn)
    }

    pub fn get_by_group(&self, group_id: i64) -> Result<Vec<Partner>> {
        self.list_by("groupId", group_id)
    }

    pub fn search_by_comment(&self, comment: &str) -> Result<Vec<Partner>> {
        self.list_by("comment", comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::endpoints::PARTNER;
    use crate::transport::testing::{reply, transport};

    #[test]
    fn partner_filters() {
        let steps = (0..4).map(|_| reply(200, "[]")).collect();
        let (transport, exchange) = transport(steps);
        let repo: Repository<Partner> = Repository::new(transport, PARTNER);

        repo.search_by_name("Acme").unwrap();
        repo.get_by_inn("7701234567").unwrap();
        repo.get_by_group(3).unwrap();
        repo.search_by_comment("vip").unwrap();

        let requests = exchange.requests();
        assert!(requests.iter().all(|r| r.url == "https://api.example.test/v1/partner"));
        assert_eq!(requests[0].query_param("name"), Some("Acme"));
        assert_eq!(requests[1].query_param("inn"), Some("7701234567"));
        assert_eq!(requests[2].query_param("groupId"), Some("3"));
        assert_eq!(requests[3].query_param("comment"), Some("vip"));
    }
}
