use serde::{Deserialize, Serialize};
use validator::Validate;

/// Pagination query shared by the list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1))]
    pub limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}

/// Request to swipe on a profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub action: String,
}

/// Request to report a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportRequest {
    pub reason: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub details: Option<String>,
}

/// Request to update the caller's location
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Query for the nearby-users endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearbyQuery {
    /// Radius in miles
    #[validate(range(min = 0.1, max = 500.0))]
    pub distance: Option<f64>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1))]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert!(query.limit.is_none());
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_page_zero_rejected() {
        let query = PageQuery { page: 0, limit: Some(10) };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_location_out_of_range_rejected() {
        let req = LocationRequest {
            latitude: 91.0,
            longitude: 10.0,
            city: None,
            country: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_swipe_request_accepts_snake_case_alias() {
        let req: SwipeRequest =
            serde_json::from_str(r#"{"user_id": "u2", "action": "like"}"#).unwrap();
        assert_eq!(req.user_id, "u2");
        assert!(req.validate().is_ok());
    }
}
