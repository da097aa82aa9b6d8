use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSiteSettingRequest {
    /// Required; an empty string is a valid value.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteSettingValue {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Every setting keyed by name, in key order.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SiteSettingMap {
    #[schema(value_type = Object)]
    pub settings: BTreeMap<String, SiteSettingValue>,
}
