use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A scoring rule template such as "Goal: +5". Events copy its name and
/// points, so deleting a category never rewrites history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub points: i64,
}
