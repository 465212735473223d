use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::player::validate_name;

/// Request payload for creating a scoring rule
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    /// Signed weight applied once per occurrence
    pub points: i64,
}
