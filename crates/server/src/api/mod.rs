use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shared::{
    domain::Category,
    error::{ApiError, ErrorCode},
    protocol::CollectionResponse,
};
use tracing::warn;

use crate::catalog::{to_media_item, Catalog};

const MAX_CATEGORY_BYTES: usize = 64;

#[derive(Clone)]
pub struct ApiContext {
    pub catalog: Arc<Catalog>,
    pub default_category: Category,
    pub signed_url_ttl: Option<Duration>,
}

pub fn collections_route() -> &'static str {
    shared::protocol::COLLECTIONS_ROUTE
}

/// Resolves a requested category to its collection. Missing, blank or unknown
/// categories are served the default collection, echoing what was asked for.
pub fn list_collection(
    ctx: &ApiContext,
    requested: Option<&Category>,
    now: DateTime<Utc>,
) -> Result<CollectionResponse, ApiError> {
    let requested = requested
        .map(|category| Category::new(category.as_str().trim()))
        .unwrap_or_else(|| Category::new(""));
    validate_category(&requested)?;

    let entries = ctx
        .catalog
        .collection(&requested)
        .or_else(|| ctx.catalog.collection(&ctx.default_category))
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::NotFound,
                format!("no collection for '{requested}' and no default collection"),
            )
        })?;

    let expires_at = match ctx.signed_url_ttl {
        Some(ttl) => Some(now.checked_add_signed(ttl).ok_or_else(|| {
            warn!(
                category = %requested,
                ttl_seconds = ttl.num_seconds(),
                "signed url expiry overflows"
            );
            ApiError::new(ErrorCode::Internal, "signed url expiry is out of range")
        })?),
        None => None,
    };
    let items = entries
        .iter()
        .map(|entry| to_media_item(entry, expires_at))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            warn!(category = %requested, error = %err, "failed to sign display url");
            ApiError::new(ErrorCode::Internal, err.to_string())
        })?;

    Ok(CollectionResponse::new(requested, items))
}

fn validate_category(category: &Category) -> Result<(), ApiError> {
    if category.as_str().len() > MAX_CATEGORY_BYTES {
        return Err(ApiError::new(ErrorCode::Validation, "category is too long"));
    }
    let valid = category
        .as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "category may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
