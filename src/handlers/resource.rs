//! Resource handlers: one generic set serves every registered record type.
//! Bodies are taken as raw bytes so decode failures surface as envelope BadRequest.

use crate::error::AppError;
use crate::model::Record;
use crate::response::success;
use crate::service::ResourceService;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

/// Router state for one resource: its service plus the relations loaded on reads by default.
pub struct ResourceState<T> {
    pub service: ResourceService<T>,
    pub relations: Arc<[String]>,
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        ResourceState {
            service: self.service.clone(),
            relations: self.relations.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IncludeParams {
    /// Comma-separated relation paths, e.g. `address,merchant.product`. Overrides the defaults;
    /// an empty value loads nothing.
    pub include: Option<String>,
}

impl IncludeParams {
    pub fn relations(&self, defaults: &[String]) -> Vec<String> {
        match &self.include {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.to_vec(),
        }
    }
}

pub async fn create<T: Record>(
    State(state): State<ResourceState<T>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let record = state.service.create_with_children(&body).await?;
    Ok(success("Success Insert", record))
}

pub async fn list<T: Record>(
    State(state): State<ResourceState<T>>,
    Query(params): Query<IncludeParams>,
) -> Result<impl IntoResponse, AppError> {
    let relations = params.relations(&state.relations);
    let records = state.service.read_all(&relations).await?;
    Ok(success("success", records))
}

pub async fn read<T: Record>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
    Query(params): Query<IncludeParams>,
) -> Result<impl IntoResponse, AppError> {
    let relations = params.relations(&state.relations);
    let record = state.service.read_by_id(&id, &relations).await?;
    Ok(success("success", record))
}

pub async fn update<T: Record>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let record = state.service.update(&id, &body).await?;
    Ok(success("Update success", record))
}

pub async fn delete<T: Record>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = state.service.delete(&id).await?;
    Ok(success("Deleted Successfully", serde_json::json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_param_overrides_defaults() {
        let defaults = vec!["address".to_string()];
        let none = IncludeParams::default();
        assert_eq!(none.relations(&defaults), defaults);

        let given = IncludeParams {
            include: Some(" contact , merchant.product,".into()),
        };
        assert_eq!(given.relations(&defaults), vec!["contact", "merchant.product"]);

        let empty = IncludeParams {
            include: Some(String::new()),
        };
        assert!(empty.relations(&defaults).is_empty());
    }
}
