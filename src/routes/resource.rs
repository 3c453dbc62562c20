//! Resource routes: `POST|GET {base}` and `GET|PUT|PATCH|DELETE {base}/:id` for one record type.

use crate::error::ConfigError;
use crate::handlers::resource::{create, delete, list, read, update, ResourceState};
use crate::model::{resolve_includes, Record};
use crate::service::ResourceService;
use crate::state::AppState;
use axum::{routing::get, Router};

/// Register `T` under `base`. `relations` are the relation paths loaded on reads when the
/// request gives no `include` parameter. The descriptor tree and the default relations are
/// checked here so misconfiguration fails at startup.
pub fn resource_routes<T: Record>(state: &AppState, base: &str, relations: &[&str]) -> Result<Router, ConfigError> {
    let base = base.trim_end_matches('/');
    if !base.starts_with('/') || base.contains(':') {
        return Err(ConfigError::Invalid {
            key: "base path",
            message: format!("'{}' must start with '/' and contain no parameters", base),
        });
    }
    let desc = T::descriptor();
    desc.validate()?;
    resolve_includes(desc, relations).map_err(|message| ConfigError::Descriptor {
        record: desc.name,
        message,
    })?;

    let resource = ResourceState {
        service: ResourceService::<T>::new(state.gateway.clone()),
        relations: relations.iter().map(|r| r.to_string()).collect(),
    };
    tracing::debug!(resource = desc.name, base, "registering routes");
    Ok(Router::new()
        .route(base, get(list::<T>).post(create::<T>))
        .route(
            &format!("{}/:id", base),
            get(read::<T>).put(update::<T>).patch(update::<T>).delete(delete::<T>),
        )
        .with_state(resource))
}
