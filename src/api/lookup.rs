use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    AppState, Error,
    lookup::{FieldMap, LookupService, Source},
};

type Service = State<Arc<LookupService>>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ipshudi/{ip}", get(ipshudi))
        .route("/ip138/{ip}", get(ip138))
        .route("/ip/{ip}", get(fastest))
}

async fn ipshudi(
    State(service): Service,
    Path(ip): Path<String>,
) -> Result<Json<FieldMap>, Error> {
    single_source(&service, &ip, Source::Ipshudi).await
}

async fn ip138(
    State(service): Service,
    Path(ip): Path<String>,
) -> Result<Json<FieldMap>, Error> {
    single_source(&service, &ip, Source::Ip138).await
}

async fn single_source(
    service: &LookupService,
    ip: &str,
    source: Source,
) -> Result<Json<FieldMap>, Error> {
    let fields = service.lookup_source(ip, source).await?;
    Ok(Json(fields))
}

async fn fastest(
    State(service): Service,
    Path(ip): Path<String>,
) -> Result<Json<FieldMap>, Error> {
    let fields = service.lookup_fastest(&ip).await?;
    Ok(Json(fields))
}
