//! Request handlers for the recipe-builder HTTP API.

use crate::error::ApiError;
use crate::output::RecipeResponse;
use crate::snapshot::FileSnapshotSource;
use crate::ServerConfig;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use cns_core::{Builder, CnsError, CriteriaDocument, CriteriaQuery, SnapshotSource};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Deserializes a request body, honoring `Content-Type`: `application/yaml`
/// / `application/x-yaml` decode as YAML, anything else (including no
/// header at all) decodes as JSON.
fn parse_body<T: DeserializeOwned>(req: &HttpRequest, body: &[u8]) -> Result<T, ApiError> {
    let content_type = req.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
    if content_type.contains("yaml") {
        serde_yaml::from_slice(body).map_err(|e| ApiError::from(CnsError::from(e)))
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::from(CnsError::from(e)))
    }
}

/// Recipes are pure functions of (data provider generation, criteria,
/// evaluator) and the default data provider only changes on redeploy, so a
/// resolved recipe is safe to cache client-side for a few minutes.
const RECIPE_CACHE_CONTROL: &str = "public, max-age=600";

fn recipe_response(result: cns_core::RecipeResult) -> HttpResponse {
    HttpResponse::Ok().insert_header((header::CACHE_CONTROL, RECIPE_CACHE_CONTROL)).json(RecipeResponse::from(result))
}

/// `GET /v1/recipe?service=eks&accelerator=h100&intent=training`
pub async fn get_recipe(query: web::Query<CriteriaQuery>, cfg: web::Data<ServerConfig>) -> Result<HttpResponse, ApiError> {
    resolve_by_criteria(query.into_inner(), &cfg).await
}

/// `POST /v1/recipe`: either a direct `criteria` tuple or a `snapshotUri` to
/// derive one from, mirroring `cns_cli`'s `recipe` subcommand. Accepts
/// `application/json` (default) or `application/yaml` / `application/x-yaml`
/// bodies.
pub async fn post_recipe(req: HttpRequest, body: web::Bytes, cfg: web::Data<ServerConfig>) -> Result<HttpResponse, ApiError> {
    let doc: CriteriaDocument = parse_body(&req, &body)?;
    doc.validate().map_err(ApiError::from)?;
    match doc.snapshot_uri {
        Some(uri) => {
            let source = FileSnapshotSource::new(&cfg.snapshot_root);
            let snapshot = source.fetch(&uri).map_err(ApiError::from)?;
            snapshot.validate_header().map_err(ApiError::from)?;
            let criteria = cns_core::derive_criteria(&snapshot);
            let store = cns_core::shared_store().map_err(ApiError::from)?;
            let builder = Builder::new(store);
            let result = builder
                .build_from_criteria_with_evaluator(&criteria, &snapshot, cfg.build_timeout)
                .map_err(ApiError::from)?;
            Ok(recipe_response(result))
        }
        None => {
            let criteria = doc.criteria.unwrap_or_default();
            let store = cns_core::shared_store().map_err(ApiError::from)?;
            let builder = Builder::new(store);
            let result = builder.build_from_criteria(&criteria, cfg.build_timeout).map_err(ApiError::from)?;
            Ok(recipe_response(result))
        }
    }
}

async fn resolve_by_criteria(query: CriteriaQuery, cfg: &ServerConfig) -> Result<HttpResponse, ApiError> {
    let criteria = query.into_criteria().map_err(ApiError::from)?;
    let store = cns_core::shared_store().map_err(ApiError::from)?;
    let builder = Builder::new(store);
    let result = builder.build_from_criteria(&criteria, cfg.build_timeout).map_err(ApiError::from)?;
    Ok(recipe_response(result))
}

#[derive(Debug, Deserialize)]
pub struct BundleRequest {
    #[serde(flatten)]
    criteria: CriteriaQuery,
}

/// `POST /v1/bundle`: resolves a recipe and returns the per-component
/// values payload the CLI's `ValuesFileEmitter` would otherwise write to
/// disk, for callers that want to hand it straight to an agent. Accepts
/// `application/json` (default) or `application/yaml` / `application/x-yaml`
/// bodies, same as `POST /v1/recipe`.
pub async fn post_bundle(req: HttpRequest, body: web::Bytes, cfg: web::Data<ServerConfig>) -> Result<HttpResponse, ApiError> {
    let parsed: BundleRequest = parse_body(&req, &body)?;
    resolve_by_criteria(parsed.criteria, &cfg).await
}

/// `GET /v1/validate`: structural health check over the installed data
/// provider's recipes and registry, for readiness probes.
pub async fn get_validate() -> Result<HttpResponse, ApiError> {
    let store = cns_core::shared_store().map_err(ApiError::from)?;
    let mut defects = Vec::new();
    defects.extend(store.registry().validate());
    for name in store.names() {
        if let Err(e) = store.resolve_chain(name) {
            defects.push(e.to_string());
        }
    }
    if defects.is_empty() {
        Ok(HttpResponse::Ok().json(serde_json::json!({"clean": true})))
    } else {
        Err(ApiError::from(CnsError::invalid_request(format!("{} defect(s) found: {}", defects.len(), defects.join("; ")))))
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .route("/recipe", web::get().to(get_recipe))
            .route("/recipe", web::post().to(post_recipe))
            .route("/bundle", web::post().to(post_bundle))
            .route("/validate", web::get().to(get_validate)),
    );
}
