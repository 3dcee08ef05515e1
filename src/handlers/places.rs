// src/handlers/places.rs
// DOCUMENTATION: HTTP handlers for public place lookups
// PURPOSE: Parse requests, call the finder, return responses

use crate::config::Config;
use crate::db::PlaceStore;
use crate::errors::PlacesError;
use crate::models::{Category, Coordinates, NearbyResult, NearestQuery, ServiceSearchQuery};
use crate::services::{summary, ClientRateLimiter, NearestPlaceFinder, PlaceService};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use std::sync::Arc;

/// Identify the caller for rate limiting
/// DOCUMENTATION: The chat front end forwards the Telegram user id in
/// X-User-Id; direct callers are keyed by peer address.
fn caller_key(req: &HttpRequest) -> String {
    req.headers()
        .get("X-User-Id")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| format!("user:{}", id))
        .or_else(|| req.peer_addr().map(|addr| format!("ip:{}", addr.ip())))
        .unwrap_or_else(|| "anonymous".to_string())
}

fn throttle(req: &HttpRequest, limiter: &ClientRateLimiter) -> Result<(), PlacesError> {
    limiter.check(&caller_key(req))
}

async fn lookup(
    finder: &NearestPlaceFinder,
    config: &Config,
    category: &str,
    query: NearestQuery,
) -> Result<(Category, Vec<NearbyResult>), PlacesError> {
    let category: Category = category.parse()?;
    let location = Coordinates::new(query.lat, query.lon);
    let max_results = query.limit.unwrap_or(config.default_max_results);

    let results = finder
        .find_nearest(location, category, max_results, query.radius_km)
        .await?;
    Ok((category, results))
}

/// GET /places/{category}/nearest
/// Closest places to a shared location
pub async fn nearest_places(
    finder: web::Data<Arc<NearestPlaceFinder>>,
    limiter: web::Data<Arc<ClientRateLimiter>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<NearestQuery>,
) -> Result<impl Responder, PlacesError> {
    throttle(&req, &limiter)?;

    let (category, results) = lookup(&finder, &config, &path, query.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "category": category,
        "count": results.len(),
        "results": results,
    })))
}

/// GET /places/{category}/nearest/summary
/// Same lookup rendered as the text message the bot sends
pub async fn nearest_summary(
    finder: web::Data<Arc<NearestPlaceFinder>>,
    limiter: web::Data<Arc<ClientRateLimiter>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<NearestQuery>,
) -> Result<impl Responder, PlacesError> {
    throttle(&req, &limiter)?;

    let (category, results) = lookup(&finder, &config, &path, query.into_inner()).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(summary::render(category, &results)))
}

/// GET /places/{category}/handles/{place_id}
/// Re-fetch a result from an earlier lookup ("show pin")
pub async fn cached_result(
    finder: web::Data<Arc<NearestPlaceFinder>>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, PlacesError> {
    let (category, place_id) = path.into_inner();
    let category: Category = category.parse()?;

    let result = finder.cached(category, &place_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /places/{category}/search?service=
/// Places offering a given service
pub async fn search_by_service(
    store: web::Data<Arc<dyn PlaceStore>>,
    limiter: web::Data<Arc<ClientRateLimiter>>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ServiceSearchQuery>,
) -> Result<impl Responder, PlacesError> {
    throttle(&req, &limiter)?;

    let category: Category = path.into_inner().parse()?;
    let places =
        PlaceService::search_by_service(store.get_ref().as_ref(), category, &query.service).await?;

    Ok(HttpResponse::Ok().json(json!({
        "category": category,
        "count": places.len(),
        "places": places,
    })))
}

/// Configuration for place routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/places")
            .route("/{category}/nearest", web::get().to(nearest_places))
            .route("/{category}/nearest/summary", web::get().to(nearest_summary))
            .route("/{category}/handles/{place_id}", web::get().to(cached_result))
            .route("/{category}/search", web::get().to(search_by_service)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryPlaceStore;
    use crate::models::Place;
    use crate::services::ResultCache;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;
    use std::time::Duration;

    async fn seeded_store() -> Arc<dyn PlaceStore> {
        let store = MemoryPlaceStore::new();
        let mut a = Place::new("a", "Usta A", 41.3111, 69.2406);
        a.services.insert("Razval".to_string());
        store.upsert(Category::Autoservice, &a).await.unwrap();
        store
            .upsert(Category::Autoservice, &Place::new("b", "Usta B", 41.2995, 69.2401))
            .await
            .unwrap();
        Arc::new(store)
    }

    macro_rules! app {
        ($store:expr, $rate:expr) => {{
            let store: Arc<dyn PlaceStore> = $store;
            let cache = Arc::new(ResultCache::new(Duration::from_secs(60), 100));
            let finder = Arc::new(NearestPlaceFinder::new(store.clone(), cache, 50.0));
            let limiter = Arc::new(ClientRateLimiter::new($rate));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(store))
                    .app_data(web::Data::new(finder))
                    .app_data(web::Data::new(limiter))
                    .app_data(web::Data::new(Config::sample()))
                    .configure(config),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_nearest_returns_sorted_results() {
        let app = app!(seeded_store().await, 100);

        let req = test::TestRequest::get()
            .uri("/places/autoservice/nearest?lat=41.3050&lon=69.2400&limit=2")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["category"], "autoservice");
        assert_eq!(body["count"], 2);
        let first = body["results"][0]["distance_km"].as_f64().unwrap();
        let second = body["results"][1]["distance_km"].as_f64().unwrap();
        assert!(first <= second);
    }

    #[actix_web::test]
    async fn test_nearest_rejects_bad_input() {
        let app = app!(seeded_store().await, 100);

        let req = test::TestRequest::get()
            .uri("/places/autoservice/nearest?lat=95.0&lon=69.24")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/places/restaurant/nearest?lat=41.3&lon=69.24")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_handle_lookup_after_search() {
        let app = app!(seeded_store().await, 100);

        let req = test::TestRequest::get()
            .uri("/places/autoservice/handles/a")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/places/autoservice/nearest?lat=41.3050&lon=69.2400&limit=2")
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/places/autoservice/handles/a")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["place_id"], "a");
        assert_eq!(
            body["map_link"],
            "https://maps.google.com/maps?q=41.3111,69.2406"
        );
    }

    #[actix_web::test]
    async fn test_summary_is_plain_text() {
        let app = app!(seeded_store().await, 100);

        let req = test::TestRequest::get()
            .uri("/places/carwash/nearest/summary?lat=41.3050&lon=69.2400")
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "Avtomoyka: hech qanday yaqin joy topilmadi");
    }

    #[actix_web::test]
    async fn test_search_by_service() {
        let app = app!(seeded_store().await, 100);

        let req = test::TestRequest::get()
            .uri("/places/autoservice/search?service=Razval")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["places"][0]["id"], "a");
    }

    #[actix_web::test]
    async fn test_rate_limit_per_user() {
        let app = app!(seeded_store().await, 1);

        let uri = "/places/autoservice/nearest?lat=41.3050&lon=69.2400";
        let first = test::TestRequest::get()
            .uri(uri)
            .insert_header(("X-User-Id", "42"))
            .to_request();
        assert_eq!(test::call_service(&app, first).await.status(), StatusCode::OK);

        let second = test::TestRequest::get()
            .uri(uri)
            .insert_header(("X-User-Id", "42"))
            .to_request();
        assert_eq!(
            test::call_service(&app, second).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let other = test::TestRequest::get()
            .uri(uri)
            .insert_header(("X-User-Id", "43"))
            .to_request();
        assert_eq!(test::call_service(&app, other).await.status(), StatusCode::OK);
    }
}
