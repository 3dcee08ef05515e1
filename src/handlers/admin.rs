// src/handlers/admin.rs
// DOCUMENTATION: Admin handlers for place management
// PURPOSE: Expose upsert/list/delete, exports and stats via REST endpoints

use crate::config::Config;
use crate::db::PlaceStore;
use crate::errors::PlacesError;
use crate::models::{Category, UpsertPlaceRequest};
use crate::services::{NearestPlaceFinder, PlaceService};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;

/// Helper function to verify admin authentication
/// DOCUMENTATION: Checks the X-Admin-Id header against ADMIN_IDS.
/// Missing or non-numeric id is 401, an id outside the list is 403.
fn verify_admin_id(req: &HttpRequest, config: &Config) -> Result<i64, PlacesError> {
    let admin_id = req
        .headers()
        .get("X-Admin-Id")
        .and_then(|h| h.to_str().ok())
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            log::warn!("Admin request without a valid X-Admin-Id");
            PlacesError::Unauthorized
        })?;

    if !config.admin_ids.contains(&admin_id) {
        log::warn!("Admin request from non-admin user {}", admin_id);
        return Err(PlacesError::Forbidden);
    }

    Ok(admin_id)
}

/// POST /admin/places/{category}
/// Create or replace a place
///
/// DOCUMENTATION: 201 when the id was new, 200 when an existing record
/// was replaced
pub async fn upsert_place(
    store: web::Data<Arc<dyn PlaceStore>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpsertPlaceRequest>,
) -> Result<impl Responder, PlacesError> {
    let admin_id = verify_admin_id(&req, &config)?;
    let category: Category = path.into_inner().parse()?;

    let (place, created) =
        PlaceService::upsert_place(store.get_ref().as_ref(), category, body.into_inner()).await?;

    log::info!(
        "Admin {} {} {} '{}'",
        admin_id,
        if created { "added" } else { "updated" },
        category,
        place.id
    );

    if created {
        Ok(HttpResponse::Created().json(place))
    } else {
        Ok(HttpResponse::Ok().json(place))
    }
}

/// GET /admin/places/{category}
pub async fn list_places(
    store: web::Data<Arc<dyn PlaceStore>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<impl Responder, PlacesError> {
    verify_admin_id(&req, &config)?;
    let category: Category = path.into_inner().parse()?;

    let places = PlaceService::list_places(store.get_ref().as_ref(), category).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "category": category,
        "count": places.len(),
        "places": places,
    })))
}

/// GET /admin/places/{category}/{id}
pub async fn get_place(
    store: web::Data<Arc<dyn PlaceStore>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, PlacesError> {
    verify_admin_id(&req, &config)?;
    let (category, id) = path.into_inner();
    let category: Category = category.parse()?;

    let place = PlaceService::get_place(store.get_ref().as_ref(), category, &id).await?;
    Ok(HttpResponse::Ok().json(place))
}

/// DELETE /admin/places/{category}/{id}
pub async fn delete_place(
    store: web::Data<Arc<dyn PlaceStore>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, PlacesError> {
    let admin_id = verify_admin_id(&req, &config)?;
    let (category, id) = path.into_inner();
    let category: Category = category.parse()?;

    PlaceService::delete_place(store.get_ref().as_ref(), category, &id).await?;
    log::info!("Admin {} deleted {} '{}'", admin_id, category, id);
    Ok(HttpResponse::NoContent().finish())
}

/// GET /admin/geojson/{category}
/// Export a category for map tools
pub async fn export_geojson(
    store: web::Data<Arc<dyn PlaceStore>>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<impl Responder, PlacesError> {
    verify_admin_id(&req, &config)?;
    let category: Category = path.into_inner().parse()?;

    let collection = PlaceService::geojson(store.get_ref().as_ref(), category).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(collection))
}

/// GET /admin/stats
/// Place counts and result cache usage
pub async fn stats(
    store: web::Data<Arc<dyn PlaceStore>>,
    finder: web::Data<Arc<NearestPlaceFinder>>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<impl Responder, PlacesError> {
    verify_admin_id(&req, &config)?;

    let places = PlaceService::stats(store.get_ref().as_ref()).await?;
    let cache = finder.cache().stats().await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "places": places,
        "result_cache": cache,
    })))
}

/// DELETE /admin/cache
/// Drop every cached nearby result
pub async fn clear_cache(
    finder: web::Data<Arc<NearestPlaceFinder>>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<impl Responder, PlacesError> {
    let admin_id = verify_admin_id(&req, &config)?;

    finder.cache().clear().await;
    log::info!("Admin {} cleared the result cache", admin_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Configuration for admin routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/places/{category}", web::post().to(upsert_place))
            .route("/places/{category}", web::get().to(list_places))
            .route("/places/{category}/{id}", web::get().to(get_place))
            .route("/places/{category}/{id}", web::delete().to(delete_place))
            .route("/geojson/{category}", web::get().to(export_geojson))
            .route("/stats", web::get().to(stats))
            .route("/cache", web::delete().to(clear_cache)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryPlaceStore;
    use crate::services::ResultCache;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use std::time::Duration;

    const ADMIN: (&str, &str) = ("X-Admin-Id", "1");

    macro_rules! app {
        () => {{
            let store: Arc<dyn PlaceStore> = Arc::new(MemoryPlaceStore::new());
            let cache = Arc::new(ResultCache::new(Duration::from_secs(60), 100));
            let finder = Arc::new(NearestPlaceFinder::new(store.clone(), cache, 50.0));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(store))
                    .app_data(web::Data::new(finder))
                    .app_data(web::Data::new(Config::sample()))
                    .configure(config),
            )
            .await
        }};
    }

    fn usta() -> Value {
        json!({
            "name": "Usta Servis",
            "lat": 41.3111,
            "lon": 69.2406,
            "phone": "901234567",
            "services": ["Razval"],
            "working_days": [0, "Seshanba"],
            "working_hours": "09:00-18:00"
        })
    }

    #[actix_web::test]
    async fn test_admin_id_required() {
        let app = app!();

        let req = test::TestRequest::get().uri("/admin/stats").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::get()
            .uri("/admin/stats")
            .insert_header(("X-Admin-Id", "not-a-number"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::get()
            .uri("/admin/stats")
            .insert_header(("X-Admin-Id", "999"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = test::TestRequest::get()
            .uri("/admin/stats")
            .insert_header(ADMIN)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_upsert_get_delete_cycle() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/admin/places/autoservice")
            .insert_header(ADMIN)
            .set_json(usta())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["id"], "autoservice_usta_servis");
        assert_eq!(created["phone"], "+998901234567");
        assert_eq!(created["working_days"], json!([0, 1]));

        let req = test::TestRequest::post()
            .uri("/admin/places/autoservice")
            .insert_header(ADMIN)
            .set_json(usta())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/admin/places/autoservice/autoservice_usta_servis")
            .insert_header(ADMIN)
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["name"], "Usta Servis");

        let req = test::TestRequest::delete()
            .uri("/admin/places/autoservice/autoservice_usta_servis")
            .insert_header(ADMIN)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );

        let req = test::TestRequest::get()
            .uri("/admin/places/autoservice/autoservice_usta_servis")
            .insert_header(ADMIN)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn test_upsert_rejects_invalid_payload() {
        let app = app!();

        let mut body = usta();
        body["lat"] = json!(120.0);
        let req = test::TestRequest::post()
            .uri("/admin/places/carwash")
            .insert_header(ADMIN)
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: Value = test::read_body_json(resp).await;
        assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn test_geojson_and_stats() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/admin/places/carwash")
            .insert_header(ADMIN)
            .set_json(usta())
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/admin/geojson/carwash")
            .insert_header(ADMIN)
            .to_request();
        let collection: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(
            collection["features"][0]["geometry"]["coordinates"],
            json!([69.2406, 41.3111])
        );

        let req = test::TestRequest::get()
            .uri("/admin/stats")
            .insert_header(ADMIN)
            .to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["places"]["total_places"], 1);
        assert_eq!(stats["places"]["places_by_category"]["carwash"], 1);
        assert_eq!(stats["result_cache"]["total_entries"], 0);

        let req = test::TestRequest::delete()
            .uri("/admin/cache")
            .insert_header(ADMIN)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );
    }

    #[actix_web::test]
    async fn test_place_with_reserved_looking_id_is_reachable() {
        let app = app!();

        let mut body = usta();
        body["id"] = json!("geojson");
        let req = test::TestRequest::post()
            .uri("/admin/places/carwash")
            .insert_header(ADMIN)
            .set_json(body)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        let req = test::TestRequest::get()
            .uri("/admin/places/carwash/geojson")
            .insert_header(ADMIN)
            .to_request();
        let place: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(place["id"], "geojson");
        assert_eq!(place["name"], "Usta Servis");

        let req = test::TestRequest::delete()
            .uri("/admin/places/carwash/geojson")
            .insert_header(ADMIN)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );
    }
}
