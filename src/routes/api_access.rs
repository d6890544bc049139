use actix_web::HttpResponse;
use serde_json::json;

pub async fn api_1() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": "Access granted for api-1" }))
}

pub async fn api_2() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": "Access granted for api-2" }))
}
