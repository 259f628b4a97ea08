use actix_web::{web, HttpResponse};

use super::auth::AuthUser;
use super::error::validate;
use super::AppState;
use crate::core::MatchError;
use crate::models::{
    DistanceResponse, GeoPoint, LocationRequest, MessageResponse, NearbyQuery, NearbyResponse,
    NearbyUser, PublicProfile, ReportReason, ReportRequest,
};

/// Configure block, report and location routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users/block/{id}", web::post().to(block_user))
        .route("/users/block/{id}", web::delete().to(unblock_user))
        .route("/users/report/{id}", web::post().to(report_user))
        .route("/users/location", web::put().to(update_location))
        .route("/users/nearby", web::get().to(nearby_users))
        .route("/users/distance/{id}", web::get().to(distance_to_user));
}

/// POST /api/v1/users/block/{id}
async fn block_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    state.engine.lifecycle.block(user.id(), &path).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("User blocked successfully")))
}

/// DELETE /api/v1/users/block/{id}
async fn unblock_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    state.engine.lifecycle.unblock(user.id(), &path).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("User unblocked successfully")))
}

/// POST /api/v1/users/report/{id}
async fn report_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
    req: web::Json<ReportRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;
    let reason: ReportReason = req.reason.parse()?;

    state.engine.lifecycle.report(user.id(), &path, reason).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("User reported successfully")))
}

/// PUT /api/v1/users/location
async fn update_location(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<LocationRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;
    let req = req.into_inner();

    let location = state
        .engine
        .location
        .update_location(
            user.id(),
            GeoPoint::new(req.longitude, req.latitude),
            req.city,
            req.country,
        )
        .await?;

    Ok(HttpResponse::Ok().json(location))
}

/// GET /api/v1/users/nearby?distance=25&page=1&limit=20
async fn nearby_users(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, MatchError> {
    validate(&*query)?;
    let limit = state.discovery.page_size(query.limit);

    let entries = state
        .engine
        .location
        .nearby(user.id(), query.distance, query.page, limit)
        .await?;

    let users: Vec<NearbyUser> = entries
        .iter()
        .map(|entry| NearbyUser {
            profile: PublicProfile::from(&entry.profile),
            distance: entry.distance,
        })
        .collect();

    Ok(HttpResponse::Ok().json(NearbyResponse {
        total: users.len(),
        users,
    }))
}

/// GET /api/v1/users/distance/{id}
async fn distance_to_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    let other_id = path.into_inner();
    let distance = state
        .engine
        .location
        .distance_between(user.id(), &other_id)
        .await?;

    Ok(HttpResponse::Ok().json(DistanceResponse {
        user_id: other_id,
        distance,
        unit: "miles".to_string(),
    }))
}
