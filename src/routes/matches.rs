use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::validate;
use super::AppState;
use crate::core::MatchError;
use crate::models::{
    DiscoverResponse, DiscoveryItem, LikesResponse, MatchSummary, MatchesResponse,
    MessageResponse, PageQuery, PublicProfile, ReceivedLike, SwipeAction, SwipeRequest,
    SwipeResponse,
};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches/discover", web::get().to(discover))
        .route("/matches/swipe", web::post().to(swipe))
        .route("/matches/likes", web::get().to(likes_received))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/{id}", web::delete().to(unmatch));
}

/// Discovery feed
///
/// GET /api/v1/matches/discover?page=1&limit=10
async fn discover(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, MatchError> {
    validate(&*query)?;
    let limit = state.discovery.page_size(query.limit);

    let entries = state
        .engine
        .feed
        .discover(user.id(), query.page, limit)
        .await?;

    Ok(HttpResponse::Ok().json(DiscoverResponse {
        profiles: entries
            .iter()
            .map(|entry| DiscoveryItem {
                profile: PublicProfile::from(&entry.profile),
                compatibility: entry.compatibility,
            })
            .collect(),
        page: query.page,
    }))
}

/// Record a swipe
///
/// POST /api/v1/matches/swipe
///
/// Request body:
/// ```json
/// { "userId": "string", "action": "like" | "dislike" | "superlike" }
/// ```
async fn swipe(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<SwipeRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;
    let action: SwipeAction = req.action.parse()?;

    let outcome = state
        .engine
        .swipes
        .swipe(user.id(), &req.user_id, action)
        .await?;

    Ok(HttpResponse::Ok().json(SwipeResponse {
        matched: outcome.matched,
        new_match: outcome
            .new_match
            .as_ref()
            .map(|m| MatchSummary::for_viewer(m, user.id())),
    }))
}

/// Active matches, newest first
///
/// GET /api/v1/matches?page=1&limit=10
async fn list_matches(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, MatchError> {
    validate(&*query)?;
    let limit = state.discovery.page_size(query.limit);

    let matches = state
        .engine
        .lifecycle
        .list_matches(user.id(), query.page, limit)
        .await?;

    Ok(HttpResponse::Ok().json(MatchesResponse {
        matches: matches
            .iter()
            .map(|m| MatchSummary::for_viewer(m, user.id()))
            .collect(),
        page: query.page,
    }))
}

/// GET /api/v1/matches/likes
async fn likes_received(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, MatchError> {
    let likes = state.engine.swipes.likes_received(user.id()).await?;

    Ok(HttpResponse::Ok().json(LikesResponse {
        likes: likes.iter().map(ReceivedLike::from).collect(),
    }))
}

/// DELETE /api/v1/matches/{id}
async fn unmatch(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, MatchError> {
    let match_id = Uuid::parse_str(&path)
        .map_err(|_| MatchError::NotFound("Match not found".to_string()))?;

    state.engine.lifecycle.unmatch(match_id, user.id()).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::ok("Unmatched successfully")))
}
