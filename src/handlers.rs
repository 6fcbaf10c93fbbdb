use actix_web::{delete, get, post, put, web, HttpResponse};
use log::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    CreateTweetRequest, LoginRequest, SignupRequest, UpdateTweetQuery, UpdateUserRequest,
};
use crate::services::AppState;

/// Register every route plus the extractor error handlers on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .service(web::scope("/auth").service(signup).service(login))
    .service(
        web::scope("/users")
            .service(list_users)
            .service(get_user)
            .service(update_user)
            .service(delete_user),
    )
    .service(
        web::scope("/tweets")
            .service(list_tweets)
            .service(post_tweet)
            .service(get_tweet)
            .service(update_tweet)
            .service(delete_tweet),
    );
}

#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.users.create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.auth.login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/")]
pub async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.users.list().await?))
}

#[get("/{user_id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.users.get(&user_id).await?))
}

#[put("/{user_id}/update")]
pub async fn update_user(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.users.update(&user_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/{user_id}/delete")]
pub async fn delete_user(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.users.delete(&user_id).await?))
}

#[get("/")]
pub async fn list_tweets(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.tweets.list().await?))
}

#[post("/post")]
pub async fn post_tweet(
    state: web::Data<AppState>,
    payload: web::Json<CreateTweetRequest>,
) -> Result<HttpResponse, ApiError> {
    let tweet = state.tweets.create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(tweet))
}

#[get("/{tweet_id}")]
pub async fn get_tweet(
    state: web::Data<AppState>,
    tweet_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = parse_tweet_id(&tweet_id)?;
    Ok(HttpResponse::Ok().json(state.tweets.get(tweet_id).await?))
}

#[put("/{tweet_id}/update")]
pub async fn update_tweet(
    state: web::Data<AppState>,
    tweet_id: web::Path<String>,
    query: web::Query<UpdateTweetQuery>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = parse_tweet_id(&tweet_id)?;
    let tweet = state.tweets.update(tweet_id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tweet))
}

#[delete("/{tweet_id}/delete")]
pub async fn delete_tweet(
    state: web::Data<AppState>,
    tweet_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let tweet_id = parse_tweet_id(&tweet_id)?;
    Ok(HttpResponse::Ok().json(state.tweets.delete(tweet_id).await?))
}

fn parse_tweet_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        debug!("Rejecting malformed tweet id {}", raw);
        ApiError::Validation(format!("invalid tweet id: {}", raw))
    })
}
