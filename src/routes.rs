use super::{controllers, middleware, models};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put, Router},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[rustfmt::skip]
pub fn get_routes() -> Router<models::AppState> {
    let api = Router::new()
        .route("/health", get(controllers::health))
        .route("/test", get(controllers::test_route))
        .route("/auth/register", post(controllers::register))
        .route("/auth/login", post(controllers::login))
        .route("/notes", get(controllers::list_notes))
        .route("/notes", post(controllers::create_note))
        .route("/notes/:id", put(controllers::update_note))
        .route("/notes/:id", delete(controllers::delete_note));

    Router::new()
        .route("/", get(controllers::root))
        .nest("/api", api)
        .fallback(controllers::not_found)
}

pub fn app(state: models::AppState) -> Router {
    get_routes()
        .layer(from_fn_with_state(state.clone(), middleware::error_detail))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
