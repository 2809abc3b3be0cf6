use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_api_key;
use super::handlers::{chat, contacts, dispatch, health, listen, message, moments, wechat};
use super::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        // WeChat lifecycle
        .route("/wechat/initialize", post(wechat::initialize))
        .route("/wechat/status", get(wechat::status))
        // Chats
        .route("/chat/open", post(chat::open_chat))
        // Messages
        .route("/message/send", post(message::send_message))
        .route("/message/send-typing", post(message::send_typing_text))
        .route("/message/send-file", post(message::send_file))
        .route("/message/get-next-new", get(message::get_next_new_message))
        // Listen targets
        .route("/message/listen/add", post(listen::add_listen_chat))
        .route("/message/listen/get", get(listen::get_listen_messages))
        .route("/message/listen/remove", post(listen::remove_listen_chat))
        // Contacts
        .route("/contacts/friends", get(contacts::get_friends))
        .route("/contacts/groups", get(contacts::get_groups))
        // Moments
        .route("/moments/open", post(moments::open_moments))
        .route("/moments/get-moments", get(moments::get_moments))
        .route("/moments/save-images", post(moments::save_images))
        .route("/moments/like", post(moments::like_moment))
        // Raw operation dispatch
        .route("/dispatch/:operation", post(dispatch::dispatch_operation))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
