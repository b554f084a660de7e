use std::sync::Arc;

use axum::Router;
use axum::routing::{get_service, post_service};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    AppState, Home, Login, LoginPost, LogoutPost, NotFound, Signup, SignupPost, SnippetCreate,
    SnippetCreatePost, SnippetView,
};

pub(crate) fn routes(state: Arc<AppState>) -> Router {
    let pipeline = &state.pipeline;
    let dynamic = pipeline.dynamic_chain();
    let protected = pipeline.protected_chain();

    Router::new()
        // unprotected
        .route("/", get_service(dynamic.then(Home(state.clone()))))
        .route(
            "/snippet/view/{id}",
            get_service(dynamic.then(SnippetView(state.clone()))),
        )
        .route(
            "/user/signup",
            get_service(dynamic.then(Signup))
                .post_service(dynamic.then(SignupPost(state.clone()))),
        )
        .route(
            "/user/login",
            get_service(dynamic.then(Login)).post_service(dynamic.then(LoginPost(state.clone()))),
        )
        // protected
        .route(
            "/snippet/create",
            get_service(protected.then(SnippetCreate))
                .post_service(protected.then(SnippetCreatePost(state.clone()))),
        )
        .route(
            "/user/logout",
            post_service(protected.then(LogoutPost(state.clone()))),
        )
        .fallback_service(pipeline.standard_chain().then(NotFound))
        .layer(TraceLayer::new_for_http())
}
