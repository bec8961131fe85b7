use axum::routing::{delete, get, post};
use axum::Router;
use hyper::header;
use tower_http::cors::{Any, CorsLayer};

use super::envelope::ApiError;
use super::identity::SANDBOX_ID_HEADER;
use super::{exec, files, lifecycle, middleware, mounts, session, AppState};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(vec![
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(SANDBOX_ID_HEADER),
        ]);

    Router::new()
        .route(
            "/lifecycle",
            post(lifecycle::create_sandbox)
                .delete(lifecycle::destroy_sandbox)
                .fallback(method_not_allowed),
        )
        .route("/exec", post(exec::exec).fallback(method_not_allowed))
        .route(
            "/session",
            post(session::create_session)
                .get(session::get_session)
                .delete(session::delete_session)
                .fallback(method_not_allowed),
        )
        .route(
            "/session/exec",
            post(exec::session_exec).fallback(method_not_allowed),
        )
        .route(
            "/session/env",
            post(session::set_session_env).fallback(method_not_allowed),
        )
        .route(
            "/files/write",
            post(files::write_file).fallback(method_not_allowed),
        )
        .route(
            "/files/read",
            get(files::read_file_get)
                .post(files::read_file_post)
                .fallback(method_not_allowed),
        )
        .route(
            "/files/delete",
            delete(files::delete_file_delete)
                .post(files::delete_file_post)
                .fallback(method_not_allowed),
        )
        .route(
            "/files/mkdir",
            post(files::make_dir).fallback(method_not_allowed),
        )
        .route(
            "/files/rename",
            post(files::rename_path).fallback(method_not_allowed),
        )
        .route(
            "/files/move",
            post(files::move_path).fallback(method_not_allowed),
        )
        .route(
            "/files/exists",
            get(files::path_exists_get)
                .post(files::path_exists_post)
                .fallback(method_not_allowed),
        )
        .route(
            "/mount-bucket",
            post(mounts::mount_bucket).fallback(method_not_allowed),
        )
        .route(
            "/unmount-bucket",
            delete(mounts::unmount_bucket_delete)
                .post(mounts::unmount_bucket_post)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::strip_trailing_slash))
        .layer(axum::middleware::from_fn(
            middleware::enrich_current_span_middleware,
        ))
}

async fn not_found(req: axum::extract::Request) -> ApiError {
    tracing::warn!("unhandled path: {}", req.uri());
    ApiError::not_found("Not Found")
}

/// Known path, wrong verb.
async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
