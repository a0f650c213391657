mod error;
mod handlers;
pub mod middleware;
mod response;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::db::Database;
use crate::generator::ContentGenerator;
use crate::materializer::{Materializer, DEFAULT_GENERATION_TIMEOUT};

pub use error::ApiError;
pub use middleware::{AuthError, AuthUser, SecurityConfig, TokenVerifier};
pub use response::ApiResponse;

/// Shared handler state. Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub generator: Arc<dyn ContentGenerator>,
    pub materializer: Arc<Materializer<Database>>,
    pub security: SecurityConfig,
    pub generation_timeout: Duration,
}

impl AppState {
    pub fn new(db: Database, generator: Arc<dyn ContentGenerator>) -> Self {
        let materializer = Arc::new(Materializer::new(db.clone(), generator.clone()));
        Self {
            db,
            generator,
            materializer,
            security: SecurityConfig::disabled(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Bound both outline and lesson generation calls.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self.materializer = Arc::new(
            Materializer::new(self.db.clone(), self.generator.clone()).with_timeout(timeout),
        );
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let courses = Router::new()
        .route("/generate", post(handlers::generate_course))
        .route("/my-courses", get(handlers::list_my_courses))
        .route("/{id}", get(handlers::get_course))
        .route_layer(from_fn_with_state(
            state.security.clone(),
            middleware::require_auth,
        ));

    let lessons = Router::new().route("/{id}", get(handlers::get_lesson));

    let api = Router::new()
        .nest("/courses", courses)
        .nest("/lessons", lessons)
        .route("/health", get(handlers::health));

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(state.security.cors_layer());

    Router::new()
        .nest("/api", api)
        .layer(layers)
        .with_state(state)
}
