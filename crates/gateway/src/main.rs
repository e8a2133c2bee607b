//! StudyHall API Gateway
//!
//! The single entry point for all client requests. Handles:
//! - Entity CRUD against the dual-mode store (remote or guest-local)
//! - The content-generation pipeline endpoints
//! - Billing checkout, portal, status, and webhook callbacks
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use studyhall_common::{
    ai::{ModelClient, OpenAiClient},
    auth::{AuthState, JwtManager},
    billing::BillingClient,
    config::AppConfig,
    db::{DbPool, Repository},
    local::LocalStore,
    metrics,
    storage::UploadStore,
    store::StudyStore,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: StudyStore,
    pub repo: Repository,
    pub ai: Arc<dyn ModelClient>,
    pub billing: Arc<BillingClient>,
    pub uploads: UploadStore,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> AuthState {
        state.auth.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    init_tracing(&config);

    info!("Starting StudyHall API Gateway v{}", studyhall_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }

    let config = Arc::new(config);

    // Initialize database connection and the dual-mode store
    let db = DbPool::new(&config.database).await?;
    let repo = Repository::new(db);
    let local = LocalStore::new(&config.local_store.data_dir);
    let store = StudyStore::new(repo.clone(), local);

    // Upstream clients
    let ai: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(config.ai.clone())?);
    let billing = Arc::new(BillingClient::new(config.billing.clone())?);

    // Auth state
    let jwt_secret = match config.auth.jwt_secret.clone() {
        Some(secret) => secret,
        None => {
            warn!("auth.jwt_secret not configured, using an insecure development secret");
            "studyhall-dev-secret".to_string()
        }
    };
    let auth = AuthState {
        jwt: Arc::new(JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs)),
        guest_header: config.auth.guest_header.clone(),
    };

    let state = AppState {
        config: config.clone(),
        store,
        repo,
        ai,
        billing,
        uploads: UploadStore::new(&config.local_store.uploads_dir),
        auth,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));

    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // Permissive CORS; OPTIONS preflights are answered by the layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut router = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Notes
        .route("/notes", get(handlers::notes::list_notes))
        .route("/notes", post(handlers::notes::create_note))
        .route("/notes/{id}", patch(handlers::notes::update_note))
        .route("/notes/{id}", delete(handlers::notes::delete_note))
        // Flashcards
        .route("/flashcards", get(handlers::flashcards::list_flashcards))
        .route("/flashcards", post(handlers::flashcards::create_flashcard))
        .route("/flashcards/{id}", patch(handlers::flashcards::update_flashcard))
        .route("/flashcards/{id}", delete(handlers::flashcards::delete_flashcard))
        // Quiz questions
        .route("/quiz-questions", get(handlers::quizzes::list_quiz_questions))
        .route("/quiz-questions", post(handlers::quizzes::create_quiz_question))
        .route("/quiz-questions/{id}", patch(handlers::quizzes::update_quiz_question))
        .route("/quiz-questions/{id}", delete(handlers::quizzes::delete_quiz_question))
        // Comics
        .route("/comics", get(handlers::comics::list_comics))
        .route("/comics", post(handlers::comics::create_comic))
        .route("/comics/{id}", patch(handlers::comics::update_comic))
        .route("/comics/{id}", delete(handlers::comics::delete_comic))
        // Exams
        .route("/exams", get(handlers::exams::list_exams))
        .route("/exams", post(handlers::exams::create_exam))
        .route("/exams/{id}", patch(handlers::exams::update_exam))
        .route("/exams/{id}", delete(handlers::exams::delete_exam))
        // Study sessions
        .route("/study-sessions", get(handlers::study_sessions::list_study_sessions))
        .route("/study-sessions", post(handlers::study_sessions::create_study_session))
        .route("/study-sessions/{id}", patch(handlers::study_sessions::update_study_session))
        .route("/study-sessions/{id}", delete(handlers::study_sessions::delete_study_session))
        // Profile (authenticated only)
        .route("/profile", get(handlers::profile::get_profile))
        .route("/profile", put(handlers::profile::update_profile))
        // Generation pipeline
        .route("/analyze-image", post(handlers::analyze::analyze_image))
        .route("/chat-ai", post(handlers::chat::chat_ai))
        .route("/generate-content", post(handlers::generate::generate_content))
        .route("/generate-comic-image", post(handlers::comic_image::generate_comic_image))
        .route("/generate-study-plan", post(handlers::study_plan::generate_study_plan))
        .route("/process-large-pdf", post(handlers::pdf_jobs::process_large_pdf))
        // Billing
        .route("/stripe-checkout/create-checkout", post(handlers::billing::create_checkout))
        .route("/stripe-checkout/customer-portal", post(handlers::billing::customer_portal))
        .route(
            "/stripe-checkout/subscription-status",
            post(handlers::billing::subscription_status),
        )
        .route("/stripe-webhook", post(handlers::webhook::stripe_webhook));

    // Rate limiting stays a stub unless explicitly enabled
    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        router = router.layer(axum::middleware::from_fn(
            move |req: axum::extract::Request, next: axum::middleware::Next| {
                let limiter = limiter.clone();
                async move {
                    middleware::rate_limit::rate_limit_middleware(req, next, limiter).await
                }
            },
        ));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
