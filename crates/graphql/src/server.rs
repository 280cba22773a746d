//! GraphQL HTTP server.

use std::future::Future;
use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{Pos, Response};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tracing::{debug, info};

use quizhub_core::error::ServiceError;
use quizhub_core::metrics::RequestTimer;
use quizhub_core::ports::IdentityProvider;

use crate::error::into_gql;
use crate::types::QuizhubSchema;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
        }
    }
}

#[derive(Clone)]
struct AppState {
    schema: QuizhubSchema,
    identity: Arc<dyn IdentityProvider>,
}

/// Build the HTTP router: `/graphql`, `/health` and optionally the playground at `/`.
pub fn router(
    schema: QuizhubSchema,
    identity: Arc<dyn IdentityProvider>,
    enable_playground: bool,
) -> Router {
    let mut app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .with_state(AppState { schema, identity });

    if enable_playground {
        app = app.route("/", get(graphql_playground));
    }
    app
}

/// Start the GraphQL server with graceful shutdown support.
pub async fn serve_with_shutdown<F>(
    schema: QuizhubSchema,
    identity: Arc<dyn IdentityProvider>,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(schema, identity, config.enable_playground);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("⚡ GraphQL server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// GraphQL query handler.
///
/// Resolves the bearer token into an identity before executing the request.
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let _timer = RequestTimer::new();
    execute(&state, bearer_token(&headers), req.into_inner())
        .await
        .into()
}

/// Resolve the requester, then run the request as that identity.
///
/// When the session store cannot be read the request is not executed.
async fn execute(
    state: &AppState,
    bearer: Option<&str>,
    request: async_graphql::Request,
) -> Response {
    let identity = match state.identity.resolve(bearer).await {
        Ok(identity) => identity,
        Err(e) => {
            let err = into_gql(ServiceError::Storage(e));
            return Response::from_errors(vec![err.into_server_error(Pos::default())]);
        }
    };
    debug!(authenticated = identity.user_id().is_some(), "Executing GraphQL request");

    state.schema.execute(request.data(identity)).await
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
