use crate::config::Config;
use crate::emailer::Emailer;
use crate::gateway::{EmailTemplateData, FormResponse, GatewayEngine, RequestMeta};
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

struct AppState {
    engine: GatewayEngine,
    emailer: Arc<Emailer>,
}

/// The HTTP front of the gateway. Configuration is loaded once and shared
/// immutably; requests never mutate it.
pub struct Server {
    config: Arc<Config>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Server {
            config: Arc::new(config),
        }
    }

    pub fn router(&self) -> anyhow::Result<Router> {
        let path = &self.config.server.path;
        if !path.starts_with('/') {
            anyhow::bail!("server path {path:?} must start with '/'");
        }
        let emailer = Emailer::new(self.config.clone())?;
        let state = Arc::new(AppState {
            engine: GatewayEngine::new(self.config.clone()),
            emailer: Arc::new(emailer),
        });
        Ok(Router::new()
            .route(path, post(gateway_handler))
            .layer(CorsLayer::permissive())
            .with_state(state))
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let router = self.router()?;
        log::info!(
            "gateway listening on http://{addr}{}",
            self.config.server.path
        );
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

/// One request, start to finish: decode, validate, answer, and only then
/// hand the email work to a detached task. The response on the wire never
/// depends on anything downstream of it.
async fn gateway_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut fields = GatewayEngine::parse_fields(&body);
    let response = state.engine.scrub_fields(&mut fields);

    if response.valid {
        let meta = RequestMeta {
            remote_ip: remote.ip().to_string(),
            x_forwarded_for: header_value(&headers, "x-forwarded-for"),
            user_agent: header_value(&headers, header::USER_AGENT.as_str()),
        };
        let data = EmailTemplateData::new(&fields, meta);
        let emailer = state.emailer.clone();
        // Fire and forget: no return channel to the request. Failures are a
        // server-side fault and go to the log only.
        tokio::spawn(async move {
            if let Err(e) = emailer.send(&data).await {
                log::error!("failed to send gateway emails: {e:#}");
            }
        });
    }

    write_response(&response)
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Always HTTP 200: the client reads the `Valid` field of the body, not the
/// status code. Validation failures are a payload concern, not a transport
/// one.
fn write_response(fr: &FormResponse) -> Response {
    match serde_json::to_vec(fr) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("could not serialize form response: {e}");
            StatusCode::OK.into_response()
        }
    }
}
