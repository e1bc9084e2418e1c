use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppConfig;
use crate::web::routes;

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
    pub app: Arc<AppConfig>,
}

/// Web server instance
pub struct WebServer {
    config: WebServerConfig,
}

impl WebServer {
    pub fn new(config: WebServerConfig) -> Self {
        Self { config }
    }

    /// Start the web server
    pub async fn start(self) -> Result<()> {
        let app_state = routes::AppState {
            app: Arc::clone(&self.config.app),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = routes::create_router(app_state)
            .layer(cors)
            .layer(TraceLayer::new_for_http());

        println!("🌐 Web server starting on http://{}", self.config.bind_addr);
        println!("   WebSocket endpoint: ws://{}/ws", self.config.bind_addr);
        println!("   API endpoint: http://{}/api/generate", self.config.bind_addr);
        tracing::info!(addr = %self.config.bind_addr, "web server listening");

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
