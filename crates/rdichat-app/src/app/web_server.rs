use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::app::AppConfig;
use crate::cli::Cli;
use crate::web::server::{WebServer, WebServerConfig};

/// Run the web server
pub async fn run_web_server(cli: &Cli, config: AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", cli.web_bind, cli.web_port).parse()?;

    println!("🌐 Starting rdichat web server...");
    println!("   Address: {}", addr);

    let server = WebServer::new(WebServerConfig {
        bind_addr: addr,
        app: Arc::new(config),
    });
    server.start().await
}
