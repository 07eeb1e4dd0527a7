use std::collections::HashMap;
use std::time::Duration;

use clap::Parser;
use yawf::handler::Json;
use yawf::logging::{init_logging, LogConfig};
use yawf::request::{Headers, PathParams};
use yawf::runtime_config::RuntimeConfig;
use yawf::{handlers, Response, Routes, Server, UrlParam};

#[derive(Parser)]
#[command(name = "yawf-demo")]
#[command(about = "Demo server for the yawf dispatch core", long_about = None)]
struct Cli {
    /// Listen address; defaults to YAWF_HOST_ENV_NAME:YAWF_PORT_ENV_NAME
    #[arg(long)]
    addr: Option<String>,

    /// Graceful shutdown delay in milliseconds
    #[arg(long)]
    graceful_delay_ms: Option<u64>,
}

fn get_item(params: PathParams) -> (u16, HashMap<String, String>) {
    let mut body = HashMap::new();
    body.insert(
        "id".to_string(),
        params.get("id").unwrap_or_default().to_string(),
    );
    (200, body)
}

/// Rejects API calls without an `x-api-key` header.
fn require_api_key(headers: Headers, res: Response) {
    if headers.get("x-api-key").is_none() {
        res.write_header(401);
        res.write_str("missing x-api-key\n");
    }
}

fn list_users() -> Json<serde_json::Value> {
    Json(serde_json::json!([{ "id": "1", "name": "ada" }]))
}

fn user_link(routes: Routes, params: PathParams) -> anyhow::Result<String> {
    let id = params.get("id").unwrap_or_default();
    Ok(routes.url_for("user", &[UrlParam::from(id)])?)
}

#[cfg(unix)]
fn install_signal_handler(shutdown: yawf::ShutdownHandle) -> anyhow::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::info!(signal, "Shutdown signal received");
            shutdown.stop();
        }
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;

    let config = RuntimeConfig::from_env();
    may::config().set_stack_size(config.stack_size);

    let mut server = Server::new();
    server.set_address(cli.addr.unwrap_or(config.address));
    server.set_graceful_delay(
        cli.graceful_delay_ms
            .map_or(config.graceful_delay, Duration::from_millis),
    );
    server.use_boxed(yawf::middleware::request_logger());

    server.get("/ping", handlers![|| "pong\n"])?;
    server.get("/items/:id", handlers![get_item])?;
    server.group(
        "/api",
        |api| {
            api.get("/users", handlers![list_users])?;
            api.get("/users/:id", handlers![user_link])?.set_name("user");
            Ok(())
        },
        handlers![require_api_key],
    )?;

    #[cfg(unix)]
    install_signal_handler(server.shutdown_handle())?;

    server.listen()?;
    server.run()?;
    Ok(())
}
