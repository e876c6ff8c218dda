use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use fileshelf::config::LogConfig;
use fileshelf::{router, AppState, Cli, Shelf};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 解析命令行与配置文件
    let config = Cli::parse().into_config()?;
    let _log_guard = init_logging(&config.log)?;

    // 2. 打开存储目录
    let shelf = Shelf::open(&config.root, &config.data_dir)
        .with_context(|| format!("cannot open storage root {}", config.root.display()))?;
    let state = AppState::new(shelf, config.lang);
    let app = router(state, config.upload_limit);

    // 3. 启动服务器
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    info!("Server running on http://{}", config.bind);
    if let Some(local_ip) = get_local_ip() {
        info!("Access files at: http://{}:{}", local_ip, config.bind.port());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_logging(log: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            log.filter
                .as_deref()
                .unwrap_or("fileshelf=info,tower_http=info,axum::rejection=trace"),
        )
    });

    let console = if log.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file_layer, guard) = match &log.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "fileshelf.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

// 获取本地IP地址
fn get_local_ip() -> Option<String> {
    use std::net::{IpAddr, Ipv4Addr};

    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?; // 80主要是防止防火墙拦截

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ipv4) if !ipv4.is_loopback() && ipv4 != Ipv4Addr::UNSPECIFIED => {
            Some(ipv4.to_string())
        }
        _ => None,
    }
}
