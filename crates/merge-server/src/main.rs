use clap::Parser;
use merge_server::{app, AppState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "merge-server", about = "Demo merge service guarded by a keyed admission gate")]
struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// How long a simulated merge holds its branch, in seconds.
    #[arg(long, default_value_t = 10)]
    merge_duration_secs: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("merge_server=info,branch_gate=debug,tower_http=info")
        }))
        .init();

    let state = AppState::new(Duration::from_secs(args.merge_duration_secs));

    let listener = TcpListener::bind(args.addr).await.expect("bind error");

    tracing::info!("Listening on http://{}", args.addr);
    tracing::info!("Try it:");
    tracing::info!("  curl http://{}/public/test", args.addr);
    tracing::info!(
        "  curl -X POST http://{}/merge -H 'content-type: application/json' -d '{{\"branch_name\":\"main\"}}'",
        args.addr
    );

    axum::serve(listener, app(state).into_make_service())
        .await
        .expect("server error");
}
