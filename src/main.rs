use std::env;
use std::net::SocketAddr;

use trackhq::server;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let bind: SocketAddr = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], server::DEFAULT_PORT)));

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    if let Err(e) = rt.block_on(server::run(bind)) {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}
