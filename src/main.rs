use log::error;
use timetable_solver::server;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = std::env::var("TIMETABLE_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    if let Err(e) = server::run_server(&addr).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
