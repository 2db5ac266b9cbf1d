#[tokio::main]
async fn main() {
    if let Err(e) = hidden_danang_be::start_server().await {
        tracing::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
