#[tokio::main]
async fn main() {
    if let Err(e) = pollcast::start_server().await {
        eprintln!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}
