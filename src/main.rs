#[tokio::main]
async fn main() {
    if let Err(err) = sshgate::mcp::server::run_stdio().await {
        eprintln!("sshgate: {}", err);
        std::process::exit(1);
    }
}
