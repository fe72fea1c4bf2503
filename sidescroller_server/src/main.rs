#[tokio::main]
async fn main() -> std::io::Result<()> {
    sidescroller_server::run_with_config().await
}
