#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wad_server::run().await
}
