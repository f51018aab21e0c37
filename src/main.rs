#[tokio::main]
async fn main() -> anyhow::Result<()> {
    muster::app::run().await
}
