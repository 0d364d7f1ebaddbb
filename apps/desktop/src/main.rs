#[tokio::main]
async fn main() -> anyhow::Result<()> {
    s3deck_desktop::run().await
}
