#[tokio::main]
async fn main() -> anyhow::Result<()> {
    circular_context_lib::run().await
}
