mod host;
mod hw;
mod store;
mod timesrc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
