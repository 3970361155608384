//! Back-office API binary.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    multas_backoffice_api::init_tracing();
    multas_backoffice_api::run().await
}
