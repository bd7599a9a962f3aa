use anyhow::Result;
use lego_core::LegoConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LegoConfig::from_env().snapshot();

    let host = config
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config
        .get_string("http.port")
        .unwrap_or_else(|| "3030".to_string());

    let app = lego_axum::build(config)?;

    let addr = format!("{host}:{port}");
    tracing::info!("listening on http://{addr}");

    app.listen(addr).await?;

    Ok(())
}
