use mock_server::MockOrigin;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let origin = match std::env::var("ANSWERS") {
        Ok(path) => {
            let script = std::fs::read_to_string(&path)?;
            tracing::info!(%path, "loading scripted answers");
            MockOrigin::from_script(&script)?
        }
        Err(_) => MockOrigin::new(),
    };

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    mock_server::run(listener, origin).await?;
    Ok(())
}
