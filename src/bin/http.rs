#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use timetable_tool::{FileKeyValueStore, InMemoryCatalog, Timetable, WeekGrid, WeekGridConfig, http_api};
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("TIMETABLE_TOOL_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let catalog = match std::env::var("TIMETABLE_TOOL_CATALOG") {
        Ok(path) => serde_json::from_str::<InMemoryCatalog>(&std::fs::read_to_string(&path)?)?,
        Err(_) => InMemoryCatalog::new(),
    };
    let mut timetable = Timetable::new(catalog);

    if let Ok(path) = std::env::var("TIMETABLE_TOOL_GRID") {
        let config: WeekGridConfig = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        timetable.set_grid(WeekGrid::from_config(&config)?)?;
        tracing::info!(path = %path, "loaded week grid");
    }

    if let Ok(dir) = std::env::var("TIMETABLE_TOOL_DATA_DIR") {
        timetable = timetable.with_backend(FileKeyValueStore::new(&dir)?)?;
        tracing::info!(dir = %dir, entries = timetable.entries().len(), "attached data directory");
    }

    println!("timetable-tool HTTP API listening on http://{addr}");
    http_api::serve(addr, timetable).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
