#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use project_scheduler::{
        Organization, ScheduleMetadata, SchedulerConfig, WorkCalendar, http_api,
    };
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr: SocketAddr = std::env::var("PROJECT_SCHEDULER_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let config = SchedulerConfig::from_env()?;

    let mut org = Organization::new("Default").with_config(config);
    let calendar = org.add_calendar(WorkCalendar::default());
    let project = org.create_project(ScheduleMetadata::named("New Project").with_calendar(calendar));

    println!("project-scheduler HTTP API listening on http://{addr}");
    http_api::serve(addr, http_api::AppState::new(org, project)).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
