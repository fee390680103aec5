use dotenvy::dotenv;
use session_client::config::get_configuration;
use session_client::observability::init_tracing;
use session_client::storage;
use session_client::{SessionEvent, SessionManager};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let telemetry = &configuration.telemetry;
    init_tracing(
        &telemetry.service_name,
        &telemetry.log_level,
        telemetry.otlp_endpoint.as_deref(),
    )?;

    let store = storage::from_settings(&configuration.storage);
    let session = Arc::new(SessionManager::new(configuration.client.clone(), store)?);

    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::NoOrganization(notice)) => {
                    warn!(
                        error_code = %notice.error_code,
                        action = %notice.action_required,
                        "{}", notice.message
                    );
                }
                Ok(SessionEvent::LoginRequired { reason }) => {
                    warn!(reason = %reason, "Sign in required")
                }
                Ok(event) => info!(?event, "Session event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Session events dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if session.restore().await? {
        info!("Using stored session");
    } else if let Some(login) = &configuration.login {
        session.login(&login.email, &login.password).await?;
    } else {
        anyhow::bail!("No stored session and no login credentials configured");
    }

    if let Some(login) = &configuration.login {
        if let Some(organization_id) = login.organization_id {
            session.switch_organization(organization_id).await?;
        }
        if let Some(workspace_id) = login.workspace_id {
            session.switch_workspace(workspace_id).await?;
        }
    }

    let context = session.tenant_context().await;
    info!(
        organization_id = ?context.as_ref().map(|c| c.organization_id),
        workspace_id = ?context.as_ref().and_then(|c| c.workspace_id),
        "Active tenant context"
    );

    let permissions = session.permissions().await;
    println!("{}", serde_json::to_string_pretty(&permissions)?);

    Ok(())
}
