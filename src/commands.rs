use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{Config, read_api_key};
use crate::pipeline::Pipeline;
use crate::session::{SessionStore, spawn_idle_sweeper};
use crate::web::{AppState, router};

/// Start the web UI and serve until interrupted
#[inline]
pub async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
        .validate()
        .context("Invalid server configuration")?;

    let pipeline = Arc::new(Pipeline::from_config(&config));
    let sessions = Arc::new(SessionStore::new(config.upload_dir()));
    let app = router(
        AppState::new(pipeline, Arc::clone(&sessions)),
        config.server.max_upload_bytes(),
    );

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    let sweeper = spawn_idle_sweeper(Arc::clone(&sessions), config.server.session_idle());

    info!(
        "Serving on http://{} (uploads in {}, sessions expire after {} idle minutes)",
        listener.local_addr()?,
        sessions.upload_dir().display(),
        config.server.session_idle_minutes
    );
    eprintln!(
        "{} http://{}",
        style("📚 IDontReadPDFs is running at").bold().green(),
        listener.local_addr()?
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed");
    sweeper.abort();
    served?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Index one PDF and answer a single question about it
#[inline]
pub async fn ask_once(
    config: Config,
    pdf: &Path,
    question: &str,
    show_sources: bool,
) -> Result<()> {
    if read_api_key(config.api_key_env()).is_none() {
        warn!(
            "{} is not set; the {} API will reject requests",
            config.api_key_env(),
            config.provider
        );
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Let me think...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let pdf = pdf.to_path_buf();
    let question = question.to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::from_config(&config);
        let document = pipeline.ingest_file(&pdf)?;
        let answer = pipeline.ask(&document, &question)?;
        Ok::<_, crate::AppError>((document, answer))
    })
    .await
    .context("Question task panicked")?;

    spinner.finish_and_clear();
    let (document, answer) = outcome?;

    println!(
        "{}",
        style(format!(
            "Indexed {} pages into {} chunks",
            document.page_count,
            document.chunk_count()
        ))
        .dim()
    );
    println!();
    println!("{}", style("🤖 Answer:").bold().cyan());
    println!("{}", answer.text);

    if show_sources {
        println!();
        println!("{}", style(format!("Sources ({}):", answer.sources.len())).bold());
        for source in &answer.sources {
            println!(
                "{} {}",
                style(format!(
                    "[page {} · chunk {} · distance {:.4}]",
                    source.chunk.page + 1,
                    source.chunk.chunk_index,
                    source.distance
                ))
                .yellow(),
                source.chunk.content.trim()
            );
        }
    }

    Ok(())
}
