//! Video composition worker binary.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vclip_queue::JobRegistry;
use vclip_transcribe::{SidecarConfig, SidecarManager};
use vclip_worker::{Orchestrator, WorkerConfig, WorkerPool};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vclip=info".parse().unwrap()))
        .init();

    info!("starting vclip-worker");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let registry = Arc::new(JobRegistry::new(config.job_queue_size));

    let sidecar_config = SidecarConfig {
        binary_path: config.transcription_binary_path.clone(),
        startup_timeout: config.transcription_startup_timeout,
        idle_timeout: config.transcription_idle_timeout,
        request_timeout: config.transcription_request_timeout,
        restart_max_attempts: config.transcription_restart_max_attempts,
    };
    let sidecar = Arc::new(SidecarManager::new(sidecar_config));
    let idle_watcher = sidecar.spawn_idle_watcher();

    let orchestrator = Orchestrator::new(config.clone(), Arc::clone(&registry), Arc::clone(&sidecar));
    let pool = Arc::new(WorkerPool::new(config, registry, orchestrator));

    let shutdown_pool = Arc::clone(&pool);
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown_pool.shutdown();
    });

    pool.run().await;
    sidecar.stop().await;

    shutdown_handle.abort();
    idle_watcher.abort();
    info!("worker shutdown complete");
}
