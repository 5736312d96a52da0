use equiploan::config::{load as config_load, validate as config_validate};
use equiploan::evidence::EvidenceResolver;
use equiploan::loans::LoanService;
use equiploan::overdue_poller::OverduePoller;
use equiploan::probe::HttpProbe;
use equiploan::storage::SupabaseStorage;
use equiploan::store::SupabaseStore;
use equiploan::web;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_load();

    if let Err(err) = config_validate(&config) {
        eprintln!("Configuration error: {err}");
        std::process::exit(1);
    }

    info!(
        backend_config = ?config.backend.sanitized_for_log(),
        probe_timeout = config.evidence.probe_timeout_seconds,
        "Effective configuration loaded"
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_signal = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Ctrl-C received, shutting down gracefully");
        running_signal.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    info!(
        sweep_interval = config.sweep.check_interval_seconds,
        port = config.web.port,
        "equiploan starting"
    );

    let sweep_store = SupabaseStore::new(&config.backend);
    let overdue_poller =
        OverduePoller::new(config.sweep, Box::new(sweep_store), Arc::clone(&running));
    let sweep_handle = std::thread::Builder::new()
        .name("overdue-poller".into())
        .spawn(move || overdue_poller.run())
        .expect("Failed to spawn overdue poller thread");

    let resolver = EvidenceResolver::new(
        Box::new(SupabaseStorage::new(&config.backend)),
        Box::new(HttpProbe::new(Duration::from_secs(
            config.evidence.probe_timeout_seconds,
        ))),
    );
    let service = Arc::new(LoanService::new(
        Box::new(SupabaseStore::new(&config.backend)),
        resolver,
    ));

    web::start(service, config.web.port, Arc::clone(&running));

    if let Err(err) = sweep_handle.join() {
        error!("Overdue poller thread panicked: {:?}", err);
        std::process::exit(1);
    }

    info!("equiploan stopped");
}
