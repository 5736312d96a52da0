use crate::loans::LoanService;
use crate::reports;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{error, info};

type Service = Arc<LoanService>;

#[derive(Serialize)]
struct ReportsResponse {
    loans: reports::LoanReport,
    equipment: reports::EquipmentReport,
}

async fn api_loans(State(service): State<Service>) -> Response {
    match service.fetch_loans() {
        Ok(loans) => Json(loans).into_response(),
        Err(err) => {
            error!(error = %err, "Failed to query loans");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn api_equipment(State(service): State<Service>) -> Response {
    match service.fetch_equipment() {
        Ok(equipment) => Json(equipment).into_response(),
        Err(err) => {
            error!(error = %err, "Failed to query equipment");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn api_reports(State(service): State<Service>) -> Response {
    // Reports only count; skip the evidence URL refresh entirely.
    let loans = match service.fetch_loans_raw() {
        Ok(loans) => loans,
        Err(err) => {
            error!(error = %err, "Failed to query loans for reports");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let equipment = match service.fetch_equipment() {
        Ok(equipment) => equipment,
        Err(err) => {
            error!(error = %err, "Failed to query equipment for reports");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Json(ReportsResponse {
        loans: reports::loan_report(&loans),
        equipment: reports::equipment_report(&equipment),
    })
    .into_response()
}

pub fn start(service: Arc<LoanService>, port: u16, running: Arc<AtomicBool>) {
    let app = Router::new()
        .route("/api/loans", get(api_loans))
        .route("/api/equipment", get(api_equipment))
        .route("/api/reports", get(api_reports))
        .with_state(service);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime for web server");

    rt.block_on(async {
        let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
            Ok(l) => l,
            Err(err) => {
                error!(error = %err, port, "Web server failed to bind");
                return;
            }
        };

        info!(port, "Web server listening");

        let shutdown = async move {
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
            info!("Web server shutting down");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .expect("Web server error");
    });
}
