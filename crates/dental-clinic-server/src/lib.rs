//! Dental clinic HTTP server.
//!
//! Exposes the stock collections as JSON REST resources plus a health
//! check:
//!
//! ```text
//! GET    /health
//! GET    /api/inventory/{implants,surgery,restorative}        newest first
//! POST   /api/inventory/{implants,surgery,restorative}        201 + item
//! PATCH  /api/inventory/{implants,surgery,restorative}/:id    changed fields only
//! DELETE /api/inventory/{implants,surgery,restorative}/:id    {"ok": true}
//! ```

pub mod config;
pub mod error;
pub mod handlers;

use axum::routing::{get, patch};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use dental_clinic_core::db::InventoryRecord;
use dental_clinic_core::validation::{ImplantInput, InventoryInput, RestorativeInput, SurgeryInput};
use dental_clinic_core::Clinic;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

/// Shared request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub clinic: Clinic,
}

impl AppState {
    pub fn new(clinic: Clinic) -> Self {
        Self { clinic }
    }
}

fn collection<I>(router: Router<AppState>, path: &str) -> Router<AppState>
where
    I: InventoryInput,
    I::Item: InventoryRecord + Serialize + Send + 'static,
{
    router
        .route(
            path,
            get(handlers::list_items::<I>).post(handlers::create_item::<I>),
        )
        .route(
            &format!("{}/:id", path),
            patch(handlers::update_item::<I>).delete(handlers::delete_item::<I>),
        )
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(handlers::health));
    app = collection::<ImplantInput>(app, "/api/inventory/implants");
    app = collection::<SurgeryInput>(app, "/api/inventory/surgery");
    app = collection::<RestorativeInput>(app, "/api/inventory/restorative");

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
