//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use dental_clinic_core::{Clinic, ClinicResult};

#[derive(Debug, Clone, Parser)]
#[command(name = "dental-clinic-server", version, about = "Dental clinic HTTP server")]
pub struct ServerConfig {
    /// SQLite database file, created if missing
    #[arg(long, env = "DENTAL_DATABASE_PATH", default_value = "dental-clinic.db")]
    pub database_path: PathBuf,

    #[arg(long, env = "DENTAL_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, env = "DENTAL_LOG", default_value = "info")]
    pub log_filter: String,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long)]
    pub in_memory: bool,
}

impl ServerConfig {
    pub fn open_clinic(&self) -> ClinicResult<Clinic> {
        if self.in_memory {
            Clinic::open_in_memory()
        } else {
            Clinic::open(&self.database_path)
        }
    }
}
