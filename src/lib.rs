//! Libris application library
//!
//! Wires the book records module onto the kernel, database, and HTTP crates.

pub mod modules;

use anyhow::Context;
use axum::Router;
use libris_db::Database;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// A bootstrapped service: database open, migrations applied, modules
/// initialized.
///
/// The database pool is acquired in [`Application::bootstrap`] and released
/// exactly once, by [`Application::serve`] or [`Application::shutdown`].
pub struct Application {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl Application {
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database)
            .await
            .context("failed to open database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db)?;
        registry.run_migrations(&db).await?;

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_modules(&ctx).await?;

        tracing::info!(
            env = ?settings.environment,
            modules = registry.module_count(),
            "libris bootstrap complete"
        );

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The full HTTP router, middleware included.
    pub fn router(&self) -> Router {
        libris_http::build_router(&self.registry, &self.settings)
    }

    /// Serve until Ctrl-C or SIGTERM, then stop modules and close the pool.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.db,
        };
        let served = match self.registry.start_modules(&ctx).await {
            Ok(()) => {
                libris_http::start_server(
                    &self.registry,
                    &self.settings,
                    libris_http::shutdown_signal(),
                )
                .await
            }
            Err(e) => Err(e),
        };

        self.shutdown().await?;
        served
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        let stopped = self.registry.stop_modules().await;
        self.db.close().await;
        stopped
    }
}
