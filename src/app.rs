//! Application bootstrap shared by the server binary and the CLI.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_db::Database;
use bookshelf_kernel::{
    settings::{Settings, StoreBackend},
    InitCtx, ModuleRegistry,
};

use crate::modules::{
    self,
    books::{BookStore, CatalogService, InMemoryBookStore, SqliteBookStore},
};

/// A fully wired application: store opened, schema migrated, modules
/// registered and initialized.
pub struct App {
    settings: Settings,
    registry: ModuleRegistry,
    catalog: CatalogService,
    migrations_applied: usize,
}

impl App {
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let (store, database): (Arc<dyn BookStore>, Option<Database>) =
            match settings.database.backend {
                StoreBackend::Memory => (Arc::new(InMemoryBookStore::new()), None),
                StoreBackend::Sqlite => {
                    let db = Database::open(&settings.database.path).with_context(|| {
                        format!(
                            "failed to open database at {}",
                            settings.database.path.display()
                        )
                    })?;
                    (Arc::new(SqliteBookStore::new(db.clone())), Some(db))
                }
            };

        let catalog = CatalogService::new(store);
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, catalog.clone());

        let migrations_applied = match &database {
            Some(db) => db
                .run_migrations(&registry.collect_migrations())
                .context("failed to run migrations")?,
            None => 0,
        };

        let ctx = InitCtx {
            settings: &settings,
        };
        registry.init_modules(&ctx).await?;

        tracing::info!(
            env = ?settings.environment,
            backend = ?settings.database.backend,
            modules = registry.module_count(),
            migrations_applied,
            "bookshelf bootstrap complete"
        );

        Ok(Self {
            settings,
            registry,
            catalog,
            migrations_applied,
        })
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The full HTTP surface: every module mounted with the middleware stack
    pub fn router(&self) -> axum::Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Number of migrations this bootstrap applied
    pub fn migrations_applied(&self) -> usize {
        self.migrations_applied
    }

    /// Start modules, serve HTTP until shutdown, then stop modules
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.start_modules(&ctx).await?;

        let served = bookshelf_http::start_server(&self.registry, &self.settings).await;

        self.registry.stop_modules().await?;
        served
    }
}
