#![allow(dead_code)]

use nawth::config::DatabaseConfig;
use nawth::db::{ConnectionManager, MIGRATIONS, MigrationRunner, Repositories};
use nawth_schema::{Category, NewCategory, NewService, NewUser, Service, User};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Unique file in the system temp dir.
pub fn temp_path(tag: &str, ext: &str) -> PathBuf {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    std::env::temp_dir().join(format!("nawth_{tag}_{unique}.{ext}"))
}

pub async fn remove_sqlite_files(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
    let _ = tokio::fs::remove_file(path.with_extension("sqlite-wal")).await;
    let _ = tokio::fs::remove_file(path.with_extension("sqlite-shm")).await;
    let _ = tokio::fs::remove_file(format!("{}-wal", path.display())).await;
    let _ = tokio::fs::remove_file(format!("{}-shm", path.display())).await;
}

pub struct Fixture {
    pub name: &'static str,
    pub repos: Repositories,
    path: Option<PathBuf>,
}

impl Fixture {
    pub async fn sqlite(tag: &str) -> Self {
        let path = temp_path(tag, "sqlite");
        let cfg = DatabaseConfig::sqlite(format!("sqlite:{}", path.display()));
        Self::open("sqlite", cfg, Some(path)).await
    }

    pub async fn document() -> Self {
        Self::open("document", DatabaseConfig::document(None), None).await
    }

    /// One fixture per backend.
    pub async fn all(tag: &str) -> Vec<Self> {
        vec![Self::sqlite(tag).await, Self::document().await]
    }

    async fn open(name: &'static str, cfg: DatabaseConfig, path: Option<PathBuf>) -> Self {
        let db = Arc::new(ConnectionManager::from_config(&cfg));
        let backend = db.handle().await.unwrap();
        let report = MigrationRunner::new(backend.as_ref()).run(MIGRATIONS).await;
        assert!(report.is_clean(), "{name}: migrations failed: {:?}", report.failed);
        Self {
            name,
            repos: Repositories::new(db),
            path,
        }
    }

    pub async fn cleanup(self) {
        self.repos.db.disconnect().await;
        if let Some(path) = &self.path {
            remove_sqlite_files(path).await;
        }
    }
}

pub fn new_user(n: u32) -> NewUser {
    NewUser {
        email: format!("user{n}@example.com"),
        username: format!("user{n}"),
        password_hash: "argon2$hash".to_string(),
        first_name: "Test".to_string(),
        last_name: format!("User{n}"),
        ..Default::default()
    }
}

pub async fn seed_user(repos: &Repositories, n: u32) -> User {
    repos.users.create(new_user(n)).await.unwrap()
}

pub async fn seed_category(repos: &Repositories, slug: &str) -> Category {
    repos
        .categories
        .create(NewCategory {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            is_active: true,
            ..Default::default()
        })
        .await
        .unwrap()
}

pub async fn seed_service(
    repos: &Repositories,
    category: &Category,
    provider: &User,
    title: &str,
    price: f64,
) -> Service {
    repos
        .services
        .create(NewService {
            title: title.to_string(),
            description: format!("{title} delivered fast"),
            price,
            duration: 3,
            category_id: category.id.clone(),
            provider_id: provider.id.clone(),
            is_active: true,
            ..Default::default()
        })
        .await
        .unwrap()
}
