//! Pooled database connection

use crate::config::Settings;
use di::Ref;
use di::inject;
use di::injectable;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Global pool override for tests. The `more-di` framework constructs
/// `DatabaseConnection` itself, so integration tests park their in-memory
/// pool here instead of injecting it.
static TEST_POOL: Mutex<Option<AnyPool>> = Mutex::new(None);

pub struct DatabaseConnection {
    connection: AnyPool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> DatabaseConnection {
        if let Some(pool) = TEST_POOL.lock().unwrap().clone() {
            return DatabaseConnection { connection: pool };
        }

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&settings.database.url())
            .expect("Cannot connect to database");

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    pub fn set_test_pool(pool: AnyPool) {
        *TEST_POOL.lock().unwrap() = Some(pool);
    }

    pub fn clear_test_pool() {
        *TEST_POOL.lock().unwrap() = None;
    }
}

impl Deref for DatabaseConnection {
    type Target = AnyPool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
