use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, TransactionManager};
use tracing::{debug, error};

use super::UnitOfWorkInternal;
use crate::errors::RepoError;

type PooledConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Hands out one unit of work per logical request, each owning one pooled
/// connection for its whole lifetime.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    conn_pool: Pool<AsyncPgConnection>,
}

impl UnitOfWorkFactory {
    pub fn new(conn_pool: Pool<AsyncPgConnection>) -> Self {
        Self { conn_pool }
    }

    pub async fn create_uow(&self) -> Result<UnitOfWork, RepoError> {
        let conn = self.conn_pool.get().await.map_err(RepoError::Pool)?;
        Ok(UnitOfWork::new(conn))
    }
}

/// Identifier slot for a staged insert. Stays empty until the owning unit
/// of work commits; after a failed or abandoned save it never fills.
#[derive(Clone, Debug, Default)]
pub struct PendingId(Arc<OnceLock<i32>>);

impl PendingId {
    pub fn get(&self) -> Option<i32> {
        self.0.get().copied()
    }

    fn fill(&self, id: i32) {
        let _ = self.0.set(id);
    }
}

/// Outcome of applying one staged change inside the save transaction.
pub(super) struct Applied {
    pub rows: usize,
    pub assigned_id: Option<(PendingId, i32)>,
}

impl Applied {
    pub fn rows(rows: usize) -> Self {
        Self {
            rows,
            assigned_id: None,
        }
    }
}

/// One staged mutation. Repositories box these into the unit of work's
/// buffer; `save` replays them in staging order inside one transaction.
#[async_trait]
pub(super) trait StagedChange: Send + Sync {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError>;
}

/// Transactional scope for one logical request. Owns the connection and the
/// single staged-change buffer shared by every repository used with it;
/// dropping it without `save` abandons the staged changes and returns the
/// connection to the pool.
pub struct UnitOfWork {
    conn: PooledConn,
    staged: Vec<Box<dyn StagedChange>>,
}

impl UnitOfWork {
    fn new(conn: PooledConn) -> Self {
        Self {
            conn,
            staged: Vec::new(),
        }
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Applies every staged change in staging order inside one transaction
    /// and returns the total number of affected rows. Any failure rolls the
    /// whole batch back; the unit of work should then be discarded and the
    /// attempt repeated with a fresh one. No retry happens here.
    pub async fn save(&mut self) -> Result<usize, RepoError> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(0);
        }

        AnsiTransactionManager::begin_transaction(self.get_conn())
            .await
            .map_err(|e| RepoError::storage("unit_of_work", "begin", e))?;

        let mut applied = Vec::with_capacity(staged.len());
        for change in &staged {
            match change.apply(self.get_conn()).await {
                Ok(outcome) => applied.push(outcome),
                Err(err) => {
                    if let Err(rollback_err) =
                        AnsiTransactionManager::rollback_transaction(self.get_conn()).await
                    {
                        error!(error = %rollback_err, "rollback after failed save also failed");
                    }
                    return Err(err);
                }
            }
        }

        AnsiTransactionManager::commit_transaction(self.get_conn())
            .await
            .map_err(|e| RepoError::on_write("unit_of_work", "commit", e))?;

        // Assigned ids become observable only once the commit is durable.
        let mut rows = 0;
        for outcome in applied {
            rows += outcome.rows;
            if let Some((slot, id)) = outcome.assigned_id {
                slot.fill(id);
            }
        }
        debug!(rows, changes = staged.len(), "unit of work committed");
        Ok(rows)
    }
}

impl UnitOfWorkInternal for UnitOfWork {
    fn get_conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }

    fn stage(&mut self, change: Box<dyn StagedChange>) {
        self.staged.push(change);
    }
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;
    use diesel_async::pooled_connection::deadpool::Pool;
    use diesel_async::pooled_connection::AsyncDieselConnectionManager;
    use diesel_async::RunQueryDsl;
    use dotenvy::dotenv;
    use rstest::{fixture, rstest};
    use serial_test::serial;
    use std::{env, process::Command};
    use tokio::runtime::{Builder, Runtime};

    use super::super::{CountriesRepo, HotelsRepo, Repository};
    use super::*;
    use crate::dtos::countries::CountryCreateDTO;
    use crate::dtos::hotels::HotelCreateDTO;

    // Same fixture pattern as the repository tests: sync tests drive a
    // current-thread runtime so cleanup can run in Drop.
    struct WithCleanup<ValT> {
        pub closure: Box<dyn FnMut() -> ()>,
        pub _val: ValT,
    }

    impl<ValT> Drop for WithCleanup<ValT> {
        fn drop(&mut self) {
            (*self.closure)();
        }
    }

    #[fixture]
    fn runtime() -> Runtime {
        Builder::new_current_thread().enable_all().build().unwrap()
    }

    #[fixture]
    fn migrations() -> WithCleanup<()> {
        Command::new("diesel")
            .arg("migration")
            .arg("run")
            .arg("--locked-schema")
            .output()
            .expect("Error setting up diesel");

        WithCleanup {
            _val: (),
            closure: Box::new(|| {
                Command::new("diesel")
                    .arg("migration")
                    .arg("revert")
                    .arg("--locked-schema")
                    .arg("--all")
                    .output()
                    .expect("Error reverting migrations");
            }),
        }
    }

    #[fixture]
    fn uow_factory(runtime: Runtime) -> (UnitOfWorkFactory, Runtime) {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DB URL must be set");
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config).build().unwrap();

        (UnitOfWorkFactory::new(pool), runtime)
    }

    fn table_counts(runtime: &Runtime, factory: &UnitOfWorkFactory) -> (i64, i64) {
        use crate::adapters::postgres::schema::{countries, hotels};

        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        let country_count: i64 = runtime
            .block_on(countries::table.count().get_result(uow.get_conn()))
            .unwrap();
        let hotel_count: i64 = runtime
            .block_on(hotels::table.count().get_result(uow.get_conn()))
            .unwrap();
        (country_count, hotel_count)
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_save_with_nothing_staged_is_a_noop(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        assert_eq!(uow.staged_len(), 0);
        assert_eq!(runtime.block_on(uow.save()).unwrap(), 0);
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_pending_id_is_empty_until_save(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        let pending = CountriesRepo::insert(
            &CountryCreateDTO {
                name: "Testland".to_string(),
                short_name: "TL".to_string(),
            },
            &mut uow,
        );
        assert_eq!(pending.get(), None);
        runtime.block_on(uow.save()).unwrap();
        assert!(pending.get().is_some());
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_failed_save_rolls_back_both_entity_types(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let (countries_before, hotels_before) = table_counts(&runtime, &factory);

        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        let pending = CountriesRepo::insert(
            &CountryCreateDTO {
                name: "Rollbackia".to_string(),
                short_name: "RB".to_string(),
            },
            &mut uow,
        );
        // FK violation: no such country id.
        HotelsRepo::insert(
            &HotelCreateDTO {
                name: "Ghost Hotel".to_string(),
                address: "Nowhere".to_string(),
                rating: 3.0,
                country_id: 999_999,
            },
            &mut uow,
        );
        let result = runtime.block_on(uow.save());
        assert!(result.is_err());
        assert_eq!(pending.get(), None);

        let (countries_after, hotels_after) = table_counts(&runtime, &factory);
        assert_eq!(countries_before, countries_after);
        assert_eq!(hotels_before, hotels_after);
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_staged_changes_apply_in_order_within_one_commit(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        let pending = CountriesRepo::insert(
            &CountryCreateDTO {
                name: "Orderland".to_string(),
                short_name: "OL".to_string(),
            },
            &mut uow,
        );
        assert_eq!(uow.staged_len(), 1);
        let rows = runtime.block_on(uow.save()).unwrap();
        assert_eq!(rows, 1);

        // The same unit of work can stage a follow-up batch that depends on
        // the first commit.
        let country_id = pending.get().unwrap();
        HotelsRepo::insert(
            &HotelCreateDTO {
                name: "Order Inn".to_string(),
                address: "First Street".to_string(),
                rating: 4.0,
                country_id,
            },
            &mut uow,
        );
        CountriesRepo::delete(country_id, &mut uow);
        // Hotel insert references the country being deleted in the same
        // batch; staging order applies the insert first, so the delete hits
        // the FK restriction and the whole batch rolls back.
        assert!(runtime.block_on(uow.save()).is_err());

        let (_, hotels_after) = table_counts(&runtime, &factory);
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        CountriesRepo::delete(country_id, &mut uow);
        runtime.block_on(uow.save()).unwrap();
        let (_, hotels_final) = table_counts(&runtime, &factory);
        assert_eq!(hotels_after, hotels_final);
    }
}
