use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::super::specifications::{CompType, UsersSpecification};
use super::includes::NoInclude;
use super::repo_trait::Repository;
use super::unit_of_work::{Applied, PendingId, StagedChange, UnitOfWork};
use super::UnitOfWorkInternal;
use crate::adapters::postgres::models::{NewUserModel, UserChangeset, UserModel};
use crate::adapters::postgres::schema::users;
use crate::dtos::paging::{Listing, PageRequest, PagedResult};
use crate::dtos::users::{UserCreateDTO, UserDBDTO};
use crate::errors::RepoError;

const ENTITY: &str = "user";

pub struct UsersRepo {}

fn filtered(spec: Option<&UsersSpecification>) -> users::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = users::table.into_boxed();
    if let Some(spec) = spec {
        query = match spec {
            UsersSpecification::Id(comp) => match comp {
                CompType::Equals(v) => query.filter(users::id.eq(*v)),
                CompType::Gte(v) => query.filter(users::id.ge(*v)),
                CompType::Lte(v) => query.filter(users::id.le(*v)),
                CompType::Lt(v) => query.filter(users::id.lt(*v)),
                CompType::Gt(v) => query.filter(users::id.gt(*v)),
            },
            UsersSpecification::Email(comp) => match comp {
                CompType::Equals(v) => query.filter(users::email.eq(v.clone())),
                CompType::Gte(v) => query.filter(users::email.ge(v.clone())),
                CompType::Lte(v) => query.filter(users::email.le(v.clone())),
                CompType::Lt(v) => query.filter(users::email.lt(v.clone())),
                CompType::Gt(v) => query.filter(users::email.gt(v.clone())),
            },
        };
    }
    query
}

impl Repository for UsersRepo {
    type CreateDto = UserCreateDTO;
    type Dto = UserDBDTO;
    type Spec = UsersSpecification;
    type Include = NoInclude;

    const ENTITY: &'static str = ENTITY;

    async fn get_all(
        page: Option<&PageRequest>,
        _includes: &[NoInclude],
        uow: &mut UnitOfWork,
    ) -> Result<Listing<UserDBDTO>, RepoError> {
        match page {
            Some(page) => {
                let total: i64 = filtered(None)
                    .count()
                    .get_result(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all count", e))?;
                let rows: Vec<UserModel> = filtered(None)
                    .order(users::id.asc())
                    .offset(page.offset())
                    .limit(page.limit())
                    .select(UserModel::as_select())
                    .load(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all", e))?;
                let items = rows.into_iter().map(UserModel::into_dto).collect();
                Ok(Listing::Page(PagedResult::new(items, total, page)))
            }
            None => {
                let rows: Vec<UserModel> = filtered(None)
                    .order(users::id.asc())
                    .select(UserModel::as_select())
                    .load(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all", e))?;
                Ok(Listing::Full(rows.into_iter().map(UserModel::into_dto).collect()))
            }
        }
    }

    async fn get_one_by(
        spec: UsersSpecification,
        _includes: &[NoInclude],
        uow: &mut UnitOfWork,
    ) -> Result<Option<UserDBDTO>, RepoError> {
        let row: Option<UserModel> = filtered(Some(&spec))
            .order(users::id.asc())
            .select(UserModel::as_select())
            .first(uow.get_conn())
            .await
            .optional()
            .map_err(|e| RepoError::storage(ENTITY, "get_one_by", e))?;
        Ok(row.map(UserModel::into_dto))
    }

    async fn get_count(
        spec: Option<&UsersSpecification>,
        uow: &mut UnitOfWork,
    ) -> Result<i64, RepoError> {
        filtered(spec)
            .count()
            .get_result(uow.get_conn())
            .await
            .map_err(|e| RepoError::storage(ENTITY, "get_count", e))
    }

    fn insert(dto: &UserCreateDTO, uow: &mut UnitOfWork) -> PendingId {
        let id_slot = PendingId::default();
        uow.stage(Box::new(InsertUser {
            row: NewUserModel::from_dto(dto),
            id_slot: id_slot.clone(),
        }));
        id_slot
    }

    fn update(dto: &UserDBDTO, uow: &mut UnitOfWork) {
        uow.stage(Box::new(UpdateUser {
            id: dto.id,
            changeset: UserChangeset {
                email: dto.email.clone(),
                first_name: dto.first_name.clone(),
                last_name: dto.last_name.clone(),
                roles: dto.roles.clone(),
            },
        }));
    }

    fn delete(id: i32, uow: &mut UnitOfWork) {
        uow.stage(Box::new(DeleteUser { id }));
    }
}

struct InsertUser {
    row: NewUserModel,
    id_slot: PendingId,
}

#[async_trait]
impl StagedChange for InsertUser {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let id = diesel::insert_into(users::table)
            .values(&self.row)
            .returning(users::id)
            .get_result::<i32>(conn)
            .await
            .map_err(|e| RepoError::on_write(ENTITY, "insert", e))?;
        Ok(Applied {
            rows: 1,
            assigned_id: Some((self.id_slot.clone(), id)),
        })
    }
}

struct UpdateUser {
    id: i32,
    changeset: UserChangeset,
}

#[async_trait]
impl StagedChange for UpdateUser {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let rows = diesel::update(users::table.find(self.id))
            .set(&self.changeset)
            .execute(conn)
            .await
            .map_err(|e| RepoError::on_write(ENTITY, "update", e))?;
        Ok(Applied::rows(rows))
    }
}

struct DeleteUser {
    id: i32,
}

#[async_trait]
impl StagedChange for DeleteUser {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let rows = diesel::delete(users::table.find(self.id))
            .execute(conn)
            .await
            .map_err(|e| RepoError::storage(ENTITY, "delete", e))?;
        if rows == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                id: self.id,
            });
        }
        Ok(Applied::rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::super::unit_of_work::UnitOfWorkFactory;

    use super::*;
    use diesel_async::pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager};
    use dotenvy::dotenv;
    use rstest::{fixture, rstest};
    use serial_test::serial;
    use std::{env, process::Command};
    use tokio::runtime::{Builder, Runtime};

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
        let config =
            AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config).build().unwrap();

        (UnitOfWorkFactory::new(pool), runtime)
    }

    fn john() -> UserCreateDTO {
        UserCreateDTO {
            email: "john@mail.com".to_string(),
            hashed_pwd: "$2b$not-a-real-hash".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            roles: vec!["User".to_string()],
        }
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_get_user_by_email_should_none(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        let user = runtime
            .block_on(UsersRepo::get_one_by(
                UsersSpecification::Email(CompType::Equals("nobody@mail.com".to_string())),
                &[],
                &mut uow,
            ))
            .unwrap();
        assert_eq!(user, None);
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_create_user_then_find_by_email(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        let pending = UsersRepo::insert(&john(), &mut uow);
        runtime.block_on(uow.save()).unwrap();
        let id = pending.get().unwrap();

        let user = runtime
            .block_on(UsersRepo::get_one_by(
                UsersSpecification::Email(CompType::Equals("john@mail.com".to_string())),
                &[],
                &mut uow,
            ))
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.first_name, "John");
        assert_eq!(user.roles, vec!["User".to_string()]);
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_duplicate_email_is_a_conflict(
        _migrations: WithCleanup<()>,
        uow_factory: (UnitOfWorkFactory, Runtime),
    ) {
        let (factory, runtime) = uow_factory;
        let mut uow = runtime.block_on(factory.create_uow()).unwrap();
        UsersRepo::insert(&john(), &mut uow);
        runtime.block_on(uow.save()).unwrap();

        UsersRepo::insert(&john(), &mut uow);
        let err = runtime.block_on(uow.save()).unwrap_err();
        assert!(matches!(err, RepoError::Conflict { entity: "user", .. }));
    }
}
