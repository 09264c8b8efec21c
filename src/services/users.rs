use crate::adapters::postgres::{
    repositories::{Repository, UnitOfWorkFactory, UsersRepo},
    specifications::{CompType, UsersSpecification},
};
use crate::dtos::users::{UserCreateDTO, UserDBDTO, UserOutDTO, UserRegisterDTO};
use crate::errors::RepoError;

const ENTITY: &str = "user";
const DEFAULT_ROLE: &str = "User";

#[derive(Clone)]
pub struct UsersService {
    uow_factory: UnitOfWorkFactory,
}

impl UsersService {
    pub fn new(uow_factory: UnitOfWorkFactory) -> Self {
        Self { uow_factory }
    }

    /// Hashes the password and stores the user. Callers never see the hash.
    pub async fn register(&self, dto: &UserRegisterDTO) -> Result<UserOutDTO, RepoError> {
        let hashed_pwd =
            pwhash::bcrypt::hash(&dto.password).map_err(RepoError::PasswordHash)?;
        let roles = if dto.roles.is_empty() {
            vec![DEFAULT_ROLE.to_string()]
        } else {
            dto.roles.clone()
        };
        let create = UserCreateDTO {
            email: dto.email.clone(),
            hashed_pwd,
            first_name: dto.first_name.clone(),
            last_name: dto.last_name.clone(),
            roles,
        };

        let mut uow = self.uow_factory.create_uow().await?;
        let pending = UsersRepo::insert(&create, &mut uow);
        uow.save().await?;
        let id = pending
            .get()
            .ok_or(RepoError::MissingAssignedId { entity: ENTITY })?;
        let stored = UsersRepo::get_one_by(
            UsersSpecification::Id(CompType::Equals(id)),
            &[],
            &mut uow,
        )
        .await?
        .ok_or(RepoError::NotFound { entity: ENTITY, id })?;
        Ok(UserOutDTO::from(stored))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserDBDTO>, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        UsersRepo::get_one_by(
            UsersSpecification::Email(CompType::Equals(email.to_string())),
            &[],
            &mut uow,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
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
    fn users_service(runtime: Runtime) -> (UsersService, Runtime) {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DB URL must be set");
        let config =
            AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config).build().unwrap();

        (UsersService::new(UnitOfWorkFactory::new(pool)), runtime)
    }

    fn register_dto(email: &str) -> UserRegisterDTO {
        UserRegisterDTO {
            email: email.to_string(),
            password: "hunter22".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Traveller".to_string(),
            roles: vec![],
        }
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_register_assigns_default_role_and_hashes(
        _migrations: WithCleanup<()>,
        users_service: (UsersService, Runtime),
    ) {
        let (service, runtime) = users_service;

        let out = runtime
            .block_on(service.register(&register_dto("jo@example.com")))
            .unwrap();
        assert_eq!(out.roles, vec!["User".to_string()]);

        let stored = runtime
            .block_on(service.find_by_email("jo@example.com"))
            .unwrap()
            .unwrap();
        assert_ne!(stored.hashed_pwd, "hunter22");
        assert!(pwhash::bcrypt::verify("hunter22", &stored.hashed_pwd));
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_register_duplicate_email_conflicts(
        _migrations: WithCleanup<()>,
        users_service: (UsersService, Runtime),
    ) {
        let (service, runtime) = users_service;

        runtime
            .block_on(service.register(&register_dto("dup@example.com")))
            .unwrap();
        let err = runtime
            .block_on(service.register(&register_dto("dup@example.com")))
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict { .. }));
    }
}
