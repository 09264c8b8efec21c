use crate::adapters::postgres::{
    repositories::{HotelInclude, HotelsRepo, Repository, UnitOfWorkFactory},
    specifications::{CompType, HotelsSpecification},
};
use crate::dtos::hotels::{HotelCreateDTO, HotelDTO, HotelUpdateDTO};
use crate::dtos::paging::{Listing, PageRequest};
use crate::errors::RepoError;

const ENTITY: &str = "hotel";

#[derive(Clone)]
pub struct HotelsService {
    uow_factory: UnitOfWorkFactory,
}

impl HotelsService {
    pub fn new(uow_factory: UnitOfWorkFactory) -> Self {
        Self { uow_factory }
    }

    pub async fn list(
        &self,
        page: Option<PageRequest>,
        includes: Vec<HotelInclude>,
    ) -> Result<Listing<HotelDTO>, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        HotelsRepo::get_all(page.as_ref(), &includes, &mut uow).await
    }

    pub async fn get(
        &self,
        id: i32,
        includes: Vec<HotelInclude>,
    ) -> Result<Option<HotelDTO>, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        HotelsRepo::get_one_by(
            HotelsSpecification::Id(CompType::Equals(id)),
            &includes,
            &mut uow,
        )
        .await
    }

    pub async fn create(&self, dto: &HotelCreateDTO) -> Result<HotelDTO, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        let pending = HotelsRepo::insert(dto, &mut uow);
        uow.save().await?;
        let id = pending
            .get()
            .ok_or(RepoError::MissingAssignedId { entity: ENTITY })?;
        HotelsRepo::get_one_by(
            HotelsSpecification::Id(CompType::Equals(id)),
            &[],
            &mut uow,
        )
        .await?
        .ok_or(RepoError::NotFound { entity: ENTITY, id })
    }

    pub async fn update(&self, id: i32, dto: &HotelUpdateDTO) -> Result<(), RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        let existing = HotelsRepo::get_one_by(
            HotelsSpecification::Id(CompType::Equals(id)),
            &[],
            &mut uow,
        )
        .await?
        .ok_or(RepoError::NotFound { entity: ENTITY, id })?;

        let updated = HotelDTO {
            id: existing.id,
            name: dto.name.clone(),
            address: dto.address.clone(),
            rating: dto.rating,
            country_id: dto.country_id,
            country: None,
        };
        HotelsRepo::update(&updated, &mut uow);
        uow.save().await?;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        HotelsRepo::delete(id, &mut uow);
        uow.save().await?;
        Ok(())
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
    fn hotels_service(runtime: Runtime) -> (HotelsService, Runtime) {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DB URL must be set");
        let config =
            AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config).build().unwrap();

        (HotelsService::new(UnitOfWorkFactory::new(pool)), runtime)
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_full_crud_cycle(
        _migrations: WithCleanup<()>,
        hotels_service: (HotelsService, Runtime),
    ) {
        let (service, runtime) = hotels_service;

        let created = runtime
            .block_on(service.create(&HotelCreateDTO {
                name: "Grand Plaza".to_string(),
                address: "1 Plaza Way".to_string(),
                rating: 4.2,
                country_id: 1,
            }))
            .unwrap();
        assert_eq!(created.name, "Grand Plaza");
        assert_eq!(created.country_id, 1);

        runtime
            .block_on(service.update(
                created.id,
                &HotelUpdateDTO {
                    name: "Grand Plaza Renovated".to_string(),
                    address: "1 Plaza Way".to_string(),
                    rating: 4.8,
                    country_id: 1,
                },
            ))
            .unwrap();

        let fetched = runtime
            .block_on(service.get(created.id, vec![HotelInclude::Country]))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name, "Grand Plaza Renovated");
        assert_eq!(fetched.rating, 4.8);
        assert_eq!(fetched.country.unwrap().short_name, "US");

        runtime.block_on(service.delete(created.id)).unwrap();
        let gone = runtime.block_on(service.get(created.id, vec![])).unwrap();
        assert_eq!(gone, None);
    }

    #[rstest]
    #[serial(hotel_listing_db)]
    fn test_delete_missing_hotel_is_not_found(
        _migrations: WithCleanup<()>,
        hotels_service: (HotelsService, Runtime),
    ) {
        let (service, runtime) = hotels_service;
        let err = runtime.block_on(service.delete(999_999)).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}
