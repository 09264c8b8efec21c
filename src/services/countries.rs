use crate::adapters::postgres::{
    repositories::{CountriesRepo, CountryInclude, Repository, UnitOfWorkFactory},
    specifications::{CompType, CountriesSpecification},
};
use crate::dtos::countries::{CountryCreateDTO, CountryDTO, CountryUpdateDTO};
use crate::dtos::paging::{Listing, PageRequest};
use crate::errors::RepoError;

const ENTITY: &str = "country";

/// One unit of work per operation; a fresh one is created for every call so
/// concurrent requests never share a session.
#[derive(Clone)]
pub struct CountriesService {
    uow_factory: UnitOfWorkFactory,
}

impl CountriesService {
    pub fn new(uow_factory: UnitOfWorkFactory) -> Self {
        Self { uow_factory }
    }

    pub async fn list(
        &self,
        page: Option<PageRequest>,
        includes: Vec<CountryInclude>,
    ) -> Result<Listing<CountryDTO>, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        CountriesRepo::get_all(page.as_ref(), &includes, &mut uow).await
    }

    pub async fn get(
        &self,
        id: i32,
        includes: Vec<CountryInclude>,
    ) -> Result<Option<CountryDTO>, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        CountriesRepo::get_one_by(
            CountriesSpecification::Id(CompType::Equals(id)),
            &includes,
            &mut uow,
        )
        .await
    }

    pub async fn create(&self, dto: &CountryCreateDTO) -> Result<CountryDTO, RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        let pending = CountriesRepo::insert(dto, &mut uow);
        uow.save().await?;
        let id = pending
            .get()
            .ok_or(RepoError::MissingAssignedId { entity: ENTITY })?;
        CountriesRepo::get_one_by(
            CountriesSpecification::Id(CompType::Equals(id)),
            &[],
            &mut uow,
        )
        .await?
        .ok_or(RepoError::NotFound { entity: ENTITY, id })
    }

    pub async fn update(&self, id: i32, dto: &CountryUpdateDTO) -> Result<(), RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        let existing = CountriesRepo::get_one_by(
            CountriesSpecification::Id(CompType::Equals(id)),
            &[],
            &mut uow,
        )
        .await?
        .ok_or(RepoError::NotFound { entity: ENTITY, id })?;

        let updated = CountryDTO {
            id: existing.id,
            name: dto.name.clone(),
            short_name: dto.short_name.clone(),
            hotels: None,
        };
        CountriesRepo::update(&updated, &mut uow);
        uow.save().await?;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut uow = self.uow_factory.create_uow().await?;
        CountriesRepo::delete(id, &mut uow);
        // A delete matching nothing surfaces as NotFound from save.
        uow.save().await?;
        Ok(())
    }
}
