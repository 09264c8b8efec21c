use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::super::specifications::{CompType, CountriesSpecification};
use super::includes::CountryInclude;
use super::repo_trait::Repository;
use super::unit_of_work::{Applied, PendingId, StagedChange, UnitOfWork};
use super::UnitOfWorkInternal;
use crate::adapters::postgres::models::{CountryChangeset, CountryModel, HotelModel, NewCountryModel};
use crate::adapters::postgres::schema::countries;
use crate::dtos::countries::{CountryCreateDTO, CountryDTO};
use crate::dtos::paging::{Listing, PagedResult, PageRequest};
use crate::errors::RepoError;

const ENTITY: &str = "country";

pub struct CountriesRepo {}

fn filtered(spec: Option<&CountriesSpecification>) -> countries::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = countries::table.into_boxed();
    if let Some(spec) = spec {
        query = match spec {
            CountriesSpecification::Id(comp) => match comp {
                CompType::Equals(v) => query.filter(countries::id.eq(*v)),
                CompType::Gte(v) => query.filter(countries::id.ge(*v)),
                CompType::Lte(v) => query.filter(countries::id.le(*v)),
                CompType::Lt(v) => query.filter(countries::id.lt(*v)),
                CompType::Gt(v) => query.filter(countries::id.gt(*v)),
            },
            CountriesSpecification::ShortName(comp) => match comp {
                CompType::Equals(v) => query.filter(countries::short_name.eq(v.clone())),
                CompType::Gte(v) => query.filter(countries::short_name.ge(v.clone())),
                CompType::Lte(v) => query.filter(countries::short_name.le(v.clone())),
                CompType::Lt(v) => query.filter(countries::short_name.lt(v.clone())),
                CompType::Gt(v) => query.filter(countries::short_name.gt(v.clone())),
            },
        };
    }
    query
}

/// Resolves the `Hotels` relation for the loaded page in one extra query.
async fn attach_hotels(
    rows: Vec<CountryModel>,
    with_hotels: bool,
    uow: &mut UnitOfWork,
) -> Result<Vec<CountryDTO>, RepoError> {
    use crate::adapters::postgres::schema::hotels;

    if !with_hotels {
        return Ok(rows.into_iter().map(|c| c.into_dto(None)).collect());
    }

    let hotel_rows: Vec<HotelModel> = HotelModel::belonging_to(&rows)
        .order(hotels::id.asc())
        .select(HotelModel::as_select())
        .load(uow.get_conn())
        .await
        .map_err(|e| RepoError::storage(ENTITY, "get_all includes", e))?;
    let grouped = hotel_rows.grouped_by(&rows);

    Ok(rows
        .into_iter()
        .zip(grouped)
        .map(|(country, hotels_for_country)| {
            let hotels = hotels_for_country
                .into_iter()
                .map(|h| h.into_dto(None))
                .collect();
            country.into_dto(Some(hotels))
        })
        .collect())
}

impl Repository for CountriesRepo {
    type CreateDto = CountryCreateDTO;
    type Dto = CountryDTO;
    type Spec = CountriesSpecification;
    type Include = CountryInclude;

    const ENTITY: &'static str = ENTITY;

    async fn get_all(
        page: Option<&PageRequest>,
        includes: &[CountryInclude],
        uow: &mut UnitOfWork,
    ) -> Result<Listing<CountryDTO>, RepoError> {
        let with_hotels = includes.contains(&CountryInclude::Hotels);

        match page {
            Some(page) => {
                // Total and window run against the same (absent) filter so
                // the metadata stays consistent with the items.
                let total: i64 = filtered(None)
                    .count()
                    .get_result(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all count", e))?;
                let rows: Vec<CountryModel> = filtered(None)
                    .order(countries::id.asc())
                    .offset(page.offset())
                    .limit(page.limit())
                    .select(CountryModel::as_select())
                    .load(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all", e))?;
                let items = attach_hotels(rows, with_hotels, uow).await?;
                Ok(Listing::Page(PagedResult::new(items, total, page)))
            }
            None => {
                let rows: Vec<CountryModel> = filtered(None)
                    .order(countries::id.asc())
                    .select(CountryModel::as_select())
                    .load(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all", e))?;
                Ok(Listing::Full(attach_hotels(rows, with_hotels, uow).await?))
            }
        }
    }

    async fn get_one_by(
        spec: CountriesSpecification,
        includes: &[CountryInclude],
        uow: &mut UnitOfWork,
    ) -> Result<Option<CountryDTO>, RepoError> {
        let row: Option<CountryModel> = filtered(Some(&spec))
            .order(countries::id.asc())
            .select(CountryModel::as_select())
            .first(uow.get_conn())
            .await
            .optional()
            .map_err(|e| RepoError::storage(ENTITY, "get_one_by", e))?;

        match row {
            Some(row) => {
                let with_hotels = includes.contains(&CountryInclude::Hotels);
                let mut dtos = attach_hotels(vec![row], with_hotels, uow).await?;
                Ok(dtos.pop())
            }
            None => Ok(None),
        }
    }

    async fn get_count(
        spec: Option<&CountriesSpecification>,
        uow: &mut UnitOfWork,
    ) -> Result<i64, RepoError> {
        filtered(spec)
            .count()
            .get_result(uow.get_conn())
            .await
            .map_err(|e| RepoError::storage(ENTITY, "get_count", e))
    }

    fn insert(dto: &CountryCreateDTO, uow: &mut UnitOfWork) -> PendingId {
        let id_slot = PendingId::default();
        uow.stage(Box::new(InsertCountry {
            row: NewCountryModel::from_dto(dto),
            id_slot: id_slot.clone(),
        }));
        id_slot
    }

    fn update(dto: &CountryDTO, uow: &mut UnitOfWork) {
        uow.stage(Box::new(UpdateCountry {
            id: dto.id,
            changeset: CountryChangeset {
                name: dto.name.clone(),
                short_name: dto.short_name.clone(),
            },
        }));
    }

    fn delete(id: i32, uow: &mut UnitOfWork) {
        uow.stage(Box::new(DeleteCountry { id }));
    }
}

struct InsertCountry {
    row: NewCountryModel,
    id_slot: PendingId,
}

#[async_trait]
impl StagedChange for InsertCountry {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let id = diesel::insert_into(countries::table)
            .values(&self.row)
            .returning(countries::id)
            .get_result::<i32>(conn)
            .await
            .map_err(|e| RepoError::on_write(ENTITY, "insert", e))?;
        Ok(Applied {
            rows: 1,
            assigned_id: Some((self.id_slot.clone(), id)),
        })
    }
}

struct UpdateCountry {
    id: i32,
    changeset: CountryChangeset,
}

#[async_trait]
impl StagedChange for UpdateCountry {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let rows = diesel::update(countries::table.find(self.id))
            .set(&self.changeset)
            .execute(conn)
            .await
            .map_err(|e| RepoError::on_write(ENTITY, "update", e))?;
        Ok(Applied::rows(rows))
    }
}

struct DeleteCountry {
    id: i32,
}

#[async_trait]
impl StagedChange for DeleteCountry {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let rows = diesel::delete(countries::table.find(self.id))
            .execute(conn)
            .await
            .map_err(|e| RepoError::storage(ENTITY, "delete", e))?;
        if rows == 0 {
            // Deleting nothing would mask bugs upstream; fail the batch.
            return Err(RepoError::NotFound {
                entity: ENTITY,
                id: self.id,
            });
        }
        Ok(Applied::rows(rows))
    }
}
