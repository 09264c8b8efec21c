use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::super::specifications::{CompType, HotelsSpecification};
use super::includes::HotelInclude;
use super::repo_trait::Repository;
use super::unit_of_work::{Applied, PendingId, StagedChange, UnitOfWork};
use super::UnitOfWorkInternal;
use crate::adapters::postgres::models::{CountryModel, HotelChangeset, HotelModel, NewHotelModel};
use crate::adapters::postgres::schema::{countries, hotels};
use crate::dtos::hotels::{HotelCreateDTO, HotelDTO};
use crate::dtos::paging::{Listing, PageRequest, PagedResult};
use crate::errors::RepoError;

const ENTITY: &str = "hotel";

pub struct HotelsRepo {}

fn filtered(spec: Option<&HotelsSpecification>) -> hotels::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = hotels::table.into_boxed();
    if let Some(spec) = spec {
        query = match spec {
            HotelsSpecification::Id(comp) => match comp {
                CompType::Equals(v) => query.filter(hotels::id.eq(*v)),
                CompType::Gte(v) => query.filter(hotels::id.ge(*v)),
                CompType::Lte(v) => query.filter(hotels::id.le(*v)),
                CompType::Lt(v) => query.filter(hotels::id.lt(*v)),
                CompType::Gt(v) => query.filter(hotels::id.gt(*v)),
            },
            HotelsSpecification::CountryId(comp) => match comp {
                CompType::Equals(v) => query.filter(hotels::country_id.eq(*v)),
                CompType::Gte(v) => query.filter(hotels::country_id.ge(*v)),
                CompType::Lte(v) => query.filter(hotels::country_id.le(*v)),
                CompType::Lt(v) => query.filter(hotels::country_id.lt(*v)),
                CompType::Gt(v) => query.filter(hotels::country_id.gt(*v)),
            },
            HotelsSpecification::Rating(comp) => match comp {
                CompType::Equals(v) => query.filter(hotels::rating.eq(*v)),
                CompType::Gte(v) => query.filter(hotels::rating.ge(*v)),
                CompType::Lte(v) => query.filter(hotels::rating.le(*v)),
                CompType::Lt(v) => query.filter(hotels::rating.lt(*v)),
                CompType::Gt(v) => query.filter(hotels::rating.gt(*v)),
            },
        };
    }
    query
}

impl Repository for HotelsRepo {
    type CreateDto = HotelCreateDTO;
    type Dto = HotelDTO;
    type Spec = HotelsSpecification;
    type Include = HotelInclude;

    const ENTITY: &'static str = ENTITY;

    async fn get_all(
        page: Option<&PageRequest>,
        includes: &[HotelInclude],
        uow: &mut UnitOfWork,
    ) -> Result<Listing<HotelDTO>, RepoError> {
        let with_country = includes.contains(&HotelInclude::Country);

        let total = match page {
            Some(_) => Some(
                filtered(None)
                    .count()
                    .get_result::<i64>(uow.get_conn())
                    .await
                    .map_err(|e| RepoError::storage(ENTITY, "get_all count", e))?,
            ),
            None => None,
        };

        let items = if with_country {
            // One joined query resolves the Country relation for every row.
            let mut query = hotels::table
                .inner_join(countries::table)
                .order(hotels::id.asc())
                .select((HotelModel::as_select(), CountryModel::as_select()))
                .into_boxed();
            if let Some(page) = page {
                query = query.offset(page.offset()).limit(page.limit());
            }
            let rows: Vec<(HotelModel, CountryModel)> = query
                .load(uow.get_conn())
                .await
                .map_err(|e| RepoError::storage(ENTITY, "get_all includes", e))?;
            rows.into_iter()
                .map(|(hotel, country)| hotel.into_dto(Some(country.into_dto(None))))
                .collect()
        } else {
            let mut query = filtered(None).order(hotels::id.asc());
            if let Some(page) = page {
                query = query.offset(page.offset()).limit(page.limit());
            }
            let rows: Vec<HotelModel> = query
                .select(HotelModel::as_select())
                .load(uow.get_conn())
                .await
                .map_err(|e| RepoError::storage(ENTITY, "get_all", e))?;
            rows.into_iter().map(|h| h.into_dto(None)).collect()
        };

        match (page, total) {
            (Some(page), Some(total)) => Ok(Listing::Page(PagedResult::new(items, total, page))),
            _ => Ok(Listing::Full(items)),
        }
    }

    async fn get_one_by(
        spec: HotelsSpecification,
        includes: &[HotelInclude],
        uow: &mut UnitOfWork,
    ) -> Result<Option<HotelDTO>, RepoError> {
        let row: Option<HotelModel> = filtered(Some(&spec))
            .order(hotels::id.asc())
            .select(HotelModel::as_select())
            .first(uow.get_conn())
            .await
            .optional()
            .map_err(|e| RepoError::storage(ENTITY, "get_one_by", e))?;

        let Some(hotel) = row else {
            return Ok(None);
        };

        let country = if includes.contains(&HotelInclude::Country) {
            let country: CountryModel = countries::table
                .find(hotel.country_id)
                .select(CountryModel::as_select())
                .first(uow.get_conn())
                .await
                .map_err(|e| RepoError::storage(ENTITY, "get_one_by includes", e))?;
            Some(country.into_dto(None))
        } else {
            None
        };

        Ok(Some(hotel.into_dto(country)))
    }

    async fn get_count(
        spec: Option<&HotelsSpecification>,
        uow: &mut UnitOfWork,
    ) -> Result<i64, RepoError> {
        filtered(spec)
            .count()
            .get_result(uow.get_conn())
            .await
            .map_err(|e| RepoError::storage(ENTITY, "get_count", e))
    }

    fn insert(dto: &HotelCreateDTO, uow: &mut UnitOfWork) -> PendingId {
        let id_slot = PendingId::default();
        uow.stage(Box::new(InsertHotel {
            row: NewHotelModel::from_dto(dto),
            id_slot: id_slot.clone(),
        }));
        id_slot
    }

    fn update(dto: &HotelDTO, uow: &mut UnitOfWork) {
        uow.stage(Box::new(UpdateHotel {
            id: dto.id,
            changeset: HotelChangeset {
                name: dto.name.clone(),
                address: dto.address.clone(),
                rating: dto.rating,
                country_id: dto.country_id,
            },
        }));
    }

    fn delete(id: i32, uow: &mut UnitOfWork) {
        uow.stage(Box::new(DeleteHotel { id }));
    }
}

struct InsertHotel {
    row: NewHotelModel,
    id_slot: PendingId,
}

#[async_trait]
impl StagedChange for InsertHotel {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let id = diesel::insert_into(hotels::table)
            .values(&self.row)
            .returning(hotels::id)
            .get_result::<i32>(conn)
            .await
            .map_err(|e| RepoError::on_write(ENTITY, "insert", e))?;
        Ok(Applied {
            rows: 1,
            assigned_id: Some((self.id_slot.clone(), id)),
        })
    }
}

struct UpdateHotel {
    id: i32,
    changeset: HotelChangeset,
}

#[async_trait]
impl StagedChange for UpdateHotel {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let rows = diesel::update(hotels::table.find(self.id))
            .set(&self.changeset)
            .execute(conn)
            .await
            .map_err(|e| RepoError::on_write(ENTITY, "update", e))?;
        Ok(Applied::rows(rows))
    }
}

struct DeleteHotel {
    id: i32,
}

#[async_trait]
impl StagedChange for DeleteHotel {
    async fn apply(&self, conn: &mut AsyncPgConnection) -> Result<Applied, RepoError> {
        let rows = diesel::delete(hotels::table.find(self.id))
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
