use diesel::prelude::*;

use crate::dtos::countries::{CountryCreateDTO, CountryDTO};
use crate::dtos::hotels::{HotelCreateDTO, HotelDTO};
use crate::dtos::users::{UserCreateDTO, UserDBDTO};

#[derive(Queryable, Selectable, Identifiable, PartialEq, Debug)]
#[diesel(table_name = super::schema::countries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CountryModel {
    pub id: i32,
    pub name: String,
    pub short_name: String,
}

impl CountryModel {
    pub fn into_dto(self, hotels: Option<Vec<HotelDTO>>) -> CountryDTO {
        CountryDTO {
            id: self.id,
            name: self.name,
            short_name: self.short_name,
            hotels,
        }
    }
}

/// Owned insert row; staged changes outlive the DTO they came from.
#[derive(Insertable, Debug)]
#[diesel(table_name = super::schema::countries)]
pub struct NewCountryModel {
    pub name: String,
    pub short_name: String,
}

impl NewCountryModel {
    pub fn from_dto(dto: &CountryCreateDTO) -> Self {
        Self {
            name: dto.name.clone(),
            short_name: dto.short_name.clone(),
        }
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = super::schema::countries)]
pub struct CountryChangeset {
    pub name: String,
    pub short_name: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, PartialEq, Debug)]
#[diesel(belongs_to(CountryModel, foreign_key = country_id))]
#[diesel(table_name = super::schema::hotels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HotelModel {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
}

impl HotelModel {
    pub fn into_dto(self, country: Option<CountryDTO>) -> HotelDTO {
        HotelDTO {
            id: self.id,
            name: self.name,
            address: self.address,
            rating: self.rating,
            country_id: self.country_id,
            country,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = super::schema::hotels)]
pub struct NewHotelModel {
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
}

impl NewHotelModel {
    pub fn from_dto(dto: &HotelCreateDTO) -> Self {
        Self {
            name: dto.name.clone(),
            address: dto.address.clone(),
            rating: dto.rating,
            country_id: dto.country_id,
        }
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = super::schema::hotels)]
pub struct HotelChangeset {
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, PartialEq, Debug)]
#[diesel(table_name = super::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserModel {
    pub id: i32,
    pub email: String,
    pub hashed_pwd: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl UserModel {
    pub fn into_dto(self) -> UserDBDTO {
        UserDBDTO {
            id: self.id,
            email: self.email,
            hashed_pwd: self.hashed_pwd,
            first_name: self.first_name,
            last_name: self.last_name,
            roles: self.roles,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = super::schema::users)]
pub struct NewUserModel {
    pub email: String,
    pub hashed_pwd: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl NewUserModel {
    pub fn from_dto(dto: &UserCreateDTO) -> Self {
        Self {
            email: dto.email.clone(),
            hashed_pwd: dto.hashed_pwd.clone(),
            first_name: dto.first_name.clone(),
            last_name: dto.last_name.clone(),
            roles: dto.roles.clone(),
        }
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = super::schema::users)]
pub struct UserChangeset {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}
