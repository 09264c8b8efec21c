use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dtos::hotels::HotelDTO;
use crate::errors::FieldError;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountryDTO {
    pub id: i32,
    pub name: String,
    pub short_name: String,
    /// Populated only when the `Hotels` include was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotels: Option<Vec<HotelDTO>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountryCreateDTO {
    pub name: String,
    pub short_name: String,
}

pub type CountryUpdateDTO = CountryCreateDTO;

impl CountryCreateDTO {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Country Name is required"));
        } else if self.name.len() > 100 {
            errors.push(FieldError::new("name", "Country Name is too long"));
        }
        if self.short_name.trim().is_empty() {
            errors.push(FieldError::new("shortName", "Country Short Name is required"));
        } else if self.short_name.len() > 2 {
            errors.push(FieldError::new("shortName", "Country Short Name is too long"));
        }
        errors
    }
}
