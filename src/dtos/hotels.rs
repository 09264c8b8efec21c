use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dtos::countries::CountryDTO;
use crate::errors::FieldError;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HotelDTO {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
    /// Populated only when the `Country` include was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<CountryDTO>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HotelCreateDTO {
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub country_id: i32,
}

pub type HotelUpdateDTO = HotelCreateDTO;

impl HotelCreateDTO {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Hotel Name is required"));
        } else if self.name.len() > 150 {
            errors.push(FieldError::new("name", "Hotel Name is too long"));
        }
        if self.address.trim().is_empty() {
            errors.push(FieldError::new("address", "Address is required"));
        } else if self.address.len() > 250 {
            errors.push(FieldError::new("address", "Address is too long"));
        }
        if !(1.0..=5.0).contains(&self.rating) {
            errors.push(FieldError::new("rating", "Rating must be between 1 and 5"));
        }
        if self.country_id < 1 {
            errors.push(FieldError::new("countryId", "Country id must be positive"));
        }
        errors
    }
}
