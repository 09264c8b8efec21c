pub enum CompType<T> {
    Equals(T),
    Gte(T),
    Lte(T),
    Lt(T),
    Gt(T),
}

pub enum CountriesSpecification {
    Id(CompType<i32>),
    ShortName(CompType<String>),
}

pub enum HotelsSpecification {
    Id(CompType<i32>),
    CountryId(CompType<i32>),
    Rating(CompType<f64>),
}

pub enum UsersSpecification {
    Id(CompType<i32>),
    Email(CompType<String>),
}

pub trait Specification {}

impl Specification for CountriesSpecification {}
impl Specification for HotelsSpecification {}
impl Specification for UsersSpecification {}
