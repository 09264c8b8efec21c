use crate::errors::RepoError;

/// A named relation that can be eagerly resolved alongside an entity.
///
/// Relation names are enumerated per entity at compile time; an unknown
/// name is a caller bug and fails at parse time instead of being dropped.
pub trait IncludePath: Copy + PartialEq + Send + Sync + Sized + 'static {
    const ENTITY: &'static str;
    const RELATIONS: &'static [&'static str];

    fn from_name(name: &str) -> Option<Self>;

    fn parse(name: &str) -> Result<Self, RepoError> {
        Self::from_name(name).ok_or_else(|| RepoError::InvalidInclude {
            entity: Self::ENTITY,
            name: name.to_string(),
        })
    }

    /// Parses a comma-separated include list as taken from the query string.
    fn parse_list(raw: Option<&str>) -> Result<Vec<Self>, RepoError> {
        match raw {
            None => Ok(Vec::new()),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(Self::parse)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryInclude {
    Hotels,
}

impl IncludePath for CountryInclude {
    const ENTITY: &'static str = "country";
    const RELATIONS: &'static [&'static str] = &["Hotels"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Hotels" => Some(Self::Hotels),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotelInclude {
    Country,
}

impl IncludePath for HotelInclude {
    const ENTITY: &'static str = "hotel";
    const RELATIONS: &'static [&'static str] = &["Country"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Country" => Some(Self::Country),
            _ => None,
        }
    }
}

/// Users have no includable relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoInclude {}

impl IncludePath for NoInclude {
    const ENTITY: &'static str = "user";
    const RELATIONS: &'static [&'static str] = &[];

    fn from_name(_name: &str) -> Option<Self> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_relation_parses() {
        assert_eq!(CountryInclude::parse("Hotels").unwrap(), CountryInclude::Hotels);
        assert_eq!(HotelInclude::parse("Country").unwrap(), HotelInclude::Country);
    }

    #[test]
    fn unknown_relation_is_an_invalid_include() {
        let err = CountryInclude::parse("Country").unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidInclude { entity: "country", .. }
        ));
    }

    #[test]
    fn list_parsing_rejects_any_unknown_name() {
        let includes = HotelInclude::parse_list(Some("Country")).unwrap();
        assert_eq!(includes, vec![HotelInclude::Country]);

        let err = HotelInclude::parse_list(Some("Country, Rooms")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidInclude { .. }));
    }

    #[test]
    fn empty_and_missing_lists_mean_no_includes() {
        assert!(HotelInclude::parse_list(None).unwrap().is_empty());
        assert!(HotelInclude::parse_list(Some("")).unwrap().is_empty());
    }

    #[test]
    fn users_have_no_relations() {
        assert!(NoInclude::RELATIONS.is_empty());
        assert!(matches!(
            NoInclude::parse("Anything"),
            Err(RepoError::InvalidInclude { entity: "user", .. })
        ));
    }
}
