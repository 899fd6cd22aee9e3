use crate::core::data_type::DataType;
use lazy_static::lazy_static;

/// One target field the pipeline knows how to map, coerce, and validate.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub synonyms: &'static [&'static str],
    pub data_type: DataType,
    pub required: bool,
    pub min_len: usize,
}

impl FieldSpec {
    fn new(name: &'static str, synonyms: &'static [&'static str], data_type: DataType) -> Self {
        FieldSpec {
            name,
            synonyms,
            data_type,
            required: false,
            min_len: 0,
        }
    }

    fn required(mut self, min_len: usize) -> Self {
        self.required = true;
        self.min_len = min_len;
        self
    }
}

lazy_static! {
    /// Canonical customer-record fields with their domain synonyms. The
    /// validation engine recognizes exactly this set; mapping configs and
    /// templates may only reference fields listed here.
    pub static ref FIELD_DICTIONARY: Vec<FieldSpec> = vec![
        FieldSpec::new(
            "external_id",
            &["id", "customer id", "customer no", "ref", "reference", "external ref"],
            DataType::Text,
        ),
        FieldSpec::new(
            "first_name",
            &["given name", "forename", "first"],
            DataType::Text,
        ),
        FieldSpec::new(
            "last_name",
            &["surname", "family name", "name", "last"],
            DataType::Text,
        )
        .required(1),
        FieldSpec::new(
            "company",
            &["organisation", "organization", "firm", "business name"],
            DataType::Text,
        ),
        FieldSpec::new(
            "email",
            &["e-mail", "mail", "email address"],
            DataType::Text,
        ),
        FieldSpec::new(
            "phone",
            &["telephone", "mobile", "cell", "phone number", "tel"],
            DataType::Phone,
        ),
        FieldSpec::new(
            "street",
            &["address", "address line 1", "street address", "road"],
            DataType::Text,
        ),
        FieldSpec::new("city", &["town", "locality"], DataType::Text),
        FieldSpec::new(
            "postal_code",
            &["zip", "zip code", "postcode", "plz"],
            DataType::PostalCode,
        ),
        FieldSpec::new("country", &["country code", "nation"], DataType::Text),
        FieldSpec::new("latitude", &["lat"], DataType::Float),
        FieldSpec::new("longitude", &["lng", "lon", "long"], DataType::Float),
        FieldSpec::new(
            "birth_date",
            &["dob", "date of birth", "birthday", "born"],
            DataType::Date,
        ),
        FieldSpec::new("notes", &["comment", "remarks", "memo"], DataType::Text),
    ];
}

/// Case-insensitive lookup by canonical field name.
pub fn find_field(name: &str) -> Option<&'static FieldSpec> {
    FIELD_DICTIONARY
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

pub fn is_known_field(name: &str) -> bool {
    find_field(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(find_field("Email").is_some());
        assert!(find_field("LAST_NAME").is_some());
        assert!(find_field("shoe_size").is_none());
    }

    #[test]
    fn last_name_is_the_only_required_field() {
        let required: Vec<_> = FIELD_DICTIONARY.iter().filter(|f| f.required).collect();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].name, "last_name");
    }

    #[test]
    fn coordinate_fields_are_floats() {
        assert_eq!(find_field("latitude").unwrap().data_type, DataType::Float);
        assert_eq!(find_field("longitude").unwrap().data_type, DataType::Float);
    }
}
