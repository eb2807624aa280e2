//! Delivery contacts.

use serde::{Deserialize, Serialize};

use crate::validation::ValidationErrors;

const CITY_MAX: usize = 50;
const STREET_MAX: usize = 100;
const ADDRESS_PART_MAX: usize = 15;
const PHONE_MAX: usize = 20;

/// Contact fields as submitted by a caller. Any field may be absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactInput {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

/// A complete, validated contact address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ContactFields {
    pub city: String,
    pub street: String,
    pub house: String,
    pub structure: String,
    pub building: String,
    pub apartment: String,
    pub phone: String,
}

/// A validated partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

impl ContactInput {
    /// Validate a new contact. City, street and phone are required.
    ///
    /// # Errors
    ///
    /// Returns every missing or over-long field.
    pub fn into_fields(self) -> Result<ContactFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let city = errors.text("city", self.city.as_deref(), true, CITY_MAX);
        let street = errors.text("street", self.street.as_deref(), true, STREET_MAX);
        let house = errors.text("house", self.house.as_deref(), false, ADDRESS_PART_MAX);
        let structure = errors.text(
            "structure",
            self.structure.as_deref(),
            false,
            ADDRESS_PART_MAX,
        );
        let building = errors.text(
            "building",
            self.building.as_deref(),
            false,
            ADDRESS_PART_MAX,
        );
        let apartment = errors.text(
            "apartment",
            self.apartment.as_deref(),
            false,
            ADDRESS_PART_MAX,
        );
        let phone = errors.text("phone", self.phone.as_deref(), true, PHONE_MAX);

        match (city, street, house, structure, building, apartment, phone) {
            (
                Some(city),
                Some(street),
                Some(house),
                Some(structure),
                Some(building),
                Some(apartment),
                Some(phone),
            ) => errors.into_result(ContactFields {
                city,
                street,
                house,
                structure,
                building,
                apartment,
                phone,
            }),
            _ => Err(errors),
        }
    }

    /// Validate a partial update with the same limits as creation.
    ///
    /// # Errors
    ///
    /// Returns every invalid supplied field, or a `contact` error when no
    /// field was supplied at all.
    pub fn into_patch(self) -> Result<ContactPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut field = |name: &str, value: Option<String>, required: bool, max: usize| {
            value.and_then(|v| errors.text(name, Some(&v), required, max))
        };
        let patch = ContactPatch {
            city: field("city", self.city, true, CITY_MAX),
            street: field("street", self.street, true, STREET_MAX),
            house: field("house", self.house, false, ADDRESS_PART_MAX),
            structure: field("structure", self.structure, false, ADDRESS_PART_MAX),
            building: field("building", self.building, false, ADDRESS_PART_MAX),
            apartment: field("apartment", self.apartment, false, ADDRESS_PART_MAX),
            phone: field("phone", self.phone, true, PHONE_MAX),
        };
        if errors.is_empty() && patch == ContactPatch::default() {
            errors.push("contact", "no fields to update");
        }
        errors.into_result(patch)
    }
}

impl ContactPatch {
    /// Overwrite the supplied fields of `contact`.
    pub fn apply(self, contact: &mut ContactFields) {
        let Self {
            city,
            street,
            house,
            structure,
            building,
            apartment,
            phone,
        } = self;
        let pairs = [
            (city, &mut contact.city),
            (street, &mut contact.street),
            (house, &mut contact.house),
            (structure, &mut contact.structure),
            (building, &mut contact.building),
            (apartment, &mut contact.apartment),
            (phone, &mut contact.phone),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn input() -> ContactInput {
        ContactInput {
            city: Some("Moscow".to_owned()),
            street: Some("Tverskaya".to_owned()),
            house: Some("7".to_owned()),
            phone: Some("+79990000000".to_owned()),
            ..ContactInput::default()
        }
    }

    #[test]
    fn test_optional_parts_default_to_empty() {
        let fields = input().into_fields().unwrap();
        assert_eq!(fields.house, "7");
        assert_eq!(fields.apartment, "");
    }

    #[test]
    fn test_required_fields() {
        let err = ContactInput::default().into_fields().unwrap_err();
        let fields: Vec<_> = err.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["city", "street", "phone"]);
    }

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let mut fields = input().into_fields().unwrap();
        let patch = ContactInput {
            apartment: Some("12".to_owned()),
            ..ContactInput::default()
        }
        .into_patch()
        .unwrap();
        patch.apply(&mut fields);
        assert_eq!(fields.apartment, "12");
        assert_eq!(fields.city, "Moscow");
    }

    #[test]
    fn test_patch_rejects_blank_required_and_empty_patch() {
        let err = ContactInput {
            city: Some(" ".to_owned()),
            ..ContactInput::default()
        }
        .into_patch()
        .unwrap_err();
        assert_eq!(err.errors()[0].field, "city");
        assert!(ContactInput::default().into_patch().is_err());
    }
}
