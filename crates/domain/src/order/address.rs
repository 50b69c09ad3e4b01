use serde::{Deserialize, Serialize};

use super::OrderError;

/// Wire names of the shipping address fields, in display order.
pub const SHIPPING_FIELDS: [&str; 9] = [
    "firstName",
    "lastName",
    "email",
    "phone",
    "address",
    "city",
    "state",
    "country",
    "zip",
];

const MAX_NAME_CHARS: usize = 50;

/// Where an order ships to. Every field is required.
///
/// Missing fields deserialize as empty strings so that validation can
/// report all of them at once instead of failing on the first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip: String,
}

impl ShippingAddress {
    fn fields(&self) -> [&str; 9] {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.phone,
            &self.address,
            &self.city,
            &self.state,
            &self.country,
            &self.zip,
        ]
    }

    /// Returns the wire names of every blank field.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        SHIPPING_FIELDS
            .iter()
            .zip(self.fields())
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Checks the address and returns a trimmed copy.
    pub fn validated(&self) -> Result<ShippingAddress, OrderError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(OrderError::MissingShippingFields(
                missing.into_iter().map(String::from).collect(),
            ));
        }

        let address = ShippingAddress {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            country: self.country.trim().to_string(),
            zip: self.zip.trim().to_string(),
        };
        if address.first_name.chars().count() > MAX_NAME_CHARS
            || address.last_name.chars().count() > MAX_NAME_CHARS
        {
            return Err(OrderError::InvalidShippingAddress(format!(
                "names must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        Ok(address)
    }
}

#[cfg(test)]
pub(crate) fn sample_address() -> ShippingAddress {
    ShippingAddress {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "+44 20 7946 0000".into(),
        address: "12 St James's Square".into(),
        city: "London".into(),
        state: "Greater London".into(),
        country: "UK".into(),
        zip: "SW1Y 4JH".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_address_is_valid() {
        let address = sample_address();
        assert!(address.missing_fields().is_empty());
        assert_eq!(address.validated().unwrap(), address);
    }

    #[test]
    fn test_every_missing_field_is_listed() {
        let address: ShippingAddress = serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "  ",
            "email": "ada@example.com",
            "city": "London"
        }))
        .unwrap();

        assert_eq!(
            address.missing_fields(),
            vec!["lastName", "phone", "address", "state", "country", "zip"]
        );
        assert!(matches!(
            address.validated(),
            Err(OrderError::MissingShippingFields(fields)) if fields.len() == 6
        ));
    }

    #[test]
    fn test_long_names_rejected() {
        let mut address = sample_address();
        address.first_name = "A".repeat(51);
        assert!(matches!(
            address.validated(),
            Err(OrderError::InvalidShippingAddress(_))
        ));
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut address = sample_address();
        address.city = "  London ".into();
        assert_eq!(address.validated().unwrap().city, "London");
    }
}
