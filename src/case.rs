//! Case conversion for relation names: CamelCase field names from clients → snake_case relation keys.

/// Convert a single identifier from camelCase or CamelCase to snake_case.
/// e.g. "contactMerchant" -> "contact_merchant", "Addresses" -> "addresses"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn converts_camel_and_pascal_case() {
        assert_eq!(to_snake_case("contactMerchant"), "contact_merchant");
        assert_eq!(to_snake_case("AddressMerchant"), "address_merchant");
        assert_eq!(to_snake_case("Product"), "product");
    }

    #[test]
    fn leaves_snake_case_alone() {
        assert_eq!(to_snake_case("address_merchant"), "address_merchant");
        assert_eq!(to_snake_case("Address_Merchant"), "address_merchant");
    }
}
