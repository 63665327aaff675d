use strum_macros::{Display, EnumString, VariantNames};

/// The osquery registry a plugin is added to. Writable tables only ever
/// register under `table`.
#[derive(Display, EnumString, VariantNames, Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[strum(serialize_all = "kebab_case")]
pub enum Registry {
    Table,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::VariantNames;

    #[test]
    fn test_registry_display() {
        assert_eq!(Registry::Table.to_string(), "table");
    }

    #[test]
    fn test_registry_from_str() {
        assert_eq!(Registry::from_str("table").ok(), Some(Registry::Table));
        assert!(Registry::from_str("logger").is_err());
        assert!(Registry::from_str("invalid").is_err());
    }

    #[test]
    fn test_registry_variant_names() {
        assert_eq!(Registry::VARIANTS, &["table"]);
    }
}
