//! Naming convention statistics over custom objects

use abapify_common::{NamingPatterns, SapObject};

/// Count name prefixes, per-type suffixes and packages.
///
/// - prefix: first two characters of the name
/// - suffix: token after the last underscore, counted per object type
/// - package: the object's package, when set
pub fn detect_naming_patterns(objects: &[SapObject]) -> NamingPatterns {
    let mut patterns = NamingPatterns::default();

    for object in objects {
        if let Some(prefix) = prefix(&object.name) {
            *patterns.prefixes.entry(prefix).or_insert(0) += 1;
        }

        if let Some(suffix) = suffix(&object.name) {
            *patterns
                .suffixes
                .entry(object.object_type.code().to_string())
                .or_default()
                .entry(suffix.to_string())
                .or_insert(0) += 1;
        }

        if let Some(package) = object.package.as_deref().filter(|p| !p.is_empty()) {
            *patterns.packages.entry(package.to_string()).or_insert(0) += 1;
        }
    }

    patterns
}

fn prefix(name: &str) -> Option<String> {
    let prefix: String = name.chars().take(2).collect();
    (prefix.chars().count() == 2).then_some(prefix)
}

fn suffix(name: &str) -> Option<&str> {
    name.rsplit_once('_')
        .map(|(_, last)| last)
        .filter(|last| !last.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use abapify_common::ObjectType;

    fn object(name: &str, object_type: ObjectType, package: Option<&str>) -> SapObject {
        SapObject {
            name: name.to_string(),
            object_type,
            description: String::new(),
            package: package.map(str::to_string),
            author: None,
            created_on: None,
            changed_on: None,
            status: None,
        }
    }

    #[test]
    fn test_empty_input_gives_empty_maps() {
        let patterns = detect_naming_patterns(&[]);
        assert!(patterns.prefixes.is_empty());
        assert!(patterns.suffixes.is_empty());
        assert!(patterns.packages.is_empty());
    }

    #[test]
    fn test_counts() {
        let objects = vec![
            object("ZR_SALES_REPORT", ObjectType::Program, Some("ZSD")),
            object("ZR_STOCK_REPORT", ObjectType::Program, Some("ZMM")),
            object("ZCL_SALES_API", ObjectType::Class, Some("ZSD")),
            object("ZSALES", ObjectType::FunctionGroup, None),
            object("Z", ObjectType::Program, Some("")),
            object("ZCL_TRAILING_", ObjectType::Class, None),
        ];

        let patterns = detect_naming_patterns(&objects);

        assert_eq!(patterns.prefixes["ZR"], 2);
        assert_eq!(patterns.prefixes["ZC"], 2);
        assert_eq!(patterns.prefixes["ZS"], 1);
        assert!(!patterns.prefixes.contains_key("Z"));

        assert_eq!(patterns.suffixes["PROG"]["REPORT"], 2);
        assert_eq!(patterns.suffixes["CLAS"]["API"], 1);
        assert_eq!(patterns.suffixes["CLAS"].len(), 1);
        assert!(!patterns.suffixes.contains_key("FUGR"));

        assert_eq!(patterns.packages["ZSD"], 2);
        assert_eq!(patterns.packages.len(), 2);
    }
}
