use tracing::warn;

use super::catalog::{Catalog, FileSpecificRule};
use crate::pr::ChangedFile;

/// Every catalog rule that applies to `file` for a PR by `author`, in
/// declaration order.
pub fn matching_rules<'c, 'f>(
    catalog: &'c Catalog,
    file: &'f ChangedFile,
    author: &'f str,
) -> impl Iterator<Item = &'c FileSpecificRule> + 'f
where
    'c: 'f,
{
    catalog
        .rules()
        .iter()
        .filter(move |rule| rule.pr_author == author && rule.target_file.is_match(&file.filename))
}

/// The first rule that applies to `file`, or `None` when the file is not
/// covered by the catalog. Later matches are shadowed and logged.
pub fn find_rule<'c>(
    catalog: &'c Catalog,
    file: &ChangedFile,
    author: &str,
) -> Option<&'c FileSpecificRule> {
    let mut candidates = matching_rules(catalog, file, author);
    let first = candidates.next()?;
    let shadowed = candidates.count();
    if shadowed > 0 {
        warn!(path = %file.filename, shadowed, "file matches more than one catalog rule; using the first");
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(author: &str, process: &str, target: &str) -> String {
        format!(
            r#"
[[rules]]
pr_author = "{author}"
process = "{process}"
target_file = '{target}'
old_version = '(?P<dependencyName>\w+) (?P<majorVersion>\d+)\.(?P<minorVersion>\d+)'
new_version = '(?P<dependencyName>\w+) (?P<majorVersion>\d+)\.(?P<minorVersion>\d+)'
"#
        )
    }

    fn file(name: &str) -> ChangedFile {
        ChangedFile {
            filename: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_rule_for_unrelated_file() {
        let catalog = Catalog::builtin().unwrap();
        assert!(find_rule(&catalog, &file("src/index.ts"), "renovate-bot").is_none());
    }

    #[test]
    fn test_author_must_match_exactly() {
        let catalog = Catalog::builtin().unwrap();
        assert!(find_rule(&catalog, &file("package.json"), "renovate").is_none());
        assert!(find_rule(&catalog, &file("package.json"), "Renovate-Bot").is_none());
    }

    #[test]
    fn test_same_file_different_authors() {
        let catalog = Catalog::builtin().unwrap();
        let dependency = find_rule(&catalog, &file("samples/package.json"), "renovate-bot").unwrap();
        assert_eq!(dependency.process.as_deref(), Some("node-dependency"));
        let release = find_rule(&catalog, &file("package.json"), "release-please[bot]").unwrap();
        assert_eq!(release.process.as_deref(), Some("node-release"));
    }

    #[test]
    fn test_first_match_wins() {
        let toml_str = format!(
            "{}{}",
            rule("bot", "specific", r"^samples/package\.json$"),
            rule("bot", "general", r"package\.json$")
        );
        let catalog = Catalog::from_toml(&toml_str).unwrap();
        let matched = find_rule(&catalog, &file("samples/package.json"), "bot").unwrap();
        assert_eq!(matched.process.as_deref(), Some("specific"));
        assert_eq!(matching_rules(&catalog, &file("samples/package.json"), "bot").count(), 2);
        let matched = find_rule(&catalog, &file("package.json"), "bot").unwrap();
        assert_eq!(matched.process.as_deref(), Some("general"));
    }

    #[test]
    fn test_disjoint_rules_are_order_independent() {
        let a = rule("bot", "go", r"go\.mod$");
        let b = rule("bot", "python", r"requirements\.txt$");
        let forward = Catalog::from_toml(&format!("{}{}", a, b)).unwrap();
        let reverse = Catalog::from_toml(&format!("{}{}", b, a)).unwrap();

        for name in ["go.mod", "requirements.txt", "README.md"] {
            let f = file(name);
            let lhs = find_rule(&forward, &f, "bot").and_then(|r| r.process.clone());
            let rhs = find_rule(&reverse, &f, "bot").and_then(|r| r.process.clone());
            assert_eq!(lhs, rhs, "{}", name);
        }
    }
}
