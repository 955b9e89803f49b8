use async_trait::async_trait;

use super::{
    check_allow_list, check_same_dependency, check_single_line_change, check_title,
    check_title_names_dependency, versions_for, AllowList, FileVerdict, LanguageRule, RuleContext,
};
use crate::engine::versions::VersionBound;

/// Renovate bumps of a pinned requirement (`name==x.y.z`).
pub struct PythonDependency {
    allow_list: Option<AllowList>,
}

impl PythonDependency {
    pub const PROCESS: &'static str = "python-dependency";

    pub fn new(allow_list: Option<AllowList>) -> Self {
        Self { allow_list }
    }
}

/// Package names compare case-insensitively, with runs of `-`, `_` and `.`
/// treated as one `-`.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut last_was_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_was_separator {
                normalized.push('-');
            }
            last_was_separator = true;
        } else {
            normalized.extend(c.to_lowercase());
            last_was_separator = false;
        }
    }
    normalized
}

#[async_trait]
impl LanguageRule for PythonDependency {
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
        check_title_names_dependency(ctx, &versions, normalize_name, &mut failures);
        check_same_dependency(&versions, normalize_name, &mut failures);
        if let Err(violation) = VersionBound::MinorOnly.check(&versions) {
            failures.push(violation);
        }
        check_single_line_change(ctx.file, &mut failures);
        check_allow_list(self.allow_list.as_ref(), &versions, &mut failures);
        FileVerdict::from_failures(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{changed_file, context_parts, pull_request, rule_for};
    use crate::pr::StaticFetcher;

    async fn check(title: &str, patch: &str) -> FileVerdict {
        let pr = pull_request("renovate-bot", title, vec![changed_file("samples/requirements.txt", patch)]);
        let rule = rule_for(PythonDependency::PROCESS);
        let fetcher = StaticFetcher::new();
        let ctx = context_parts(&pr, 0, &rule, &fetcher);
        PythonDependency::new(None).check_pr(&ctx).await
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Google_Cloud.Storage"), "google-cloud-storage");
        assert_eq!(normalize_name("a--b__c"), "a-b-c");
    }

    #[tokio::test]
    async fn test_minor_bump_approved() {
        let verdict = check(
            "chore(deps): update dependency google-cloud-storage to v2.5.0",
            "@@ -1,3 +1,3 @@\n flask==2.0.1\n-google-cloud-storage==2.4.0\n+google-cloud-storage==2.5.0\n pytest==7.0.0\n",
        )
        .await;
        assert_eq!(verdict, FileVerdict::Approved);
    }

    #[tokio::test]
    async fn test_title_name_normalized() {
        let verdict = check(
            "chore(deps): update dependency Google_Cloud_Storage to v2.5.0",
            "@@ -1 +1 @@\n-google-cloud-storage==2.4.0\n+google-cloud-storage==2.5.0\n",
        )
        .await;
        assert_eq!(verdict, FileVerdict::Approved);
    }

    #[tokio::test]
    async fn test_major_bump_rejected() {
        let verdict = check(
            "chore(deps): update dependency google-cloud-storage to v3",
            "@@ -1 +1 @@\n-google-cloud-storage==2.4.0\n+google-cloud-storage==3.0.0\n",
        )
        .await;
        assert!(!verdict.is_approved());
    }

    #[tokio::test]
    async fn test_downgrade_rejected() {
        let verdict = check(
            "chore(deps): update dependency google-cloud-storage to v2.3.0",
            "@@ -1 +1 @@\n-google-cloud-storage==2.4.0\n+google-cloud-storage==2.3.0\n",
        )
        .await;
        assert!(!verdict.is_approved());
    }
}
