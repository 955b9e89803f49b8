use async_trait::async_trait;

use super::{
    check_allow_list, check_same_dependency, check_single_line_change, check_title,
    check_title_names_dependency, exact, versions_for, AllowList, FileVerdict, LanguageRule,
    RuleContext,
};
use crate::engine::versions::VersionBound;

/// Renovate bumps of Gradle coordinates (`group:artifact:version`).
///
/// Gradle builds routinely pull plugins and BOMs from anywhere, so only
/// coordinates on the allow-list may be approved. Without configuration the
/// list is `com.google.*`. Nothing but the coordinate line may change, since
/// a build script can add repositories or tasks anywhere.
pub struct JavaDependency {
    allow_list: AllowList,
}

impl JavaDependency {
    pub const PROCESS: &'static str = "java-dependency";

    pub fn new(allow_list: Option<AllowList>) -> Self {
        Self {
            allow_list: allow_list
                .unwrap_or_else(|| AllowList::new(vec!["com.google.*".to_string()])),
        }
    }
}

#[async_trait]
impl LanguageRule for JavaDependency {
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
        check_allow_list(Some(&self.allow_list), &versions, &mut failures);
        FileVerdict::from_failures(failures)
    }
}
