use async_trait::async_trait;

use super::{
    check_allow_list, check_companion_file, check_same_dependency, check_single_line_change,
    check_title, check_title_names_dependency, exact, versions_for, AllowList, FileVerdict, LanguageRule,
    RuleContext,
};
use crate::engine::versions::VersionBound;

const GO_SUM: &str = "go.sum";

/// Renovate bumps of a Go module requirement.
///
/// Patch releases only, and `go.sum` beside the `go.mod` has to change in the
/// same PR or the build will not verify the new module.
pub struct GoDependency {
    allow_list: Option<AllowList>,
}

impl GoDependency {
    pub const PROCESS: &'static str = "go-dependency";

    pub fn new(allow_list: Option<AllowList>) -> Self {
        Self { allow_list }
    }
}

#[async_trait]
impl LanguageRule for GoDependency {
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
        if let Err(violation) = VersionBound::PatchOnly.check(&versions) {
            failures.push(violation);
        }
        check_single_line_change(ctx.file, &mut failures);
        check_companion_file(ctx, GO_SUM, &mut failures);
        check_allow_list(self.allow_list.as_ref(), &versions, &mut failures);
        FileVerdict::from_failures(failures)
    }
}
