use crate::{Checker, Finding};
use mesh_config_core::{Check, ObjectKind};
use mesh_config_k8s_index::Index;

#[derive(Clone, Debug, Default)]
pub struct JwtRuleChecker;

impl Checker for JwtRuleChecker {
    fn name(&self) -> &'static str {
        "request_authentication"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        index
            .of_kind(ObjectKind::RequestAuthentication)
            .filter_map(|ra| ra.as_request_authentication().map(|spec| (ra, spec)))
            .flat_map(|(ra, spec)| {
                spec.jwt_rules
                    .iter()
                    .enumerate()
                    .filter(|(_, rule)| rule.issuer.trim().is_empty())
                    .map(move |(i, _)| {
                        (
                            ra.key(),
                            Check::error(
                                "KIA1301",
                                "JWT rule is missing an issuer",
                                format!("spec/jwtRules[{i}]/issuer"),
                            ),
                        )
                    })
            })
            .collect()
    }
}
