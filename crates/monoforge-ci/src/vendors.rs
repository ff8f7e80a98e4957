use std::{collections::HashMap, sync::OnceLock};

#[derive(Clone, Debug, PartialEq)]
pub struct VendorEnvs {
    pub(crate) any: Vec<&'static str>,
    pub(crate) all: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vendor {
    pub(crate) name: &'static str,
    pub constant: &'static str,
    pub(crate) env: VendorEnvs,
    pub(crate) eval_env: Option<HashMap<&'static str, &'static str>>,
}

impl Vendor {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

static VENDORS: OnceLock<[Vendor; 9]> = OnceLock::new();

pub(crate) fn get_vendors() -> &'static [Vendor] {
    VENDORS
        .get_or_init(|| {
            [
                Vendor {
                    name: "Buildkite",
                    constant: "BUILDKITE",
                    env: VendorEnvs {
                        any: vec!["BUILDKITE"],
                        all: vec![],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "CircleCI",
                    constant: "CIRCLE",
                    env: VendorEnvs {
                        any: vec!["CIRCLECI"],
                        all: vec![],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "Codeship",
                    constant: "CODESHIP",
                    env: VendorEnvs {
                        any: vec![],
                        all: vec![],
                    },
                    eval_env: Some(HashMap::from([("CI_NAME", "codeship")])),
                },
                Vendor {
                    name: "GitHub Actions",
                    constant: "GITHUB_ACTIONS",
                    env: VendorEnvs {
                        any: vec!["GITHUB_ACTIONS"],
                        all: vec![],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "GitLab CI",
                    constant: "GITLAB",
                    env: VendorEnvs {
                        any: vec!["GITLAB_CI"],
                        all: vec![],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "Jenkins",
                    constant: "JENKINS",
                    env: VendorEnvs {
                        any: vec![],
                        all: vec!["JENKINS_URL", "BUILD_ID"],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "TeamCity",
                    constant: "TEAMCITY",
                    env: VendorEnvs {
                        any: vec!["TEAMCITY_VERSION"],
                        all: vec![],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "Travis CI",
                    constant: "TRAVIS",
                    env: VendorEnvs {
                        any: vec!["TRAVIS"],
                        all: vec![],
                    },
                    eval_env: None,
                },
                Vendor {
                    name: "Vercel",
                    constant: "VERCEL",
                    env: VendorEnvs {
                        any: vec!["NOW_BUILDER", "VERCEL"],
                        all: vec![],
                    },
                    eval_env: None,
                },
            ]
        })
        .as_slice()
}
