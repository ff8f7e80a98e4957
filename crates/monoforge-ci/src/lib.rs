#![deny(clippy::all)]

mod vendors;

use std::{env, sync::OnceLock};

use crate::vendors::get_vendors;
pub use crate::vendors::Vendor;

static IS_CI: OnceLock<bool> = OnceLock::new();
static VENDOR: OnceLock<Option<&'static Vendor>> = OnceLock::new();

const CI_ENV_VARS: &[&str] = [
    "BUILD_ID",
    "BUILD_NUMBER",
    "CI",
    "CI_APP_ID",
    "CI_BUILD_ID",
    "CI_BUILD_NUMBER",
    "CI_NAME",
    "CONTINUOUS_INTEGRATION",
    "RUN_ID",
    "TEAMCITY_VERSION",
]
.as_slice();

/// Whether the current process runs under a recognized CI environment
/// indicator. An env variable set to the empty string counts as unset.
pub fn is_ci() -> bool {
    *IS_CI.get_or_init(is_ci_inner)
}

fn is_ci_inner() -> bool {
    CI_ENV_VARS
        .iter()
        .any(|env_var| !env::var(env_var).unwrap_or_default().is_empty())
}

impl Vendor {
    // Returns info about a CI vendor
    pub fn infer() -> Option<&'static Vendor> {
        *VENDOR.get_or_init(Self::infer_inner)
    }

    fn infer_inner() -> Option<&'static Vendor> {
        for vendor in get_vendors() {
            if let Some(eval_env) = &vendor.eval_env {
                for (name, expected_value) in eval_env {
                    if matches!(env::var(name), Ok(env_value) if *expected_value == env_value) {
                        return Some(vendor);
                    }
                }
            } else if !vendor.env.any.is_empty() {
                for env_var in &vendor.env.any {
                    if matches!(env::var(env_var), Ok(v) if !v.is_empty()) {
                        return Some(vendor);
                    }
                }
            } else if !vendor.env.all.is_empty() {
                let all = vendor
                    .env
                    .all
                    .iter()
                    .all(|env_var| !env::var(env_var).unwrap_or_default().is_empty());

                if all {
                    return Some(vendor);
                }
            }
        }

        None
    }

    pub fn get_name() -> Option<&'static str> {
        Self::infer().map(|v| v.name)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tracing::info;

    use super::*;

    #[test]
    #[serial]
    fn test_is_ci() {
        // Clear the real environment first so a live CI run doesn't leak
        // into the assertions; restored below.
        let saved: Vec<(&str, String)> = CI_ENV_VARS
            .iter()
            .filter_map(|var| env::var(var).ok().map(|value| (*var, value)))
            .collect();
        for var in CI_ENV_VARS {
            env::remove_var(var);
        }

        assert!(!is_ci_inner());

        env::set_var("CONTINUOUS_INTEGRATION", "");
        assert!(!is_ci_inner(), "empty value counts as unset");

        env::set_var("CONTINUOUS_INTEGRATION", "1");
        assert!(is_ci_inner());
        env::remove_var("CONTINUOUS_INTEGRATION");

        env::set_var("CI", "true");
        assert!(is_ci_inner());
        env::remove_var("CI");

        env::set_var("TEAMCITY_VERSION", "2023.11");
        assert!(is_ci_inner());
        env::remove_var("TEAMCITY_VERSION");

        for (var, value) in saved {
            env::set_var(var, value);
        }
    }

    fn get_vendor(name: &str) -> Vendor {
        for v in get_vendors() {
            if v.name == name {
                return v.clone();
            }
        }

        unreachable!("vendor not found")
    }

    #[test]
    fn test_vendor_constants() {
        assert_eq!(get_vendor("GitHub Actions").constant, "GITHUB_ACTIONS");
        assert_eq!(get_vendor("Vercel").constant, "VERCEL");
        assert_eq!(get_vendor("CircleCI").constant, "CIRCLE");
    }

    struct TestCase {
        name: String,
        set_env: Vec<String>,
        want: Option<Vendor>,
    }

    #[test]
    #[serial]
    fn test_infer() {
        // This is purposefully *not* using test_case
        // because we don't want to run these tests in parallel
        // due to race conditions with environment variables.
        let tests = vec![
            TestCase {
                name: "Vercel".to_string(),
                set_env: vec!["VERCEL".to_string(), "NOW_BUILDER".to_string()],
                want: Some(get_vendor("Vercel")),
            },
            TestCase {
                name: "CircleCI".to_string(),
                set_env: vec!["CIRCLECI".to_string()],
                want: Some(get_vendor("CircleCI")),
            },
            TestCase {
                name: "Jenkins".to_string(),
                set_env: vec!["BUILD_ID".to_string(), "JENKINS_URL".to_string()],
                want: Some(get_vendor("Jenkins")),
            },
            TestCase {
                name: "Jenkins - failing".to_string(),
                set_env: vec!["BUILD_ID".to_string()],
                want: None,
            },
            TestCase {
                name: "GitHub Actions".to_string(),
                set_env: vec!["GITHUB_ACTIONS".to_string()],
                want: Some(get_vendor("GitHub Actions")),
            },
            TestCase {
                name: "Codeship".to_string(),
                set_env: vec!["CI_NAME=codeship".to_string()],
                want: Some(get_vendor("Codeship")),
            },
        ];

        for TestCase {
            name,
            set_env,
            want,
        } in tests
        {
            info!("test case: {}", name);

            let live_ci = if Vendor::get_name() == Some("GitHub Actions") {
                let live_ci = std::env::var("GITHUB_ACTIONS").unwrap_or_default();
                env::remove_var("GITHUB_ACTIONS");
                Some(live_ci)
            } else {
                None
            };

            for env in set_env.iter() {
                let mut env_parts = env.split('=');
                let key = env_parts.next().unwrap();
                let val = env_parts.next().unwrap_or("some value");
                env::set_var(key, val);
            }

            assert_eq!(Vendor::infer_inner(), want.as_ref());

            if Vendor::get_name() == Some("GitHub Actions") {
                if let Some(live_ci) = live_ci {
                    env::set_var("GITHUB_ACTIONS", live_ci);
                } else {
                    env::remove_var("GITHUB_ACTIONS");
                }
            }

            for env in set_env {
                let mut env_parts = env.split('=');
                let key = env_parts.next().unwrap();
                env::remove_var(key);
            }
        }
    }
}
