#![deny(clippy::all)]

//! Per-package build configuration resolution.
//!
//! Given a package's distribution target, a release channel, and a build
//! mode, computes the flat record of feature flags, version strings,
//! URLs, and environment-sourced secrets that the downstream build
//! pipeline consumes. Channel presets layer field-wise overrides on top
//! of the `stable` base; nothing here is cached or mutated after
//! construction.

mod distribution;
mod env;

use std::{fmt, str::FromStr};

use miette::Diagnostic;
use monoforge_repository::package_graph::Package;
use serde::Serialize;

pub use crate::{
    distribution::{Distribution, DistributionTable},
    env::EnvSnapshot,
};

const DOWNLOAD_URL: &str = "https://acme.dev/download";
const IMAGE_PROXY_URL: &str = "/api/worker/image-proxy";
const LINK_PREVIEW_URL: &str = "/api/worker/link-preview";

const CHANGELOG_URL_STABLE: &str = "https://acme.dev/changelog";
const CHANGELOG_URL_BETA: &str = "https://acme.dev/changelog/beta";
const CHANGELOG_URL_INTERNAL: &str = "https://acme.dev/changelog/internal";
const CHANGELOG_URL_CANARY: &str = "https://acme.dev/changelog/canary";

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("no distribution target registered for package \"{0}\"")]
    DistributionNotFound(String),
    #[error("unsupported build channel \"{0}\", expected one of stable, beta, internal, canary")]
    UnsupportedChannel(String),
    #[error("unsupported build mode \"{0}\", expected development or production")]
    UnsupportedMode(String),
}

/// Release track selecting which preset of build constants applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Beta,
    Internal,
    Canary,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
            Channel::Internal => "internal",
            Channel::Canary => "canary",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Channel::Stable),
            "beta" => Ok(Channel::Beta),
            "internal" => Ok(Channel::Internal),
            "canary" => Ok(Channel::Canary),
            other => Err(Error::UnsupportedChannel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Mode::Development),
            "production" => Ok(Mode::Production),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildFlags {
    pub channel: Channel,
    pub mode: Mode,
}

impl BuildFlags {
    pub fn parse(channel: &str, mode: &str) -> Result<Self, Error> {
        Ok(Self {
            channel: channel.parse()?,
            mode: mode.parse()?,
        })
    }
}

/// The fully resolved configuration for one (package, flags) pair.
///
/// `is_desktop_edition` and `is_native` overlap on the desktop shell on
/// purpose: the desktop app is both the desktop edition of the product
/// and a natively packaged artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub debug: bool,
    pub is_desktop_edition: bool,
    pub is_mobile_edition: bool,
    pub is_electron: bool,
    pub is_web: bool,
    pub is_mobile_web: bool,
    pub is_ios: bool,
    pub is_android: bool,
    pub is_native: bool,
    pub is_admin: bool,
    pub distribution: Distribution,
    pub app_build_type: Channel,
    pub app_version: String,
    pub editor_version: String,
    pub changelog_url: String,
    pub download_url: String,
    pub image_proxy_url: String,
    pub link_preview_url: String,
    pub captcha_site_key: String,
    pub sentry_dsn: String,
    pub mixpanel_token: String,
}

/// Resolves the build configuration for a workspace package.
pub fn resolve_for_package(
    table: &DistributionTable,
    package: &Package,
    flags: BuildFlags,
    env: &EnvSnapshot,
) -> Result<BuildConfig, Error> {
    resolve(table, package.name(), package.version(), flags, env)
}

pub fn resolve(
    table: &DistributionTable,
    package_name: &str,
    app_version: &str,
    flags: BuildFlags,
    env: &EnvSnapshot,
) -> Result<BuildConfig, Error> {
    let distribution = table
        .distribution_of(package_name)
        .ok_or_else(|| Error::DistributionNotFound(package_name.to_string()))?;

    let base = base_preset(distribution, app_version, flags, env);
    let mut config = apply_channel(base, flags.channel);

    // CI builds must stay hermetic: local developer overrides are only
    // honored outside a recognized CI environment.
    if !env.is_ci() {
        if let Some(url) = env.var("CHANGELOG_URL") {
            config.changelog_url = url.to_string();
        }
    }

    Ok(config)
}

/// The `stable` preset every channel derives from. Edition flags are
/// pure set-membership tests against the distribution target.
fn base_preset(
    distribution: Distribution,
    app_version: &str,
    flags: BuildFlags,
    env: &EnvSnapshot,
) -> BuildConfig {
    use Distribution::{Admin, Android, Desktop, Ios, Mobile, Web};

    BuildConfig {
        debug: flags.mode == Mode::Development || env.truthy("BUILD_DEBUG"),
        is_desktop_edition: matches!(distribution, Web | Desktop | Admin),
        is_mobile_edition: matches!(distribution, Mobile | Ios | Android),
        is_electron: distribution == Desktop,
        is_web: distribution == Web,
        is_mobile_web: distribution == Mobile,
        is_ios: distribution == Ios,
        is_android: distribution == Android,
        is_native: matches!(distribution, Desktop | Ios | Android),
        is_admin: distribution == Admin,
        distribution,
        app_build_type: Channel::Stable,
        app_version: app_version.to_string(),
        editor_version: app_version.to_string(),
        changelog_url: CHANGELOG_URL_STABLE.to_string(),
        download_url: DOWNLOAD_URL.to_string(),
        image_proxy_url: IMAGE_PROXY_URL.to_string(),
        link_preview_url: LINK_PREVIEW_URL.to_string(),
        captcha_site_key: env.var_or_default("CAPTCHA_SITE_KEY"),
        sentry_dsn: env.var_or_default("SENTRY_DSN"),
        mixpanel_token: env.var_or_default("MIXPANEL_TOKEN"),
    }
}

/// Field-wise channel override on a copy of the base preset. Only the
/// build type and the changelog location differ per channel.
fn apply_channel(base: BuildConfig, channel: Channel) -> BuildConfig {
    match channel {
        Channel::Stable => base,
        Channel::Beta => BuildConfig {
            app_build_type: Channel::Beta,
            changelog_url: CHANGELOG_URL_BETA.to_string(),
            ..base
        },
        Channel::Internal => BuildConfig {
            app_build_type: Channel::Internal,
            changelog_url: CHANGELOG_URL_INTERNAL.to_string(),
            ..base
        },
        Channel::Canary => BuildConfig {
            app_build_type: Channel::Canary,
            changelog_url: CHANGELOG_URL_CANARY.to_string(),
            ..base
        },
    }
}
