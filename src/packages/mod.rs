//! Concrete package definitions: built-in ones in code, plus manifests from the configuration file.

pub mod manifest;
pub mod qwt;

pub use manifest::ManifestPackage;
pub use qwt::QwtPackage;

use crate::config::Settings;
use crate::package::Package;
use crate::result::{BuildError, Result};
use serde::Serialize;

pub const BUILTIN_PACKAGES: &[&str] = &[QwtPackage::NAME];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    Builtin,
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    pub name: String,
    pub source: PackageSource,
}

/** Looks up a package definition by name
 *
 * # Resolution
 * - Built-in packages are constructed from the environment snapshot
 * - Anything else must be declared under `[packages.<name>]`
 *
 * # Errors
 * - [`BuildError::Config`] when a manifest shadows a built-in name, or a
 *   built-in package's environment variables are missing
 * - [`BuildError::NotFound`] for unknown names
 */
pub fn resolve(name: &str, settings: &Settings) -> Result<Box<dyn Package>> {
    check_collisions(settings)?;

    match name {
        QwtPackage::NAME => Ok(Box::new(QwtPackage::from_settings(settings)?)),
        _ => settings
            .config()
            .packages
            .get(name)
            .map(|spec| Box::new(ManifestPackage::new(name.into(), spec.clone())) as Box<dyn Package>)
            .ok_or_else(|| BuildError::not_found(format!("Unknown package: {}", name))),
    }
}

/// Every package `resolve` accepts, built-ins first.
pub fn known_packages(settings: &Settings) -> Result<Vec<PackageEntry>> {
    check_collisions(settings)?;

    let mut entries: Vec<PackageEntry> = BUILTIN_PACKAGES
        .iter()
        .map(|name| PackageEntry {
            name: name.to_string(),
            source: PackageSource::Builtin,
        })
        .collect();
    entries.extend(settings.config().packages.keys().map(|name| PackageEntry {
        name: name.to_string(),
        source: PackageSource::Manifest,
    }));
    Ok(entries)
}

fn check_collisions(settings: &Settings) -> Result<()> {
    match BUILTIN_PACKAGES
        .iter()
        .find(|name| settings.config().packages.contains_key(**name))
    {
        Some(name) => Err(BuildError::config(format!(
            "Manifest package '{}' collides with a built-in package",
            name
        ))),
        None => Ok(()),
    }
}
