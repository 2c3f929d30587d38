//! Module resolution redirect
//!
//! Plugins are installed with their own dependency trees, which may contain a
//! private copy of the host package. While a redirect is installed, module
//! requests naming the host (or another shared package) resolve into the host's
//! own installation so every plugin sees one instance of the shared internals.

use super::{PluginError, PluginResult};
use std::path::{Path, PathBuf};

/// Redirects plugin module requests for shared packages to the host installation
#[derive(Debug)]
pub struct ModuleResolutionRedirector {
    host_package: String,
    host_root: PathBuf,
    active: Option<Vec<String>>,
}

impl ModuleResolutionRedirector {
    pub fn new(host_package: impl Into<String>, host_root: PathBuf) -> Self {
        Self {
            host_package: host_package.into(),
            host_root,
            active: None,
        }
    }

    /// Start redirecting requests for the given package names
    pub fn install(&mut self, whitelist: &[String]) -> PluginResult<()> {
        if self.active.is_some() {
            return Err(PluginError::AlreadyInstalled);
        }
        tracing::debug!("Installing module redirect for: {}", whitelist.join(", "));
        self.active = Some(whitelist.to_vec());
        Ok(())
    }

    /// Stop redirecting
    pub fn teardown(&mut self) -> PluginResult<()> {
        if self.active.take().is_none() {
            return Err(PluginError::NotInstalled);
        }
        tracing::debug!("Module redirect removed");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Map a module request into the host installation, if it names a shared package
    pub fn resolve(&self, request: &str) -> Option<PathBuf> {
        let whitelist = self.active.as_ref()?;
        let shared = whitelist
            .iter()
            .find(|name| Self::names_package(request, name))?;

        let subpath = request[shared.len()..].trim_start_matches('/');
        let base = if *shared == self.host_package {
            self.host_root.clone()
        } else {
            let mut base = self.host_root.join("node_modules");
            for segment in shared.split('/') {
                base.push(segment);
            }
            base
        };

        Some(if subpath.is_empty() {
            base
        } else {
            base.join(subpath)
        })
    }

    /// Resolve a handler or health check reference to an existing file
    pub fn locate(&self, plugin_root: &Path, request: &str) -> Option<PathBuf> {
        let candidate = match self.resolve(request) {
            Some(redirected) => redirected,
            None if Path::new(request).is_absolute() => PathBuf::from(request),
            None => plugin_root.join(request.strip_prefix("./").unwrap_or(request)),
        };

        if candidate.is_file() {
            return Some(candidate);
        }

        let mut with_extension = candidate.into_os_string();
        with_extension.push(".js");
        let with_extension = PathBuf::from(with_extension);
        with_extension.is_file().then_some(with_extension)
    }

    fn names_package(request: &str, package: &str) -> bool {
        request == package
            || request
                .strip_prefix(package)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}
