//! Package installation
//!
//! Plugins are ordinary packages installed by an external package manager into
//! a private prefix. The [`PackageInstaller`] trait is the seam the facility
//! talks to; [`NpmInstaller`] drives the `npm` executable.

use super::{PluginError, PluginResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use url::Url;

/// Canonical identity of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
}

/// Where a package is installed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLocator {
    /// `name`, `name@version`, `@scope/name@range`
    Registry {
        name: String,
        version: Option<String>,
    },
    /// Local package directory
    Path(PathBuf),
    /// Remote tarball or git URL
    Url(Url),
    /// Local `.tgz`, `.tar.gz` or `.tar` file
    Archive(PathBuf),
}

const ARCHIVE_SUFFIXES: &[&str] = &[".tgz", ".tar.gz", ".tar"];
const URL_SCHEMES: &[&str] = &[
    "http",
    "https",
    "git",
    "git+ssh",
    "git+http",
    "git+https",
    "git+file",
    "file",
];

impl PackageLocator {
    /// Classify a locator string
    pub fn parse(raw: &str) -> PluginResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PluginError::InvalidLocator(raw.to_string()));
        }

        let is_archive = ARCHIVE_SUFFIXES
            .iter()
            .any(|suffix| trimmed.to_ascii_lowercase().ends_with(suffix));

        if Self::looks_like_path(trimmed) {
            let path = PathBuf::from(trimmed);
            return Ok(if is_archive {
                Self::Archive(path)
            } else {
                Self::Path(path)
            });
        }

        if let Ok(url) = Url::parse(trimmed) {
            if URL_SCHEMES.contains(&url.scheme()) {
                return Ok(Self::Url(url));
            }
        }

        if is_archive {
            return Ok(Self::Archive(PathBuf::from(trimmed)));
        }

        Self::parse_registry(trimmed)
    }

    fn looks_like_path(raw: &str) -> bool {
        raw.starts_with('.')
            || raw.starts_with('/')
            || raw.starts_with('~')
            || raw.starts_with('\\')
            || Path::new(raw).is_absolute()
    }

    fn parse_registry(raw: &str) -> PluginResult<Self> {
        // A leading '@' belongs to the scope, not the version separator
        let (scope_offset, rest) = match raw.strip_prefix('@') {
            Some(rest) => (1, rest),
            None => (0, raw),
        };

        let (name, version) = match rest.find('@') {
            Some(at) => {
                let split = at + scope_offset;
                let version = &raw[split + 1..];
                (
                    &raw[..split],
                    (!version.is_empty()).then(|| version.to_string()),
                )
            }
            None => (raw, None),
        };

        let valid_name = !name.is_empty()
            && name != "@"
            && !name.ends_with('/')
            && name.matches('/').count() == usize::from(name.starts_with('@'))
            && name.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '@' | '~')
            });

        if !valid_name {
            return Err(PluginError::InvalidLocator(raw.to_string()));
        }

        Ok(Self::Registry {
            name: name.to_string(),
            version,
        })
    }

    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Registry { .. })
    }

    /// Package name for registry locators
    pub fn registry_name(&self) -> Option<&str> {
        match self {
            Self::Registry { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Package manager operations used by the plugin facility
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Directory that holds installed packages, one subdirectory per package
    fn modules_dir(&self) -> PathBuf;

    /// Resolve a locator to the name and version of the package it refers to
    async fn resolve_locator(&self, locator: &str) -> PluginResult<PackageIdentity>;

    /// Install a package, returning the package manager output
    async fn install(&self, locator: &str, registry: &str) -> PluginResult<String>;

    /// Remove an installed package
    async fn uninstall(&self, name: &str) -> PluginResult<()>;

    /// Reinstall a registry package at its newest version, returning that version
    async fn update(&self, name: &str, registry: &str) -> PluginResult<String>;

    /// Registry configured in the package manager itself
    async fn default_registry(&self) -> PluginResult<String>;
}

/// Extract the version from a `+ name@version` install output line
pub fn parse_installed_version(output: &str, name: &str) -> Option<String> {
    let prefix = format!("+ {}@", name);
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix(&prefix)
            .map(|version| version.trim().to_string())
            .filter(|version| !version.is_empty())
    })
}

/// Read `name` and `version` from an installed package's `package.json`
pub fn read_package_identity(package_dir: &Path) -> PluginResult<PackageIdentity> {
    #[derive(Deserialize)]
    struct PackageFields {
        name: Option<String>,
        version: Option<String>,
    }

    let path = package_dir.join("package.json");
    let contents = std::fs::read_to_string(&path).map_err(|source| PluginError::Io {
        path: path.clone(),
        source,
    })?;
    let fields: PackageFields =
        serde_json::from_str(&contents).map_err(|source| PluginError::Parse {
            path: path.clone(),
            source,
        })?;

    match (fields.name, fields.version) {
        (Some(name), Some(version)) => Ok(PackageIdentity { name, version }),
        _ => Err(PluginError::InvalidPackageMetadata(format!(
            "{} is missing 'name' or 'version'",
            path.display()
        ))),
    }
}

/// Installer backed by the `npm` executable (or a compatible one)
#[derive(Debug, Clone)]
pub struct NpmInstaller {
    program: String,
    install_root: PathBuf,
}

impl NpmInstaller {
    pub fn new(program: impl Into<String>, install_root: PathBuf) -> Self {
        Self {
            program: platform_program(&program.into(), cfg!(windows)),
            install_root,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Arguments for a global install into the private prefix
    pub fn install_args(&self, locator: &str, registry: &str) -> Vec<String> {
        vec![
            "install".to_string(),
            locator.to_string(),
            "--prefix".to_string(),
            self.install_root.display().to_string(),
            "-g".to_string(),
            "--registry".to_string(),
            registry.to_string(),
            "--legacy-peer-deps".to_string(),
        ]
    }

    pub fn uninstall_args(&self, name: &str) -> Vec<String> {
        vec![
            "uninstall".to_string(),
            name.to_string(),
            "--prefix".to_string(),
            self.install_root.display().to_string(),
            "-g".to_string(),
        ]
    }

    /// Run the package manager to completion, failing on a non-zero exit
    async fn run(&self, args: &[String]) -> PluginResult<String> {
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::debug!("Running package manager: {}", command);

        std::fs::create_dir_all(&self.install_root).map_err(|source| PluginError::Io {
            path: self.install_root.clone(),
            source,
        })?;

        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .current_dir(&self.install_root)
            .env("COREPACK_ENABLE_DOWNLOAD_PROMPT", "0")
            .output()
            .await
            .map_err(|source| PluginError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        Self::check_output(command, output)
    }

    fn check_output(command: String, output: Output) -> PluginResult<String> {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        tracing::debug!("Package manager failed ({}): {}", output.status, detail);

        Err(PluginError::Install {
            command,
            status: output.status.to_string(),
            output: detail,
        })
    }

    /// Ask the package manager for a package's manifest without installing it
    async fn query_metadata(&self, locator: &str) -> PluginResult<PackageIdentity> {
        #[derive(Deserialize)]
        struct PackedManifest {
            name: String,
            version: String,
        }

        let args = vec![
            "pack".to_string(),
            "--dry-run".to_string(),
            "--json".to_string(),
            locator.to_string(),
        ];
        let stdout = self.run(&args).await?;

        let packed: Vec<PackedManifest> = serde_json::from_str(stdout.trim())
            .map_err(|e| PluginError::InvalidPackageMetadata(format!("{}: {}", locator, e)))?;

        packed
            .into_iter()
            .next()
            .map(|manifest| PackageIdentity {
                name: manifest.name,
                version: manifest.version,
            })
            .ok_or_else(|| {
                PluginError::InvalidPackageMetadata(format!("no package reported for {}", locator))
            })
    }
}

#[async_trait]
impl PackageInstaller for NpmInstaller {
    fn modules_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.install_root.join("node_modules")
        } else {
            self.install_root.join("lib").join("node_modules")
        }
    }

    async fn resolve_locator(&self, locator: &str) -> PluginResult<PackageIdentity> {
        match PackageLocator::parse(locator)? {
            PackageLocator::Registry { name, .. } => {
                read_package_identity(&self.modules_dir().join(&name))
            }
            PackageLocator::Url(_) | PackageLocator::Path(_) | PackageLocator::Archive(_) => {
                self.query_metadata(locator).await
            }
        }
    }

    async fn install(&self, locator: &str, registry: &str) -> PluginResult<String> {
        tracing::info!("Installing package '{}' from {}", locator, registry);
        self.run(&self.install_args(locator, registry)).await
    }

    async fn uninstall(&self, name: &str) -> PluginResult<()> {
        tracing::info!("Uninstalling package '{}'", name);
        self.run(&self.uninstall_args(name)).await?;
        Ok(())
    }

    async fn update(&self, name: &str, registry: &str) -> PluginResult<String> {
        tracing::info!("Updating package '{}' from {}", name, registry);
        let output = self.run(&self.install_args(name, registry)).await?;

        parse_installed_version(&output, name).ok_or_else(|| PluginError::VersionNotReported {
            package: name.to_string(),
            output,
        })
    }

    async fn default_registry(&self) -> PluginResult<String> {
        let args = vec![
            "config".to_string(),
            "get".to_string(),
            "registry".to_string(),
        ];
        Ok(self.run(&args).await?.trim().to_string())
    }
}

/// npm-style tools are `.cmd` shims on Windows, which process spawning does not resolve
fn platform_program(program: &str, windows: bool) -> String {
    if windows && Path::new(program).extension().is_none() {
        return format!("{}.cmd", program);
    }
    program.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_windows_program_shim() {
        assert_eq!(platform_program("npm", true), "npm.cmd");
        assert_eq!(platform_program("npm", false), "npm");
        assert_eq!(platform_program("pnpm.cmd", true), "pnpm.cmd");
        assert_eq!(platform_program("C:\\tools\\npm.exe", true), "C:\\tools\\npm.exe");
    }

    #[test]
    fn test_program_name_on_this_platform() {
        let installer = NpmInstaller::new("npm", PathBuf::from("/tmp/plugins"));
        let expected = if cfg!(windows) { "npm.cmd" } else { "npm" };
        assert_eq!(installer.program(), expected);
    }

    #[test]
    fn test_registry_locators() {
        assert_eq!(
            PackageLocator::parse("sample-plugin").unwrap(),
            PackageLocator::Registry {
                name: "sample-plugin".to_string(),
                version: None
            }
        );
        assert_eq!(
            PackageLocator::parse("sample-plugin@1.2.3").unwrap(),
            PackageLocator::Registry {
                name: "sample-plugin".to_string(),
                version: Some("1.2.3".to_string())
            }
        );
        assert_eq!(
            PackageLocator::parse("@acme/db@^2.0.0").unwrap(),
            PackageLocator::Registry {
                name: "@acme/db".to_string(),
                version: Some("^2.0.0".to_string())
            }
        );
        assert_eq!(
            PackageLocator::parse("@acme/db").unwrap().registry_name(),
            Some("@acme/db")
        );
    }

    #[test]
    fn test_path_locators() {
        assert_eq!(
            PackageLocator::parse("./sample").unwrap(),
            PackageLocator::Path(PathBuf::from("./sample"))
        );
        assert_eq!(
            PackageLocator::parse("../plugins/db").unwrap(),
            PackageLocator::Path(PathBuf::from("../plugins/db"))
        );
        assert!(matches!(
            PackageLocator::parse("/opt/plugins/db").unwrap(),
            PackageLocator::Path(_)
        ));
    }

    #[test]
    fn test_archive_locators() {
        assert_eq!(
            PackageLocator::parse("./db-1.0.0.tgz").unwrap(),
            PackageLocator::Archive(PathBuf::from("./db-1.0.0.tgz"))
        );
        assert_eq!(
            PackageLocator::parse("db-1.0.0.tar.gz").unwrap(),
            PackageLocator::Archive(PathBuf::from("db-1.0.0.tar.gz"))
        );
    }

    #[test]
    fn test_url_locators() {
        assert!(matches!(
            PackageLocator::parse("https://example.com/db-1.0.0.tgz").unwrap(),
            PackageLocator::Url(_)
        ));
        assert!(matches!(
            PackageLocator::parse("git+https://github.com/acme/db.git").unwrap(),
            PackageLocator::Url(_)
        ));
    }

    #[test]
    fn test_invalid_locators() {
        assert!(PackageLocator::parse("").is_err());
        assert!(PackageLocator::parse("   ").is_err());
        assert!(PackageLocator::parse("bad name").is_err());
        assert!(PackageLocator::parse("a/b/c").is_err());
    }

    #[test]
    fn test_parse_installed_version() {
        let output = "\n> postinstall\n+ sample-plugin@1.4.2\nadded 12 packages in 3s\n";
        assert_eq!(
            parse_installed_version(output, "sample-plugin"),
            Some("1.4.2".to_string())
        );
    }

    #[test]
    fn test_parse_installed_version_scoped() {
        let output = "+ @acme/db@2.0.0-beta.1\n";
        assert_eq!(
            parse_installed_version(output, "@acme/db"),
            Some("2.0.0-beta.1".to_string())
        );
    }

    #[test]
    fn test_parse_installed_version_missing() {
        assert_eq!(parse_installed_version("up to date", "sample-plugin"), None);
        assert_eq!(parse_installed_version("+ other@1.0.0", "sample-plugin"), None);
    }

    #[test]
    fn test_install_args() {
        let installer = NpmInstaller::new("npm", PathBuf::from("/tmp/plugins"));
        let args = installer.install_args("sample-plugin", "https://registry.npmjs.org/");
        assert_eq!(
            args,
            vec![
                "install",
                "sample-plugin",
                "--prefix",
                "/tmp/plugins",
                "-g",
                "--registry",
                "https://registry.npmjs.org/",
                "--legacy-peer-deps",
            ]
        );
    }

    #[test]
    fn test_read_package_identity() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("package.json"),
            r#"{ "name": "sample-plugin", "version": "1.0.0" }"#,
        )
        .unwrap();

        let identity = read_package_identity(temp_dir.path()).unwrap();
        assert_eq!(identity.name, "sample-plugin");
        assert_eq!(identity.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_resolve_registry_locator_reads_installed_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let installer = NpmInstaller::new("npm", temp_dir.path().to_path_buf());
        let package_dir = installer.modules_dir().join("sample-plugin");
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(
            package_dir.join("package.json"),
            r#"{ "name": "sample-plugin", "version": "3.1.0" }"#,
        )
        .unwrap();

        let identity = installer
            .resolve_locator("sample-plugin@^3.0.0")
            .await
            .unwrap();
        assert_eq!(identity.version, "3.1.0");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let installer = NpmInstaller::new(
            "plugdeck-no-such-package-manager",
            temp_dir.path().to_path_buf(),
        );

        let result = installer.uninstall("sample-plugin").await;
        assert!(matches!(result, Err(PluginError::Spawn { .. })));
    }
}
