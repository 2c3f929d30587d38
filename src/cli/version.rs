//! Version command handler

use crate::host::{FRAMEWORK_PACKAGE, HOST_PACKAGE};

/// Display version information
pub fn display_version() {
    println!("{} {}", HOST_PACKAGE, env!("CARGO_PKG_VERSION"));
    println!("  {}", env!("CARGO_PKG_DESCRIPTION"));
    println!("  Framework: {} {}", FRAMEWORK_PACKAGE, env!("CARGO_PKG_VERSION"));
    println!("  License: {}", env!("CARGO_PKG_LICENSE"));
    println!("  Repository: {}", env!("CARGO_PKG_REPOSITORY"));
}
