//! Extension catalog
//!
//! Each extension is enabled either through `configure` flags at build time
//! or, for PECL modules, by a separate build against the installed PHP.

use crate::error::{PhpsmithError, PhpsmithResult};
use std::collections::BTreeSet;

/// How an extension gets into an installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMechanism {
    /// Compiled in through `configure` flags
    Configure,
    /// Built as a shared module with the installed `phpize`
    Module {
        /// Loaded with `zend_extension=` rather than `extension=`
        zend: bool,
    },
}

/// Static catalog entry
#[derive(Debug, Clone, Copy)]
pub struct ExtensionDefinition {
    pub name: &'static str,
    /// Flags passed to `configure`; empty for modules
    pub configure_flags: &'static [&'static str],
    /// Logical dependencies, keys into the dependency catalog
    pub dependencies: &'static [&'static str],
    pub mechanism: InstallMechanism,
}

impl ExtensionDefinition {
    /// Installed post-build rather than through `configure`
    pub fn is_alternate_mechanism(&self) -> bool {
        matches!(self.mechanism, InstallMechanism::Module { .. })
    }
}

const fn configure(
    name: &'static str,
    configure_flags: &'static [&'static str],
    dependencies: &'static [&'static str],
) -> ExtensionDefinition {
    ExtensionDefinition {
        name,
        configure_flags,
        dependencies,
        mechanism: InstallMechanism::Configure,
    }
}

const fn module(
    name: &'static str,
    dependencies: &'static [&'static str],
    zend: bool,
) -> ExtensionDefinition {
    ExtensionDefinition {
        name,
        configure_flags: &[],
        dependencies,
        mechanism: InstallMechanism::Module { zend },
    }
}

/// Every extension phpsmith knows how to enable
pub const EXTENSIONS: &[ExtensionDefinition] = &[
    configure("bcmath", &["--enable-bcmath"], &[]),
    configure("bz2", &["--with-bz2"], &["bzip2"]),
    configure("calendar", &["--enable-calendar"], &[]),
    configure("curl", &["--with-curl"], &["libcurl"]),
    configure("exif", &["--enable-exif"], &[]),
    configure("ffi", &["--with-ffi"], &["libffi"]),
    configure("ftp", &["--enable-ftp"], &[]),
    configure(
        "gd",
        &["--enable-gd", "--with-jpeg", "--with-webp", "--with-freetype"],
        &["libpng", "libjpeg", "libwebp", "freetype"],
    ),
    configure("gettext", &["--with-gettext"], &["gettext"]),
    configure("gmp", &["--with-gmp"], &["gmp"]),
    configure("intl", &["--enable-intl"], &["icu"]),
    configure("ldap", &["--with-ldap"], &["openldap"]),
    configure("mbstring", &["--enable-mbstring"], &["oniguruma"]),
    configure("mysqli", &["--with-mysqli=mysqlnd"], &[]),
    configure("opcache", &["--enable-opcache"], &[]),
    configure("openssl", &["--with-openssl"], &["openssl"]),
    configure("pcntl", &["--enable-pcntl"], &[]),
    configure("pdo_mysql", &["--with-pdo-mysql=mysqlnd"], &[]),
    configure("pdo_pgsql", &["--with-pdo-pgsql"], &["libpq"]),
    configure("pdo_sqlite", &["--with-pdo-sqlite"], &["sqlite3"]),
    configure("pgsql", &["--with-pgsql"], &["libpq"]),
    configure("readline", &["--with-readline"], &["readline"]),
    configure("soap", &["--enable-soap"], &["libxml2"]),
    configure("sockets", &["--enable-sockets"], &[]),
    configure("sodium", &["--with-sodium"], &["libsodium"]),
    configure("sqlite3", &["--with-sqlite3"], &["sqlite3"]),
    configure("tidy", &["--with-tidy"], &["libtidy"]),
    configure("xsl", &["--with-xsl"], &["libxslt"]),
    configure("zip", &["--with-zip"], &["libzip"]),
    configure("zlib", &["--with-zlib"], &["zlib"]),
    module("apcu", &[], false),
    module("imagick", &["imagemagick"], false),
    module("mongodb", &["openssl"], false),
    module("redis", &[], false),
    module("xdebug", &[], true),
];

/// Enabled when the caller requests no explicit set
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "bcmath", "curl", "exif", "intl", "mbstring", "mysqli", "opcache", "openssl", "pdo_mysql",
    "pdo_sqlite", "sockets", "sqlite3", "zip", "zlib",
];

/// Look up a catalog entry by name
pub fn find_extension(name: &str) -> Option<&'static ExtensionDefinition> {
    EXTENSIONS.iter().find(|ext| ext.name == name)
}

/// Normalize requested names and reject unknown extensions
pub fn validate_extensions<I, S>(names: I) -> PhpsmithResult<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for name in names {
        let name = name.as_ref().trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        if find_extension(&name).is_none() {
            return Err(PhpsmithError::UnknownExtension(name));
        }
        set.insert(name);
    }
    Ok(set)
}

/// `configure` flags contributed by an extension set, in catalog order.
/// Module extensions contribute nothing here.
pub fn configure_flags(extensions: &BTreeSet<String>) -> Vec<String> {
    EXTENSIONS
        .iter()
        .filter(|ext| extensions.contains(ext.name))
        .flat_map(|ext| ext.configure_flags.iter().map(|f| f.to_string()))
        .collect()
}

/// Module extensions of a set
pub fn module_extensions(extensions: &BTreeSet<String>) -> Vec<&'static ExtensionDefinition> {
    extensions
        .iter()
        .filter_map(|name| find_extension(name))
        .filter(|ext| ext.is_alternate_mechanism())
        .collect()
}

/// Whether switching between two sets changes any configure-flag extension
pub fn requires_rebuild(current: &BTreeSet<String>, proposed: &BTreeSet<String>) -> bool {
    current
        .symmetric_difference(proposed)
        .filter_map(|name| find_extension(name))
        .any(|ext| !ext.is_alternate_mechanism())
}
