//! Dependency registry
//!
//! Maps each logical dependency to per-manager package names and to the
//! probes used to tell whether it is already available on the host.

use crate::system::PackageManager;

/// Per-manager package names of one logical dependency
#[derive(Debug, Clone, Copy)]
pub struct Packages {
    pub apt: &'static [&'static str],
    /// Shared by dnf and yum
    pub dnf: &'static [&'static str],
    pub pacman: &'static [&'static str],
    pub zypper: &'static [&'static str],
    pub apk: &'static [&'static str],
    pub brew: &'static [&'static str],
}

impl Packages {
    pub fn for_manager(&self, manager: PackageManager) -> &'static [&'static str] {
        match manager {
            PackageManager::Apt => self.apt,
            PackageManager::Dnf | PackageManager::Yum => self.dnf,
            PackageManager::Pacman => self.pacman,
            PackageManager::Zypper => self.zypper,
            PackageManager::Apk => self.apk,
            PackageManager::Brew => self.brew,
        }
    }
}

/// Static catalog entry for a logical dependency
#[derive(Debug, Clone, Copy)]
pub struct DependencyConfig {
    pub name: &'static str,
    pub packages: Packages,
    /// Names resolvable with `pkg-config --exists`
    pub pkg_config: &'static [&'static str],
    /// Commands whose presence on the search path satisfies the dependency
    pub probe_commands: &'static [&'static str],
    /// Shared-library file name prefixes searched in `LIBRARY_DIRS`
    pub probe_libraries: &'static [&'static str],
}

/// Directories searched for shared libraries
pub const LIBRARY_DIRS: &[&str] = &[
    "/usr/lib",
    "/usr/lib64",
    "/usr/local/lib",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    "/lib",
    "/lib64",
    "/opt/homebrew/lib",
];

/// Needed by every build regardless of extensions
pub const BASE_DEPENDENCIES: &[&str] = &["build-tools", "libxml2", "sqlite3"];

pub const DEPENDENCIES: &[DependencyConfig] = &[
    DependencyConfig {
        name: "build-tools",
        packages: Packages {
            apt: &["build-essential", "autoconf", "bison", "re2c", "pkg-config"],
            dnf: &["gcc", "gcc-c++", "make", "autoconf", "bison", "re2c", "pkgconf-pkg-config"],
            pacman: &["base-devel", "autoconf", "bison", "re2c", "pkgconf"],
            zypper: &["gcc", "gcc-c++", "make", "autoconf", "bison", "re2c", "pkg-config"],
            apk: &["build-base", "autoconf", "bison", "re2c", "pkgconf"],
            brew: &["autoconf", "bison", "re2c", "pkg-config"],
        },
        pkg_config: &[],
        probe_commands: &["cc"],
        probe_libraries: &[],
    },
    DependencyConfig {
        name: "libxml2",
        packages: Packages {
            apt: &["libxml2-dev"],
            dnf: &["libxml2-devel"],
            pacman: &["libxml2"],
            zypper: &["libxml2-devel"],
            apk: &["libxml2-dev"],
            brew: &["libxml2"],
        },
        pkg_config: &["libxml-2.0"],
        probe_commands: &["xml2-config"],
        probe_libraries: &["libxml2.so"],
    },
    DependencyConfig {
        name: "sqlite3",
        packages: Packages {
            apt: &["libsqlite3-dev"],
            dnf: &["sqlite-devel"],
            pacman: &["sqlite"],
            zypper: &["sqlite3-devel"],
            apk: &["sqlite-dev"],
            brew: &["sqlite"],
        },
        pkg_config: &["sqlite3"],
        probe_commands: &[],
        probe_libraries: &["libsqlite3.so"],
    },
    DependencyConfig {
        name: "openssl",
        packages: Packages {
            apt: &["libssl-dev"],
            dnf: &["openssl-devel"],
            pacman: &["openssl"],
            zypper: &["libopenssl-devel"],
            apk: &["openssl-dev"],
            brew: &["openssl@3"],
        },
        pkg_config: &["openssl"],
        probe_commands: &[],
        probe_libraries: &["libssl.so"],
    },
    DependencyConfig {
        name: "libcurl",
        packages: Packages {
            apt: &["libcurl4-openssl-dev"],
            dnf: &["libcurl-devel"],
            pacman: &["curl"],
            zypper: &["libcurl-devel"],
            apk: &["curl-dev"],
            brew: &["curl"],
        },
        pkg_config: &["libcurl"],
        probe_commands: &["curl-config"],
        probe_libraries: &["libcurl.so"],
    },
    DependencyConfig {
        name: "zlib",
        packages: Packages {
            apt: &["zlib1g-dev"],
            dnf: &["zlib-devel"],
            pacman: &["zlib"],
            zypper: &["zlib-devel"],
            apk: &["zlib-dev"],
            brew: &["zlib"],
        },
        pkg_config: &["zlib"],
        probe_commands: &[],
        probe_libraries: &["libz.so"],
    },
    DependencyConfig {
        name: "bzip2",
        packages: Packages {
            apt: &["libbz2-dev"],
            dnf: &["bzip2-devel"],
            pacman: &["bzip2"],
            zypper: &["libbz2-devel"],
            apk: &["bzip2-dev"],
            brew: &["bzip2"],
        },
        pkg_config: &["bzip2"],
        probe_commands: &[],
        probe_libraries: &["libbz2.so"],
    },
    DependencyConfig {
        name: "libpng",
        packages: Packages {
            apt: &["libpng-dev"],
            dnf: &["libpng-devel"],
            pacman: &["libpng"],
            zypper: &["libpng16-devel"],
            apk: &["libpng-dev"],
            brew: &["libpng"],
        },
        pkg_config: &["libpng"],
        probe_commands: &["libpng-config"],
        probe_libraries: &["libpng.so"],
    },
    DependencyConfig {
        name: "libjpeg",
        packages: Packages {
            apt: &["libjpeg-dev"],
            dnf: &["libjpeg-turbo-devel"],
            pacman: &["libjpeg-turbo"],
            zypper: &["libjpeg8-devel"],
            apk: &["libjpeg-turbo-dev"],
            brew: &["jpeg-turbo"],
        },
        pkg_config: &["libjpeg"],
        probe_commands: &[],
        probe_libraries: &["libjpeg.so"],
    },
    DependencyConfig {
        name: "libwebp",
        packages: Packages {
            apt: &["libwebp-dev"],
            dnf: &["libwebp-devel"],
            pacman: &["libwebp"],
            zypper: &["libwebp-devel"],
            apk: &["libwebp-dev"],
            brew: &["webp"],
        },
        pkg_config: &["libwebp"],
        probe_commands: &[],
        probe_libraries: &["libwebp.so"],
    },
    DependencyConfig {
        name: "freetype",
        packages: Packages {
            apt: &["libfreetype-dev"],
            dnf: &["freetype-devel"],
            pacman: &["freetype2"],
            zypper: &["freetype2-devel"],
            apk: &["freetype-dev"],
            brew: &["freetype"],
        },
        pkg_config: &["freetype2"],
        probe_commands: &["freetype-config"],
        probe_libraries: &["libfreetype.so"],
    },
    DependencyConfig {
        name: "libzip",
        packages: Packages {
            apt: &["libzip-dev"],
            dnf: &["libzip-devel"],
            pacman: &["libzip"],
            zypper: &["libzip-devel"],
            apk: &["libzip-dev"],
            brew: &["libzip"],
        },
        pkg_config: &["libzip"],
        probe_commands: &[],
        probe_libraries: &["libzip.so"],
    },
    DependencyConfig {
        name: "oniguruma",
        packages: Packages {
            apt: &["libonig-dev"],
            dnf: &["oniguruma-devel"],
            pacman: &["oniguruma"],
            zypper: &["oniguruma-devel"],
            apk: &["oniguruma-dev"],
            brew: &["oniguruma"],
        },
        pkg_config: &["oniguruma"],
        probe_commands: &[],
        probe_libraries: &["libonig.so"],
    },
    DependencyConfig {
        name: "icu",
        packages: Packages {
            apt: &["libicu-dev"],
            dnf: &["libicu-devel"],
            pacman: &["icu"],
            zypper: &["libicu-devel"],
            apk: &["icu-dev"],
            brew: &["icu4c"],
        },
        pkg_config: &["icu-i18n"],
        probe_commands: &["icu-config"],
        probe_libraries: &["libicuuc.so"],
    },
    DependencyConfig {
        name: "gmp",
        packages: Packages {
            apt: &["libgmp-dev"],
            dnf: &["gmp-devel"],
            pacman: &["gmp"],
            zypper: &["gmp-devel"],
            apk: &["gmp-dev"],
            brew: &["gmp"],
        },
        pkg_config: &["gmp"],
        probe_commands: &[],
        probe_libraries: &["libgmp.so"],
    },
    DependencyConfig {
        name: "libsodium",
        packages: Packages {
            apt: &["libsodium-dev"],
            dnf: &["libsodium-devel"],
            pacman: &["libsodium"],
            zypper: &["libsodium-devel"],
            apk: &["libsodium-dev"],
            brew: &["libsodium"],
        },
        pkg_config: &["libsodium"],
        probe_commands: &[],
        probe_libraries: &["libsodium.so"],
    },
    DependencyConfig {
        name: "libpq",
        packages: Packages {
            apt: &["libpq-dev"],
            dnf: &["libpq-devel"],
            pacman: &["postgresql-libs"],
            zypper: &["postgresql-devel"],
            apk: &["libpq-dev"],
            brew: &["libpq"],
        },
        pkg_config: &["libpq"],
        probe_commands: &["pg_config"],
        probe_libraries: &["libpq.so"],
    },
    DependencyConfig {
        name: "readline",
        packages: Packages {
            apt: &["libreadline-dev"],
            dnf: &["readline-devel"],
            pacman: &["readline"],
            zypper: &["readline-devel"],
            apk: &["readline-dev"],
            brew: &["readline"],
        },
        pkg_config: &["readline"],
        probe_commands: &[],
        probe_libraries: &["libreadline.so"],
    },
    DependencyConfig {
        name: "libxslt",
        packages: Packages {
            apt: &["libxslt1-dev"],
            dnf: &["libxslt-devel"],
            pacman: &["libxslt"],
            zypper: &["libxslt-devel"],
            apk: &["libxslt-dev"],
            brew: &["libxslt"],
        },
        pkg_config: &["libxslt"],
        probe_commands: &["xslt-config"],
        probe_libraries: &["libxslt.so"],
    },
    DependencyConfig {
        name: "gettext",
        packages: Packages {
            apt: &["gettext"],
            dnf: &["gettext-devel"],
            pacman: &["gettext"],
            zypper: &["gettext-tools"],
            apk: &["gettext-dev"],
            brew: &["gettext"],
        },
        pkg_config: &[],
        probe_commands: &["msgfmt"],
        probe_libraries: &["libintl.so"],
    },
    DependencyConfig {
        name: "libffi",
        packages: Packages {
            apt: &["libffi-dev"],
            dnf: &["libffi-devel"],
            pacman: &["libffi"],
            zypper: &["libffi-devel"],
            apk: &["libffi-dev"],
            brew: &["libffi"],
        },
        pkg_config: &["libffi"],
        probe_commands: &[],
        probe_libraries: &["libffi.so"],
    },
    DependencyConfig {
        name: "openldap",
        packages: Packages {
            apt: &["libldap-dev"],
            dnf: &["openldap-devel"],
            pacman: &["libldap"],
            zypper: &["openldap2-devel"],
            apk: &["openldap-dev"],
            brew: &["openldap"],
        },
        pkg_config: &["ldap"],
        probe_commands: &[],
        probe_libraries: &["libldap.so"],
    },
    DependencyConfig {
        name: "libtidy",
        packages: Packages {
            apt: &["libtidy-dev"],
            dnf: &["libtidy-devel"],
            pacman: &["tidy"],
            zypper: &["libtidy-devel"],
            apk: &["tidyhtml-dev"],
            brew: &["tidy-html5"],
        },
        pkg_config: &["tidy"],
        probe_commands: &[],
        probe_libraries: &["libtidy.so"],
    },
    DependencyConfig {
        name: "imagemagick",
        packages: Packages {
            apt: &["libmagickwand-dev"],
            dnf: &["ImageMagick-devel"],
            pacman: &["imagemagick"],
            zypper: &["ImageMagick-devel"],
            apk: &["imagemagick-dev"],
            brew: &["imagemagick"],
        },
        pkg_config: &["MagickWand"],
        probe_commands: &["MagickWand-config"],
        probe_libraries: &["libMagickWand"],
    },
];

/// Look up a logical dependency by name
pub fn find_dependency(name: &str) -> Option<&'static DependencyConfig> {
    DEPENDENCIES.iter().find(|dep| dep.name == name)
}
