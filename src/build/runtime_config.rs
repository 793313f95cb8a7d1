//! php.ini and php-fpm.conf provisioning
//!
//! Files are only ever created; an existing file belongs to the user.

use crate::config::Layout;
use crate::error::{PhpsmithError, PhpsmithResult};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Fallback when the source tree ships no template
const MINIMAL_INI: &str = "\
; Generated by phpsmith
memory_limit = 256M
error_reporting = E_ALL
display_errors = On
date.timezone = UTC
";

fn fpm_config(layout: &Layout, line: &str) -> String {
    let run_dir = layout.run_dir();
    let logs_dir = layout.logs_dir();
    format!(
        "\
; Generated by phpsmith for PHP {line}
[global]
pid = {pid}
error_log = {error_log}

[www]
listen = {socket}
listen.mode = 0660
pm = dynamic
pm.max_children = 5
pm.start_servers = 2
pm.min_spare_servers = 1
pm.max_spare_servers = 3
",
        line = line,
        pid = run_dir.join(format!("php{}-fpm.pid", line)).display(),
        error_log = logs_dir.join(format!("php{}-fpm.log", line)).display(),
        socket = layout.fpm_socket(line).display(),
    )
}

async fn write_if_absent(path: &Path, content: &[u8]) -> PhpsmithResult<bool> {
    if fs::try_exists(path).await.unwrap_or(false) {
        debug!("Keeping existing {}", path.display());
        return Ok(false);
    }
    fs::write(path, content)
        .await
        .map_err(|e| PhpsmithError::io(format!("writing {}", path.display()), e))?;
    Ok(true)
}

/// Seed the per-line configuration directory.
///
/// `source_dir` is the unpacked source tree, whose `php.ini-development`
/// seeds `php.ini`.
pub async fn provision(layout: &Layout, line: &str, source_dir: Option<&Path>) -> PhpsmithResult<()> {
    for dir in [layout.conf_d_dir(line), layout.run_dir()] {
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PhpsmithError::io(format!("creating {}", dir.display()), e))?;
    }

    let template = match source_dir {
        Some(dir) => fs::read(dir.join("php.ini-development")).await.ok(),
        None => None,
    };
    let ini = template.unwrap_or_else(|| MINIMAL_INI.as_bytes().to_vec());
    if write_if_absent(&layout.ini_path(line), &ini).await? {
        info!("Created {}", layout.ini_path(line).display());
    }

    let fpm = fpm_config(layout, line);
    if write_if_absent(&layout.fpm_config_path(line), fpm.as_bytes()).await? {
        info!("Created {}", layout.fpm_config_path(line).display());
    }

    Ok(())
}
