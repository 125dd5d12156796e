//! Linux shares mounted with `mount -t cifs` under a per-alias mount point.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::network::is_network_path;
use super::{ShareConnector, run_share_command};
use crate::SourceLine;
use crate::error::ShareError;

#[derive(Debug, Clone)]
pub struct CifsConnector {
    mount_base: PathBuf,
}

impl CifsConnector {
    pub fn new(mount_base: &Path) -> Self {
        Self {
            mount_base: mount_base.to_path_buf(),
        }
    }

    /// `<mount_base>/<alias>`
    pub fn mount_point(&self, line: &SourceLine) -> PathBuf {
        self.mount_base.join(&line.alias)
    }

    /// `//<address>/<shared_folder>`
    pub fn remote(line: &SourceLine) -> String {
        format!("//{}/{}", line.address, line.shared_folder)
    }
}

impl ShareConnector for CifsConnector {
    fn connect(&self, line: &SourceLine) -> Result<PathBuf, ShareError> {
        if !cfg!(target_os = "linux") {
            return Err(ShareError::Unsupported("cifs"));
        }
        let remote = Self::remote(line);
        let mount_point = self.mount_point(line);
        fs::create_dir_all(&mount_point).map_err(|e| ShareError::Connect {
            target: remote.clone(),
            reason: format!("cannot create mount point {}: {}", mount_point.display(), e),
        })?;
        if is_network_path(&mount_point) {
            debug!("[{}] {} already mounted", line.alias, mount_point.display());
            return Ok(mount_point);
        }
        // mount.cifs reads the password from PASSWD, keeping it off the command line.
        run_share_command(
            Command::new("mount")
                .arg("-t")
                .arg("cifs")
                .arg(&remote)
                .arg(&mount_point)
                .arg("-o")
                .arg(format!("username={},ro", line.username))
                .env("PASSWD", &line.password),
        )
        .map_err(|reason| ShareError::Connect {
            target: remote,
            reason,
        })?;
        Ok(mount_point)
    }

    fn disconnect(&self, line: &SourceLine) -> Result<(), ShareError> {
        if !cfg!(target_os = "linux") {
            return Err(ShareError::Unsupported("cifs"));
        }
        let mount_point = self.mount_point(line);
        if !is_network_path(&mount_point) {
            debug!("[{}] {} is not mounted", line.alias, mount_point.display());
            return Ok(());
        }
        run_share_command(Command::new("umount").arg(&mount_point)).map_err(|reason| {
            ShareError::Disconnect {
                target: mount_point.display().to_string(),
                reason,
            }
        })
    }
}
