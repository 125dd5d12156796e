//! Windows shares through `net use` on the UNC path.

use std::path::PathBuf;
use std::process::Command;

use super::{ShareConnector, run_share_command, run_share_command_with_input};
use crate::SourceLine;
use crate::error::ShareError;

#[derive(Debug, Clone, Copy, Default)]
pub struct NetUseConnector;

impl NetUseConnector {
    /// Arguments after `net`. The password slot is `*`: `net use` then reads it from stdin, so it
    /// never shows up in the process list.
    pub fn connect_args(line: &SourceLine) -> Vec<String> {
        vec![
            "use".to_string(),
            line.unc_path(),
            "*".to_string(),
            format!("/user:{}", line.username),
            "/persistent:no".to_string(),
        ]
    }
}

impl ShareConnector for NetUseConnector {
    fn connect(&self, line: &SourceLine) -> Result<PathBuf, ShareError> {
        if !cfg!(windows) {
            return Err(ShareError::Unsupported("net-use"));
        }
        let unc = line.unc_path();
        run_share_command_with_input(
            Command::new("net").args(Self::connect_args(line)),
            &line.password,
        )
        .map_err(|reason| ShareError::Connect {
            target: unc.clone(),
            reason,
        })?;
        Ok(PathBuf::from(unc))
    }

    fn disconnect(&self, line: &SourceLine) -> Result<(), ShareError> {
        if !cfg!(windows) {
            return Err(ShareError::Unsupported("net-use"));
        }
        let unc = line.unc_path();
        run_share_command(
            Command::new("net")
                .arg("use")
                .arg(&unc)
                .arg("/delete")
                .arg("/y"),
        )
        .map_err(|reason| ShareError::Disconnect { target: unc, reason })
    }
}
