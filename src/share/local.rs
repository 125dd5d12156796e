//! Lines whose "share" is a directory already reachable on this machine.

use std::path::PathBuf;

use super::ShareConnector;
use crate::SourceLine;
use crate::error::ShareError;

/// Root is `<address>/<shared_folder>`; connect only checks that it is a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConnector;

impl LocalConnector {
    pub fn root_for(line: &SourceLine) -> PathBuf {
        PathBuf::from(&line.address).join(&line.shared_folder)
    }
}

impl ShareConnector for LocalConnector {
    fn connect(&self, line: &SourceLine) -> Result<PathBuf, ShareError> {
        let root = Self::root_for(line);
        if root.is_dir() {
            Ok(root)
        } else {
            Err(ShareError::Connect {
                target: root.display().to_string(),
                reason: "directory not found".to_string(),
            })
        }
    }

    fn disconnect(&self, _line: &SourceLine) -> Result<(), ShareError> {
        Ok(())
    }
}
