//! Network filesystem detection, used to pick polling over native change notifications.

use log::debug;
use std::path::Path;
use sysinfo::Disks;

/// Check if filesystem type indicates network storage
#[inline]
pub fn is_network_fs(fs_type: &str) -> bool {
    let fs = fs_type.to_lowercase();
    fs.contains("nfs")
        || fs.contains("smb")
        || fs.contains("cifs")
        || fs.contains("afp")
        || fs.contains("webdav")
}

/// Check if mount point indicates network path
#[inline]
pub fn is_network_mount(mount: &str) -> bool {
    mount.starts_with("\\\\") || mount.starts_with("//")
}

/// True when `path` is a UNC path or lives on a network filesystem mount.
pub fn is_network_path(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    if is_network_mount(&path_str) {
        return true;
    }

    let disks = Disks::new_with_refreshed_list();
    let normalized = path_str.replace('\\', "/");
    let disk = disks
        .iter()
        .filter(|d| {
            let mount = d.mount_point().to_string_lossy().replace('\\', "/");
            normalized.starts_with(&mount)
        })
        .max_by_key(|d| d.mount_point().to_string_lossy().len());

    match disk {
        Some(disk) => {
            let fs_type = disk.file_system().to_string_lossy();
            let mount_point = disk.mount_point().to_string_lossy();
            debug!(
                "Disk detection: path={}, mount={}, fs_type={}",
                path.display(),
                mount_point,
                fs_type
            );
            is_network_fs(&fs_type) || is_network_mount(&mount_point)
        }
        None => {
            debug!("No disk found for path: {}", path.display());
            false
        }
    }
}
