//! Host identity for machine-wide clients.
//!
//! A machine-wide client reports the host's machine id as its user id and
//! the current boot id as its session id.

use std::path::Path;

use crate::error::OmahaError;

/// Systemd machine id, a 32 character hex string.
pub const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Kernel boot id, a dashed 36 character UUID.
pub const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";

const MIN_MACHINE_ID_LEN: usize = 32;
const MIN_BOOT_ID_LEN: usize = 36;

/// Persistent machine id plus per-boot id of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIdentity {
    machine_id: String,
    boot_id: String,
}

impl MachineIdentity {
    /// Trim and validate raw identifiers.
    pub fn from_parts(machine_id: &str, boot_id: &str) -> Result<Self, OmahaError> {
        let machine_id = machine_id.trim();
        if machine_id.len() < MIN_MACHINE_ID_LEN {
            return Err(OmahaError::Config(format!(
                "incomplete machine id: {machine_id:?}"
            )));
        }

        let boot_id = boot_id.trim();
        if boot_id.len() < MIN_BOOT_ID_LEN {
            return Err(OmahaError::Config(format!("incomplete boot id: {boot_id:?}")));
        }

        Ok(Self {
            machine_id: machine_id.to_string(),
            boot_id: boot_id.to_string(),
        })
    }

    /// Read the identity of the running host.
    #[cfg(target_os = "linux")]
    pub fn read() -> Result<Self, OmahaError> {
        Self::read_from(Path::new(MACHINE_ID_PATH), Path::new(BOOT_ID_PATH))
    }

    /// Read the identity from the given files.
    pub fn read_from(machine_id_path: &Path, boot_id_path: &Path) -> Result<Self, OmahaError> {
        let machine_id = std::fs::read_to_string(machine_id_path)
            .map_err(|e| OmahaError::Config(format!("failed to read machine id: {e}")))?;
        let boot_id = std::fs::read_to_string(boot_id_path)
            .map_err(|e| OmahaError::Config(format!("failed to read boot id: {e}")))?;
        Self::from_parts(&machine_id, &boot_id)
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn boot_id(&self) -> &str {
        &self.boot_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MACHINE_ID: &str = "0123456789abcdef0123456789abcdef";
    const BOOT_ID: &str = "7d52a1cc-7066-40f0-91c7-7cb6a871bfde";

    #[test]
    fn test_from_parts_trims() {
        let id = MachineIdentity::from_parts(&format!("{MACHINE_ID}\n"), &format!(" {BOOT_ID}\n"))
            .unwrap();
        assert_eq!(id.machine_id(), MACHINE_ID);
        assert_eq!(id.boot_id(), BOOT_ID);
    }

    #[test]
    fn test_short_ids_rejected() {
        assert!(MachineIdentity::from_parts("abc", BOOT_ID).is_err());
        assert!(MachineIdentity::from_parts(MACHINE_ID, "7d52a1cc").is_err());
    }

    #[test]
    fn test_read_from_files() {
        let dir = TempDir::new().unwrap();
        let machine = dir.path().join("machine-id");
        let boot = dir.path().join("boot_id");
        std::fs::write(&machine, format!("{MACHINE_ID}\n")).unwrap();
        std::fs::write(&boot, format!("{BOOT_ID}\n")).unwrap();

        let id = MachineIdentity::read_from(&machine, &boot).unwrap();
        assert_eq!(id.machine_id(), MACHINE_ID);

        let missing = dir.path().join("missing");
        assert!(MachineIdentity::read_from(&missing, &boot).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_host_identity() {
        // Containers often lack a machine id.
        let (Ok(machine_id), Ok(boot_id)) = (
            std::fs::read_to_string(MACHINE_ID_PATH),
            std::fs::read_to_string(BOOT_ID_PATH),
        ) else {
            return;
        };
        if let Ok(id) = MachineIdentity::read() {
            assert_eq!(id.machine_id(), machine_id.trim());
            assert_eq!(id.boot_id(), boot_id.trim());
        }
    }
}
