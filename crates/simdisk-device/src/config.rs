use std::path::PathBuf;
use std::str::FromStr;

use simdisk_backend::BackendTarget;

use crate::ConfigError;

/// Optional protocol prefix of the open string.
pub const PROTOCOL_PREFIX: &str = "disksim:";

/// Parsed device open string: `[disksim:]<params-file>:<output-file>:<backend-target>`.
///
/// The backend target is everything after the second colon, so it may itself contain colons
/// (`raw:disk.img`, `mem:1048576`). The params and output paths therefore cannot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub params: PathBuf,
    pub output: PathBuf,
    pub target: BackendTarget,
}

impl FromStr for DeviceConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        let s = s.strip_prefix(PROTOCOL_PREFIX).unwrap_or(s);
        let mut fields = s.splitn(3, ':');
        let mut field = |name: &'static str| {
            fields
                .next()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingField(name))
        };

        let params = field("simulator parameter file")?;
        let output = field("simulator output file")?;
        let target = field("backend target")?;

        Ok(Self {
            params: PathBuf::from(params),
            output: PathBuf::from(output),
            target: target
                .parse()
                .map_err(|err: simdisk_backend::BackendError| {
                    ConfigError::InvalidTarget(err.to_string())
                })?,
        })
    }
}
