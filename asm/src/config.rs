use crate::error::{Error, Result};
use arch::exe::{BASE_ADDRESS, DEFAULT_STACK_SIZE, FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Knobs of one compilation. Every field has a default, so a config file only
/// names what it changes:
///
/// ```yaml
/// stack_size: 8192
/// output: build/main.vmx
/// isa: isa.yaml
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address of the first body byte.
    pub base_address: u32,
    /// Stack bytes the loader reserves.
    pub stack_size: u64,
    /// Header version tag.
    pub version: u32,
    /// Destination of the image.
    pub output: PathBuf,
    /// Instruction table replacing the builtin one.
    pub isa: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_address: BASE_ADDRESS as u32,
            stack_size: DEFAULT_STACK_SIZE,
            version: FORMAT_VERSION,
            output: PathBuf::from("a.vmx"),
            isa: None,
        }
    }
}

impl Config {
    pub fn from_yaml(src: &str) -> Result<Self> {
        serde_yaml::from_str(src).map_err(|e| Error::Config(String::from("<yaml>"), e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|e| Error::FileOpen(name.clone(), e))?;
        serde_yaml::from_reader(std::io::BufReader::new(file)).map_err(|e| Error::Config(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.base_address, 1024);
        assert_eq!(config.stack_size, 4096);
        assert_eq!(config.version, FORMAT_VERSION);
        assert_eq!(config.isa, None);
    }

    #[test]
    fn partial_yaml() {
        let config = Config::from_yaml("stack_size: 8192\noutput: out.vmx\n").unwrap();
        assert_eq!(config.stack_size, 8192);
        assert_eq!(config.output, PathBuf::from("out.vmx"));
        assert_eq!(config.base_address as i64, BASE_ADDRESS);
    }

    #[test]
    fn unknown_key() {
        assert!(matches!(
            Config::from_yaml("stak_size: 1\n"),
            Err(Error::Config(..))
        ));
    }
}
