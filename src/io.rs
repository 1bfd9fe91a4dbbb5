use std::{
    fs,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{IoError, TraderError, TraderResult};

// ================================================================================================
// Serde Formats
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Eq,
    Hash,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    IntoStaticStr,
    Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SerdeFormat {
    /// Compact binary, used for model checkpoints.
    #[default]
    Postcard,
    Json,
}

impl SerdeFormat {
    pub fn from_path(path: &Path) -> TraderResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| err(&path.display().to_string(), true))?;
        match ext.to_lowercase().as_str() {
            "postcard" => Ok(Self::Postcard),
            "json" => Ok(Self::Json),
            other => Err(err(other, false)),
        }
    }

    pub fn to_vec<T: Serialize>(&self, value: &T) -> TraderResult<Vec<u8>> {
        let bytes = match self {
            Self::Postcard => postcard::to_stdvec(value).map_err(IoError::from)?,
            Self::Json => serde_json::to_vec_pretty(value).map_err(IoError::from)?,
        };
        Ok(bytes)
    }

    pub fn from_slice<T: DeserializeOwned>(&self, bytes: &[u8]) -> TraderResult<T> {
        let value = match self {
            Self::Postcard => postcard::from_bytes(bytes).map_err(IoError::from)?,
            Self::Json => serde_json::from_slice(bytes).map_err(IoError::from)?,
        };
        Ok(value)
    }
}

fn err(s: &str, missing_extension: bool) -> TraderError {
    let msg = if missing_extension {
        format!("missing or invalid extension in path '{s}'")
    } else {
        format!("'{s}'")
    };
    IoError::UnsupportedFormat(msg).into()
}

// ================================================================================================
// Files
// ================================================================================================

/// Serializes `value` to `path`, creating parent directories as needed.
pub fn write_file<T: Serialize>(path: &Path, value: &T, format: SerdeFormat) -> TraderResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            IoError::ReadFailed(format!("failed to create directory {}: {e}", dir.display()))
        })?;
    }
    let bytes = format.to_vec(value)?;
    let mut writer = BufWriter::new(fs::File::create(path).map_err(IoError::from)?);
    writer.write_all(&bytes).map_err(IoError::from)?;
    writer.flush().map_err(IoError::from)?;
    Ok(())
}

pub fn read_file<T: DeserializeOwned>(path: &Path, format: SerdeFormat) -> TraderResult<T> {
    let file = fs::File::open(path)
        .map_err(|e| IoError::ReadFailed(format!("{}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(IoError::from)?;
    format.from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        values: Vec<f64>,
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("qtrader-io-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SerdeFormat::from_path(Path::new("cfg/run.JSON")).expect("json"),
            SerdeFormat::Json
        );
        assert_eq!(
            SerdeFormat::from_path(Path::new("models/x.postcard")).expect("postcard"),
            SerdeFormat::Postcard
        );
        assert!(SerdeFormat::from_path(Path::new("models/x")).is_err());
        assert!(SerdeFormat::from_path(Path::new("models/x.csv")).is_err());
    }

    #[test]
    fn test_write_then_read_creates_directories() {
        let sample = Sample {
            name: "goog".to_string(),
            values: vec![1.5, -2.0],
        };
        for format in [SerdeFormat::Postcard, SerdeFormat::Json] {
            let path = temp_path(&format!("nested/{format}/sample"));
            write_file(&path, &sample, format).expect("write");
            let back: Sample = read_file(&path, format).expect("read");
            assert_eq!(back, sample);
        }
        let _ = fs::remove_dir_all(temp_path(""));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result: TraderResult<Sample> =
            read_file(&temp_path("does-not-exist"), SerdeFormat::Postcard);
        assert!(matches!(
            result,
            Err(TraderError::Io(IoError::ReadFailed(_)))
        ));
    }
}
