use std::{io, path::PathBuf};

use sapling_core::error::ParamError;
use thiserror::Error;

use crate::exitcode;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("refusing to overwrite existing preset {0}")]
    PresetExists(PathBuf),

    #[error("{0}")]
    Param(#[from] ParamError),

    #[error("cannot encode output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                exitcode::NOINPUT
            }
            CliError::Read { .. } | CliError::Write { .. } => exitcode::IOERR,
            CliError::PresetExists(_) => exitcode::CANTCREAT,
            CliError::Param(ParamError::InvalidParameter { .. }) => exitcode::CONFIG,
            CliError::Param(ParamError::Preset(_)) => exitcode::DATAERR,
            CliError::Output(_) => exitcode::SOFTWARE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sapling_core::config::ParameterSet;

    #[test]
    fn exit_codes_follow_the_failure() {
        let missing = CliError::Read {
            path: "nope.json".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(missing.exit_code(), exitcode::NOINPUT);

        let invalid = ParameterSet {
            levels: 0,
            ..ParameterSet::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(CliError::from(invalid).exit_code(), exitcode::CONFIG);

        let malformed = ParameterSet::from_json("{ levels").unwrap_err();
        assert_eq!(CliError::from(malformed).exit_code(), exitcode::DATAERR);

        assert_eq!(
            CliError::PresetExists("a.json".into()).exit_code(),
            exitcode::CANTCREAT
        );
    }
}
