//! Ubicaciones de datos: entradas de importación (`s3://BUCKET/KEY.csv`),
//! entradas batch (`s3://BUCKET/KEY.json`) y destinos batch
//! (`s3://BUCKET/PREFIX/`).

use std::fmt;

use crate::errors::FlowError;

const SCHEME: &str = "s3://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocation {
    pub bucket: String,
    pub key: String,
}

impl DataLocation {
    /// Valida el formato antes de tocar el backend.
    pub fn parse(raw: &str) -> Result<Self, FlowError> {
        Self::parse_ending(raw, ".csv", "s3://BUCKET_NAME/XYZ.csv")
    }

    /// Entrada de un job batch.
    pub fn parse_json_input(raw: &str) -> Result<Self, FlowError> {
        Self::parse_ending(raw, ".json", "s3://BUCKET_NAME/XYZ.json")
    }

    /// Destino de un job batch: un prefijo terminado en `/`.
    pub fn parse_output_prefix(raw: &str) -> Result<Self, FlowError> {
        Self::parse_ending(raw, "/", "s3://BUCKET_NAME/PREFIX/")
    }

    fn parse_ending(raw: &str, ending: &str, expected: &str) -> Result<Self, FlowError> {
        let invalid = || FlowError::Validation(format!("invalid data location, expected {expected} but got `{raw}`"));
        let rest = raw.trim().strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || key.is_empty() || !key.ends_with(ending) {
            return Err(invalid());
        }
        Ok(Self { bucket: bucket.to_string(),
                  key: key.to_string() })
    }

    pub fn uri(&self) -> String {
        format!("{SCHEME}{}/{}", self.bucket, self.key)
    }
}

impl fmt::Display for DataLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.bucket, self.key)
    }
}
