use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::BackendError;

mod stage;
mod startup;
mod update;

pub use stage::*;
pub use startup::*;
pub use update::*;

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
	rows.into_iter()
		.map(|row| serde_json::from_value(row).map_err(BackendError::from))
		.collect()
}

fn decode_first<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, BackendError> {
	rows.into_iter()
		.next()
		.map(serde_json::from_value)
		.transpose()
		.map_err(BackendError::from)
}
