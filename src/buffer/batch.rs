use crate::domain::{DataType, HostMetrics, Item, ValidationError};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Cannot encode discovery value: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Items waiting for the next send, all encoded for a single data type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemBatch {
    data_type: Option<DataType>,
    items: Vec<Item>,
}

impl ItemBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Sets the encoding for subsequent appends. Switching away from a
    /// different type drops the items already collected.
    pub fn set_data_type(&mut self, data_type: DataType) {
        if let Some(current) = self.data_type
            && current != data_type
            && !self.items.is_empty()
        {
            debug!(
                "data_type changed from {} to {}, dropping {} items",
                current,
                data_type,
                self.items.len()
            );
            self.items.clear();
        }
        self.data_type = Some(data_type);
    }

    pub fn append(
        &mut self,
        host: impl Into<String>,
        key: impl Into<String>,
        value: Value,
        clock: i64,
    ) -> Result<(), BatchError> {
        let item = match self.data_type {
            Some(DataType::Items) => Item::new(host, key, value, clock),
            Some(DataType::Lld) => Item::discovery(host, key, value, clock)?,
            None => return Err(ValidationError::DataTypeNotConfigured.into()),
        };
        self.items.push(item);
        Ok(())
    }

    /// Appends every host/key/value triple, skipping `[]` values, and returns
    /// the number of items added.
    pub fn add_bulk(&mut self, data: &HostMetrics, clock: i64) -> Result<usize, BatchError> {
        if self.data_type.is_none() {
            return Err(ValidationError::DataTypeNotConfigured.into());
        }

        let mut added = 0;
        for (host, metrics) in data {
            for (key, value) in metrics {
                if matches!(value, Value::Array(values) if values.is_empty()) {
                    continue;
                }
                self.append(host.as_str(), key.as_str(), value.clone(), clock)?;
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drops the items and forgets the data type.
    pub fn reset(&mut self) {
        self.items.clear();
        self.data_type = None;
    }
}
