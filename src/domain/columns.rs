//! Column schema: which payload keys are exposed, in which order.
//!
//! The schema is a display binding only. Removing a column never touches
//! the payload values stored on nodes.

use crate::domain::error::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Payload key
    pub key: String,
    /// Header text
    pub label: String,
    pub editable: bool,
    pub required: bool,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            editable: true,
            required: false,
        }
    }

    fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    /// EPL-style BOM header.
    pub fn bom_default() -> Self {
        let columns = vec![
            Column::new("customer", "Customer"),
            Column::new("carModel", "Car Model"),
            Column::new("project", "Project"),
            Column::new("partNumber", "Part No").required(),
            Column::new("sonPartNumber", "S/ON Part No"),
            Column::new("altPartNumber", "Alt Part No"),
            Column::new("partName", "Part Name").required(),
            Column::new("quantity", "U/S").required(),
            Column::new("image", "Image").read_only(),
            Column::new("material", "Material"),
            Column::new("surfaceTreatment", "Surface Treatment"),
            Column::new("drawing2d", "2D").read_only(),
            Column::new("drawing3d", "3D").read_only(),
            Column::new("eoNo", "EO No"),
            Column::new("changeNotice", "C/N"),
            Column::new("type", "Type"),
            Column::new("mfg1", "Mfg 1"),
            Column::new("mfg2", "Mfg 2"),
            Column::new("mfg3", "Mfg 3"),
            Column::new("remarks", "Remarks"),
        ];
        Self { columns }
    }

    /// Append an editable column. Keys are unique.
    pub fn add_column(&mut self, key: &str, label: &str) -> DomainResult<()> {
        if self.get(key).is_some() {
            return Err(DomainError::DuplicateColumn(key.to_string()));
        }
        self.columns.push(Column::new(key, label));
        Ok(())
    }

    pub fn remove_column(&mut self, key: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.key == key)?;
        Some(self.columns.remove(pos))
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
