//! CSV exchange service
//!
//! Writes the tree as flat rows carrying `level` and `path`, and rebuilds
//! documents from such files. Cells go through `FieldValue::to_cell` /
//! `from_cell`, so text that looks numeric keeps its type and an empty
//! cell means the field is absent.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, CsvResultExt, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    flatten, flatten_tree, rebuild, BomDocument, ColumnSchema, FieldValue, FlatRow, Payload,
};
use crate::infrastructure::traits::FileSystem;

/// Which rows go into an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    /// Only rows visible under the current expansion state
    Visible,
    #[default]
    Full,
}

/// Service for reading and writing BOM files.
pub struct ExchangeService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl ExchangeService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Flatten `doc` into rows for the given scope.
    pub fn rows(&self, doc: &BomDocument, scope: ExportScope) -> Vec<FlatRow> {
        let label = &self.settings.label_field;
        match scope {
            ExportScope::Visible => flatten(doc.tree(), doc.visible(), label),
            ExportScope::Full => flatten_tree(doc.tree(), label),
        }
    }

    /// Header order: level, path, schema keys, remaining payload keys sorted.
    fn payload_headers(columns: &ColumnSchema, rows: &[FlatRow]) -> Vec<String> {
        let mut headers: Vec<String> = columns.keys().map(str::to_string).collect();
        let extra: BTreeSet<&String> = rows
            .iter()
            .flat_map(|r| r.payload.keys())
            .filter(|k| columns.get(k).is_none())
            .collect();
        headers.extend(extra.into_iter().cloned());
        headers
    }

    #[instrument(level = "debug", skip(self, doc))]
    pub fn to_csv_string(&self, doc: &BomDocument, scope: ExportScope) -> ApplicationResult<String> {
        let rows = self.rows(doc, scope);
        let keys = Self::payload_headers(&doc.columns, &rows);
        let csv_cfg = &self.settings.csv;
        if let Some(clash) = keys
            .iter()
            .find(|k| **k == csv_cfg.level_header || **k == csv_cfg.path_header)
        {
            return Err(ApplicationError::ReservedColumn(clash.clone()));
        }

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.settings.csv_delimiter()?)
            .from_writer(Vec::new());

        let mut header = vec![
            self.settings.csv.level_header.clone(),
            self.settings.csv.path_header.clone(),
        ];
        header.extend(keys.iter().cloned());
        wtr.write_record(&header).csv_context("write header")?;

        for row in &rows {
            let mut record = vec![
                row.level.to_string(),
                row.joined_path(&self.settings.path_separator),
            ];
            record.extend(
                keys.iter()
                    .map(|k| row.payload.get(k).map(FieldValue::to_cell).unwrap_or_default()),
            );
            wtr.write_record(&record).csv_context("write row")?;
        }

        let bytes = wtr.into_inner().map_err(|e| ApplicationError::OperationFailed {
            context: "flush csv".to_string(),
            source: Box::new(e.into_error()),
        })?;
        debug!("serialized {} rows", rows.len());
        String::from_utf8(bytes).map_err(|e| ApplicationError::OperationFailed {
            context: "csv is not utf-8".to_string(),
            source: Box::new(e),
        })
    }

    /// Write `doc` to `path`; returns the number of data rows.
    #[instrument(level = "debug", skip(self, doc))]
    pub fn export_csv(
        &self,
        doc: &BomDocument,
        scope: ExportScope,
        path: &Path,
    ) -> ApplicationResult<usize> {
        let content = self.to_csv_string(doc, scope)?;
        let count = self.rows(doc, scope).len();
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent of", path)?;
        self.fs
            .write(path, &content)
            .with_path_context("write bom", path)?;
        info!("exported {} rows to {}", count, path.display());
        Ok(count)
    }

    /// Build a document from CSV text.
    #[instrument(level = "debug", skip_all)]
    pub fn parse_csv(&self, content: &str) -> ApplicationResult<BomDocument> {
        let csv_cfg = &self.settings.csv;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.settings.csv_delimiter()?)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .csv_context("read header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let level_idx = headers
            .iter()
            .position(|h| *h == csv_cfg.level_header)
            .ok_or_else(|| ApplicationError::MissingHeader(csv_cfg.level_header.clone()))?;

        let mut rows: Vec<(usize, Payload)> = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.csv_context("read row")?;
            let row = idx + 1;
            let raw_level = record.get(level_idx).unwrap_or("").trim();
            let level = raw_level
                .parse::<usize>()
                .map_err(|_| ApplicationError::InvalidCell {
                    row,
                    column: csv_cfg.level_header.clone(),
                    value: raw_level.to_string(),
                })?;

            let payload: Payload = headers
                .iter()
                .zip(record.iter())
                .enumerate()
                .filter(|(i, (h, _))| *i != level_idx && **h != csv_cfg.path_header)
                .filter_map(|(_, (h, cell))| FieldValue::from_cell(cell).map(|v| (h.clone(), v)))
                .collect();
            rows.push((level, payload));
        }

        let tree = rebuild(rows)?;

        let mut columns = ColumnSchema::bom_default();
        for key in headers
            .iter()
            .filter(|h| **h != csv_cfg.level_header && **h != csv_cfg.path_header)
        {
            if columns.get(key).is_none() {
                columns.add_column(key, key)?;
            }
        }

        let mut doc = BomDocument::from_parts(tree, columns);
        if self.settings.expand_on_import {
            doc.expand_all();
        }
        debug!("parsed {} nodes", doc.tree().len());
        Ok(doc)
    }

    /// Read a document from `path`.
    #[instrument(level = "debug", skip(self))]
    pub fn import_csv(&self, path: &Path) -> ApplicationResult<BomDocument> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read bom", path)?;
        let doc = self.parse_csv(&content)?;
        info!("imported {} nodes from {}", doc.tree().len(), path.display());
        Ok(doc)
    }
}
