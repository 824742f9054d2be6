//! CSV bulk import.
//!
//! The whole input is parsed before any memory is written, so malformed CSV
//! fails the import without side effects. Rows are then created one at a
//! time, each under its own timeout; a failed row is reported and skipped.

use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use xmem_types::config::ImportConfig;
use xmem_types::error::{ImportError, MemoryError};
use xmem_types::import::{ImportSummary, RowFailure};
use xmem_types::memory::CreateMemoryRequest;
use xmem_types::tenant::TenantId;

use super::row::prepare_row;
use crate::repository::memory::MemoryRepository;
use crate::repository::project::ProjectRepository;
use crate::service::memory::MemoryService;

pub struct CsvImporter<M: MemoryRepository, P: ProjectRepository> {
    memories: Arc<MemoryService<M, P>>,
    config: ImportConfig,
}

impl<M: MemoryRepository, P: ProjectRepository> CsvImporter<M, P> {
    pub fn new(memories: Arc<MemoryService<M, P>>, config: ImportConfig) -> Self {
        Self { memories, config }
    }

    /// Import every data row of `input` as a memory owned by `tenant`.
    pub async fn import<R: Read>(
        &self,
        tenant: &TenantId,
        input: R,
    ) -> Result<ImportSummary, ImportError> {
        let (headers, records) = read_records(input)?;
        let imported_at = Utc::now();
        let row_timeout = Duration::from_secs(self.config.row_timeout_secs);

        let mut summary = ImportSummary {
            total_records: records.len(),
            ..Default::default()
        };
        let mut categories = BTreeSet::new();
        let mut tags = BTreeSet::new();

        for (index, values) in records.iter().enumerate() {
            let row = index + 1;
            let Some(prepared) = prepare_row(&headers, values, &self.config, imported_at) else {
                summary.failed.push(RowFailure {
                    row,
                    message: "row has no content".to_string(),
                });
                continue;
            };

            let request = CreateMemoryRequest::new(prepared.content)
                .with_tags(prepared.tags.clone())
                .with_metadata(prepared.metadata);
            let created =
                match tokio::time::timeout(row_timeout, self.memories.create(tenant, request)).await {
                    Ok(result) => result,
                    Err(_) => Err(MemoryError::BackendUnavailable(format!(
                        "row timed out after {}s",
                        row_timeout.as_secs()
                    ))),
                };

            match created {
                Ok(memory) => {
                    summary.imported += 1;
                    summary.memory_ids.push(memory.id);
                    summary.has_metadata |= prepared.has_metadata;
                    categories.extend(prepared.category);
                    tags.extend(prepared.tags);
                }
                Err(e) => {
                    tracing::warn!(tenant_id = %tenant, row, error = %e, "import row failed");
                    summary.failed.push(RowFailure {
                        row,
                        message: e.public_message(),
                    });
                }
            }
        }

        summary.unique_categories = categories.into_iter().collect();
        summary.unique_tags = tags.into_iter().collect();
        tracing::info!(
            tenant_id = %tenant,
            imported = summary.imported,
            failed = summary.failed.len(),
            "csv import finished"
        );
        Ok(summary)
    }
}

/// Parse header and data records. Records whose fields are all blank are
/// skipped; a record with the wrong field count is malformed.
fn read_records<R: Read>(input: R) -> Result<(Vec<String>, Vec<Vec<String>>), ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Malformed {
            record: 0,
            message: e.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::MissingHeader);
    }

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ImportError::Malformed {
            record: index + 1,
            message: e.to_string(),
        })?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::in_process_service;
    use xmem_types::memory::SearchRequest;

    const TWO_ROWS: &str = "title,category,tags,body\n\
        \"Intro\",\"guide\",\"a,b\",\"hello world\"\n\
        \"Setup\",\"howto\",\"b,c\",\"install the toolchain\"\n";

    #[tokio::test]
    async fn test_two_row_import() {
        let (service, repo) = in_process_service();
        let importer = CsvImporter::new(Arc::clone(&service), ImportConfig::default());
        let tenant = TenantId::new("t1");

        let summary = importer.import(&tenant, TWO_ROWS.as_bytes()).await.unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.total_records, 2);
        assert!(summary.has_metadata);
        assert!(summary.unique_categories.contains(&"guide".to_string()));
        assert_eq!(summary.unique_tags, vec!["a", "b", "c"]);
        assert!(summary.failed.is_empty());

        let first = service.get(&tenant, &summary.memory_ids[0]).await.unwrap();
        assert_eq!(first.metadata["tags"], serde_json::json!(["a", "b"]));
        assert!(first.content.contains("body: hello world"));
        assert_eq!(first.tags, vec!["a", "b"]);
        assert_eq!(repo.all().len(), 2);

        let hits = service
            .search(&tenant, &SearchRequest::new("body: hello world"))
            .await
            .unwrap();
        assert_eq!(hits[0].id, first.id);
    }

    #[tokio::test]
    async fn test_bad_row_does_not_abort_batch() {
        let (service, _) = in_process_service();
        let importer = CsvImporter::new(service, ImportConfig::default());
        let long_tag = "t".repeat(80);
        let csv = format!("tags,body\n{long_tag},first\nok,second\n");

        let summary = importer.import(&TenantId::new("t1"), csv.as_bytes()).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].row, 1);
    }

    #[tokio::test]
    async fn test_malformed_csv_fails_before_writing() {
        let (service, repo) = in_process_service();
        let importer = CsvImporter::new(service, ImportConfig::default());
        let csv = "title,body\nok,row\ntoo,many,fields\n";

        let err = importer
            .import(&TenantId::new("t1"), csv.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Malformed { record: 2, .. }));
        assert!(repo.all().is_empty());
    }

    #[tokio::test]
    async fn test_blank_rows_skipped() {
        let (service, _) = in_process_service();
        let importer = CsvImporter::new(service, ImportConfig::default());
        let csv = "title,body\n,\nA,b\n";
        let summary = importer.import(&TenantId::new("t1"), csv.as_bytes()).await.unwrap();
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.imported, 1);
    }
}
