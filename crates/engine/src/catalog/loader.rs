//! 카탈로그 로더 -- YAML 카탈로그 문서를 파싱하고 디스크에서 로드합니다.
//!
//! JSON은 YAML의 부분집합이므로 같은 파서로 처리됩니다.
//! 카탈로그 로딩 실패는 치명적이며 호출자에게 그대로 전파됩니다.

use std::path::Path;

use crate::error::EngineError;

use super::RuleCatalog;
use super::types::CatalogDocument;

/// 카탈로그 파일 최대 크기 기본값
pub const DEFAULT_MAX_CATALOG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// 카탈로그 로더
pub struct CatalogLoader;

impl CatalogLoader {
    /// 파일에서 카탈로그를 로드하고 컴파일합니다.
    ///
    /// # Errors
    /// - 파일 메타데이터/내용을 읽을 수 없는 경우
    /// - 파일 크기가 `max_file_size`를 초과하는 경우
    /// - 문서 파싱 또는 규칙 검증에 실패한 경우
    pub async fn load_file(
        path: impl AsRef<Path>,
        max_file_size: u64,
    ) -> Result<RuleCatalog, EngineError> {
        let path = path.as_ref();
        let source = path.display().to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| EngineError::CatalogLoad {
                path: source.clone(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > max_file_size {
            return Err(EngineError::CatalogLoad {
                path: source,
                reason: format!(
                    "file too large: {} bytes (max: {max_file_size})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EngineError::CatalogLoad {
                    path: source.clone(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let catalog = Self::load_str(&content, &source)?;

        tracing::info!(
            path = %source,
            version = %catalog.version(),
            count = catalog.len(),
            "loaded rule catalog"
        );
        metrics::gauge!(polgen_core::metrics::CATALOG_RULES_LOADED).set(catalog.len() as f64);

        Ok(catalog)
    }

    /// 문자열에서 카탈로그를 파싱하고 컴파일합니다.
    pub fn load_str(content: &str, source: &str) -> Result<RuleCatalog, EngineError> {
        let document = Self::parse_yaml(content, source)?;
        RuleCatalog::from_document(document).map_err(|e| match e {
            EngineError::CatalogLoad { reason, .. } => EngineError::CatalogLoad {
                path: source.to_owned(),
                reason,
            },
            other => other,
        })
    }

    /// YAML 문자열을 카탈로그 문서로 파싱합니다 (검증 없음).
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<CatalogDocument, EngineError> {
        serde_yaml::from_str(yaml_str).map_err(|e| EngineError::CatalogLoad {
            path: source.to_owned(),
            reason: format!("YAML parse error: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
version: 1.0.0
rules:
  - name: write-in-shm
    precondition: []
    description:
      refs:
        - name: MITRE
          url: [https://attack.mitre.org/techniques/T1036/005/]
      tldr: Block writes to shared memory
    spec:
      severity: 5
      action: Block
      file:
        matchDirectories:
          - dir: /dev/shm/
            recursive: true
"#;

    #[test]
    fn parse_valid_yaml() {
        let doc = CatalogLoader::parse_yaml(VALID, "rules.yaml").unwrap();
        assert_eq!(doc.version, "1.0.0");
        assert_eq!(doc.rules.len(), 1);
        assert_eq!(doc.rules[0].description.refs[0].name, "MITRE");
    }

    #[test]
    fn parse_json_document() {
        let json = r#"{"version":"1.0.0","rules":[{"name":"a","spec":{"severity":1,"network":{"matchProtocols":[{"protocol":"raw"}]}}}]}"#;
        let catalog = CatalogLoader::load_str(json, "rules.json").unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let result = CatalogLoader::parse_yaml("not: [valid: yaml: {{{", "bad.yaml");
        assert!(matches!(result, Err(EngineError::CatalogLoad { .. })));
    }

    #[test]
    fn load_str_reports_source_on_bad_version() {
        let yaml = VALID.replace("1.0.0", "one");
        let err = CatalogLoader::load_str(&yaml, "rules.yaml").unwrap_err();
        assert!(err.to_string().contains("rules.yaml"));
    }

    #[tokio::test]
    async fn load_file_reads_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        tokio::fs::write(&path, VALID).await.unwrap();

        let catalog = CatalogLoader::load_file(&path, DEFAULT_MAX_CATALOG_FILE_SIZE)
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn load_file_rejects_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        tokio::fs::write(&path, VALID).await.unwrap();

        let err = CatalogLoader::load_file(&path, 8).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result =
            CatalogLoader::load_file("/nonexistent/rules.yaml", DEFAULT_MAX_CATALOG_FILE_SIZE)
                .await;
        assert!(result.is_err());
    }
}
