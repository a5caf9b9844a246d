//! 카탈로그 캐시 -- 디스크 캐시 파일의 로딩과 버전 기반 갱신
//!
//! 갱신은 단일 작성자만 허용합니다. `<cache>.lock` 파일을 `create_new`로 만들어
//! 잠금을 얻고, 새 문서는 형제 임시 파일에 쓴 뒤 rename 하므로
//! 읽는 쪽은 항상 완전한 파일만 보게 됩니다.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use semver::Version;
use tokio::io::AsyncWriteExt;

use polgen_core::config::CatalogConfig;
use polgen_core::metrics as m;

use super::RuleCatalog;
use super::loader::CatalogLoader;
use crate::error::EngineError;

/// 캐시 갱신 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheUpdate {
    /// 새 문서로 교체됨
    Replaced {
        /// 이전 캐시 버전 (유효한 캐시가 없었으면 `None`)
        previous: Option<Version>,
        /// 새 캐시 버전
        current: Version,
    },
    /// 캐시가 같거나 더 새로워 유지됨
    Unchanged {
        /// 현재 캐시 버전
        cached: Version,
        /// 제시된 문서 버전
        offered: Version,
    },
}

/// 디스크 카탈로그 캐시
#[derive(Debug, Clone)]
pub struct CatalogCache {
    path: PathBuf,
    max_file_size: u64,
}

impl CatalogCache {
    /// 캐시 경로와 최대 파일 크기로 생성합니다.
    pub fn new(path: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            path: path.into(),
            max_file_size,
        }
    }

    /// core의 `CatalogConfig`에서 생성합니다.
    pub fn from_core(config: &CatalogConfig) -> Self {
        Self::new(&config.cache_path, config.max_file_size)
    }

    /// 캐시 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 잠금 파일 경로 (`<cache>.lock`)
    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.path, ".lock")
    }

    fn temp_path(&self) -> PathBuf {
        sibling(&self.path, ".tmp")
    }

    /// 캐시 파일을 로드합니다.
    pub async fn load(&self) -> Result<RuleCatalog, EngineError> {
        CatalogLoader::load_file(&self.path, self.max_file_size).await
    }

    /// 현재 캐시의 버전을 반환합니다. 캐시가 없거나 유효하지 않으면 `None`.
    pub async fn cached_version(&self) -> Option<Version> {
        match self.load().await {
            Ok(catalog) => Some(catalog.version().clone()),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "no valid cached catalog");
                None
            }
        }
    }

    /// 새 카탈로그 문서를 검증하고, 캐시보다 새로운 경우에만 교체합니다.
    ///
    /// # Errors
    /// - 다른 작성자가 잠금을 보유한 경우 ([`EngineError::CacheBusy`])
    /// - 제시된 문서가 유효하지 않은 경우
    /// - 임시 파일 쓰기 또는 rename 실패
    pub async fn store(&self, document: &str) -> Result<CacheUpdate, EngineError> {
        if document.len() as u64 > self.max_file_size {
            return Err(EngineError::CatalogLoad {
                path: "(offered document)".to_owned(),
                reason: format!(
                    "document too large: {} bytes (max: {})",
                    document.len(),
                    self.max_file_size
                ),
            });
        }
        let offered = CatalogLoader::load_str(document, "(offered document)")?;

        let _lock = CacheLock::acquire(&self.lock_path()).await?;

        let previous = self.cached_version().await;
        if let Some(cached) = previous.as_ref() {
            if cached >= offered.version() {
                tracing::info!(
                    cached = %cached,
                    offered = %offered.version(),
                    "catalog cache is up to date"
                );
                metrics::counter!(m::CATALOG_CACHE_UPDATES_TOTAL, m::LABEL_RESULT => "unchanged")
                    .increment(1);
                return Ok(CacheUpdate::Unchanged {
                    cached: cached.clone(),
                    offered: offered.version().clone(),
                });
            }
        }

        let temp = self.temp_path();
        let write_err = |e: std::io::Error| EngineError::CatalogLoad {
            path: temp.display().to_string(),
            reason: format!("failed to write cache: {e}"),
        };
        tokio::fs::write(&temp, document).await.map_err(write_err)?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| EngineError::CatalogLoad {
                path: self.path.display().to_string(),
                reason: format!("failed to replace cache: {e}"),
            })?;

        tracing::info!(
            path = %self.path.display(),
            previous = ?previous.as_ref().map(ToString::to_string),
            current = %offered.version(),
            "catalog cache replaced"
        );
        metrics::counter!(m::CATALOG_CACHE_UPDATES_TOTAL, m::LABEL_RESULT => "replaced")
            .increment(1);

        Ok(CacheUpdate::Replaced {
            previous,
            current: offered.version().clone(),
        })
    }
}

/// 캐시 작성자 잠금
///
/// drop 시 잠금 파일을 제거합니다.
struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    async fn acquire(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::CatalogLoad {
                    path: parent.display().to_string(),
                    reason: format!("failed to create cache directory: {e}"),
                })?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(EngineError::CacheBusy(path.display().to_string()));
            }
            Err(e) => {
                return Err(EngineError::CatalogLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to create lock file: {e}"),
                });
            }
        };

        let lock = Self {
            path: path.to_path_buf(),
        };
        // 진단용 기록이므로 실패해도 잠금은 유효합니다.
        if let Err(e) = file.write_all(std::process::id().to_string().as_bytes()).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to record lock owner");
        }
        Ok(lock)
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release cache lock");
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(version: &str) -> String {
        format!(
            r#"
version: {version}
rules:
  - name: raw-socket
    spec:
      severity: 4
      network:
        matchProtocols:
          - protocol: raw
"#
        )
    }

    fn cache_in(dir: &tempfile::TempDir) -> CatalogCache {
        CatalogCache::new(dir.path().join("rules.yaml"), 1024 * 1024)
    }

    #[tokio::test]
    async fn store_into_empty_cache_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);

        let update = cache.store(&doc("1.0.0")).await.unwrap();
        assert_eq!(
            update,
            CacheUpdate::Replaced {
                previous: None,
                current: Version::new(1, 0, 0)
            }
        );
        assert_eq!(cache.load().await.unwrap().len(), 1);
        assert!(!cache.lock_path().exists());
        assert!(!cache.temp_path().exists());
    }

    #[tokio::test]
    async fn store_newer_version_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.store(&doc("1.0.0")).await.unwrap();

        let update = cache.store(&doc("1.1.0")).await.unwrap();
        assert!(matches!(update, CacheUpdate::Replaced { previous: Some(_), .. }));
        assert_eq!(cache.cached_version().await, Some(Version::new(1, 1, 0)));
    }

    #[tokio::test]
    async fn store_same_or_older_version_keeps_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.store(&doc("2.0.0")).await.unwrap();

        let same = cache.store(&doc("2.0.0")).await.unwrap();
        assert!(matches!(same, CacheUpdate::Unchanged { .. }));
        let older = cache.store(&doc("1.9.9")).await.unwrap();
        assert!(matches!(older, CacheUpdate::Unchanged { .. }));
        assert_eq!(cache.cached_version().await, Some(Version::new(2, 0, 0)));
    }

    #[tokio::test]
    async fn store_rejects_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.store(&doc("1.0.0")).await.unwrap();

        let bad = doc("2.0.0").replace("severity: 4", "severity: 40");
        assert!(cache.store(&bad).await.is_err());
        assert_eq!(cache.cached_version().await, Some(Version::new(1, 0, 0)));
    }

    #[tokio::test]
    async fn corrupt_cache_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        tokio::fs::write(cache.path(), "{{{ not yaml").await.unwrap();

        let update = cache.store(&doc("0.1.0")).await.unwrap();
        assert!(matches!(update, CacheUpdate::Replaced { previous: None, .. }));
    }

    #[tokio::test]
    async fn concurrent_writer_gets_cache_busy() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        tokio::fs::write(cache.lock_path(), "4242").await.unwrap();

        let err = cache.store(&doc("1.0.0")).await.unwrap_err();
        assert!(matches!(err, EngineError::CacheBusy(_)));
        // 다른 작성자의 잠금은 건드리지 않습니다.
        assert!(cache.lock_path().exists());
    }

    #[test]
    fn sibling_appends_suffix() {
        let path = sibling(Path::new("/var/lib/polgen/rules.yaml"), ".lock");
        assert_eq!(path, PathBuf::from("/var/lib/polgen/rules.yaml.lock"));
    }
}
