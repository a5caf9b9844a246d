//! 설정 관리 -- polgen.toml 파싱 및 런타임 설정
//!
//! [`PolgenConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`POLGEN_RECOMMEND_OUT_DIR=/tmp/out` 형식)
//! 2. 설정 파일 (`polgen.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), polgen_core::error::PolgenError> {
//! use polgen_core::config::PolgenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PolgenConfig::load("polgen.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PolgenConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PolgenError};

/// 경로 집약 기본 임계값 (형제 노드 수가 이를 초과하면 디렉토리로 일반화)
pub const DEFAULT_AGGREGATION_THRESHOLD: usize = 3;

/// 경로 집약 임계값 상한
pub const MAX_AGGREGATION_THRESHOLD: usize = 1024;

/// polgen 통합 설정
///
/// `polgen.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolgenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 규칙 카탈로그 설정
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// 정책 추천 설정
    #[serde(default)]
    pub recommend: RecommendConfig,
}

impl PolgenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PolgenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PolgenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PolgenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PolgenError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PolgenError> {
        toml::from_str(toml_str).map_err(|e| {
            PolgenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `POLGEN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "POLGEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "POLGEN_GENERAL_LOG_FORMAT");

        // Catalog
        override_string(&mut self.catalog.cache_path, "POLGEN_CATALOG_CACHE_PATH");
        override_u64(
            &mut self.catalog.max_file_size,
            "POLGEN_CATALOG_MAX_FILE_SIZE",
        );

        // Recommend
        override_string(&mut self.recommend.out_dir, "POLGEN_RECOMMEND_OUT_DIR");
        override_csv(&mut self.recommend.tags, "POLGEN_RECOMMEND_TAGS");
        override_usize(
            &mut self.recommend.aggregation_threshold,
            "POLGEN_RECOMMEND_AGGREGATION_THRESHOLD",
        );
        override_string(
            &mut self.recommend.api_version,
            "POLGEN_RECOMMEND_API_VERSION",
        );
        override_string(&mut self.recommend.kind, "POLGEN_RECOMMEND_KIND");
        override_string(
            &mut self.recommend.selector_label_key,
            "POLGEN_RECOMMEND_SELECTOR_LABEL_KEY",
        );
        override_bool(
            &mut self.recommend.skip_empty_policies,
            "POLGEN_RECOMMEND_SKIP_EMPTY_POLICIES",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PolgenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.catalog.cache_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "catalog.cache_path".to_owned(),
                reason: "cache path must not be empty".to_owned(),
            }
            .into());
        }

        if self.catalog.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "catalog.max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.recommend.out_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "recommend.out_dir".to_owned(),
                reason: "output directory must not be empty".to_owned(),
            }
            .into());
        }

        if self.recommend.aggregation_threshold == 0
            || self.recommend.aggregation_threshold > MAX_AGGREGATION_THRESHOLD
        {
            return Err(ConfigError::InvalidValue {
                field: "recommend.aggregation_threshold".to_owned(),
                reason: format!("must be 1-{MAX_AGGREGATION_THRESHOLD}"),
            }
            .into());
        }

        if self.recommend.selector_label_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "recommend.selector_label_key".to_owned(),
                reason: "label key must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 규칙 카탈로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 카탈로그 캐시 파일 경로
    pub cache_path: String,
    /// 카탈로그 파일 최대 크기 (바이트)
    pub max_file_size: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_path: "/var/lib/polgen/rules.yaml".to_owned(),
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// 정책 추천 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// 정책 출력 디렉토리
    pub out_dir: String,
    /// 요청 태그 (비어있으면 모든 규칙 대상)
    pub tags: Vec<String>,
    /// 경로 집약 임계값
    pub aggregation_threshold: usize,
    /// 생성 정책의 apiVersion
    pub api_version: String,
    /// 생성 정책의 kind
    pub kind: String,
    /// 이미지 라벨이 없을 때 셀렉터에 사용할 라벨 키
    pub selector_label_key: String,
    /// 규칙 블록이 하나도 없는 정책을 조용히 건너뛸지 여부
    pub skip_empty_policies: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            out_dir: "out".to_owned(),
            tags: Vec::new(),
            aggregation_threshold: DEFAULT_AGGREGATION_THRESHOLD,
            api_version: "security.kubearmor.com/v1".to_owned(),
            kind: "KubeArmorPolicy".to_owned(),
            selector_label_key: "kubearmor.io/container.name".to_owned(),
            skip_empty_policies: true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = PolgenConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.recommend.aggregation_threshold, 3);
        assert!(config.recommend.tags.is_empty());
        assert_eq!(config.recommend.kind, "KubeArmorPolicy");
    }

    #[test]
    fn default_config_passes_validation() {
        PolgenConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = PolgenConfig::parse("").unwrap();
        assert_eq!(config.catalog.cache_path, "/var/lib/polgen/rules.yaml");
        assert_eq!(config.recommend.out_dir, "out");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[recommend]
out_dir = "/srv/policies"
tags = ["network", "filesystem"]
"#;
        let config = PolgenConfig::parse(toml).unwrap();
        assert_eq!(config.recommend.out_dir, "/srv/policies");
        assert_eq!(config.recommend.tags.len(), 2);
        // 나머지는 기본값 유지
        assert_eq!(config.recommend.aggregation_threshold, 3);
        assert_eq!(config.general.log_format, "pretty");
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = PolgenConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            PolgenError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = PolgenConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let mut config = PolgenConfig::default();
        config.recommend.aggregation_threshold = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("aggregation_threshold"));
    }

    #[test]
    fn validate_rejects_excessive_threshold() {
        let mut config = PolgenConfig::default();
        config.recommend.aggregation_threshold = MAX_AGGREGATION_THRESHOLD + 1;
        assert!(config.validate().is_err());

        config.recommend.aggregation_threshold = MAX_AGGREGATION_THRESHOLD;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_out_dir() {
        let mut config = PolgenConfig::default();
        config.recommend.out_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_POLGEN_STR", "overridden") };
        override_string(&mut val, "TEST_POLGEN_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_POLGEN_STR") };
    }

    #[test]
    #[serial]
    fn env_override_usize_invalid_keeps_original() {
        let mut val = 3usize;
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_POLGEN_USIZE_BAD", "many") };
        override_usize(&mut val, "TEST_POLGEN_USIZE_BAD");
        assert_eq!(val, 3);
        unsafe { std::env::remove_var("TEST_POLGEN_USIZE_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv_skips_blank_items() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_POLGEN_CSV", "network, ,filesystem") };
        override_csv(&mut val, "TEST_POLGEN_CSV");
        assert_eq!(val, vec!["network", "filesystem"]);
        unsafe { std::env::remove_var("TEST_POLGEN_CSV") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = true;
        override_bool(&mut val, "TEST_POLGEN_NONEXISTENT_98765");
        assert!(val);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = PolgenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = PolgenConfig::parse(&toml_str).unwrap();
        assert_eq!(config.recommend.api_version, parsed.recommend.api_version);
        assert_eq!(config.catalog.max_file_size, parsed.catalog.max_file_size);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = PolgenConfig::from_file("/nonexistent/path/polgen.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PolgenError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
