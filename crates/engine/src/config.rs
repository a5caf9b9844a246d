//! 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`RecommendConfig`]를 기반으로
//! 추천 패스에 필요한 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use polgen_core::config::PolgenConfig;
//! use polgen_engine::config::EngineConfig;
//!
//! let core_config = PolgenConfig::default();
//! let config = EngineConfig::from_core(&core_config.recommend);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use polgen_core::config::{MAX_AGGREGATION_THRESHOLD, RecommendConfig};

use crate::error::EngineError;

/// 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 정책 출력 루트 디렉토리
    pub out_dir: PathBuf,
    /// 요청 태그 (비어있으면 모든 규칙 대상)
    pub tags: Vec<String>,
    /// 경로 집약 임계값
    pub aggregation_threshold: usize,
    /// 정책 `apiVersion`
    pub api_version: String,
    /// 정책 `kind`
    pub kind: String,
    /// 이미지 라벨이 없을 때 셀렉터 라벨 키
    pub selector_label_key: String,
    /// 빈 정책을 건너뛸지 여부 (`false`면 실패로 기록)
    pub skip_empty_policies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_core(&RecommendConfig::default())
    }
}

impl EngineConfig {
    /// core의 `RecommendConfig`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &RecommendConfig) -> Self {
        Self {
            out_dir: PathBuf::from(&core.out_dir),
            tags: core.tags.clone(),
            aggregation_threshold: core.aggregation_threshold,
            api_version: core.api_version.clone(),
            kind: core.kind.clone(),
            selector_label_key: core.selector_label_key.clone(),
            skip_empty_policies: core.skip_empty_policies,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.out_dir.as_os_str().is_empty() {
            return Err(EngineError::Config {
                field: "out_dir".to_owned(),
                reason: "output directory must not be empty".to_owned(),
            });
        }

        if self.aggregation_threshold == 0
            || self.aggregation_threshold > MAX_AGGREGATION_THRESHOLD
        {
            return Err(EngineError::Config {
                field: "aggregation_threshold".to_owned(),
                reason: format!("must be 1-{MAX_AGGREGATION_THRESHOLD}"),
            });
        }

        if self.api_version.is_empty() || self.kind.is_empty() {
            return Err(EngineError::Config {
                field: "api_version/kind".to_owned(),
                reason: "policy apiVersion and kind must not be empty".to_owned(),
            });
        }

        if self.selector_label_key.is_empty() {
            return Err(EngineError::Config {
                field: "selector_label_key".to_owned(),
                reason: "label key must not be empty".to_owned(),
            });
        }

        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(EngineError::Config {
                field: "tags".to_owned(),
                reason: "tags must not contain empty entries".to_owned(),
            });
        }

        Ok(())
    }
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 정책 출력 디렉토리를 설정합니다.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    /// 요청 태그를 설정합니다.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// 경로 집약 임계값을 설정합니다.
    pub fn aggregation_threshold(mut self, threshold: usize) -> Self {
        self.config.aggregation_threshold = threshold;
        self
    }

    /// 정책 `apiVersion`을 설정합니다.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.config.api_version = api_version.into();
        self
    }

    /// 정책 `kind`를 설정합니다.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.config.kind = kind.into();
        self
    }

    /// 셀렉터 라벨 키를 설정합니다.
    pub fn selector_label_key(mut self, key: impl Into<String>) -> Self {
        self.config.selector_label_key = key.into();
        self
    }

    /// 빈 정책 처리 방식을 설정합니다.
    pub fn skip_empty_policies(mut self, skip: bool) -> Self {
        self.config.skip_empty_policies = skip;
        self
    }

    /// 설정을 검증하고 `EngineConfig`를 생성합니다.
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use polgen_core::config::DEFAULT_AGGREGATION_THRESHOLD;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.aggregation_threshold, DEFAULT_AGGREGATION_THRESHOLD);
    }

    #[test]
    fn from_core_preserves_values() {
        let core = RecommendConfig {
            out_dir: "/srv/policies".to_owned(),
            tags: vec!["network".to_owned()],
            aggregation_threshold: 5,
            ..RecommendConfig::default()
        };
        let config = EngineConfig::from_core(&core);
        assert_eq!(config.out_dir, PathBuf::from("/srv/policies"));
        assert_eq!(config.tags, vec!["network"]);
        assert_eq!(config.aggregation_threshold, 5);
        assert_eq!(config.kind, "KubeArmorPolicy");
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let config = EngineConfig {
            aggregation_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_threshold() {
        let config = EngineConfig {
            aggregation_threshold: MAX_AGGREGATION_THRESHOLD + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_out_dir() {
        let config = EngineConfig {
            out_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_tag() {
        let config = EngineConfig {
            tags: vec!["network".to_owned(), "  ".to_owned()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = EngineConfigBuilder::new()
            .out_dir("/tmp/out")
            .tags(["filesystem"])
            .aggregation_threshold(4)
            .selector_label_key("app")
            .build()
            .unwrap();
        assert_eq!(config.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.tags, vec!["filesystem"]);
        assert_eq!(config.aggregation_threshold, 4);
        assert_eq!(config.selector_label_key, "app");
    }

    #[test]
    fn builder_validates_on_build() {
        let result = EngineConfigBuilder::new().kind("").build();
        assert!(result.is_err());
    }
}
