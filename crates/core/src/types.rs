//! 도메인 타입 -- 크레이트 전역에서 공유되는 공통 타입
//!
//! 이미지 스캐너가 전달하는 이미지 메타데이터와 정책 액션을 정의합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// 스캔 실패 시 가정하는 기본 OS
pub const DEFAULT_OS: &str = "linux";

/// 컨테이너 이미지 메타데이터
///
/// 외부 이미지 스캐너가 이미지 레이어를 풀어서 생성합니다.
/// 한 번의 추천 패스 동안 호출자가 소유하며, 동시에 변경되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageInfo {
    /// 이미지 참조 (예: `nginx:1.25`)
    pub name: String,
    /// 배포 대상 네임스페이스 (비어있으면 지정하지 않음)
    pub namespace: String,
    /// 이미지 라벨
    pub labels: BTreeMap<String, String>,
    /// 저장소 태그 목록 (첫 번째가 대표 태그)
    pub repo_tags: Vec<String>,
    /// CPU 아키텍처
    pub arch: String,
    /// 운영체제
    pub os: String,
    /// 배포판
    pub distro: String,
    /// 이미지 내 파일 절대 경로 집합
    pub file_list: BTreeSet<String>,
    /// 이미지 내 디렉토리 절대 경로 집합
    pub dir_list: BTreeSet<String>,
}

impl ImageInfo {
    /// 스캔 실패 시 사용할 축소된 이미지 정보를 생성합니다.
    ///
    /// 경로 목록이 비어 있으므로 파일시스템 패턴이 없는 일반 정책만 추천됩니다.
    pub fn degraded(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            repo_tags: vec![name.clone()],
            name,
            os: DEFAULT_OS.to_owned(),
            ..Self::default()
        }
    }

    /// 대표 태그를 반환합니다. 태그가 없으면 이미지 이름을 사용합니다.
    pub fn canonical_tag(&self) -> &str {
        self.repo_tags
            .first()
            .map(String::as_str)
            .unwrap_or(self.name.as_str())
    }

    /// 대표 태그에서 저장소 이름 부분(첫 `:` 이전)을 반환합니다.
    pub fn repo_name(&self) -> &str {
        let tag = self.canonical_tag();
        tag.split_once(':').map_or(tag, |(repo, _)| repo)
    }

    /// 스캐너 JSON 출력을 파싱합니다.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 파일/디렉토리 경로가 하나도 없는지 확인합니다.
    pub fn has_no_paths(&self) -> bool {
        self.file_list.is_empty() && self.dir_list.is_empty()
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{} {}) files={} dirs={}",
            self.canonical_tag(),
            self.os,
            self.arch,
            self.distro,
            self.file_list.len(),
            self.dir_list.len(),
        )
    }
}

/// 이미지 스캐너 결과
///
/// 스캔 실패는 치명적이지 않으며, 축소된 이미지 정보로 대체됩니다.
#[derive(Debug, Clone)]
pub enum ImageScan {
    /// 스캔 성공
    Complete(ImageInfo),
    /// 스캔 실패
    Failed {
        /// 이미지 참조
        image: String,
        /// 실패 사유
        reason: String,
    },
}

impl ImageScan {
    /// 이미지 참조를 반환합니다.
    pub fn image_name(&self) -> &str {
        match self {
            Self::Complete(info) => info.canonical_tag(),
            Self::Failed { image, .. } => image,
        }
    }

    /// 실패한 스캔이면 축소된 이미지 정보로 변환합니다.
    pub fn into_image_info(self) -> ImageInfo {
        match self {
            Self::Complete(info) => info,
            Self::Failed { image, .. } => ImageInfo::degraded(image),
        }
    }
}

/// 정책 액션
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// 허용 (화이트리스트)
    Allow,
    /// 감사 로그만 남김
    #[default]
    Audit,
    /// 차단
    Block,
}

impl Action {
    /// 문자열에서 액션을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "audit" => Some(Self::Audit),
            "block" | "deny" => Some(Self::Block),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Audit => write!(f, "Audit"),
            Self::Block => write!(f, "Block"),
        }
    }
}
