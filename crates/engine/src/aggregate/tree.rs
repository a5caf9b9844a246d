//! 경로 트라이 -- 아레나 기반 노드 저장소
//!
//! 모든 노드는 [`PathTree`]가 소유하는 `Vec<Node>`에 저장되며,
//! 부모/자식 관계는 [`NodeId`] 인덱스로 표현합니다.
//! 트리는 집약 호출마다 새로 만들어지고 호출이 끝나면 버려집니다.

use std::fmt;

use super::SysPath;

/// 숫자 와일드카드의 문자열 표현
pub const WILDCARD_DIGIT: &str = "[0-9]+";

/// 문자 와일드카드의 문자열 표현
pub const WILDCARD_CHAR: &str = ".+";

/// 첫 단계에서 즉시 디렉토리로 일반화되는 세그먼트
const VOLATILE_ROOT_SEGMENT: &str = "tmp";

/// 경로 세그먼트
///
/// 한 경로 컴포넌트(`/` 사이의 문자열)를 나타냅니다.
/// 다중 컴포넌트 와일드카드는 지원하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// 리터럴 컴포넌트 (앞의 `/` 제외)
    Literal(String),
    /// 숫자로만 이루어진 한 컴포넌트 (`/[0-9]+`)
    WildcardDigit,
    /// 임의의 한 컴포넌트 (`/.+`)
    WildcardChar,
}

impl Segment {
    /// 경로 컴포넌트 하나를 세그먼트로 변환합니다.
    ///
    /// 와일드카드 표기 그대로의 컴포넌트는 해당 와일드카드가 되고,
    /// 숫자로만 이루어진 컴포넌트는 숫자 와일드카드로 일반화됩니다.
    pub fn parse(component: &str) -> Self {
        if component == WILDCARD_DIGIT {
            return Self::WildcardDigit;
        }
        if component == WILDCARD_CHAR {
            return Self::WildcardChar;
        }
        if !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit()) {
            return Self::WildcardDigit;
        }
        Self::Literal(component.to_owned())
    }

    /// 와일드카드 세그먼트인지 확인합니다.
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    /// 와일드카드 패턴이 들어오는 세그먼트의 텍스트 전체와 일치하는지 확인합니다.
    ///
    /// 리터럴 세그먼트는 항상 `false`를 반환합니다 (정확 일치는 별도 단계).
    pub fn accepts(&self, incoming: &Segment) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::WildcardDigit => match incoming {
                Self::Literal(text) => {
                    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
                }
                Self::WildcardDigit => true,
                Self::WildcardChar => false,
            },
            // `/.+`는 비어있지 않은 모든 컴포넌트 텍스트와 일치합니다.
            Self::WildcardChar => match incoming {
                Self::Literal(text) => !text.is_empty(),
                Self::WildcardDigit | Self::WildcardChar => true,
            },
        }
    }

    /// 컴포넌트 텍스트 (앞의 `/` 제외)
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::WildcardDigit => WILDCARD_DIGIT,
            Self::WildcardChar => WILDCARD_CHAR,
        }
    }

    fn is_volatile_root(&self) -> bool {
        matches!(self, Self::Literal(text) if text == VOLATILE_ROOT_SEGMENT)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

/// 아레나 내 노드 인덱스
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// 트라이 노드
#[derive(Debug, Clone)]
pub struct Node {
    /// 이 노드가 나타내는 세그먼트
    pub segment: Segment,
    /// 합성 루트로부터의 거리 (루트의 자식은 1)
    pub depth: usize,
    /// 일반화된 디렉토리 매치로 끝나는 노드인지 여부
    pub is_directory: bool,
    /// 이 노드를 지나간 경로 수
    pub touch_count: u32,
    /// 자식 노드
    pub children: Vec<NodeId>,
    /// 부모 노드 (루트는 `None`)
    pub parent: Option<NodeId>,
}

impl Node {
    /// 자식이 없는 노드인지 확인합니다.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// 경로 트라이
///
/// 불변식:
/// - 자식의 깊이는 항상 부모 깊이 + 1
/// - 한 노드의 자식 중 세그먼트와 깊이가 같은 노드는 둘 이상 존재하지 않음
/// - `is_directory == true`인 노드는 자식을 갖지 않음
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<Node>,
    threshold: usize,
}

impl PathTree {
    /// 합성 루트 노드
    pub const ROOT: NodeId = NodeId(0);

    /// 빈 트리를 생성합니다.
    pub fn new(threshold: usize) -> Self {
        Self {
            nodes: vec![Node {
                segment: Segment::Literal(String::new()),
                depth: 0,
                is_directory: false,
                touch_count: 0,
                children: Vec::new(),
                parent: None,
            }],
            threshold,
        }
    }

    /// 노드를 조회합니다.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// 루트의 자식 노드 목록
    pub fn roots(&self) -> &[NodeId] {
        &self.nodes[Self::ROOT.0].children
    }

    /// 아레나에 할당된 노드 수 (잘려나간 노드 포함)
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// 주어진 경로에 해당하는 노드를 찾습니다.
    pub fn find(&self, segments: &[Segment]) -> Option<NodeId> {
        let mut current = Self::ROOT;
        for segment in segments {
            let depth = self.node(current).depth + 1;
            current = self.find_child(current, segment, depth)?;
        }
        Some(current)
    }

    /// 세그먼트 열을 트리에 삽입합니다.
    ///
    /// 이미 디렉토리로 일반화된 노드에 도달하면 더 내려가지 않습니다.
    /// `is_directory`가 참이면 마지막 노드를 디렉토리로 만들고 자식을 버립니다.
    pub fn insert(&mut self, segments: &[Segment], is_directory: bool) {
        let mut current = Self::ROOT;

        for segment in segments {
            if current != Self::ROOT && self.node(current).is_directory {
                return;
            }

            let depth = self.node(current).depth + 1;
            current = match self.find_child(current, segment, depth) {
                Some(child) => {
                    self.nodes[child.0].touch_count += 1;
                    child
                }
                None => self.add_child(current, segment.clone()),
            };
        }

        if is_directory && current != Self::ROOT {
            self.mark_directory(current);
        }
    }

    /// 자식 중에서 세그먼트와 일치하는 노드를 찾습니다.
    ///
    /// 와일드카드 자식을 먼저 시도하고, 그 다음 정확히 같은 세그먼트를 찾습니다.
    fn find_child(&self, parent: NodeId, segment: &Segment, depth: usize) -> Option<NodeId> {
        let children = &self.node(parent).children;

        let wildcard = children.iter().copied().find(|&id| {
            let child = self.node(id);
            child.depth == depth && child.segment.is_wildcard() && child.segment.accepts(segment)
        });
        if wildcard.is_some() {
            return wildcard;
        }

        children.iter().copied().find(|&id| {
            let child = self.node(id);
            child.depth == depth && child.segment == *segment
        })
    }

    fn add_child(&mut self, parent: NodeId, segment: Segment) -> NodeId {
        let depth = self.node(parent).depth + 1;
        let is_directory = depth == 1 && segment.is_volatile_root();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            segment,
            depth,
            is_directory,
            touch_count: 1,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn mark_directory(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.is_directory = true;
        node.children.clear();
    }

    /// 후위 순회로 자식이 임계값을 초과하는 노드를 디렉토리로 접습니다.
    ///
    /// 합성 루트는 접지 않습니다.
    pub fn aggregate(&mut self) {
        self.aggregate_node(Self::ROOT);
    }

    fn aggregate_node(&mut self, id: NodeId) {
        let children = self.node(id).children.clone();
        for child in children {
            self.aggregate_node(child);
        }

        if id != Self::ROOT && self.node(id).children.len() > self.threshold {
            let node = &mut self.nodes[id.0];
            node.children.clear();
            node.is_directory = true;
            node.touch_count = 1;
        }
    }

    /// 루트에서 노드까지의 경로 문자열을 만듭니다 (디렉토리 표기 없음).
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == Self::ROOT {
                break;
            }
            let node = self.node(node_id);
            segments.push(node.segment.to_string());
            current = node.parent;
        }
        segments.reverse();
        segments.concat()
    }

    /// 모든 리프에 대해 [`SysPath`]를 생성합니다. 결과는 경로순으로 정렬됩니다.
    pub fn generate(&self) -> Vec<SysPath> {
        let mut results = Vec::new();
        let mut stack: Vec<(NodeId, String)> = self
            .roots()
            .iter()
            .rev()
            .map(|&id| (id, String::new()))
            .collect();

        while let Some((id, prefix)) = stack.pop() {
            let node = self.node(id);
            let path = format!("{prefix}{}", node.segment);

            if node.is_leaf() {
                results.push(if node.is_directory {
                    SysPath::directory(path)
                } else {
                    SysPath::file(path)
                });
                continue;
            }

            for &child in node.children.iter().rev() {
                stack.push((child, path.clone()));
            }
        }

        results.sort();
        results.dedup();
        results
    }
}
