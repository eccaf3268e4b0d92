//! Configuration management for sourcesift
//!
//! This module handles loading and validating configuration from TOML files and
//! environment variables. Every field has a default, so a partial file (or no
//! file at all) yields a usable configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint probe configuration
    pub http: HttpConfig,

    /// Content filter phrases
    pub filter: FilterConfig,

    /// Tagging rules
    pub classify: ClassifyConfig,

    /// Stage toggles
    pub pipeline: PipelineToggles,

    /// Input/output locations and file layout
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Probe (HTTP client) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total request timeout in seconds
    pub timeout_secs: f64,

    /// Read timeout in seconds
    pub read_timeout_secs: f64,

    /// Maximum number of probes in flight
    pub max_workers: usize,

    /// Maximum number of redirects followed per probe
    pub max_redirects: usize,

    /// Verify TLS certificates
    pub verify_tls: bool,

    /// Honour proxy settings from the environment
    pub trust_env: bool,

    /// User agent string
    pub user_agent: String,

    /// Number of body bytes inspected by the content heuristic
    pub max_body_bytes: usize,

    /// Replace the display name with the page title after a passing probe
    pub rename_from_title: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5.0,
            read_timeout_secs: 1.0,
            max_workers: 128,
            max_redirects: 3,
            verify_tls: false,
            trust_env: true,
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
            ),
            max_body_bytes: 100_000,
            rename_from_title: false,
        }
    }
}

/// Phrases deciding whether a fetched page is real content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Content keywords; any hit passes the page
    pub whitelist: Vec<String>,

    /// Parking/error page signatures; any hit fails the page
    pub blacklist: Vec<String>,

    /// Maximum number of base64-looking tokens before a page counts as noise
    pub base64_token_limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            whitelist: strings(&["小说", "章节", "书架", "阅读", "漫画", "听书"]),
            blacklist: strings(&[
                "error",
                "nginx",
                "banggood",
                "for sale",
                "verify code",
                "make an offer",
                "server is down",
                "buy this domain",
                "cheapest domains",
                "using the domain",
                "sorry",
                "can not be accessed",
                "彩票",
                "棋牌",
                "错误",
                "抱歉",
                "转让",
                "公司",
                "没有找到站点",
                "welcome",
                "无法显示",
                "无法加载",
                "域名出售",
                "正在出售",
            ]),
            base64_token_limit: 200,
        }
    }
}

/// One category label and the keywords that trigger it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: strings(keywords),
        }
    }
}

/// Mapping between a numeric source type and its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub id: i64,
    pub label: String,
}

/// Tagging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Include the display name in the classification text
    pub classify_from_name: bool,

    /// Include the comment in the classification text
    pub classify_from_comment: bool,

    /// Remember the first matched label as the primary category
    pub store_primary_category: bool,

    /// Tag records of the default type (id 0) with their type label too
    pub always_tag_default_type: bool,

    /// Source type labels
    pub types: Vec<TypeMapping>,

    /// Category rules, evaluated in order
    pub categories: Vec<CategoryRule>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        let types = [("小说", 0), ("音频", 1), ("漫画", 2), ("文件", 3), ("视频", 4)]
            .into_iter()
            .map(|(label, id)| TypeMapping {
                id,
                label: label.to_string(),
            })
            .collect();

        Self {
            classify_from_name: false,
            classify_from_comment: false,
            store_primary_category: false,
            always_tag_default_type: false,
            types,
            categories: vec![
                CategoryRule::new("精品", &["精", "优", "满"]),
                CategoryRule::new(
                    "成人",
                    &[
                        "18", "黄", "肉", "色", "涩", "瑟", "羞", "成人", "嘿嘿", "刘备", "绅士",
                        "淑女", "涩涩", "禁书", "禁漫", "束冠", "不可描述", "h", "po", "nsfw",
                        "🥵", "🔞", "🙈",
                    ],
                ),
                CategoryRule::new("男频", &["男频"]),
                CategoryRule::new("女频", &["甜", "女频", "言情", "女生", "轻言"]),
                CategoryRule::new("轻文", &["轻"]),
                CategoryRule::new("耽美", &["耽", "长佩", "bl"]),
                CategoryRule::new("正版", &["正版", "付费"]),
                CategoryRule::new("社区", &["论坛", "频道", "社区", "收集", "发布", "置顶"]),
                CategoryRule::new("失效", &["失效", "缺失", "待修", "超时", "未测", "错误"]),
            ],
        }
    }
}

impl ClassifyConfig {
    /// Look up the label for a type id
    pub fn type_label(&self, type_id: i64) -> Option<&str> {
        self.types
            .iter()
            .find(|mapping| mapping.id == type_id)
            .map(|mapping| mapping.label.as_str())
    }
}

/// Switches for the optional pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineToggles {
    /// Probe every record that has a domain
    pub url_check: bool,

    /// Keep one record per domain
    pub dedup_by_domain: bool,

    /// Log prober progress every N completed probes
    pub progress_every: usize,
}

impl Default for PipelineToggles {
    fn default() -> Self {
        Self {
            url_check: true,
            dedup_by_domain: true,
            progress_every: 100,
        }
    }
}

/// Input/output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding `*.json` record files
    pub input_dir: PathBuf,

    /// Directory receiving the result buckets
    pub output_dir: PathBuf,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Split large buckets into several files
    pub slice: bool,

    /// Records per sliced file
    pub slice_size: usize,

    /// Empty the output directory before writing
    pub clear_output: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            pretty: true,
            slice: true,
            slice_size: 1000,
            clear_output: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise start from the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `SOURCESIFT_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Some(workers) = std::env::var("SOURCESIFT_MAX_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.http.max_workers = workers;
        }

        if let Some(timeout) = std::env::var("SOURCESIFT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.http.timeout_secs = timeout;
        }

        if let Ok(user_agent) = std::env::var("SOURCESIFT_USER_AGENT") {
            self.http.user_agent = user_agent;
        }

        if let Ok(level) = std::env::var("SOURCESIFT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.max_workers == 0 {
            anyhow::bail!("max_workers must be greater than 0");
        }

        self.request_timeout()?;
        self.read_timeout()?;

        if self.http.read_timeout_secs > self.http.timeout_secs {
            anyhow::bail!("read_timeout_secs must not exceed timeout_secs");
        }

        if self.output.slice_size == 0 {
            anyhow::bail!("slice_size must be greater than 0");
        }

        if self.output.clear_output && self.output.output_dir == self.output.input_dir {
            anyhow::bail!("output_dir must differ from input_dir when clear_output is on");
        }

        let mut labels = HashSet::new();
        for rule in &self.classify.categories {
            if !labels.insert(rule.label.as_str()) {
                anyhow::bail!("duplicate category label: {}", rule.label);
            }
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Get total probe timeout as Duration
    pub fn request_timeout(&self) -> Result<Duration> {
        timeout("timeout_secs", self.http.timeout_secs)
    }

    /// Get probe read timeout as Duration
    pub fn read_timeout(&self) -> Result<Duration> {
        timeout("read_timeout_secs", self.http.read_timeout_secs)
    }
}

/// Longest accepted probe timeout
const MAX_TIMEOUT_SECS: f64 = 3600.0;

fn timeout(name: &str, secs: f64) -> Result<Duration> {
    // NaN fails both comparisons.
    if !(secs > 0.0 && secs <= MAX_TIMEOUT_SECS) {
        anyhow::bail!("{name} must be in (0, {MAX_TIMEOUT_SECS}], got {secs}");
    }
    Ok(Duration::from_secs_f64(secs))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
