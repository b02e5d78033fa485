//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ENIGMA__*` 覆盖（双下划线表示嵌套，
//! 如 `ENIGMA__LLM__BASE_URL=http://127.0.0.1:1234/v1`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub console: ConsoleSection,
    pub shell: ShellSection,
}

/// [llm] 段：推理服务端点与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：local（OpenAI 兼容端点，如 LM Studio）/ mock
    pub provider: String,
    /// OpenAI 兼容端点的 base URL
    pub base_url: String,
    pub model: String,
    /// 单次请求超时（秒）；超时会以独立的错误条目出现在会话历史中
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            base_url: "http://127.0.0.1:1234/v1".to_string(),
            model: "qwen/qwen3-4b".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// [console] 段：模拟机启动命令与就绪检测
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    /// 模拟机启动命令（串口需挂在 stdio 上）
    pub command: String,
    pub args: Vec<String>,
    /// 就绪标记：行缓冲（小写、去首尾空白后）包含该子串即视为到达交互提示符
    pub prompt_marker: String,
    /// 登录引导使用的账户
    pub login_account: String,
    /// 启动后静置毫秒数，等待模拟机串口就绪
    pub settle_delay_ms: u64,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            command: "qemu-system-i386".to_string(),
            args: vec![
                "-m".into(),
                "256".into(),
                "-cdrom".into(),
                "images/alpine-minimal.iso".into(),
                "-nographic".into(),
            ],
            prompt_marker: "login:".to_string(),
            login_account: "root".to_string(),
            settle_delay_ms: 200,
        }
    }
}

/// [shell] 段：上下文与历史的截断边界
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// 送入推理服务的控制台快照尾部字符数
    pub transcript_tail_chars: usize,
    /// 送入推理服务的历史轮数
    pub context_turns: usize,
    /// UI 展示的历史轮数
    pub display_turns: usize,
    /// 历史保留上限，超出丢弃最旧条目
    pub max_history_turns: usize,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            transcript_tail_chars: 2000,
            context_turns: 6,
            display_turns: 5,
            max_history_turns: 50,
        }
    }
}

/// 从 config 目录加载配置，环境变量 ENIGMA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ENIGMA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ENIGMA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
