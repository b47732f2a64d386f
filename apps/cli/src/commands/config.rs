//! 配置管理命令
//!
//! 默认串口、波特率和状态帧格式保存在用户配置目录下的 `bench/config.toml`。

use anyhow::{Context, Result};
use bench_driver::{PipelineConfig, list_ports};
use bench_protocol::{BAUD_RATE, FrameVariant};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件路径
pub fn config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine the config directory"))?;
    path.push("bench");
    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CliConfig {
    /// 默认串口
    pub port: Option<String>,
    /// 波特率（默认 115200）
    pub baud_rate: Option<u32>,
    /// 设备固件的状态帧格式
    pub frame_variant: Option<FrameVariant>,
}

impl CliConfig {
    /// 从默认位置加载，文件不存在时返回默认配置
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, format!("# Test bench CLI configuration\n\n{content}"))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(BAUD_RATE)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            frame_variant: self.frame_variant.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认串口（如 /dev/ttyUSB0, COM3）
        #[arg(short, long)]
        port: Option<String>,

        /// 波特率
        #[arg(short, long)]
        baud_rate: Option<u32>,

        /// 状态帧格式：compact (4 字节) 或 extended (8 字节)
        #[arg(short, long)]
        frame_variant: Option<FrameVariant>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（port, baud_rate, frame_variant, all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        let path = config_file()?;
        match self {
            ConfigCommand::Set {
                port,
                baud_rate,
                frame_variant,
            } => set_(&path, port, baud_rate, frame_variant),
            ConfigCommand::Get { key } => {
                let config = CliConfig::load_from(&path)?;
                println!("{}", get_(&config, &key)?);
                Ok(())
            },
            ConfigCommand::Check => check_(&path),
        }
    }
}

fn set_(
    path: &Path,
    port: Option<String>,
    baud_rate: Option<u32>,
    frame_variant: Option<FrameVariant>,
) -> Result<()> {
    let mut config = CliConfig::load_from(path)?;

    if let Some(port) = port {
        println!("Default port: {port}");
        config.port = Some(port);
    }
    if let Some(baud_rate) = baud_rate {
        println!("Baud rate: {baud_rate}");
        config.baud_rate = Some(baud_rate);
    }
    if let Some(variant) = frame_variant {
        println!("Status frames: {variant}");
        config.frame_variant = Some(variant);
    }

    config.save_to(path)
}

fn get_(config: &CliConfig, key: &str) -> Result<String> {
    let unset = || "(not set)".to_string();
    Ok(match key {
        "port" => config.port.clone().unwrap_or_else(unset),
        "baud_rate" => config.baud_rate().to_string(),
        "frame_variant" => config.frame_variant.unwrap_or_default().to_string(),
        "all" => format!(
            "port: {}\nbaud_rate: {}\nframe_variant: {}",
            config.port.clone().unwrap_or_else(unset),
            config.baud_rate(),
            config.frame_variant.unwrap_or_default()
        ),
        other => anyhow::bail!("Unknown config key: {other}"),
    })
}

fn check_(path: &Path) -> Result<()> {
    let config = CliConfig::load_from(path)?;
    println!("Config file: {}", path.display());
    println!("{}", get_(&config, "all")?);

    let ports = list_ports().context("Failed to enumerate serial ports")?;
    match &config.port {
        Some(port) if ports.iter().any(|p| &p.name == port) => println!("Port {port} is present"),
        Some(port) => println!("Port {port} was not found ({} ports available)", ports.len()),
        None => println!("No default port; the first available port will be used"),
    }
    Ok(())
}
