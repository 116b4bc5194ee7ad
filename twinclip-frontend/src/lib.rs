pub mod cli;
pub mod errors;
pub mod loader;
pub mod repl;
pub mod session;

use std::io;
use std::path::Path;

use errors::FrontendError;
use tracing::info;
use twinclip_config::AppConfig;

use crate::loader::load_region_from_env_or_demo;
use crate::session::DemoSession;

/// 加载区域后运行 CLI 演示，报告写到标准输出。
pub fn run_cli_demo(config: &AppConfig, region: Option<&Path>) -> Result<(), FrontendError> {
    info!("启动 CLI 演示前端");
    let loaded = load_region_from_env_or_demo(config, region)?;
    let mut session = DemoSession::new(config, loaded);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run_demo(config, &mut session, &mut out)
}

/// 从标准输入逐行读取交互命令。
pub fn run_repl(config: &AppConfig, region: Option<&Path>) -> Result<(), FrontendError> {
    info!("启动交互模式");
    let loaded = load_region_from_env_or_demo(config, region)?;
    let mut session = DemoSession::new(config, loaded);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    repl::run_repl(
        &mut session,
        config.frontend.report_precision,
        &mut input,
        &mut out,
    )
}
