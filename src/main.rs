//! Parla CLI - 交互式 TTS 合成终端
//!
//! 连接远程合成服务，逐行读取文本输入，
//! 按配置以批量或流式方式合成并交给外部播放程序

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use parla::application::{SpeechServicePort, SynthesisOrchestrator};
use parla::config::{load_config, print_config, AppConfig};
use parla::domain::speech::{AudioEncoding, SynthesisRequest};
use parla::infrastructure::grpc::{ConnectOption, GrpcSpeechClient};
use parla::infrastructure::playback::ProcessSink;

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "parla", about = "Interactive text-to-speech client")]
struct Cli {
    /// 配置文件路径
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 打印横幅
    println!("Parla CLI - interactive text-to-speech client\n");

    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config(&cli.config).map_err(|e| {
        anyhow::anyhow!("Failed to load config {}: {}", cli.config.display(), e)
    })?;

    // 初始化日志
    let log_filter = format!("{},parla={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    print_config(&config);

    // 组装连接选项并建立连接
    let options = build_connect_options(&config).await?;
    let client = GrpcSpeechClient::connect(config.server.address.clone(), options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize speech client: {}", e))?;

    // 查询服务端版本
    let version = client
        .version(None)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get server version: {}", e))?;
    println!("{}", version);
    println!("Connected to {}\n", client.address());

    // 获取音色列表
    let voices = client
        .list_voices(None)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get voice list: {}", e))?;
    println!("Available voices:");
    for voice in &voices {
        println!("  Name: {}  ID: {}", voice.name, voice.id);
    }
    println!();

    // 组装编排器: gRPC 客户端 + 播放进程 sink
    let sink = ProcessSink::new(
        config.playback.application.clone(),
        config.playback.arg_list(),
    );
    let mut orchestrator = SynthesisOrchestrator::new(Arc::new(client), Box::new(sink));

    // 交互循环: 读取整行输入直到 EOF
    println!("Enter text to synthesize at the prompt. To exit, use Ctrl+D.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"parla> ").await?;
        stdout.flush().await?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        // 纯空白输入直接忽略，不发出请求
        if line.trim().is_empty() {
            continue;
        }

        // 单个请求失败只中止该请求，循环继续等待下一个输入
        if let Err(e) = handle_line(&mut orchestrator, &config, &line).await {
            println!("synthesis error: {}\n", e);
        }
    }

    println!("Exiting...");
    Ok(())
}

/// 处理一行输入: 构造请求并按配置的模式合成
async fn handle_line(
    orchestrator: &mut SynthesisOrchestrator,
    config: &AppConfig,
    line: &str,
) -> anyhow::Result<()> {
    let request = SynthesisRequest::new(
        config.server.voice_id.as_str(),
        AudioEncoding::RawLinear16,
        line,
    )?;

    if config.streaming {
        let report = orchestrator.synthesize_streaming(&request).await?;
        if let Some(ttfc) = report.time_to_first_chunk {
            println!("time to first audio: {:.3?}", ttfc);
        }
        println!("streaming synthesis took {:.3?}\n", report.total);
    } else {
        let report = orchestrator.synthesize_batch(&request).await?;
        println!("batch synthesis took {:.3?}", report.synthesis);
        println!("playback took {:.3?}", report.playback);
        println!("real time factor: {:.2}\n", report.real_time_factor);
    }

    Ok(())
}

/// 把配置翻译成连接选项（按顺序应用，证书文件在此读取）
async fn build_connect_options(config: &AppConfig) -> anyhow::Result<Vec<ConnectOption>> {
    let server = &config.server;
    let mut options = vec![ConnectOption::ConnectTimeout(Duration::from_secs(
        server.connect_timeout_secs,
    ))];

    if server.insecure {
        options.push(ConnectOption::Insecure);
    }

    if let Some(path) = &server.ca_cert {
        let pem = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read CA certificate {}: {}", path, e))?;
        options.push(ConnectOption::ServerCert(pem));
    }

    if let (Some(cert_path), Some(key_path)) = (&server.client_cert, &server.client_key) {
        let cert = tokio::fs::read(cert_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read client certificate {}: {}", cert_path, e))?;
        let key = tokio::fs::read(key_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read client key {}: {}", key_path, e))?;
        options.push(ConnectOption::ClientCert { cert, key });
    }

    Ok(options)
}
