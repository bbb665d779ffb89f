use clap::Parser;
use restlink::config::Command;
use restlink::core::coercion;
use restlink::core::transport::RestRequest;
use restlink::utils::error::ErrorSeverity;
use restlink::utils::{logger, validation, validation::Validate};
use restlink::{
    CliConfig, MediaType, RestError, RestServer, SslConfig, StaticDiscovery,
    StatusService, TomlConfig, ValueKind,
};
use std::path::PathBuf;

const BUILTIN_NAMESPACE: &str = "restlink";

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let result = match cli.command.clone() {
        Command::Serve {
            config,
            host,
            port,
            keystore,
        } => serve(&cli, config, host, port, keystore).await,
        Command::Get {
            url,
            media_type,
            kind,
        } => {
            init_logger(&cli, false);
            get(&url, &media_type, kind.into()).await
        }
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ restlink failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn init_logger(cli: &CliConfig, json_from_file: bool) {
    if cli.json_logs || json_from_file {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
}

async fn serve(
    cli: &CliConfig,
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    keystore: Option<PathBuf>,
) -> Result<(), RestError> {
    let file = config_path.map(TomlConfig::from_file).transpose()?;
    if let Some(file) = &file {
        file.validate()?;
    }

    init_logger(cli, file.as_ref().is_some_and(TomlConfig::json_logs));
    tracing::info!("Starting restlink server");

    let mut server_config = file
        .as_ref()
        .map(TomlConfig::server_config)
        .unwrap_or_default();
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }
    if server_config.namespaces.is_empty() {
        server_config.namespaces.push(BUILTIN_NAMESPACE.to_string());
    }
    if cli.verbose {
        tracing::debug!("Server config: {:?}", server_config);
    }

    let ssl = keystore
        .map(SslConfig::new)
        .or_else(|| file.as_ref().and_then(TomlConfig::ssl_config));

    let status = StatusService::new().with_services(vec![StatusService::CANONICAL_NAME.to_string()]);
    let discovery = StaticDiscovery::new().service(BUILTIN_NAMESPACE, status);

    let mut server = RestServer::new(server_config, &discovery)?;
    if let Some(ssl) = &ssl {
        server.enable_ssl(ssl)?;
    }

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("🛑 Ctrl-C received");
            handle.shutdown();
        }
    });

    server.execute().await?;
    println!("✅ restlink server stopped");
    Ok(())
}

async fn get(url: &str, media_type: &str, kind: ValueKind) -> Result<(), RestError> {
    validation::validate_url("url", url)?;

    let media_type = MediaType::new(media_type);
    let value = RestRequest::new()
        .get_text(url, &media_type)
        .await
        .and_then(|text| coercion::coerce(&text, kind, media_type.is_json()));

    match value {
        Some(value) => println!("{}", value),
        None => println!("null"),
    }
    Ok(())
}
