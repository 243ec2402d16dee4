use clap::{Arg, Command};
use form_gateway::config::Config;
use form_gateway::emailer::Emailer;
use form_gateway::server::Server;
use log::LevelFilter;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("form-gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Contact-form gateway that validates submissions and sends templated emails")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/form-gateway.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity, field types and templates")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    let server = Server::new(config);
    if let Err(e) = server.run().await {
        log::error!("server error: {e:#}");
        process::exit(1);
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("Testing configuration...");
    println!();
    println!("Configured fields: {}", config.fields.len());
    for field in &config.fields {
        match field.policy_type() {
            Some(t) => println!("  {}: {t:?}", field.name),
            None => println!(
                "  {}: unknown type {:?} - this field will be skipped",
                field.name, field.field_type
            ),
        }
    }
    match Emailer::new(Arc::new(config.clone())) {
        Ok(_) => println!("Templates loaded and SMTP transport configured."),
        Err(e) => {
            eprintln!("Configuration validation failed: {e:#}");
            process::exit(1);
        }
    }
}
