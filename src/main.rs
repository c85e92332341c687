use clap::{Arg, Command};
use log::LevelFilter;
use phishscore::{AnalysisResult, HistoryStore, ScoringConfig, ScoringEngine};
use std::io::Read;
use std::process;

// Canned credential-phish sample for quick demos.
const DEMO_EMAIL: &str = "\
URGENT: Your Account Security Alert
Dear Customer,
We detected unusual sign-in activity. Verify your account immediately:
http://secure-banking-verify.com/auth
Your account will be suspended if you don't act now.
";

fn main() {
    let matches = Command::new("phishscore")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transparent phishing email scorer using weighted keyword and URL heuristics")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Keyword dictionary file (YAML); defaults to the built-in tables"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the default dictionary configuration and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the dictionary configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .help("Show dictionary sizes and weights")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("analyze")
                .short('a')
                .long("analyze")
                .value_name("TEXT")
                .help("Analyze the given email text")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("email-file")
                .short('f')
                .long("email-file")
                .value_name("FILE")
                .help("Analyze email text read from a file ('-' for stdin)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Analyze a built-in sample phishing email")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit the analysis result as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .value_name("NAME")
                .help("User the analysis history is recorded under")
                .default_value("local"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("FILE")
                .help("History database path")
                .default_value("email_history.db"),
        )
        .arg(
            Arg::new("no-history")
                .long("no-history")
                .help("Do not record this analysis in the history database")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .help("Show the analysis history for the user and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("clear-history")
                .long("clear-history")
                .help("Delete the analysis history for the user and exit")
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

    if let Some(path) = matches.get_one::<String>("generate-config") {
        generate_default_config(path);
        return;
    }

    let config = match load_config(matches.get_one::<String>("config")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("🔍 Testing configuration...");
        match config.validate() {
            Ok(()) => {
                for rule in &config.categories {
                    println!(
                        "  {} {}: {} keywords, weight {}",
                        rule.category.emoji(),
                        rule.category.label(),
                        rule.keywords.len(),
                        rule.weight
                    );
                }
                println!(
                    "  🔗 Suspicious domain tokens: {}",
                    config.suspicious_domains.len()
                );
                println!("✅ Configuration is valid");
            }
            Err(e) => {
                println!("❌ Configuration validation failed: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let engine = match ScoringEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error building scoring engine: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("status") {
        print_status(&engine, matches.get_flag("json"));
        return;
    }

    let user = matches.get_one::<String>("user").unwrap();
    let db_path = matches.get_one::<String>("db").unwrap();

    if matches.get_flag("history") || matches.get_flag("clear-history") {
        let store = match HistoryStore::open(db_path) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error opening history database: {e}");
                process::exit(1);
            }
        };
        if matches.get_flag("clear-history") {
            match store.clear_user(user) {
                Ok(removed) => println!("✅ Removed {removed} history entries for {user}"),
                Err(e) => {
                    eprintln!("Error clearing history: {e}");
                    process::exit(1);
                }
            }
        } else {
            match store.user_history(user) {
                Ok(entries) => print_history(user, &entries),
                Err(e) => {
                    eprintln!("Error reading history: {e}");
                    process::exit(1);
                }
            }
        }
        return;
    }

    let email_text = match read_input(&matches) {
        Ok(Some(text)) => text,
        Ok(None) => {
            eprintln!("No input given. Use --analyze, --email-file, or --demo (see --help).");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    let result = engine.analyze(&email_text);

    // A history failure never blocks the verdict.
    if !matches.get_flag("no-history") {
        match HistoryStore::open(db_path) {
            Ok(store) => {
                if let Err(e) = store.add_entry(user, &email_text, &result) {
                    log::warn!("Failed to record analysis in history: {e}");
                }
            }
            Err(e) => log::warn!("Failed to open history database: {e}"),
        }
    }

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing result: {e}");
                process::exit(1);
            }
        }
    } else {
        print_result(&result);
    }
}

fn load_config(path: Option<&String>) -> anyhow::Result<ScoringConfig> {
    match path {
        Some(path) => ScoringConfig::load_from_file(path),
        None => Ok(ScoringConfig::default()),
    }
}

fn generate_default_config(path: &str) {
    let config = ScoringConfig::default();
    let yaml = match serde_yaml::to_string(&config) {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("Error serializing default configuration: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(path, yaml) {
        eprintln!("Error writing configuration to {path}: {e}");
        process::exit(1);
    }
    println!("✅ Default configuration written to {path}");
}

fn read_input(matches: &clap::ArgMatches) -> anyhow::Result<Option<String>> {
    if let Some(text) = matches.get_one::<String>("analyze") {
        return Ok(Some(text.clone()));
    }
    if let Some(path) = matches.get_one::<String>("email-file") {
        if path == "-" {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            return Ok(Some(text));
        }
        return Ok(Some(std::fs::read_to_string(path)?));
    }
    if matches.get_flag("demo") {
        return Ok(Some(DEMO_EMAIL.to_string()));
    }
    Ok(None)
}

fn print_result(result: &AnalysisResult) {
    println!("🔍 Analysis Results");
    println!("═══════════════════════════════════════");
    println!("Risk Score:     {}/100", result.risk_score);
    println!("Risk Level:     {}", result.risk_level);
    let classification = if result.is_phishing {
        "🚨 PHISHING"
    } else {
        "✅ Legitimate"
    };
    println!("Classification: {classification}");
    if result.degraded {
        println!("⚠️  Analysis degraded - treat this verdict with caution");
    }
    if !result.reasons.is_empty() {
        println!();
        println!("Reasons:");
        for reason in &result.reasons {
            println!("  • {reason}");
        }
    }
}

fn print_status(engine: &ScoringEngine, json: bool) {
    let status = engine.status();
    if json {
        match serde_json::to_string_pretty(&status) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error serializing status: {e}");
                process::exit(1);
            }
        }
        return;
    }
    println!("📊 Engine Status");
    println!("═══════════════════════════════════════");
    for category in &status.categories {
        println!(
            "  {} {:<10} {:>3} keywords, weight {}",
            category.category.emoji(),
            category.category.label(),
            category.keyword_count,
            category.weight
        );
    }
    println!();
    println!("Total keywords:           {}", status.total_keywords);
    println!("Suspicious domain tokens: {}", status.suspicious_domains);
}

fn print_history(user: &str, entries: &[phishscore::HistoryEntry]) {
    if entries.is_empty() {
        println!("No history for {user}");
        return;
    }
    println!("📜 History for {user} ({} entries):", entries.len());
    println!("═══════════════════════════════════════");
    for entry in entries {
        let verdict = if entry.prediction {
            "PHISHING"
        } else {
            "legitimate"
        };
        let preview: String = entry.email_content.chars().take(60).collect();
        println!(
            "  [{}] {:<10} score {:>3}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            verdict,
            entry.risk_score,
            preview.replace('\n', " ")
        );
    }
}
