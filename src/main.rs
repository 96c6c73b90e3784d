//! VMFW - VM Firewall policy engine CLI
//!
//! Command-line front end for the rule engine: browse the catalog, expand
//! templates, check rules as you type them, and run a full wizard submission.
//!
//! # Usage
//!
//! ```bash
//! vmfw services                         # List service presets
//! vmfw services --category database     # Presets in one category
//! vmfw templates                        # List firewall templates
//! vmfw expand web-server                # Show the rules a template produces
//! vmfw expand web-server --json         # Same, as JSON
//! vmfw ports "80, 8000-8100"            # Parse a port specification
//! vmfw check --action allow --direction inbound --port 22
//! vmfw wizard --scope vm:web01 --direction inbound --preset ssh --action allow
//! vmfw wizard --scope department:eng --direction inbound --template web-server
//! ```

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use vmfw::config::{self, EngineConfig};
use vmfw::core::catalog::{Catalog, ServiceCategory, TemplateCategory};
use vmfw::core::error::{Error, StoreErrorPattern};
use vmfw::core::expander::expand_template_by_id;
use vmfw::core::firewall::{ConcreteRule, RuleDraft, format_rule_for_display};
use vmfw::core::ports::{format_port_spans, parse_ports};
use vmfw::core::risk::calculate_risk_level;
use vmfw::core::store::{MemoryRuleStore, RuleScope};
use vmfw::core::wizard::{Customization, ServiceSelection, StepInput, WizardSession, WizardStep};
use vmfw::utils::{ensure_dirs, log_file_path, truncate_string};
use vmfw::validators::validate_rule;

#[derive(Parser)]
#[command(name = "vmfw")]
#[command(about = "VM firewall policy engine - catalog, validation and rule wizard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List service presets
    Services {
        /// Only show one category (web, remote, database, email, file, other)
        #[arg(short, long)]
        category: Option<ServiceCategory>,
    },
    /// List firewall templates
    Templates {
        /// Only show one category
        #[arg(short, long)]
        category: Option<TemplateCategory>,
    },
    /// Show the rules a template expands to
    Expand {
        /// Template id
        template: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Parse a port specification
    Ports {
        /// e.g. "22", "8000-8100", "80,443", "*"
        spec: String,
    },
    /// Validate a rule and show its risk
    Check(RuleArgs),
    /// Run a full wizard session and submit to an in-memory store
    Wizard(WizardArgs),
}

#[derive(Args)]
struct RuleArgs {
    #[arg(long)]
    action: String,
    #[arg(long)]
    direction: String,
    #[arg(long)]
    protocol: Option<String>,
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    destination: Option<String>,
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Args)]
struct WizardArgs {
    /// Target scope: vm:<id>, department:<id> or filter:<id>
    #[arg(long, value_parser = parse_scope)]
    scope: RuleScope,
    #[arg(long)]
    direction: String,
    /// Service preset id
    #[arg(long, conflicts_with_all = ["template", "protocol"])]
    preset: Option<String>,
    /// Firewall template id
    #[arg(long, conflicts_with = "protocol")]
    template: Option<String>,
    /// Custom service protocol (tcp, udp, icmp)
    #[arg(long, requires = "port")]
    protocol: Option<String>,
    /// Custom service ports, or a port override for a preset
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    action: Option<String>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    destination: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    #[arg(long)]
    priority: Option<i32>,
    /// Show the plan without submitting
    #[arg(long)]
    dry_run: bool,
}

fn parse_scope(value: &str) -> Result<RuleScope, String> {
    let (kind, id) = value
        .split_once(':')
        .ok_or_else(|| format!("'{value}' is not a scope (expected vm:<id>, department:<id> or filter:<id>)"))?;
    if id.trim().is_empty() {
        return Err(format!("Scope '{value}' has an empty id"));
    }
    match kind.to_ascii_lowercase().as_str() {
        "vm" => Ok(RuleScope::Vm(id.to_string())),
        "department" | "dept" => Ok(RuleScope::Department(id.to_string())),
        "filter" => Ok(RuleScope::Filter(id.to_string())),
        _ => Err(format!("Unknown scope kind '{kind}'")),
    }
}

fn init_logging(config: &EngineConfig) {
    if config.log_to_file
        && let Some(log_path) = log_file_path()
        && let Ok(file) = std::fs::File::create(log_path)
    {
        tracing_subscriber::fmt().with_writer(file).init();
    } else {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    }
}

fn main() -> ExitCode {
    let _ = ensure_dirs();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config().await;
    init_logging(&config);
    let catalog = Arc::new(config::load_catalog(&config).await?);

    match command {
        Commands::Services { category } => print_services(&catalog, category),
        Commands::Templates { category } => print_templates(&catalog, category),
        Commands::Expand { template, json } => {
            let rules = expand_template_by_id(&catalog, &template)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else {
                for rule in &rules {
                    let risk = calculate_risk_level(rule);
                    println!(
                        "  {:<7} {:<14} {:<4} {:<11} prio {:<5} {:<12} {}",
                        rule.action.display_name(),
                        rule.direction.display_name(),
                        rule.protocol.display_name(),
                        rule.ports.map_or_else(|| "Any".to_string(), |p| p.to_string()),
                        rule.priority,
                        risk.label,
                        rule.description
                    );
                }
            }
        }
        Commands::Ports { spec } => {
            let spans = parse_ports(&spec)?;
            if spans.is_empty() {
                println!("Any port");
            }
            for span in &spans {
                match span.to_port_range() {
                    Ok(range) => println!("  {range}"),
                    Err(msg) => println!("  {span}  ✗ {msg}"),
                }
            }
            println!("Normalized: {}", format_port_spans(&spans));
        }
        Commands::Check(args) => check_rule(args)?,
        Commands::Wizard(args) => {
            run_wizard(catalog, config.default_priority, args).await?;
        }
    }
    Ok(())
}

fn print_services(catalog: &Catalog, category: Option<ServiceCategory>) {
    let presets = match category {
        Some(category) => catalog.get_service_presets_by_category(category),
        None => catalog.service_presets().iter().collect(),
    };
    for preset in presets {
        let ports: Vec<String> = preset
            .rules
            .iter()
            .map(|r| {
                let port = r.port.map_or_else(|| "-".to_string(), |p| p.to_string());
                format!("{}/{} {}", r.protocol, port, r.direction)
            })
            .collect();
        println!(
            "  {:<12} {:<22} {:<14} {:<8} {}",
            preset.id,
            truncate_string(&preset.name, 22),
            preset.category.display_name(),
            preset.risk,
            ports.join(", ")
        );
    }
}

fn print_templates(catalog: &Catalog, category: Option<TemplateCategory>) {
    let templates = match category {
        Some(category) => catalog.get_firewall_templates_by_category(category),
        None => catalog.firewall_templates().iter().collect(),
    };
    for template in templates {
        println!(
            "  {:<16} {:<22} [{}] {}",
            template.id,
            truncate_string(&template.name, 22),
            template.services.join(", "),
            truncate_string(&template.description, 60)
        );
    }
}

fn check_rule(args: RuleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let draft = RuleDraft {
        action: args.action,
        direction: args.direction,
        protocol: args.protocol,
        port: args.port,
        source: args.source,
        destination: args.destination,
        comment: args.comment,
        ..RuleDraft::default()
    };

    let result = validate_rule(&draft);
    let risk = calculate_risk_level(&draft);
    println!("Risk: {} (score {})", risk.label, risk.score);

    if !result.is_valid {
        for error in &result.errors {
            println!("  ✗ {error}");
        }
        return Err(format!("{} validation error(s)", result.errors.len()).into());
    }

    match draft.to_concrete_rules() {
        Ok(rules) => {
            for rule in &rules {
                print_rule(rule);
            }
            Ok(())
        }
        Err(errors) => Err(Error::Validation(errors).into()),
    }
}

fn print_rule(rule: &ConcreteRule) {
    let display = format_rule_for_display(rule);
    println!("  ✓ {display}");
    for note in &display.notes {
        println!("      {note}");
    }
}

async fn run_wizard(
    catalog: Arc<Catalog>,
    default_priority: i32,
    args: WizardArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection = match (args.preset, args.template, args.protocol) {
        (Some(id), _, _) => ServiceSelection::Preset(id),
        (_, Some(id), _) => ServiceSelection::Template(id),
        (_, _, Some(protocol)) => ServiceSelection::Custom {
            protocol,
            port: args.port.clone().unwrap_or_default(),
        },
        _ => return Err("Choose --preset, --template or --protocol/--port".into()),
    };
    let custom_service = matches!(selection, ServiceSelection::Custom { .. });

    let mut session =
        WizardSession::new(catalog, args.scope).with_default_priority(default_priority);

    let steps = [
        (WizardStep::Direction, StepInput::Direction(args.direction)),
        (WizardStep::Service, StepInput::Service(selection)),
        (
            WizardStep::Customization,
            StepInput::Customization(Customization {
                action: args.action,
                port: if custom_service { None } else { args.port },
                source: args.source,
                destination: args.destination,
                comment: args.comment,
                priority: args.priority,
            }),
        ),
    ];

    for (step, input) in steps {
        if let Err(e) = session.advance(step, input) {
            eprintln!("{} step:", step.title());
            for (field, messages) in session.errors().iter() {
                for message in messages {
                    eprintln!("  ✗ {field}: {message}");
                }
            }
            return Err(e.into());
        }
    }

    let plan = session.plan()?;
    println!("Review ({} rules for {}):", plan.rules.len(), session.scope());
    for rule in &plan.rules {
        print_rule(rule);
    }

    if args.dry_run {
        session.cancel();
        return Ok(());
    }

    let store = MemoryRuleStore::new();
    match session.complete(&store).await {
        Ok(receipt) => {
            println!("✓ Created {} rules:", receipt.rule_ids.len());
            for id in &receipt.rule_ids {
                println!("  {id}");
            }
            Ok(())
        }
        Err(Error::Submission { message, created }) => {
            let translation = StoreErrorPattern::match_error(&message);
            eprintln!("✗ {}", translation.user_message);
            for suggestion in &translation.suggestions {
                eprintln!("  - {suggestion}");
            }
            Err(format!("submission stopped after {} rule(s)", created.len()).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope("vm:web01").unwrap(), RuleScope::Vm("web01".to_string()));
        assert_eq!(
            parse_scope("Department:eng").unwrap(),
            RuleScope::Department("eng".to_string())
        );
        assert!(parse_scope("vm:").is_err());
        assert!(parse_scope("host:1").is_err());
        assert!(parse_scope("web01").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
