use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use petal_contracts::config::ConfigStore;
use petal_contracts::history::HistoryLedger;
use petal_contracts::inventory::InventoryLedger;
use petal_contracts::models::{
    provider_preset, DesignRequest, FlowerCategory, FlowerStock, Language, Occasion, Recipient,
    Style, PROVIDER_PRESETS,
};
use petal_contracts::session::SessionStore;
use petal_contracts::stores::{FileSecretStore, KvStore};
use petal_engine::{attach_preview, DesignPlanner, ImageDispatcher};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "petal", version, about = "Florist studio assistant")]
struct Cli {
    /// Directory holding the settings blob, secrets, and saved previews.
    #[arg(long, default_value = ".petal")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage flower stock.
    #[command(subcommand)]
    Inventory(InventoryCommand),
    /// Generate a design plan (and preview image) from a request.
    Design(DesignArgs),
    /// Browse, execute, or delete saved plans.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Show or change provider settings.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Sign in with a shop name.
    Login { name: String },
    Logout,
    /// Set the output language (en | zh).
    Lang { language: String },
}

#[derive(Debug, Subcommand)]
enum InventoryCommand {
    List,
    Add(AddStockArgs),
    /// Set the on-hand quantity of one stock record.
    UpdateQty { id: String, quantity: u32 },
    Delete { id: String },
    /// List records at or below the alert threshold.
    LowStock {
        #[arg(long)]
        threshold: Option<u32>,
    },
}

#[derive(Debug, Parser)]
struct AddStockArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    color: String,
    #[arg(long)]
    quantity: u32,
    #[arg(long)]
    cost: f64,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value = "main")]
    category: String,
    #[arg(long)]
    meaning: Option<String>,
    /// Comma-separated culture tags, e.g. "western,universal".
    #[arg(long)]
    tags: Option<String>,
}

#[derive(Debug, Parser)]
struct DesignArgs {
    #[arg(long, default_value = "home")]
    occasion: String,
    #[arg(long, default_value = "self")]
    recipient: String,
    #[arg(long, default_value = "fresh")]
    style: String,
    #[arg(long)]
    budget: Option<f64>,
    #[arg(long)]
    requirements: Option<String>,
    #[arg(long)]
    school: Option<String>,
    #[arg(long)]
    technique: Option<String>,
    #[arg(long)]
    professional: bool,
    /// Design from a reference photo instead of a text-only request.
    #[arg(long)]
    from_image: Option<PathBuf>,
    /// Skip preview image generation.
    #[arg(long)]
    no_image: bool,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List,
    Show { id: String },
    /// Deduct the plan's materials from inventory and mark it completed.
    Execute { id: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    Show,
    Set(SetConfigArgs),
    /// Prefill endpoint and models from a known provider preset.
    Provider { id: String },
}

#[derive(Debug, Parser)]
struct SetConfigArgs {
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    vision_model: Option<String>,
    #[arg(long)]
    image_model: Option<String>,
    #[arg(long)]
    image_endpoint: Option<String>,
    #[arg(long)]
    budget: Option<f64>,
    #[arg(long)]
    low_stock_threshold: Option<u32>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("petal error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let mut studio = Studio::open(&cli.data_dir);
    match cli.command {
        Command::Inventory(command) => run_inventory(&mut studio, command)?,
        Command::Design(args) => run_design(&mut studio, args)?,
        Command::History(command) => run_history(&mut studio, command)?,
        Command::Config(command) => run_config(&mut studio, command)?,
        Command::Login { name } => {
            let tenant = studio.session.login(&name)?;
            println!("Signed in as {}", tenant.name);
        }
        Command::Logout => {
            studio.session.logout()?;
            println!("Signed out");
        }
        Command::Lang { language } => {
            let Some(language) = Language::parse(&language) else {
                bail!("unknown language '{language}' (expected en or zh)");
            };
            studio.session.set_language(language)?;
            println!("Language set to {}", language.as_str());
        }
    }
    Ok(0)
}

/// All stores hang off one settings file; handles merge their slots on write
/// so they can coexist.
struct Studio {
    config: ConfigStore,
    inventory: InventoryLedger,
    history: HistoryLedger,
    session: SessionStore,
    images_dir: PathBuf,
}

impl Studio {
    fn open(data_dir: &Path) -> Self {
        let store_path = data_dir.join("store.json");
        Self {
            config: ConfigStore::new(
                KvStore::new(&store_path),
                Box::new(FileSecretStore::new(data_dir.join("secrets"))),
            ),
            inventory: InventoryLedger::new(KvStore::new(&store_path)),
            history: HistoryLedger::new(KvStore::new(&store_path)),
            session: SessionStore::new(KvStore::new(&store_path)),
            images_dir: data_dir.join("images"),
        }
    }
}

fn run_inventory(studio: &mut Studio, command: InventoryCommand) -> Result<()> {
    match command {
        InventoryCommand::List => {
            for stock in studio.inventory.list() {
                print_stock(&stock);
            }
        }
        InventoryCommand::Add(args) => {
            let mut stock = FlowerStock::new(
                &args.name,
                &args.color,
                args.quantity,
                args.quantity,
                parse_category(&args.category)?,
                args.cost,
                args.price,
                args.meaning.as_deref(),
            );
            if let Some(tags) = &args.tags {
                stock.culture_tags = Some(
                    tags.split(',')
                        .map(str::trim)
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string)
                        .collect(),
                );
            }
            let id = stock.id.clone();
            studio.inventory.add(stock)?;
            println!("Added {id}");
        }
        InventoryCommand::UpdateQty { id, quantity } => {
            let Some(mut stock) = studio.inventory.get(&id) else {
                bail!("no stock record with id {id}");
            };
            stock.quantity = quantity;
            stock.updated_at = Some(petal_contracts::now_utc_iso());
            studio.inventory.update(stock)?;
            println!("Updated {id}");
        }
        InventoryCommand::Delete { id } => {
            studio.inventory.delete(&id)?;
            println!("Deleted {id}");
        }
        InventoryCommand::LowStock { threshold } => {
            let threshold =
                threshold.unwrap_or_else(|| studio.config.current().low_stock_threshold);
            for stock in studio.inventory.low_stock(threshold) {
                print_stock(&stock);
            }
        }
    }
    Ok(())
}

fn run_design(studio: &mut Studio, args: DesignArgs) -> Result<()> {
    let config = studio.config.current();
    let language = studio.session.language();
    let listing = studio
        .inventory
        .listing_text(config.low_stock_threshold);

    let mut request = DesignRequest::new(
        parse_occasion(&args.occasion)?,
        parse_recipient(&args.recipient)?,
        parse_style(&args.style)?,
    );
    request.budget = args.budget;
    request.requirements = args.requirements;
    request.school = args.school;
    request.technique = args.technique;
    if args.professional {
        request.design_mode = Some("professional".to_string());
    }

    let planner = DesignPlanner::new(config.clone(), language)?;
    let mut plan = match &args.from_image {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
            planner.generate_plan_from_image(&bytes, &request, &listing)?
        }
        None => planner.generate_plan(&request, &listing)?,
    };

    if !args.no_image {
        let dispatcher = ImageDispatcher::new(config)?;
        attach_preview(&dispatcher, &mut plan, Some(&studio.images_dir));
    }

    studio.history.save(plan.clone())?;
    print_plan(&plan);
    Ok(())
}

fn run_history(studio: &mut Studio, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => {
            for plan in studio.history.list() {
                println!(
                    "{}  {:<9}  {}  {}",
                    plan.id,
                    match plan.status {
                        petal_contracts::models::PlanStatus::Draft => "draft",
                        petal_contracts::models::PlanStatus::Completed => "completed",
                    },
                    plan.created_at,
                    plan.title,
                );
            }
        }
        HistoryCommand::Show { id } => {
            let Some(plan) = studio.history.get(&id) else {
                bail!("no saved plan with id {id}");
            };
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        HistoryCommand::Execute { id } => {
            let Some(plan) = studio.history.get(&id) else {
                bail!("no saved plan with id {id}");
            };
            let executed = studio.history.execute(plan, &mut studio.inventory)?;
            println!(
                "Executed {} at {}",
                executed.id,
                executed.executed_at.as_deref().unwrap_or("-"),
            );
        }
        HistoryCommand::Delete { id } => {
            studio.history.delete(&id)?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

fn run_config(studio: &mut Studio, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let mut config = studio.config.current();
            if !config.api_key.is_empty() {
                config.api_key = "••••".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Set(args) => {
            let mut config = studio.config.current();
            if let Some(api_key) = args.api_key {
                config.api_key = api_key;
            }
            if let Some(endpoint) = args.endpoint {
                config.endpoint = endpoint;
            }
            if let Some(text_model) = args.text_model {
                config.text_model = text_model;
            }
            if let Some(vision_model) = args.vision_model {
                config.vision_model = vision_model;
            }
            if let Some(image_model) = args.image_model {
                config.image_model = image_model;
            }
            if let Some(image_endpoint) = args.image_endpoint {
                config.image_endpoint =
                    (!image_endpoint.is_empty()).then_some(image_endpoint);
            }
            if let Some(budget) = args.budget {
                config.budget = budget;
            }
            if let Some(threshold) = args.low_stock_threshold {
                config.low_stock_threshold = threshold;
            }
            studio.config.update(&config)?;
            println!("Settings saved");
        }
        ConfigCommand::Provider { id } => {
            let Some(preset) = provider_preset(&id) else {
                let known: Vec<&str> = PROVIDER_PRESETS.iter().map(|preset| preset.id).collect();
                bail!("unknown provider '{id}' (expected one of: {})", known.join(", "));
            };
            let mut config = studio.config.current();
            if preset.id != "custom" {
                config.endpoint = preset.endpoint.to_string();
                config.text_model = preset.models.first().copied().unwrap_or_default().to_string();
                config.vision_model = preset
                    .vision_models
                    .first()
                    .copied()
                    .unwrap_or_default()
                    .to_string();
                config.image_endpoint = (!preset.image_endpoint.is_empty())
                    .then(|| preset.image_endpoint.to_string());
                config.image_model = preset
                    .image_models
                    .first()
                    .copied()
                    .unwrap_or_default()
                    .to_string();
            }
            studio.config.update(&config)?;
            println!("Applied provider preset {}", preset.name);
        }
    }
    Ok(())
}

fn print_stock(stock: &FlowerStock) {
    println!(
        "{}  {:<14}  qty {:<4}  ¥{:<6}  {}",
        stock.id,
        stock.name,
        stock.quantity,
        stock.unit_cost,
        stock.category.as_str(),
    );
}

fn print_plan(plan: &petal_contracts::models::DesignPlan) {
    println!("{}", plan.title);
    println!("{}", plan.description);
    println!();
    for item in &plan.flower_list {
        match &item.reason {
            Some(reason) => println!("  {} x{}  ({reason})", item.flower_name, item.count),
            None => println!("  {} x{}", item.flower_name, item.count),
        }
    }
    println!();
    for (index, step) in plan.steps.iter().enumerate() {
        println!("  {}. {step}", index + 1);
    }
    println!();
    println!("Meaning: {}", plan.meaning_text);
    println!("Estimated cost: ¥{}", plan.total_cost);
    if let Some(image_url) = &plan.image_url {
        println!("Preview: {image_url}");
    }
    if let Some(image_error) = &plan.image_error {
        println!("Preview unavailable: {image_error}");
    }
    println!("Saved as {}", plan.id);
}

fn parse_occasion(value: &str) -> Result<Occasion> {
    Occasion::ALL
        .iter()
        .copied()
        .find(|occasion| occasion.as_str() == value)
        .with_context(|| unknown_variant("occasion", value, &Occasion::ALL.map(|o| o.as_str())))
}

fn parse_recipient(value: &str) -> Result<Recipient> {
    Recipient::ALL
        .iter()
        .copied()
        .find(|recipient| recipient.as_str() == value)
        .with_context(|| unknown_variant("recipient", value, &Recipient::ALL.map(|r| r.as_str())))
}

fn parse_style(value: &str) -> Result<Style> {
    Style::ALL
        .iter()
        .copied()
        .find(|style| style.as_str() == value)
        .with_context(|| unknown_variant("style", value, &Style::ALL.map(|s| s.as_str())))
}

fn parse_category(value: &str) -> Result<FlowerCategory> {
    FlowerCategory::ALL
        .iter()
        .copied()
        .find(|category| category.as_str() == value)
        .with_context(|| {
            unknown_variant("category", value, &FlowerCategory::ALL.map(|c| c.as_str()))
        })
}

fn unknown_variant(kind: &str, value: &str, expected: &[&str]) -> String {
    format!("unknown {kind} '{value}' (expected one of: {})", expected.join(", "))
}
