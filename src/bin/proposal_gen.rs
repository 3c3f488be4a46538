//! Offline proposal generation and cleanup.
//!
//! Usage:
//!   proposal-gen generate --projects projects.json --id 3 --template template.docx -o out/
//!   proposal-gen scope --projects projects.json --id 3
//!   proposal-gen cleanup --dir generated_docs [--stale-secs 900]
//!   proposal-gen prices --sheet prices.csv
//!   proposal-gen items --catalog items.json [add|remove <name>]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proposal_docs::catalog::{Catalog, CsvPriceSheet};
use proposal_docs::project::{JsonProjectStore, ProjectStore};
use proposal_docs::scope::describe_items;
use proposal_docs::{DocumentGenerator, GeneratorConfig, Janitor, JanitorConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "proposal-gen", about = "Fill proposal templates and manage generated files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the template for one project and write the output file
    Generate {
        /// Projects JSON file
        #[arg(long, env = "PROPOSAL_PROJECTS")]
        projects: PathBuf,

        /// Project id
        #[arg(long)]
        id: i64,

        /// Template DOCX
        #[arg(long, env = "PROPOSAL_TEMPLATE")]
        template: PathBuf,

        /// Output directory
        #[arg(short, long, env = "PROPOSAL_OUTPUT_DIR", default_value = "generated_docs")]
        output_dir: PathBuf,
    },

    /// Print the scope-of-work text for a project's items
    Scope {
        #[arg(long, env = "PROPOSAL_PROJECTS")]
        projects: PathBuf,

        #[arg(long)]
        id: i64,
    },

    /// Delete generated files (all of them, or only stale ones)
    Cleanup {
        /// Generated-documents directory
        #[arg(long, env = "PROPOSAL_OUTPUT_DIR", default_value = "generated_docs")]
        dir: PathBuf,

        /// Only delete outputs older than this many seconds
        #[arg(long)]
        stale_secs: Option<u64>,
    },

    /// Parse a price sheet CSV and print the prices
    Prices {
        #[arg(long, env = "PROPOSAL_PRICE_SHEET")]
        sheet: PathBuf,
    },

    /// List the selectable items, or add/remove one
    Items {
        /// Item catalog JSON (defaults are used when missing)
        #[arg(long, env = "PROPOSAL_CATALOG", default_value = "items.json")]
        catalog: PathBuf,

        /// Price sheet CSV used to show unit prices next to the items
        #[arg(long, env = "PROPOSAL_PRICE_SHEET", default_value = "prices.csv")]
        sheet: PathBuf,

        #[command(subcommand)]
        action: Option<ItemAction>,
    },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Add an item to the catalog
    Add { name: String },
    /// Remove an item from the catalog
    Remove { name: String },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            projects,
            id,
            template,
            output_dir,
        } => {
            let store = JsonProjectStore::new(projects);
            let generator = DocumentGenerator::new(GeneratorConfig {
                template,
                output_dir,
            });
            let doc = generator.generate_for(&store, id)?;
            println!("Saved to: {}", doc.path.display());
            println!(
                "  {} paragraphs, {} table cells, {} shapes ({} skipped), {} modified",
                doc.stats.paragraphs,
                doc.stats.table_cells,
                doc.stats.shapes,
                doc.stats.skipped_shapes,
                doc.stats.modified
            );
        }
        Commands::Scope { projects, id } => {
            let store = JsonProjectStore::new(projects);
            let project = store
                .project(id)?
                .with_context(|| format!("Project {} not found", id))?;
            println!("{}", describe_items(&project.items));
        }
        Commands::Cleanup { dir, stale_secs } => {
            let mut config = JanitorConfig::new(dir);
            let removed = match stale_secs {
                Some(secs) => {
                    config.sweep_interval = Duration::from_secs(secs);
                    Janitor::new(config).sweep_stale()
                }
                None => Janitor::new(config).clean_all(),
            };
            println!("Removed {} generated file(s)", removed);
        }
        Commands::Prices { sheet } => {
            let catalog = Catalog::new(Box::new(CsvPriceSheet::new(sheet)));
            let mut prices: Vec<(String, f64)> = catalog.prices().into_iter().collect();
            if prices.is_empty() {
                anyhow::bail!("No prices could be read from the sheet");
            }
            prices.sort_by(|a, b| a.0.cmp(&b.0));
            for (name, price) in prices {
                println!("{:<30} {:>10.2}", name, price);
            }
        }
        Commands::Items {
            catalog,
            sheet,
            action,
        } => {
            let items = Catalog::load(&catalog, Box::new(CsvPriceSheet::new(sheet)))?;
            match action {
                Some(ItemAction::Add { name }) => {
                    if items.add_item(&name) {
                        items.save(&catalog)?;
                        println!("Added '{}'", name.trim());
                    } else {
                        println!("'{}' is already listed", name.trim());
                    }
                }
                Some(ItemAction::Remove { name }) => {
                    if items.remove_item(&name) {
                        items.save(&catalog)?;
                        println!("Removed '{}'", name);
                    } else {
                        println!("'{}' is not listed", name);
                    }
                }
                None => {
                    let prices = items.prices();
                    for name in items.items() {
                        match prices.get(&name) {
                            Some(price) => println!("{:<30} {:>10.2}", name, price),
                            None => println!("{:<30} {:>10}", name, "-"),
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
