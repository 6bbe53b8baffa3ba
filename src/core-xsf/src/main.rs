use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use core_xsf::{
    ExclusionStore, HmacNonces, QueryArgs, SitemapFilter, SitemapStatus, get_db_pool, get_nonce_config, get_site_url,
    nonce::SAVE_ACTION, setup_logging, sitemap_url,
};
use data_model_xsf::models::{DisabledProviders, ExclusionKey, ExclusionSet, IdSet, Provider};
use data_model_xsf::option_store::{OptionStore, PgOptionStore};

#[derive(Parser)]
#[command(name = "sitemap-filter")]
#[command(about = "Manage which content appears in the XML sitemap", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the last update, the sitemap URL and the disabled providers
    Status,

    /// List every stored exclusion list
    List,

    /// Replace the excluded IDs of one group/subtype. Passing no IDs clears the list.
    Exclude {
        /// Content group: posts, taxonomies or users
        #[arg(short, long)]
        group: String,
        /// Post type, taxonomy, or `users` for the users group
        #[arg(short, long)]
        subtype: String,
        #[arg(value_parser = parse_id)]
        ids: Vec<u64>,
    },

    /// Replace the disabled providers. Passing no names enables every provider.
    DisableProviders {
        #[arg(value_parser = parse_provider)]
        names: Vec<Provider>,
    },

    /// Print the query arguments the sitemap engine would receive
    Preview {
        #[command(subcommand)]
        query: PreviewQuery,
        /// Initial query arguments as a JSON object
        #[arg(long, default_value = "{}", value_parser = parse_query_args)]
        args: QueryArgs,
    },

    /// Check whether a provider would be registered
    Provider { name: String },

    /// Print a fresh nonce for the admin settings form
    Nonce,
}

#[derive(Subcommand, Clone)]
enum PreviewQuery {
    /// Posts sitemap query for a post type
    Posts { post_type: String },
    /// Taxonomy sitemap query for a taxonomy
    Taxonomy { taxonomy: String },
    /// Users sitemap query
    Users,
}

fn parse_id(s: &str) -> Result<u64, String> {
    s.trim()
        .parse::<u64>()
        .map_err(|e| format!("Not a non-negative integer ID ({s}): {e}"))
}

fn parse_provider(s: &str) -> Result<Provider, String> {
    Provider::parse(s.trim()).ok_or_else(|| format!("Unknown provider '{s}', expected one of: posts, taxonomies, users"))
}

fn parse_query_args(s: &str) -> Result<QueryArgs, String> {
    serde_json::from_str(s).map_err(|e| format!("Query arguments must be a JSON object: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if it exists
    dotenvy::dotenv().ok();

    setup_logging("sitemap_filter=info,core_xsf=info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Nonce => {
            let config = get_nonce_config()?;
            let nonce = HmacNonces::from_config(&config).issue(SAVE_ACTION)?;
            println!("{nonce}");
        }

        Commands::Status => {
            let store = ExclusionStore::new(open_options().await?);
            let home = get_site_url().context("SITE_URL is not a valid URL")?;
            let status = SitemapStatus::load(&store, sitemap_url(&home)?).await?;
            println!("{status}");
        }

        Commands::List => {
            let store = ExclusionStore::new(open_options().await?);
            let exclusions = store.load_exclusions().await?;
            if exclusions.is_empty() {
                println!("No exclusions stored.");
            }
            for (key, ids) in exclusions.iter() {
                let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
                println!("{key}: {}", ids.join(", "));
            }
        }

        Commands::Exclude { group, subtype, ids } => {
            let store = ExclusionStore::new(open_options().await?);
            let key = ExclusionKey::new(group.as_str(), subtype.as_str());
            let update: ExclusionSet = [(key.clone(), ids.into_iter().collect::<IdSet>())].into_iter().collect();
            let stored = store.save_exclusions(update).await?;
            store.touch_last_update().await?;
            let count = stored.get(&key).map(|ids| ids.len()).unwrap_or(0);
            println!("{key}: {count} excluded");
        }

        Commands::DisableProviders { names } => {
            let store = ExclusionStore::new(open_options().await?);
            let disabled = store
                .save_disabled_providers(names.into_iter().collect::<DisabledProviders>())
                .await?;
            store.touch_last_update().await?;
            if disabled.is_empty() {
                println!("All providers active.");
            } else {
                println!("Disabled providers: {disabled}");
            }
        }

        Commands::Preview { query, args } => {
            let filter = SitemapFilter::new(open_options().await?);
            let filtered = match query {
                PreviewQuery::Posts { post_type } => filter.on_posts_query(args, &post_type).await,
                PreviewQuery::Taxonomy { taxonomy } => filter.on_taxonomy_query(args, &taxonomy).await,
                PreviewQuery::Users => filter.on_users_query(args).await,
            };
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }

        Commands::Provider { name } => {
            let filter = SitemapFilter::new(open_options().await?);
            match filter.on_provider_registration((), &name).await {
                Some(()) => println!("{name}: registered"),
                None => println!("{name}: disabled"),
            }
        }
    }

    Ok(())
}

/// Option store backed by the database at DATABASE_URL.
async fn open_options() -> anyhow::Result<Arc<dyn OptionStore>> {
    let pool = get_db_pool().await?;
    Ok(Arc::new(PgOptionStore::new(pool)))
}
