use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use proofai_client::{
    Block, BlockFilter, BlockQueryService, ClientContext, Config, EndpointResolver, LogoutOutcome,
    Role, RoleController, SessionManager, TransactionWorkflow, UploadPipeline,
};

#[derive(Parser)]
#[command(name = "proofai")]
#[command(about = "ProofAI client - submit model training jobs and follow them through mining")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "proofai.toml")]
    config: PathBuf,

    /// Data directory (overrides config file)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration preset used when no config file exists
    #[arg(short, long, default_value = "development")]
    environment: Environment,

    /// Service machine (storage gateway) address, host:port
    #[arg(short = 's', long, global = true)]
    service_addr: Option<String>,

    /// Public key; falls back to remembered credentials
    #[arg(long, global = true)]
    public_key: Option<String>,

    /// Private key; falls back to remembered credentials
    #[arg(long, global = true)]
    private_key: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum Environment {
    Development,
    Production,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair through the service
    Keygen,

    /// Log in and report the session
    Login {
        /// Remember the key pair for later runs
        #[arg(long)]
        remember: bool,
    },

    /// End the service session and forget remembered credentials
    Logout {
        /// Do not ask for confirmation while a block is being mined
        #[arg(long)]
        yes: bool,
    },

    /// Show or change the session role
    Role {
        #[command(subcommand)]
        action: Option<RoleAction>,
    },

    /// Upload model or dataset files and print the CID
    Upload {
        /// Files to upload as one set
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the files stored under a CID
    Fetch {
        #[arg(long)]
        cid: String,

        /// Write the files into this directory
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Submit a model/dataset pair for mining
    Submit {
        #[arg(long)]
        model_cid: String,

        #[arg(long)]
        dataset_cid: String,
    },

    /// Check once whether a transaction is confirmed
    Confirm {
        #[arg(long)]
        from: String,

        #[arg(long)]
        nonce: u64,
    },

    /// List mined blocks
    Blocks {
        /// Only blocks carrying this session's transactions
        #[arg(long)]
        own: bool,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show the block and transaction currently being mined
    Mining,

    /// Create a default configuration file
    CreateConfig {
        /// Output configuration file path
        #[arg(long, default_value = "proofai.toml")]
        output: PathBuf,

        /// Environment type for the configuration
        #[arg(long, default_value = "development")]
        env: Environment,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum RoleAction {
    /// Role as seen after login
    Get,
    /// Re-read the role from the service
    Refresh,
    /// Switch between miner and validator
    Set { role: RoleArg },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Miner,
    Validator,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Miner => Role::Miner,
            RoleArg::Validator => Role::Validator,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Human,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Commands::CreateConfig { output, env } = &cli.command {
        return create_config_command(output, env);
    }

    let mut config = load_or_create_config(&cli)?;
    apply_cli_overrides(&mut config, &cli);
    config.validate().context("configuration validation failed")?;

    log::info!("🚀 ProofAI client v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("🔧 Environment: {:?}", cli.environment);
    log::info!("🔗 Service API: {}", config.service.api_base_url);

    let ctx = ClientContext::from_config(config).context("failed to open client state")?;
    connect(&ctx, &cli).await?;

    match &cli.command {
        Commands::Keygen => keygen_command(&ctx).await?,
        Commands::Login { remember } => {
            let session = login(&ctx, &cli, *remember).await?;
            println!("✅ Logged in as {}", session.public_key);
        }
        Commands::Logout { yes } => {
            login(&ctx, &cli, false).await?;
            logout_command(&ctx, *yes).await?;
        }
        Commands::Role { action } => {
            login(&ctx, &cli, false).await?;
            role_command(&ctx, action.unwrap_or(RoleAction::Get)).await?;
        }
        Commands::Upload { files } => {
            let cid = UploadPipeline::new(ctx.clone()).upload(files).await?;
            println!("{cid}");
        }
        Commands::Fetch { cid, output } => fetch_command(&ctx, cid, output.as_deref()).await?,
        Commands::Submit { model_cid, dataset_cid } => {
            login(&ctx, &cli, false).await?;
            let tx = TransactionWorkflow::new(ctx.clone()).submit(model_cid, dataset_cid).await?;
            println!("⛏️ Transaction submitted");
            println!("   from:  {}", tx.from);
            println!("   nonce: {}", tx.nonce);
        }
        Commands::Confirm { from, nonce } => {
            login(&ctx, &cli, false).await?;
            let confirmed = TransactionWorkflow::new(ctx.clone()).check_confirmation(from, *nonce).await?;
            if confirmed {
                println!("✅ Confirmed");
            } else {
                println!("⏳ Pending");
            }
        }
        Commands::Blocks { own, format } => {
            login(&ctx, &cli, false).await?;
            blocks_command(&ctx, *own, *format).await?;
        }
        Commands::Mining => {
            login(&ctx, &cli, false).await?;
            mining_command(&ctx).await?;
        }
        Commands::CreateConfig { .. } => {}
    }

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config(cli: &Cli) -> anyhow::Result<Config> {
    if cli.config.exists() {
        log::info!("📄 Loading configuration from {:?}", cli.config);
        match Config::load_from_file(&cli.config) {
            Ok(config) => Ok(config),
            Err(e) => {
                log::error!("❌ Failed to load configuration: {}", e);
                log::info!("🔧 Using default configuration...");
                Ok(create_default_config(&cli.environment))
            }
        }
    } else {
        log::info!("🔧 Configuration file not found, using defaults");
        let mut config = create_default_config(&cli.environment);
        config.apply_env_overrides();
        Ok(config)
    }
}

fn create_default_config(env: &Environment) -> Config {
    match env {
        Environment::Development => Config::development(),
        Environment::Production => Config::production(),
    }
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref data_dir) = cli.data_dir {
        config.storage.data_directory = data_dir.clone();
    }
    if cli.verbose {
        log::debug!("🔍 Verbose logging enabled");
    }
}

async fn connect(ctx: &ClientContext, cli: &Cli) -> anyhow::Result<()> {
    let resolver = EndpointResolver::new(ctx.clone());
    let address = match &cli.service_addr {
        Some(address) => address.clone(),
        None => {
            // The one request allowed before resolve: it only picks a default
            // address, which resolve below still validates, probes and registers
            let registered = resolver
                .registered_address()
                .await
                .context("no --service-addr given and the service has none registered")?;
            if registered.trim().is_empty() {
                bail!("no service machine address; pass --service-addr host:port");
            }
            registered
        }
    };
    resolver.resolve(&address).await?;
    Ok(())
}

async fn login(ctx: &ClientContext, cli: &Cli, remember: bool) -> anyhow::Result<proofai_client::Session> {
    let sessions = SessionManager::new(ctx.clone());
    let (public_key, private_key) = match (&cli.public_key, &cli.private_key) {
        (Some(public_key), Some(private_key)) => (public_key.clone(), private_key.clone()),
        (None, None) => match sessions.remembered_credentials()? {
            Some(credentials) => {
                log::info!("🔐 Using remembered credentials");
                (credentials.public_key.clone(), credentials.private_key.to_string())
            }
            None => bail!("no credentials; pass --public-key and --private-key or log in with --remember"),
        },
        _ => bail!("--public-key and --private-key must be given together"),
    };
    // Logging in from remembered credentials keeps them remembered
    let remember = remember || cli.public_key.is_none();
    Ok(sessions.login(&public_key, &private_key, remember).await?)
}

async fn keygen_command(ctx: &ClientContext) -> anyhow::Result<()> {
    let credentials = SessionManager::new(ctx.clone()).generate_keys().await?;
    println!("🔑 New key pair");
    println!("public key:  {}", credentials.public_key);
    println!("private key: {}", credentials.private_key.as_str());
    println!("⚠️ Store the private key safely; it is not kept anywhere.");
    Ok(())
}

async fn logout_command(ctx: &ClientContext, yes: bool) -> anyhow::Result<()> {
    let sessions = SessionManager::new(ctx.clone());
    let outcome = if yes {
        sessions.logout(&|_: &Block| true).await?
    } else {
        sessions.logout(&ask_abandon_block).await?
    };
    match outcome {
        LogoutOutcome::LoggedOut => println!("👋 Logged out"),
        LogoutOutcome::Cancelled => println!("↩️ Logout cancelled"),
    }
    Ok(())
}

fn ask_abandon_block(block: &Block) -> bool {
    print!(
        "⛏️ Block {} is still being mined. Logging out abandons it. Continue? [y/N] ",
        block.block_number
    );
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

async fn role_command(ctx: &ClientContext, action: RoleAction) -> anyhow::Result<()> {
    let roles = RoleController::new(ctx.clone());
    let role = match action {
        RoleAction::Get => roles.get_role()?,
        RoleAction::Refresh => roles.refresh_role().await?,
        RoleAction::Set { role } => roles.set_role(role.into()).await?,
    };
    println!("🎭 Role: {role}");
    Ok(())
}

async fn fetch_command(ctx: &ClientContext, cid: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let listing = UploadPipeline::new(ctx.clone()).fetch_artifact(cid).await?;
    println!("📦 {} file(s) under {cid}", listing.files.len());
    for file in &listing.files {
        println!("   {}  {}", file.hash, file.name);
    }

    if let Some(dir) = output {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        for file in &listing.files {
            let name = Path::new(&file.name)
                .file_name()
                .with_context(|| format!("refusing file name {:?}", file.name))?;
            let path = dir.join(name);
            std::fs::write(&path, file.content.as_bytes())
                .with_context(|| format!("cannot write {}", path.display()))?;
        }
        println!("💾 Written to {}", dir.display());
    }
    Ok(())
}

async fn blocks_command(ctx: &ClientContext, own: bool, format: OutputFormat) -> anyhow::Result<()> {
    let filter = if own { BlockFilter::OwnOnly } else { BlockFilter::All };
    let blocks = BlockQueryService::new(ctx.clone()).list_mined_blocks(filter).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&blocks)?),
        OutputFormat::Human => {
            println!("⛓️ Mined blocks ({})", filter.as_str());
            println!("==================");
            if blocks.is_empty() {
                println!("No blocks found");
            }
            for block in &blocks {
                println!(
                    "#{} proposer {} difficulty {} ({} transaction(s))",
                    block.block_number,
                    block.proposer_id,
                    block.difficulty,
                    block.transaction_count()
                );
                for tx in &block.transactions {
                    println!("   {}/{} model {} dataset {}", tx.from, tx.nonce, tx.model_cid, tx.dataset_cid);
                }
            }
        }
    }
    Ok(())
}

async fn mining_command(ctx: &ClientContext) -> anyhow::Result<()> {
    let queries = BlockQueryService::new(ctx.clone());
    match queries.currently_mining().await? {
        Some(block) => println!(
            "⛏️ Mining block {} ({} transaction(s))",
            block.block_number,
            block.transaction_count()
        ),
        None => println!("💤 No block is being mined"),
    }
    if let Some(tx) = queries.currently_mining_transaction().await? {
        println!("   transaction {}/{} model {} dataset {}", tx.from, tx.nonce, tx.model_cid, tx.dataset_cid);
    }
    Ok(())
}

fn create_config_command(output: &Path, env: &Environment) -> anyhow::Result<()> {
    println!("🔧 Creating default configuration file...");

    let config = create_default_config(env);
    config
        .save_to_file(output)
        .with_context(|| format!("failed to save configuration to {}", output.display()))?;
    println!("✅ Configuration file created at {:?}", output);
    println!("📄 Configuration content:\n{}", toml::to_string_pretty(&config)?);

    Ok(())
}
