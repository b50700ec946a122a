use std::path::{Path, PathBuf};

use clap::{Parser as ClapParser, Subcommand};
use serde::Serialize;
use tracing_subscriber::filter::EnvFilter;

use retro_script::bytecode::ScriptStore;
use retro_script::config::Config;
use retro_script::scene::{Entity, PRIORITY_ACTIVE};
use retro_script::{disasm, loader, Engine, TracingHost};

#[derive(ClapParser)]
#[command(author, version, about = "RSDK-style script compiler and virtual machine")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every configured script into a bytecode file
    Compile {
        /// Game configuration file
        config: PathBuf,
        /// Where to write the bytecode
        #[arg(short, long, default_value = "Scripts.bin")]
        output: PathBuf,
    },
    /// Compile, run Startup, then run frames and print the entities
    Run {
        config: PathBuf,
        #[arg(long, default_value_t = 1)]
        frames: u32,
        /// Abort a sub-script after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,
        /// Directory that animation and text files are read from
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Disassemble a bytecode file
    Dump { bytecode: PathBuf },
    /// Manage the game configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a configuration file with defaults
    Init { path: PathBuf },
    /// Print a configuration file with defaults filled in
    Show { path: PathBuf },
}

#[derive(Serialize)]
struct EntityDump<'a> {
    slot: usize,
    #[serde(flatten)]
    entity: &'a Entity,
}

fn compile(config_path: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    let mut engine = Engine::new(config, TracingHost::new(None));
    engine.load_scripts()?;
    loader::write_file(output, &engine.store)?;
    println!(
        "Compiled {} object type(s), {} code words, {} jump words into {}",
        engine.store.type_names.len() - 1,
        engine.store.code.len(),
        engine.store.jump_table.len(),
        output.display()
    );
    Ok(())
}

fn run(
    config_path: &Path,
    frames: u32,
    max_steps: Option<u64>,
    data_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;
    let data_dir = data_dir.or_else(|| config.scripts_dir.parent().map(Path::to_path_buf));
    let mut engine = Engine::new(config, TracingHost::new(data_dir));
    engine.vm.step_limit = max_steps;
    engine.load_scripts()?;
    engine.setup_objects()?;

    // One active entity per configured type, in type order.
    for type_id in 1..engine.store.type_names.len() {
        let entity = &mut engine.scene.entities[type_id - 1];
        entity.type_id = type_id as u8;
        entity.priority = PRIORITY_ACTIVE;
    }
    for _ in 0..frames {
        engine.run_frame()?;
    }

    let dump: Vec<EntityDump> = engine
        .scene
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.type_id != 0)
        .map(|(slot, entity)| EntityDump { slot, entity })
        .collect();
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

fn dump(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ScriptStore::new();
    loader::read_file(path, &mut store)?;
    print!("{}", disasm::dump(&store)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile { config, output } => compile(&config, &output)?,
        Commands::Run {
            config,
            frames,
            max_steps,
            data_dir,
        } => run(&config, frames, max_steps, data_dir)?,
        Commands::Dump { bytecode } => dump(&bytecode)?,
        Commands::Config { command } => match command {
            ConfigCommands::Init { path } => {
                if path.exists() {
                    println!("Configuration already exists at: {}", path.display());
                    println!("Remove the file to reinitialize.");
                } else {
                    Config::default().save(&path)?;
                    println!("Initialized new configuration at: {}", path.display());
                }
            }
            ConfigCommands::Show { path } => {
                let config = Config::load(&path)?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}
