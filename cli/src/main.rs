use clap::Parser;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bufobjects_compiler::config::{DEFAULT_INTERFACE_NAME, DEFAULT_MAX_OBJECT_SIZE, DEFAULT_OUTPUT, DEFAULT_PACKAGE_NAME};
use bufobjects_compiler::{run, BufObjectsError, CompilerConfig, DocumentConfig};

#[derive(Parser)]
#[command(name = "bufobjects")]
#[command(about = "Generate binary codec types from bufobjects schemas", long_about = None)]
struct Cli {
    /// Glob selecting the schema files, e.g. `schemas/*.yml`
    #[arg(short, long)]
    input: String,

    /// Generated source file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Target language (selects the template bundle)
    #[arg(short = 't', long = "lang")]
    language: String,

    /// Package/module name of the generated code
    #[arg(short, long, default_value = DEFAULT_PACKAGE_NAME)]
    package: String,

    /// Name of the interface every generated type implements
    #[arg(long, default_value = DEFAULT_INTERFACE_NAME)]
    interface: String,

    /// Appended to every record name
    #[arg(long, default_value = "")]
    name_suffix: String,

    /// Scratch buffer size used by the generated code
    #[arg(long, default_value_t = DEFAULT_MAX_OBJECT_SIZE)]
    max_size: usize,

    /// Directory holding `<lang>/` template bundles (built-ins when omitted)
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Extra import for the generated code (repeatable)
    #[arg(long = "import")]
    imports: Vec<String>,

    /// Log every record and id assignment
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> CompilerConfig {
        let mut config = CompilerConfig::new(self.language, self.input);
        config.output = self.output;
        config.template_dir = self.templates;
        config.document = DocumentConfig {
            package_name:    self.package,
            interface_name:  self.interface,
            name_suffix:     self.name_suffix,
            max_object_size: self.max_size,
            imports:         self.imports,
        };
        config
    }
}

fn main() -> Result<(), BufObjectsError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli.into_config()).inspect_err(|err| error!(%err, "compilation failed"))?;
    match result {
        Some(path) => println!("Generated {}", path.display()),
        None => println!("No schema files matched, nothing generated"),
    }
    Ok(())
}
