//! Props command - print a dataset's default encoding properties

use crate::catalog::Catalog;
use crate::cli::args::PropsArgs;
use crate::config::Config;
use crate::error::LogprepResult;

/// Execute the props command
pub async fn execute(args: PropsArgs, config: &Config) -> LogprepResult<()> {
    let catalog = Catalog::new(&config.storage.data_dir, config.defaults.clone());
    let source = catalog.locate(&args.dataset).await?;
    let properties = catalog.default_properties(&source).await?;

    println!("{}", serde_json::to_string_pretty(&properties)?);
    Ok(())
}
