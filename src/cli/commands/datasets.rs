//! Datasets command - list event logs under the data root

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::LogprepResult;
use crate::ui::{self, UiContext};

/// Execute the datasets command
pub async fn execute(config: &Config) -> LogprepResult<()> {
    let catalog = Catalog::new(&config.storage.data_dir, config.defaults.clone());
    let names = catalog.datasets().await?;

    if names.is_empty() {
        let ctx = UiContext::detect();
        ui::step_info(
            &ctx,
            &format!("No datasets in {}", config.storage.data_dir.display()),
        );
        ui::remark(&ctx, "Each dataset is a directory holding {name}/{name}.csv");
        return Ok(());
    }

    for name in names {
        println!("{}", name);
    }
    Ok(())
}
