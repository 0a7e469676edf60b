//! Region listing.

use tabled::Tabled;

use dbhost_api::Region;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&Region> for RegionRow {
    fn from(r: &Region) -> Self {
        Self {
            name: r.name.clone(),
            provider: r.provider.clone().unwrap_or_default(),
            location: r
                .location
                .clone()
                .or_else(|| r.region.clone())
                .unwrap_or_default(),
        }
    }
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let regions = ctx.client.list_regions().await?;
    let out = output::render_list(
        &global.output,
        &regions,
        |r| RegionRow::from(r),
        |r| r.name.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
