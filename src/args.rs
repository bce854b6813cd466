use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "yield-listing")]
#[command(about = "Crawls every result page of a product search and exports the products as a PDF")]
#[command(version)]
pub struct Args {
    /// Search query submitted to the listing
    pub query: String,

    /// Output PDF path (defaults to <query>_products.pdf)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON configuration file (selectors, delays, limits)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Landing page holding the search control
    #[arg(long)]
    pub seed_url: Option<String>,

    /// WebDriver endpoint (WEBDRIVER_URL takes precedence)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Maximum number of result pages visited
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Also write the extracted records as JSON
    #[arg(long)]
    pub dump_json: Option<PathBuf>,
}

impl Args {
    /// Output path, derived from the query when not given
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}_products.pdf",
                yield_listing::utils::sanitize_filename(&self.query)
            ))
        })
    }
}
