#[macro_use]
extern crate clap;
extern crate failure;

use std::path::PathBuf;
use std::time::Duration;

use failure::Error;

use intermediary_fetcher::{FetcherConfig, IntermediaryFetcher};

fn app() -> clap::App<'static, 'static> {
    clap_app!(intermediary_fetcher =>
        (version: crate_version!())
        (about: crate_description!())
        (@arg output_dir: --out +takes_value default_value[intermediary_mappings] "The output directory for the generated JSON")
        (@arg threads: --threads +takes_value "The number of download workers")
        (@arg timeout: --timeout +takes_value "The batch timeout in seconds")
        (@arg repo: --repo +takes_value "An alternate Maven repository holding intermediary")
    )
}

fn main() -> Result<(), Error> {
    ::env_logger::init();
    let matches = app().get_matches();
    let mut config = FetcherConfig::default();
    config.output_dir = PathBuf::from(matches.value_of("output_dir").unwrap());
    if let Some(threads) = matches.value_of("threads") {
        config.worker_count = threads.parse()?;
    }
    if let Some(timeout) = matches.value_of("timeout") {
        config.timeout = Duration::from_secs(timeout.parse()?);
    }
    if let Some(repo) = matches.value_of("repo") {
        let repo = repo.trim_end_matches('/');
        config.base_url = format!("{}/", repo);
        config.metadata_url = format!("{}/maven-metadata.xml", repo);
    }
    let fetcher = IntermediaryFetcher::new(config);
    let summary = fetcher.run()?;
    println!(
        "Build Successful: {}/{} versions exported ({} failed)",
        summary.succeeded, summary.total, summary.failed
    );
    Ok(())
}
