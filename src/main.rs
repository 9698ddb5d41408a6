use blogcast::{config, feed, output, sync, tts};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blogcast")]
#[command(about = "Static article pipeline: pages, narrated audio, podcast feed")]
#[command(long_about = "\
Static article pipeline: pages, narrated audio, podcast feed

Your filesystem is the data source. Each directory under the drafts root
is one article; its name is the slug.

Content structure:

  drafts/
  ├── config.toml                  # Site config (optional)
  ├── how-i-build-things/
  │   ├── article.md               # Draft body with +++ TOML frontmatter
  │   └── audio.mp3                # Cached narration (written by sync)
  └── thoughts-on-testing/
      └── article.md

Output structure (written by sync and rss):

  site/
  ├── articles.json                # Summary manifest (consumed by rss)
  ├── rss.xml                      # Podcast feed
  ├── audio/<slug>.mp3             # Published narration
  └── <slug>/index.html            # Article page

Synthesis credentials come from the ELEVENLABS_API_KEY and
ELEVENLABS_VOICE_ID environment variables.

Run 'blogcast gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Drafts directory
    #[arg(long, default_value = "drafts", global = true)]
    drafts: PathBuf,

    /// Output directory
    #[arg(long, default_value = "site", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync articles: render pages, synthesize audio, write the manifest
    Sync {
        /// Sync only this article (default: all)
        slug: Option<String>,
    },
    /// Assemble the podcast feed from the synced manifest
    Rss,
    /// Validate drafts without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Sync { slug } => {
            let site_config = config::load_config(&cli.drafts)?;
            // Fail fast on missing credentials — before any draft is read
            // or any network call is attempted.
            let credentials = config::Credentials::from_env()?;
            let synthesizer = tts::ElevenLabs::new(credentials, &site_config.tts)?;

            println!("==> Syncing {}", cli.drafts.display());
            let report = sync::sync_all(
                &cli.drafts,
                &cli.output,
                &site_config,
                &synthesizer,
                slug.as_deref(),
            )?;
            output::print_sync_report(&report);

            if slug.is_some() && report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Command::Rss => {
            let site_config = config::load_config(&cli.drafts)?;
            let manifest_path = cli.output.join(sync::MANIFEST_FILENAME);
            if !manifest_path.exists() {
                return Err(format!(
                    "manifest not found at {} - run 'blogcast sync' first",
                    manifest_path.display()
                )
                .into());
            }
            let manifest = std::fs::read_to_string(&manifest_path)?;
            let summaries: Vec<blogcast::types::ArticleSummary> = serde_json::from_str(&manifest)?;

            let audio_dir = cli.output.join("audio");
            let document = feed::assemble(&site_config, &summaries, feed::audio_probe(&audio_dir))?;

            let feed_path = cli.output.join("rss.xml");
            std::fs::write(&feed_path, &document)?;
            println!(
                "Generated feed with {} item(s) at {}",
                summaries.len(),
                feed_path.display()
            );
        }
        Command::Check => {
            let site_config = config::load_config(&cli.drafts)?;
            println!("==> Checking {}", cli.drafts.display());
            let outcomes = sync::check_all(&cli.drafts, &site_config)?;
            let invalid = outcomes.iter().filter(|o| o.result.is_err()).count();
            output::print_check_output(&outcomes);
            if invalid > 0 {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
