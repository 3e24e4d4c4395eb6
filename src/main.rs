use clap::{Parser, Subcommand};
use litebox::{LiteboxOptions, Page, config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

/// Flags shared by commands that set up a gallery on a page.
#[derive(clap::Args, Clone)]
struct GalleryArgs {
    /// HTML page containing the gallery
    page: PathBuf,

    /// CSS selector of the gallery container
    #[arg(long, short)]
    selector: String,

    /// litebox.toml with gallery options (defaults if omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "litebox")]
#[command(about = "Lightbox gallery widget, driven from the command line")]
#[command(long_about = "\
Lightbox gallery widget, driven from the command line

Loads an HTML page, sets up a gallery on a container element and reports
what the lightbox would show.

Image resolution:
  image_source = \"img\"   large image is the thumbnail's src
  image_source = \"a\"     large image is the href of the enclosing link
  Thumbnails without a usable source are left out.

Description resolution:
  description = \"alt\" | \"title\"   that attribute of the thumbnail
  description = <selector>         text of a matching element in the thumbnail's item

Run 'litebox gen-config' to generate a documented litebox.toml.")]
#[command(version)]
struct Cli {
    /// Log lifecycle events to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the images a gallery resolves to
    Scan {
        #[command(flatten)]
        gallery: GalleryArgs,

        /// Print the image list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Click a thumbnail, replay keys, and print the resulting overlay
    Open {
        #[command(flatten)]
        gallery: GalleryArgs,

        /// 1-based position of the thumbnail to click
        #[arg(long, default_value_t = 1)]
        image: usize,

        /// Key pressed on the open overlay (repeatable): ArrowLeft, ArrowRight, Escape
        #[arg(long = "key")]
        keys: Vec<String>,
    },
    /// Print a stock litebox.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan { gallery, json } => {
            let (page, id) = load_gallery(&gallery)?;
            let images = page.gallery(id).map(|g| g.images()).unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(images)?);
            } else {
                output::print_scan_output(&gallery.selector, images);
            }
        }
        Command::Open {
            gallery,
            image,
            keys,
        } => {
            let (mut page, id) = load_gallery(&gallery)?;
            let thumbs = page
                .gallery(id)
                .map(|g| page.document().elements_by_tag(g.container(), "img"))
                .unwrap_or_default();
            let thumb = image
                .checked_sub(1)
                .and_then(|i| thumbs.get(i).copied())
                .ok_or_else(|| {
                    format!(
                        "--image {} is out of range: '{}' has {} thumbnails",
                        image,
                        gallery.selector,
                        thumbs.len()
                    )
                })?;
            page.click(thumb)?;
            for key in &keys {
                let command = page.key_down(key)?;
                println!("{}", output::format_key_event(key, command));
                page.tick();
            }
            output::print_open_output(&page, id);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "litebox=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_options(path: Option<&Path>) -> Result<LiteboxOptions, config::ConfigError> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading options");
            config::load_options(path)
        }
        None => Ok(LiteboxOptions::default()),
    }
}

fn load_gallery(args: &GalleryArgs) -> Result<(Page, litebox::GalleryId), Box<dyn std::error::Error>> {
    let options = load_options(args.config.as_deref())?;
    let markup = std::fs::read_to_string(&args.page)?;
    let mut page = Page::from_html(&markup)?;
    let id = page.litebox(args.selector.as_str(), &options)?;
    Ok((page, id))
}
