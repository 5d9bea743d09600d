//! Terminal front end for the image search core.
//!
//! Usage:
//!   PIXABAY_API_KEY=... image-search cats --pages 2
//!   image-search "mountain lake" --open 3 --json

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shared::capabilities::Key;
use shared::shell::{HttpExecutor, NativeShell};
use shared::view::ViewModel;
use shared::{
    ApiConfig, Event, ViewState, DEFAULT_API_BASE_URL, DEFAULT_PER_PAGE, DEFAULT_REQUEST_TIMEOUT,
};

#[derive(Parser, Debug)]
#[command(name = "image-search", version)]
#[command(about = "Search Pixabay and page through the results")]
struct Args {
    /// Search terms.
    query: String,

    /// Pixabay API key.
    #[arg(long, env = "PIXABAY_API_KEY", hide_env_values = true)]
    api_key: String,

    /// How many pages to load (the first page plus load-more requests).
    #[arg(short, long, default_value_t = 1)]
    pages: u32,

    /// Results per page.
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,

    #[arg(long, env = "PIXABAY_API_URL", default_value = DEFAULT_API_BASE_URL)]
    base_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Include results that SafeSearch would filter.
    #[arg(long)]
    no_safe_search: bool,

    /// Open the image at this gallery index and print its full-size URL.
    #[arg(long)]
    open: Option<usize>,

    /// Print the final view model as JSON instead of a listing.
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::default().with_api_key(args.api_key);
    config.base_url = args.base_url;
    config.per_page = args.per_page;
    config.safe_search = !args.no_safe_search;
    config.request_timeout_ms = args.timeout_ms;
    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let executor = match HttpExecutor::new(config.request_timeout()) {
        Ok(executor) => executor,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut shell = NativeShell::new(executor);

    shell.dispatch(Event::Configure(Box::new(config))).await;
    shell.dispatch(Event::ViewMounted).await;

    print_notices(
        &shell
            .dispatch(Event::SearchSubmitted {
                query: args.query.clone(),
            })
            .await,
    );
    for _ in 1..args.pages {
        if !shell.view().load_more_visible {
            break;
        }
        print_notices(&shell.dispatch(Event::LoadMoreRequested).await);
    }

    if let Some(index) = args.open {
        shell.dispatch(Event::ImageActivated { index }).await;
        match shell.view().modal {
            Some(modal) => println!("{}\t{}", modal.image_url, modal.alt),
            None => eprintln!("no image at index {index}"),
        }
        shell.press_key(&Key::Escape).await;
    }

    let view = shell.view();
    shell.dispatch(Event::ViewUnmounted).await;

    if args.json {
        match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else if args.open.is_none() {
        print_gallery(&view);
    }

    if matches!(view.state, ViewState::Error { .. }) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_notices(notices: &[shared::Notice]) {
    for notice in notices {
        eprintln!("{}", notice.message);
    }
}

fn print_gallery(view: &ViewModel) {
    for item in &view.gallery {
        println!("{:>4}  {}  {}", item.index, item.thumbnail_url, item.alt);
    }
    eprintln!(
        "{} of {} results for \"{}\" (page {}){}",
        view.gallery.len(),
        view.total_hits,
        view.query,
        view.page,
        if view.load_more_visible { ", more available" } else { "" }
    );
}
