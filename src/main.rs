use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Deserialize;
use simplelog::{Config, LevelFilter, WriteLogger};

use pageflow::gesture::{GestureClassifier, TapTarget};
use pageflow::navigation::Navigation;
use pageflow::page::PageTarget;
use pageflow::sim::{SimBook, SimulatedLoader, SimulatedLocators, SimulatedSurface};
use pageflow::{Preferences, SavedPositions, Spine};

type SimNavigation = Navigation<SimulatedSurface, SimulatedLocators, SimulatedLoader>;

/// Drive the navigation core against a simulated book described by a JSON
/// manifest, one command per line.
#[derive(Parser)]
#[command(name = "pageflow", version, about)]
struct Cli {
    /// Book manifest (spine + synthetic chapter layouts)
    manifest: PathBuf,

    /// Persist reading positions to this JSON file
    #[arg(long)]
    positions: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "pageflow.log")]
    log_file: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    spine: Spine,
    #[serde(default)]
    page_box: ManifestPageBox,
    chapters: Vec<ManifestChapter>,
}

#[derive(Debug, Deserialize)]
struct ManifestPageBox {
    width: f32,
    padding: f32,
    columns: u32,
}

impl Default for ManifestPageBox {
    fn default() -> Self {
        Self {
            width: 600.0,
            padding: 20.0,
            columns: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestChapter {
    extent: f32,
    #[serde(default)]
    elements: Vec<ManifestElement>,
    #[serde(default)]
    images: Vec<ManifestImage>,
}

#[derive(Debug, Deserialize)]
struct ManifestElement {
    id: String,
    left: f32,
}

#[derive(Debug, Deserialize)]
struct ManifestImage {
    left: f32,
    width: f32,
    #[serde(default)]
    src: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&cli.log_file).context("failed to create log file")?,
    )?;

    let manifest_text = std::fs::read_to_string(&cli.manifest)
        .with_context(|| format!("failed to read manifest {}", cli.manifest.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_text).context("malformed book manifest")?;
    info!(
        "opened manifest {} with {} chapters",
        cli.manifest.display(),
        manifest.chapters.len()
    );

    let mut book = SimBook::new().page_box(
        manifest.page_box.width,
        manifest.page_box.padding,
        manifest.page_box.columns,
    );
    for chapter in &manifest.chapters {
        book = book.chapter_with_extent(chapter.extent);
        for element in &chapter.elements {
            book = book.element(&element.id, element.left);
        }
        for image in &chapter.images {
            book = match &image.src {
                Some(src) => book.image_with_src(image.left, image.width, src),
                None => book.deferred_image(image.left, image.width),
            };
        }
    }
    let (surface, locators, loader) = book.build();

    let book_key = cli.manifest.display().to_string();
    let positions =
        SavedPositions::load_or_ephemeral(cli.positions.as_deref().and_then(|p| p.to_str()));
    let resume = positions.get(&book_key).map(|p| (p.chapter, p.page));

    let mut nav = Navigation::new(
        manifest.spine,
        surface,
        locators,
        loader,
        Preferences::load(),
    );
    nav.attach_position_store(book_key, positions);
    nav.recompute_page_count();

    if let Some((chapter, page)) = resume {
        if let Some(href) = nav.spine().get(chapter).map(|c| c.href.clone()) {
            println!("resuming at chapter {chapter}, page {page}");
            report(nav.load_chapter(&href));
            nav.load_page(PageTarget::Absolute(page), false);
        }
    } else {
        nav.update();
    }

    repl(&mut nav)
}

fn repl(nav: &mut SimNavigation) -> Result<()> {
    let started = Instant::now();
    let mut classifier = GestureClassifier::new();
    let stdin = io::stdin();

    print_status(nav);
    prompt()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let now_ms = started.elapsed().as_millis() as u64;

        match words.next() {
            Some("next" | "n") => report(nav.next()),
            Some("prev" | "p") => report(nav.prev()),
            Some("goto") => match words.next() {
                Some(raw) => {
                    if let Ok(target) = raw.parse::<PageTarget>() {
                        nav.load_page(target, false);
                    }
                }
                None => println!("usage: goto <page|last|locator|anchor>"),
            },
            Some("open") => match words.next() {
                Some(url) => report(nav.load_chapter(url)),
                None => println!("usage: open <href[#fragment]>"),
            },
            Some("swipe") => {
                let dx: f32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(-30.0);
                let duration: u64 = words.next().and_then(|w| w.parse().ok()).unwrap_or(100);
                classifier.start(nav, 300.0, 400.0, now_ms);
                classifier.track(nav, 300.0 + dx, 400.0, 1, None);
                let outcome = classifier.end(nav, &TapTarget::other(), now_ms + duration);
                println!("gesture: {outcome:?}");
            }
            Some("tap") => {
                let x: f32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(300.0);
                let y: f32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(400.0);
                classifier.start(nav, x, y, now_ms);
                let outcome = classifier.end(nav, &TapTarget::other(), now_ms + 50);
                println!("gesture: {outcome:?}");
            }
            Some("reflow") => {
                let width: f32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(600.0);
                let padding: f32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(20.0);
                let columns: u32 = words.next().and_then(|w| w.parse().ok()).unwrap_or(1);
                nav.surface_mut().reflow_to(width, padding, columns);
                nav.refresh_layout();
            }
            Some("update") => nav.update(),
            Some("reset") => nav.reset(),
            Some("info") => {}
            Some("quit" | "q") => break,
            Some(other) => println!("unknown command: {other}"),
            None => {}
        }

        classifier.tick(nav, started.elapsed().as_millis() as u64);
        for event in nav.drain_events() {
            println!("event: {event:?}");
        }
        print_status(nav);
        prompt()?;
    }
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn report(result: Result<(), pageflow::NavigationError>) {
    if let Err(err) = result {
        println!("navigation: {err}");
    }
}

fn print_status(nav: &SimNavigation) {
    println!(
        "chapter {}/{} ({}) page {}/{} {}% {}",
        nav.chapter(),
        nav.chapter_count().saturating_sub(1),
        nav.chapter_doc_name(),
        nav.page(),
        nav.page_count(),
        nav.progress_percent(),
        nav.locator()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
}
