mod config;
mod fmt;
mod glob;
mod preview;
mod print;
mod scanner;
mod tree;
mod ui;

use std::io::{self, IsTerminal, Write};
use std::panic;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use config::{ByteFormat, Config};
use scanner::Scanner;
use ui::App;

/// Consecutive movement keys within this window collapse into one jump.
const INPUT_BATCH_DELAY: Duration = Duration::from_millis(5);
/// Idle delay of the input loop.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "dusage")]
#[command(version)]
#[command(about = "A tool to conveniently learn about disk usage, fast", long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Option<ModeCommand>,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand, Debug)]
enum ModeCommand {
    /// Launch the interactive terminal UI
    #[command(visible_alias = "i")]
    Interactive {
        #[command(flatten)]
        options: Options,
    },
    /// Aggregate disk usage of the given paths (the default)
    #[command(visible_alias = "a")]
    Aggregate {
        #[command(flatten)]
        options: Options,
    },
}

#[derive(Args, Debug, Clone)]
struct Options {
    /// Display apparent sizes instead of disk usage
    #[arg(short = 'A', long)]
    apparent_size: bool,

    /// Count hard-linked files each time they are seen
    #[arg(short = 'l', long)]
    count_hard_links: bool,

    /// Do not cross filesystem boundaries
    #[arg(short = 'x', long)]
    stay_on_filesystem: bool,

    /// Maximum depth to traverse in tree output
    #[arg(short = 'd', long, value_name = "N")]
    depth: Option<usize>,

    /// Show only the top N entries per directory in tree output
    #[arg(short = 't', long, value_name = "N")]
    top: Option<usize>,

    /// Print a tree instead of the flat aggregate
    #[arg(short = 'T', long)]
    tree: bool,

    /// Size output format
    #[arg(short = 'f', long, value_enum, default_value_t = ByteFormat::Metric)]
    format: ByteFormat,

    /// Number of scan threads (0 = auto-detect)
    #[arg(short = 'j', long, value_name = "N", default_value_t = 0)]
    threads: usize,

    /// Directories to ignore (can be repeated)
    #[arg(short = 'i', long = "ignore-dirs", value_name = "DIR")]
    ignore_dirs: Vec<PathBuf>,

    /// Skip the existence check before interactive refresh and delete
    #[arg(long)]
    no_entry_check: bool,

    /// Disable colored output
    #[arg(long)]
    no_colors: bool,

    /// Disable the progress display on stderr
    #[arg(long)]
    no_progress: bool,

    /// Paths to scan (defaults to the current directory)
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let exit_code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(exit_code);
        }
    };

    let (forced_mode, options) = match cli.mode {
        Some(ModeCommand::Interactive { options }) => (Some(true), options),
        Some(ModeCommand::Aggregate { options }) => (Some(false), options),
        None => (None, cli.options),
    };

    let config = match build_config(options) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}");
            process::exit(1);
        }
    };

    let interactive = match forced_mode {
        Some(forced) => forced,
        None => io::stdout().is_terminal() && !config.tree_mode,
    };

    if let Err(err) = run(config, interactive) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn build_config(options: Options) -> std::result::Result<Config, String> {
    let mut paths = options.paths;
    if paths.is_empty() {
        paths.push(PathBuf::from("."));
    }
    for path in &paths {
        if !path.exists() {
            return Err(format!("Path does not exist: {}", path.display()));
        }
    }

    let mut config = Config {
        apparent_size: options.apparent_size,
        count_hard_links: options.count_hard_links,
        stay_on_filesystem: options.stay_on_filesystem,
        no_entry_check: options.no_entry_check,
        no_colors: options.no_colors,
        tree_mode: options.tree,
        show_progress: !options.no_progress,
        max_depth: options.depth,
        top_n: options.top,
        thread_count: options.threads,
        format: options.format,
        paths,
        ..Config::default()
    };
    for dir in &options.ignore_dirs {
        config.add_ignore_dir(dir);
    }
    Ok(config)
}

fn run(config: Config, interactive: bool) -> Result<()> {
    let scanner = Scanner::new(config.clone());
    let roots = scanner
        .scan(&config.paths)
        .context("scanning failed")?;
    let stats = scanner.stats();

    if interactive {
        stats.print(config.format);
        let marked = run_interactive(roots, config)?;
        for path in marked {
            println!("{}", path.display());
        }
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if config.tree_mode {
            for root in &roots {
                print::print_tree(root, &config, &mut out)?;
            }
        } else {
            print::print_flat(&roots, &config, &mut out)?;
        }
        out.flush()?;
        stats.print(config.format);
    }
    Ok(())
}

fn run_interactive(
    roots: Vec<std::sync::Arc<tree::Entry>>,
    config: Config,
) -> Result<Vec<PathBuf>> {
    // Restore the terminal before propagating any panic.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(roots, config);
    let result = run_app(&mut terminal, &mut app);

    let cleanup = cleanup_terminal(&mut terminal);
    result.and(cleanup)?;

    Ok(app.marked_paths())
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn is_movement(key: &KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Up | KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('k')
    )
}

fn movement_delta(key: &KeyEvent) -> i64 {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => 1,
        _ => -1,
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut carried_over: Option<KeyEvent> = None;

    loop {
        terminal.draw(|frame| ui::draw::render(frame, app))?;

        let key = match carried_over.take() {
            Some(key) => Some(key),
            None => {
                if event::poll(IDLE_POLL)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => Some(key),
                        Event::Resize(_, _) => {
                            app.needs_full_redraw = true;
                            None
                        }
                        _ => None,
                    }
                } else {
                    None
                }
            }
        };

        if let Some(key) = key {
            if app.is_browsing_main() && is_movement(&key) {
                // Collapse a burst of arrow presses into one jump, then
                // refresh the preview once.
                let mut delta = movement_delta(&key);
                while event::poll(INPUT_BATCH_DELAY)? {
                    match event::read()? {
                        Event::Key(next) if next.kind == KeyEventKind::Press => {
                            if is_movement(&next) {
                                delta += movement_delta(&next);
                            } else {
                                carried_over = Some(next);
                                break;
                            }
                        }
                        Event::Resize(_, _) => app.needs_full_redraw = true,
                        _ => {}
                    }
                }
                app.apply_movement(delta);
                app.refresh_quickview();
            } else {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::try_parse_from(["dusage"]).unwrap();
        assert!(cli.mode.is_none());
        assert!(cli.options.paths.is_empty());
        assert_eq!(cli.options.format, ByteFormat::Metric);
        assert_eq!(cli.options.threads, 0);
    }

    #[test]
    fn test_cli_parses_subcommands_and_options() {
        let cli = Cli::try_parse_from(["dusage", "i", "-A", "-x", "/tmp"]).unwrap();
        match cli.mode {
            Some(ModeCommand::Interactive { options }) => {
                assert!(options.apparent_size);
                assert!(options.stay_on_filesystem);
                assert_eq!(options.paths, vec![PathBuf::from("/tmp")]);
            }
            other => panic!("unexpected mode: {other:?}"),
        }

        let cli = Cli::try_parse_from(["dusage", "a", "-t", "5", "-d", "2", "-T"]).unwrap();
        match cli.mode {
            Some(ModeCommand::Aggregate { options }) => {
                assert_eq!(options.top, Some(5));
                assert_eq!(options.depth, Some(2));
                assert!(options.tree);
            }
            other => panic!("unexpected mode: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_formats_and_repeated_ignores() {
        let cli = Cli::try_parse_from([
            "dusage",
            "-f",
            "gib",
            "-i",
            "/a",
            "--ignore-dirs",
            "/b",
            "-l",
        ])
        .unwrap();
        assert_eq!(cli.options.format, ByteFormat::Gib);
        assert_eq!(
            cli.options.ignore_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(cli.options.count_hard_links);
    }

    #[test]
    fn test_cli_rejects_unknown_option() {
        assert!(Cli::try_parse_from(["dusage", "--definitely-not-an-option"]).is_err());
    }

    #[test]
    fn test_build_config_rejects_missing_path() {
        let cli = Cli::try_parse_from(["dusage", "/no/such/path/at/all"]).unwrap();
        let result = build_config(cli.options);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("does not exist"));
    }

    #[test]
    fn test_build_config_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["dusage", "--no-progress"]).unwrap();
        let config = build_config(cli.options).unwrap();
        assert_eq!(config.paths, vec![PathBuf::from(".")]);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_movement_classification() {
        let up = KeyEvent::new(KeyCode::Up, crossterm::event::KeyModifiers::empty());
        let j = KeyEvent::new(KeyCode::Char('j'), crossterm::event::KeyModifiers::empty());
        let other = KeyEvent::new(KeyCode::Char('x'), crossterm::event::KeyModifiers::empty());
        assert!(is_movement(&up));
        assert!(is_movement(&j));
        assert!(!is_movement(&other));
        assert_eq!(movement_delta(&up), -1);
        assert_eq!(movement_delta(&j), 1);
    }
}
