use std::collections::HashMap;
use std::env;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use listing_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS, COPYABLE_FIELDS};
use listing_contracts::events::{EventLog, SessionEvent};
use listing_engine::present::{Clipboard, CopyField, ListingView};
use listing_engine::{
    default_service_registry, parse_dotenv, ListingService, ListingSession, PreviewStore,
    SelectedImage, ServiceConfig, ServiceRegistry, SessionPhase,
};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "listing-rs",
    version,
    about = "Marketplace listing generator for product photos"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(GenerateArgs),
    Session(SessionArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long = "image", required = true, num_args = 1..)]
    images: Vec<PathBuf>,
    #[arg(long, default_value = "gemini")]
    service: String,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long, default_value = "gemini")]
    service: String,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("listing-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let config = load_config(Path::new(".env"), args.model.clone());
    let registry = default_service_registry(&config);
    let service = resolve_service(&registry, &args.service)?;
    let events = args.events.as_deref().map(open_event_log);

    emit(
        events.as_ref(),
        SessionEvent::SessionStarted {
            mode: "generate".to_string(),
            service: service.name().to_string(),
            model: service.model().to_string(),
        },
    );

    let mut session = new_session(events.as_ref());
    let files: Vec<SelectedImage> = args
        .images
        .iter()
        .map(|path| SelectedImage::from_path(path))
        .collect();
    session.select_files(files)?;
    let phase = session.generate(service)?;

    let code = match (phase, session.listing()) {
        (SessionPhase::Ready, Some(record)) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(record).context("failed to render listing")?
                );
            } else {
                print!("{}", render_view(&ListingView::from_record(record), Instant::now()));
            }
            0
        }
        _ => {
            eprintln!("{}", session.error().unwrap_or("Generation did not complete."));
            1
        }
    };

    emit(
        events.as_ref(),
        SessionEvent::SessionFinished {
            phase: session.phase().as_str().to_string(),
            exit_code: Some(code),
        },
    );
    Ok(code)
}

fn run_session(args: SessionArgs) -> Result<()> {
    let config = load_config(Path::new(".env"), args.model.clone());
    let registry = default_service_registry(&config);
    let service = resolve_service(&registry, &args.service)?;
    let events = args.events.as_deref().map(open_event_log);

    emit(
        events.as_ref(),
        SessionEvent::SessionStarted {
            mode: "session".to_string(),
            service: service.name().to_string(),
            model: service.model().to_string(),
        },
    );

    let mut session = new_session(events.as_ref());
    let mut view: Option<ListingView> = None;
    let mut clipboard = TerminalClipboard::new(io::stdout());
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Listing session started ({} / {}). Type /help for commands.",
        service.name(),
        service.model()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        if intent.action == "noop" {
            continue;
        }

        match intent.action.as_str() {
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
                println!("Fields: {}", COPYABLE_FIELDS.join(" "));
            }
            "quit" => break,
            "select_files" | "drop_files" => {
                let files = paths_from_args(intent.command_args.get("paths"));
                if files.is_empty() {
                    println!("/{} requires at least one path", command_name(&intent.action));
                    continue;
                }
                let changed = if intent.action == "drop_files" {
                    session.drop_files(files)
                } else {
                    session.select_files(files)
                };
                match changed {
                    Ok(true) => {
                        view = None;
                        print_selection(&session);
                    }
                    Ok(false) => println!("No images in that selection; nothing changed."),
                    Err(err) => println!("{err}"),
                }
            }
            "generate" => {
                if !session.can_generate() {
                    println!("Select at least one image first (/select or /drop).");
                    continue;
                }
                println!("Generating listing from {} image(s)...", session.files().len());
                match session.generate(service) {
                    Ok(SessionPhase::Ready) => {
                        view = session.listing().map(ListingView::from_record);
                        if let Some(view) = view.as_ref() {
                            print!("{}", render_view(view, Instant::now()));
                        }
                    }
                    Ok(_) => {
                        view = None;
                        println!(
                            "Error: {}",
                            session.error().unwrap_or("Generation did not complete.")
                        );
                    }
                    Err(err) => println!("{err}"),
                }
            }
            "show" => match view.as_ref() {
                Some(view) => print!("{}", render_view(view, Instant::now())),
                None => match session.error() {
                    Some(message) => println!("Error: {message}"),
                    None => print_selection(&session),
                },
            },
            "copy_field" => {
                let Some(view) = view.as_mut() else {
                    println!("Nothing to copy yet. Run /generate first.");
                    continue;
                };
                let Some(name) = value_as_non_empty_string(intent.command_args.get("field"))
                else {
                    println!("/copy expects one of: {}", COPYABLE_FIELDS.join(" "));
                    continue;
                };
                let Some(field) = view.field_mut(&name) else {
                    println!("/copy expects one of: {}", COPYABLE_FIELDS.join(" "));
                    continue;
                };
                let now = Instant::now();
                if field.copy(&mut clipboard, now)? {
                    println!("{} [{}]", field.label, field.button_label(now));
                    emit(
                        events.as_ref(),
                        SessionEvent::Copied {
                            field: name,
                            chars: field.value.chars().count(),
                            index: None,
                        },
                    );
                } else {
                    println!("{} is empty; nothing copied.", field.label);
                }
            }
            "copy_tag" => {
                let Some(view) = view.as_mut() else {
                    println!("Nothing to copy yet. Run /generate first.");
                    continue;
                };
                let index = intent
                    .command_args
                    .get("index")
                    .and_then(Value::as_u64)
                    .and_then(|value| usize::try_from(value).ok());
                let Some(index) = index else {
                    println!("/tag expects a tag number (1-{})", view.tags.tags().len());
                    continue;
                };
                let now = Instant::now();
                if view.tags.copy_tag(index, &mut clipboard, now)? {
                    let tag = &view.tags.tags()[index];
                    println!("Copied tag {}: {tag}", index + 1);
                    emit(
                        events.as_ref(),
                        SessionEvent::Copied {
                            field: "tag".to_string(),
                            chars: tag.chars().count(),
                            index: Some(index),
                        },
                    );
                } else {
                    println!("No tag {}.", index + 1);
                }
            }
            "copy_all_tags" => {
                let Some(view) = view.as_mut() else {
                    println!("Nothing to copy yet. Run /generate first.");
                    continue;
                };
                let now = Instant::now();
                if view.tags.copy_all(&mut clipboard, now)? {
                    println!("{}", view.tags.copy_all_label(now));
                    emit(
                        events.as_ref(),
                        SessionEvent::Copied {
                            field: "tags".to_string(),
                            chars: view.tags.tags().join(", ").chars().count(),
                            index: None,
                        },
                    );
                } else {
                    println!("No tags to copy.");
                }
            }
            "reset" => match session.reset() {
                Ok(()) => {
                    view = None;
                    println!("Session cleared.");
                }
                Err(err) => println!("{err}"),
            },
            _ => {
                let command = value_as_non_empty_string(intent.command_args.get("command"))
                    .unwrap_or_default();
                if command.is_empty() {
                    println!("Commands start with '/'. Type /help for the list.");
                } else {
                    println!("Unknown command /{command}. Type /help for the list.");
                }
            }
        }
    }

    emit(
        events.as_ref(),
        SessionEvent::SessionFinished {
            phase: session.phase().as_str().to_string(),
            exit_code: None,
        },
    );
    Ok(())
}

/// `.env` values fill in only what the environment leaves unset.
fn load_config(dotenv_path: &Path, model: Option<String>) -> ServiceConfig {
    let dotenv = if dotenv_path.exists() {
        parse_dotenv(dotenv_path)
    } else {
        HashMap::new()
    };
    config_from_sources(|key| env::var(key).ok(), &dotenv).with_model(model)
}

fn config_from_sources(
    lookup: impl Fn(&str) -> Option<String>,
    dotenv: &HashMap<String, String>,
) -> ServiceConfig {
    ServiceConfig::from_lookup(|key| lookup(key).or_else(|| dotenv.get(key).cloned()))
}

fn resolve_service<'a>(
    registry: &'a ServiceRegistry,
    name: &str,
) -> Result<&'a dyn ListingService> {
    let name = name.trim().to_ascii_lowercase();
    match registry.get(&name) {
        Some(service) => Ok(service),
        None => bail!(
            "unknown service '{name}' (available: {})",
            registry.names().join(", ")
        ),
    }
}

fn open_event_log(path: &Path) -> EventLog {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let session_id = format!("session-{stamp}-{}", &Uuid::new_v4().simple().to_string()[..8]);
    EventLog::new(path, session_id)
}

fn new_session(events: Option<&EventLog>) -> ListingSession {
    let session = ListingSession::new(PreviewStore::new());
    match events {
        Some(events) => session.with_events(events.clone()),
        None => session,
    }
}

fn emit(events: Option<&EventLog>, event: SessionEvent) {
    let Some(events) = events else {
        return;
    };
    if let Err(err) = events.record(&event) {
        eprintln!("listing-rs warning: event log write failed: {err:#}");
    }
}

fn print_selection(session: &ListingSession) {
    if session.files().is_empty() {
        println!("No images selected.");
        return;
    }
    println!("{} image(s) selected:", session.files().len());
    for (file, url) in session.files().iter().zip(session.previews().urls()) {
        let mime = file.mime_type.as_deref().unwrap_or("unknown type");
        println!("  {} ({mime}) {url}", file.display_name());
    }
}

fn render_view(view: &ListingView, now: Instant) -> String {
    let mut out = String::new();
    render_field(&mut out, &view.description, now);
    render_field(&mut out, &view.title, now);
    out.push_str("Attributes\n");
    for field in &view.attributes {
        out.push_str("  ");
        render_field(&mut out, field, now);
    }
    for field in &view.details {
        render_field(&mut out, field, now);
    }
    render_field(&mut out, &view.materials, now);
    if view.tags.is_visible() {
        out.push_str(&format!(
            "{} [{}]\n",
            view.tags.header(),
            view.tags.copy_all_label(now)
        ));
        let chips: Vec<String> = view
            .tags
            .tags()
            .iter()
            .enumerate()
            .map(|(index, tag)| {
                if view.tags.is_tag_copied(index, now) {
                    format!("{}. {tag} (copied)", index + 1)
                } else {
                    format!("{}. {tag}", index + 1)
                }
            })
            .collect();
        out.push_str(&format!("  {}\n", chips.join("  ")));
    }
    out
}

fn render_field(out: &mut String, field: &CopyField, now: Instant) {
    let value = if field.value.is_empty() {
        "-"
    } else {
        field.value.as_str()
    };
    if field.multiline {
        out.push_str(&format!("{} [{}]\n", field.label, field.button_label(now)));
        for line in value.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    } else {
        out.push_str(&format!(
            "{}: {value} [{}]\n",
            field.label,
            field.button_label(now)
        ));
    }
    if let Some(helper) = field.helper_text.as_deref() {
        out.push_str(&format!("  ({helper})\n"));
    }
}

fn paths_from_args(value: Option<&Value>) -> Vec<SelectedImage> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(SelectedImage::from_path)
                .collect()
        })
        .unwrap_or_default()
}

fn command_name(action: &str) -> &str {
    match action {
        "drop_files" => "drop",
        _ => "select",
    }
}

/// Terminal clipboard over the OSC 52 escape sequence.
struct TerminalClipboard<W: Write> {
    out: W,
}

impl<W: Write> TerminalClipboard<W> {
    fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Clipboard for TerminalClipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<()> {
        write!(self.out, "{}", osc52_sequence(text)).context("failed to write clipboard sequence")?;
        self.out.flush().context("failed to flush clipboard sequence")?;
        Ok(())
    }
}

fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", BASE64.encode(text.as_bytes()))
}

fn value_as_non_empty_string(value: Option<&Value>) -> Option<String> {
    let raw = value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::time::{Duration, Instant};

    use clap::Parser;
    use listing_contracts::ListingRecord;
    use listing_engine::present::{Clipboard, ListingView};
    use listing_engine::{default_service_registry, ServiceConfig};
    use serde_json::json;

    use super::{
        config_from_sources, load_config, osc52_sequence, paths_from_args, render_view,
        resolve_service, Cli, Command, TerminalClipboard,
    };

    fn record() -> ListingRecord {
        serde_json::from_value(json!({
            "title": "Lace garter",
            "description": "Hook line.\nIncluded: one garter.",
            "primaryColor": "White",
            "tags": ["handmade", "boho"],
            "materials": ["cotton", "lace"],
        }))
        .unwrap()
    }

    #[test]
    fn generate_args_accept_repeated_images() {
        let cli = Cli::try_parse_from([
            "listing-rs",
            "generate",
            "--image",
            "a.png",
            "--image",
            "b.jpg",
            "--service",
            "dryrun",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.images.len(), 2);
                assert_eq!(args.service, "dryrun");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn generate_requires_an_image() {
        assert!(Cli::try_parse_from(["listing-rs", "generate"]).is_err());
    }

    #[test]
    fn environment_wins_over_dotenv() {
        let dotenv = HashMap::from([
            ("GEMINI_API_KEY".to_string(), "from-dotenv".to_string()),
            ("LISTING_MODEL".to_string(), "dotenv-model".to_string()),
        ]);
        let config = config_from_sources(
            |key| (key == "LISTING_MODEL").then(|| "env-model".to_string()),
            &dotenv,
        );
        assert_eq!(config.api_key.as_deref(), Some("from-dotenv"));
        assert_eq!(config.model, "env-model");
    }

    #[test]
    fn model_flag_overrides_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "LISTING_MODEL=dotenv-model\n").unwrap();
        let config = load_config(&path, Some("flag-model".to_string()));
        assert_eq!(config.model, "flag-model");
    }

    #[test]
    fn unknown_service_lists_the_registered_ones() {
        let registry = default_service_registry(&ServiceConfig::default());
        let err = resolve_service(&registry, "openai").err().unwrap();
        assert!(err.to_string().contains("dryrun, gemini"));
        assert_eq!(resolve_service(&registry, " Dryrun ").unwrap().name(), "dryrun");
    }

    #[test]
    fn path_args_become_selected_images() {
        let files = paths_from_args(Some(&json!(["shots/one.png", "two.txt"])));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].mime_type.as_deref(), Some("image/png"));
        assert!(!files[1].is_image());
        assert!(paths_from_args(None).is_empty());
    }

    #[test]
    fn rendered_view_marks_copied_state() {
        let mut view = ListingView::from_record(&record());
        let mut sink = Vec::new();
        let now = Instant::now();
        {
            let mut clipboard = TerminalClipboard::new(&mut sink);
            view.tags.copy_tag(1, &mut clipboard, now).unwrap();
        }
        let text = render_view(&view, now);
        assert!(text.contains("Description [Copy]\n  Hook line.\n  Included: one garter.\n"));
        assert!(text.contains("  (First few lines are crucial for SEO.)"));
        assert!(text.contains("Primary Color: White [Copy]"));
        assert!(text.contains("Holiday: - [Copy]"));
        assert!(text.contains("Materials: cotton, lace [Copy]"));
        assert!(text.contains("Tags (2/13) [Copy all tags]"));
        assert!(text.contains("2. boho (copied)"));
        assert!(!render_view(&view, now + Duration::from_secs(2)).contains("(copied)"));
    }

    #[test]
    fn terminal_clipboard_emits_osc52() {
        let mut sink = Vec::new();
        TerminalClipboard::new(&mut sink).write_text("hi").unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "\x1b]52;c;aGk=\x07");
        assert_eq!(osc52_sequence(""), "\x1b]52;c;\x07");
    }
}
