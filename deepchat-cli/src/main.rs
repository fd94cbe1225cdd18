mod console;

use anyhow::{Result, bail};
use deepchat_shared::config::{API_KEY_VAR, ENDPOINT_VAR};
use deepchat_shared::{ChatConfig, ChatSession};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: deepchat [--stream] [--system <prompt>] [--model <name>] [<prompt>...]";

const SYNC_SYSTEM_PROMPT: &str = "You are a helpful assistant";
const SYNC_PROMPT: &str = "Explain Riemann's conjecture in 1 paragraph";
const STREAM_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const STREAM_PROMPT: &str =
    "Maria's father has 4 daughters: Spring, Autumn, Winter. What is the name of the fourth daughter?";

#[derive(Debug, Default, PartialEq)]
struct Args {
    stream: bool,
    system_prompt: Option<String>,
    model: Option<String>,
    prompt: Option<String>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut words = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--stream" | "-s" => parsed.stream = true,
                "--system" => match args.next() {
                    Some(prompt) => parsed.system_prompt = Some(prompt),
                    None => bail!("--system needs a value\n{}", USAGE),
                },
                "--model" => match args.next() {
                    Some(model) => parsed.model = Some(model),
                    None => bail!("--model needs a value\n{}", USAGE),
                },
                "--help" | "-h" => bail!(USAGE),
                flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
                _ => words.push(arg),
            }
        }

        if !words.is_empty() {
            parsed.prompt = Some(words.join(" "));
        }
        Ok(parsed)
    }

    /// Prompts used when none are given, matching each mode's sample.
    fn prompts(&self) -> (&str, &str) {
        let (system, prompt) = if self.stream {
            (STREAM_SYSTEM_PROMPT, STREAM_PROMPT)
        } else {
            (SYNC_SYSTEM_PROMPT, SYNC_PROMPT)
        };
        (
            self.system_prompt.as_deref().unwrap_or(system),
            self.prompt.as_deref().unwrap_or(prompt),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the reply, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let config = ChatConfig::from_env();
    let mut session = ChatSession::from_config(&config);
    if let Some(model) = args.model.clone() {
        session = session.with_model(model);
    }
    if !session.is_ready() {
        bail!("Please set the environment variables {} and {}.", ENDPOINT_VAR, API_KEY_VAR);
    }

    let (system_prompt, prompt) = args.prompts();
    debug!("Prompt: {}", prompt);
    let request = session.request(Some(system_prompt), prompt)?;

    let mut stdout = std::io::stdout();
    if args.stream {
        info!("Streaming reply from {}", session.model());
        let stream = session.complete_stream(request).await?;
        console::print_stream(&mut stdout, stream).await?;
    } else {
        info!("Requesting reply from {}", session.model());
        let result = session.complete_sync(request).await?;
        console::print_result(&mut stdout, &result)?;
    }

    Ok(())
}
