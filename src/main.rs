use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use cafe_chat::backends::backend_for_id;
use cafe_chat::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use cafe_chat::interrupt::{next_input, Interrupts, PromptInput};
use cafe_chat::{
    logging, ChatConfig, Cli, Conversation, Role, SessionId, Transcript, TurnEvent, TurnOutcome,
};
use clap::Parser;
use session_store::{FileIdentityStore, IdentityProvider};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ChatConfig::from_cli(Cli::parse())?;
    logging::init(config.verbose);

    let backend = backend_for_id(&config.backend_id, &config)?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(FileIdentityStore::new(&config.state_dir));
    let profile = backend.profile();
    tracing::info!(backend = %profile.backend_id, endpoint = %profile.endpoint, "starting");

    let mut conversation = Conversation::with_options(backend, identity, config.options);
    match config.session_id.clone() {
        Some(session_id) => {
            conversation.resume(session_id).await?;
        }
        None => {
            conversation.hydrate().await;
        }
    }
    print_transcript(conversation.transcript())?;

    let mut interrupts = Interrupts::listen_for_ctrl_c();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let line = match next_input(&mut lines, &mut interrupts)
            .await
            .context("reading stdin")?
        {
            PromptInput::Line(line) => line,
            PromptInput::Eof => break,
            PromptInput::Interrupted => {
                println!();
                break;
            }
        };

        match parse_slash_command(&line) {
            Some(SlashCommand::Quit) => break,
            Some(command) => run_command(&mut conversation, command).await?,
            None => send_line(&mut conversation, &line, &mut interrupts).await?,
        }
    }

    Ok(())
}

async fn run_command(conversation: &mut Conversation, command: SlashCommand) -> io::Result<()> {
    match command {
        SlashCommand::Help => println!("{HELP_TEXT}"),
        SlashCommand::Reset => report(conversation.reset().map(|()| "Transcript cleared.")),
        SlashCommand::Forget => {
            let forgotten = match conversation.identity().get_identity() {
                Ok(session_id) => conversation
                    .backend()
                    .reset_session(&session_id)
                    .await
                    .map_err(|error| format!("Failed to clear chat: {error}")),
                Err(error) => Err(error.to_string()),
            };
            match forgotten {
                Ok(()) => report(conversation.reset().map(|()| "Server history deleted.")),
                Err(message) => eprintln!("error: {message}"),
            }
        }
        SlashCommand::New => match conversation.identity().clear() {
            Ok(()) => report(conversation.reset().map(|()| "Started a new session.")),
            Err(error) => eprintln!("error: {error}"),
        },
        SlashCommand::Resume(None) => println!("Usage: /resume <session-id>"),
        SlashCommand::Resume(Some(value)) => match SessionId::parse(value) {
            Ok(session_id) => match conversation.resume(session_id).await {
                Ok(loaded) => {
                    println!("Resumed session with {loaded} messages.");
                    print_transcript(conversation.transcript())?;
                }
                Err(error) => eprintln!("error: {error}"),
            },
            Err(error) => eprintln!("error: {error}"),
        },
        SlashCommand::Unknown(name) => println!("Unknown command {name}. {HELP_TEXT}"),
        SlashCommand::Quit => {}
    }
    io::stdout().flush()
}

async fn send_line(
    conversation: &mut Conversation,
    line: &str,
    interrupts: &mut Interrupts,
) -> io::Result<()> {
    let mut stdout = io::stdout();
    // Write errors are dropped mid-stream so they cannot abort the turn; a
    // broken stdout still surfaces at the next prompt.
    let send = conversation.send_with(line, |event, _transcript: &Transcript| match event {
        TurnEvent::Opened => {
            let _ = write!(stdout, "assistant: ");
            let _ = stdout.flush();
        }
        TurnEvent::Delta(delta) => {
            let _ = write!(stdout, "{delta}");
            let _ = stdout.flush();
        }
        TurnEvent::Committed(_) | TurnEvent::RolledBack(_) => {
            let _ = writeln!(stdout);
        }
    });

    let result = tokio::select! {
        result = send => Some(result),
        _ = interrupts.pressed() => None,
    };

    match result {
        Some(Ok(TurnOutcome::Committed { .. })) => {}
        Some(Ok(TurnOutcome::RolledBack { .. })) | None => {
            if let Some(error) = conversation.last_error() {
                eprintln!("\nerror: {error}");
            }
        }
        Some(Err(rejected)) => eprintln!("{rejected}"),
    }
    Ok(())
}

fn report<E: std::fmt::Display>(result: Result<&str, E>) {
    match result {
        Ok(message) => println!("{message}"),
        Err(error) => eprintln!("error: {error}"),
    }
}

fn print_transcript(transcript: &Transcript) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    for entry in transcript.entries() {
        let label = match entry.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        writeln!(stdout, "{label}: {}", entry.content)?;
    }
    stdout.flush()
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "you: ")?;
    stdout.flush()
}
