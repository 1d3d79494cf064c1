use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use alfred_core::{Agent, Reply, TranscriptSource};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

type Transcript = (String, TranscriptSource);

/// Runs an agent as an interactive chat in the terminal.
///
/// Lines read from stdin are sent to the agent, and its replies are
/// streamed to stdout. `/reset` forgets the conversation, `/exit` or the
/// end of input stops the chat.
pub struct Runner {
    agent: Agent,
    transcript_rx: mpsc::UnboundedReceiver<Transcript>,
}

impl Runner {
    /// Wraps `agent`, keeping its options apart from the transcript
    /// callback which the runner needs for itself.
    pub fn new(agent: Agent) -> Self {
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
        let options = agent.options().clone().on_transcript(move |text, source| {
            transcript_tx.send((text.to_owned(), source)).ok();
        });
        Self {
            agent: agent.with_options(options),
            transcript_rx,
        }
    }

    /// Chats until the input ends, blocking the calling thread.
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;
        runtime.block_on(self.chat())
    }

    async fn chat(mut self) -> Result<()> {
        let mut stdin = BufReader::new(io::stdin());
        let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

        info!(agent = self.agent.name(), "chat started");
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = read_line(&mut stdin).await else {
                break;
            };
            match line.trim() {
                "" => continue,
                "/exit" => break,
                "/reset" => {
                    self.agent.clear_conversation();
                    println!("{}", "Conversation cleared.".dimmed());
                    continue;
                }
                input => {
                    let result = self.send(input, &progress_style).await;
                    match result {
                        Ok(reply) => debug!(
                            steps = reply.steps,
                            tool_calls = reply.tool_calls.len(),
                            "turn finished"
                        ),
                        Err(err) => {
                            println!("{}{}", BAR_CHAR.bright_red(), err.red());
                        }
                    }
                    println!();
                }
            }
        }
        Ok(())
    }

    async fn send(
        &mut self,
        input: &str,
        progress_style: &ProgressStyle,
    ) -> Result<Reply, alfred_core::Error> {
        let mut turn = pin!(self.agent.send_message(input));
        let mut printer = Printer::default();
        let mut progress_bar = None;

        let result = loop {
            if !printer.streaming {
                // Create a new progress bar if it has been finished.
                progress_bar
                    .get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(progress_style.clone());
                        progress_bar.set_message("🤔 Thinking...");
                        progress_bar
                    })
                    .inc(1);
            }

            select! {
                result = &mut turn => break result,
                Some((text, source)) = self.transcript_rx.recv() => {
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    printer.print(&text, source);
                }
                _ = sleep(Duration::from_millis(100)) => {}
            }
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        while let Ok((text, source)) = self.transcript_rx.try_recv() {
            printer.print(&text, source);
        }
        printer.end_line();
        result
    }
}

#[derive(Default)]
struct Printer {
    streaming: bool,
}

impl Printer {
    fn print(&mut self, text: &str, source: TranscriptSource) {
        match source {
            TranscriptSource::Assistant => {
                if !self.streaming {
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    self.streaming = true;
                }
                print!("{}", text.bright_white());
                std::io::stdout().flush().ok();
            }
            TranscriptSource::Tool => {
                self.end_line();
                println!("{}🔧 {}", BAR_CHAR.bright_yellow(), text.dimmed());
            }
            TranscriptSource::User => {}
        }
    }

    fn end_line(&mut self) {
        if self.streaming {
            println!();
            self.streaming = false;
        }
    }
}

async fn read_line(stdin: &mut BufReader<Stdin>) -> Option<String> {
    let mut line = String::new();
    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {err}");
            None
        }
    }
}
